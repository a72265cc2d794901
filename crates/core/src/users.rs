use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserProfile {
    pub user_id: String,
    pub onboarded: bool,
    pub free_conversations_used: u32,
}

impl UserProfile {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            onboarded: false,
            free_conversations_used: 0,
        }
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Returns the profile, or `None` for a user never seen before.
    async fn profile(&self, user_id: &str) -> Result<Option<UserProfile>>;

    async fn complete_onboarding(&self, user_id: &str) -> Result<UserProfile>;

    /// Counts one more practice conversation and returns the new total.
    ///
    /// With a non-zero `limit` the check and the increment are one atomic
    /// step: `None` means the user had already used `limit` conversations
    /// and nothing was counted.
    async fn record_conversation(&self, user_id: &str, limit: u32) -> Result<Option<u32>>;
}

/// Everything the service persists.
pub trait Store: crate::progress::ProgressStore + UserStore {}

impl<T> Store for T where T: crate::progress::ProgressStore + UserStore {}
