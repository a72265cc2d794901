//! Vendor API key validation.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::ToSchema;

use crate::voice::ELEVENLABS_API_BASE;

pub const FAL_KEY_CHECK_URL: &str = "https://rest.alpha.fal.ai/tokens/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
pub struct KeyStatus {
    pub elevenlabs: bool,
    pub falai: bool,
}

#[async_trait]
pub trait KeyValidator: Send + Sync {
    async fn validate_elevenlabs(&self, key: &str) -> bool;

    async fn validate_fal(&self, key: &str) -> bool;

    /// Checks both keys concurrently.
    async fn validate(&self, elevenlabs_key: &str, fal_key: &str) -> KeyStatus {
        let (elevenlabs, falai) = tokio::join!(
            self.validate_elevenlabs(elevenlabs_key),
            self.validate_fal(fal_key)
        );
        KeyStatus { elevenlabs, falai }
    }
}

/// Validates keys by making an authenticated request to each vendor.
/// A key is valid iff it is non-empty and the vendor answers 2xx.
pub struct HttpKeyValidator {
    client: Client,
    elevenlabs_base: String,
    fal_check_url: String,
}

impl Default for HttpKeyValidator {
    fn default() -> Self {
        Self::new(ELEVENLABS_API_BASE.to_string(), FAL_KEY_CHECK_URL.to_string())
    }
}

impl HttpKeyValidator {
    pub fn new(elevenlabs_base: String, fal_check_url: String) -> Self {
        Self {
            client: Client::new(),
            elevenlabs_base,
            fal_check_url,
        }
    }

    async fn check(&self, vendor: &str, request: reqwest::RequestBuilder) -> bool {
        match request.send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                warn!(vendor, error = %e, "Key validation request failed");
                false
            }
        }
    }
}

#[async_trait]
impl KeyValidator for HttpKeyValidator {
    async fn validate_elevenlabs(&self, key: &str) -> bool {
        if key.trim().is_empty() {
            return false;
        }
        let url = format!("{}/v1/user", self.elevenlabs_base.trim_end_matches('/'));
        self.check("elevenlabs", self.client.get(url).header("xi-api-key", key))
            .await
    }

    async fn validate_fal(&self, key: &str) -> bool {
        if key.trim().is_empty() {
            return false;
        }
        self.check(
            "falai",
            self.client
                .get(&self.fal_check_url)
                .header("Authorization", format!("Key {key}")),
        )
        .await
    }
}
