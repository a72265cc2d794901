//! Voice Vendor Broker
//!
//! Audio transport, speech recognition and synthesis all happen between the
//! browser and the voice vendor. The server only hands out the credentials a
//! browser needs to open a vendor conversation.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

pub const ELEVENLABS_API_BASE: &str = "https://api.elevenlabs.io";

/// What the browser needs to join a vendor conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VoiceSessionCredentials {
    pub url: String,
    pub agent_id: String,
}

#[async_trait]
pub trait VoiceProvider: Send + Sync {
    /// Obtains credentials for a fresh vendor conversation.
    async fn start_session(&self) -> Result<VoiceSessionCredentials>;
}

#[derive(Deserialize)]
struct SignedUrlResponse {
    signed_url: String,
}

/// Requests signed conversation URLs from the ElevenLabs conversational API.
pub struct ElevenLabsProvider {
    client: Client,
    api_base: String,
    api_key: String,
    agent_id: String,
}

impl ElevenLabsProvider {
    pub fn new(api_key: String, agent_id: String) -> Self {
        Self::with_api_base(ELEVENLABS_API_BASE.to_string(), api_key, agent_id)
    }

    pub fn with_api_base(api_base: String, api_key: String, agent_id: String) -> Self {
        Self {
            client: Client::new(),
            api_base,
            api_key,
            agent_id,
        }
    }
}

#[async_trait]
impl VoiceProvider for ElevenLabsProvider {
    async fn start_session(&self) -> Result<VoiceSessionCredentials> {
        let url = format!(
            "{}/v1/convai/conversation/get_signed_url",
            self.api_base.trim_end_matches('/')
        );
        let response = self
            .client
            .get(&url)
            .query(&[("agent_id", self.agent_id.as_str())])
            .header("xi-api-key", &self.api_key)
            .send()
            .await
            .context("Failed to reach the voice vendor")?;

        let status = response.status();
        if !status.is_success() {
            bail!("Voice vendor returned {status}");
        }
        let body: SignedUrlResponse = response
            .json()
            .await
            .context("Voice vendor returned an unexpected body")?;

        info!(agent_id = %self.agent_id, "Obtained signed conversation URL");
        Ok(VoiceSessionCredentials {
            url: body.signed_url,
            agent_id: self.agent_id.clone(),
        })
    }
}

/// Used when no voice vendor is configured; every start fails.
pub struct UnconfiguredVoiceProvider;

#[async_trait]
impl VoiceProvider for UnconfiguredVoiceProvider {
    async fn start_session(&self) -> Result<VoiceSessionCredentials> {
        bail!("No voice vendor is configured")
    }
}
