//! Stub services shared by the handler, router and WebSocket tests.

use crate::{config::Config, state::AppState};
use anyhow::{Result, bail};
use async_trait::async_trait;
use oratoria_core::{
    catalog::Catalog,
    coach::CourseCoach,
    feedback::LLMFeedbackGenerator,
    keys::KeyValidator,
    llm_client::{LLMClient, ResponseShape},
    memory::MemoryStore,
    voice::{VoiceProvider, VoiceSessionCredentials},
};
use std::sync::Arc;

pub const VALID_FEEDBACK_JSON: &str =
    r#"{"perception":"Confident","strongPoints":["Clear"],"improvementAreas":["Pace"]}"#;

pub struct StubVoice {
    pub fail: bool,
}

#[async_trait]
impl VoiceProvider for StubVoice {
    async fn start_session(&self) -> Result<VoiceSessionCredentials> {
        if self.fail {
            bail!("vendor unavailable");
        }
        Ok(VoiceSessionCredentials {
            url: "wss://vendor.test/convai".to_string(),
            agent_id: "agent-test".to_string(),
        })
    }
}

/// Answers every prompt with the same text.
pub struct StubLlm {
    pub response: String,
}

#[async_trait]
impl LLMClient for StubLlm {
    async fn complete(&self, _: &str, _: &str, _: ResponseShape) -> Result<String> {
        Ok(self.response.clone())
    }
}

/// Accepts exactly one key per vendor.
pub struct StubKeys;

pub const GOOD_ELEVENLABS_KEY: &str = "sk_good";

#[async_trait]
impl KeyValidator for StubKeys {
    async fn validate_elevenlabs(&self, key: &str) -> bool {
        key == GOOD_ELEVENLABS_KEY
    }

    async fn validate_fal(&self, _key: &str) -> bool {
        false
    }
}

pub struct TestApp {
    pub voice_fails: bool,
    pub llm_response: String,
    pub config: Config,
}

impl Default for TestApp {
    fn default() -> Self {
        Self {
            voice_fails: false,
            llm_response: VALID_FEEDBACK_JSON.to_string(),
            config: Config::default(),
        }
    }
}

impl TestApp {
    /// Builds the shared state over an in-memory store and returns both.
    pub fn build(self) -> (Arc<AppState>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let llm: Arc<dyn LLMClient> = Arc::new(StubLlm {
            response: self.llm_response,
        });
        let state = Arc::new(AppState {
            config: Arc::new(self.config),
            catalog: Arc::new(Catalog::builtin().unwrap()),
            store: store.clone(),
            feedback: Arc::new(LLMFeedbackGenerator::new(llm.clone())),
            coach: Arc::new(CourseCoach::new(llm)),
            voice: Arc::new(StubVoice {
                fail: self.voice_fails,
            }),
            keys: Arc::new(StubKeys),
            key_monitor: None,
        });
        (state, store)
    }
}
