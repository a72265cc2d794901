//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds the catalog, the
//! store and every vendor client behind its trait.

use crate::config::Config;
use oratoria_core::{
    catalog::Catalog, coach::CourseCoach, feedback::FeedbackGenerator, keys::KeyStatus,
    keys::KeyValidator, periodic::PeriodicTask, users::Store, voice::VoiceProvider,
};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub catalog: Arc<Catalog>,
    pub store: Arc<dyn Store>,
    pub feedback: Arc<dyn FeedbackGenerator>,
    pub coach: Arc<CourseCoach>,
    pub voice: Arc<dyn VoiceProvider>,
    pub keys: Arc<dyn KeyValidator>,
    /// Periodic re-validation of the configured vendor keys, if any are set.
    pub key_monitor: Option<Arc<PeriodicTask<KeyStatus>>>,
}
