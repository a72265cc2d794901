//! Defines the WebSocket message protocol between the browser client and the API server.
//!
//! The browser talks to the voice vendor directly and relays what the vendor
//! reports (transcript messages, speaking mode, disconnects) over this socket.
//! The server owns the practice state machine and pushes a fresh snapshot after
//! every change.

use oratoria_core::{
    catalog::Difficulty,
    conversation::{VendorMode, VendorPayload},
    practice::PracticeSnapshot,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which situation to practice. Exactly one of `situation_id` and
/// `template_id` must be set.
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
pub struct StartPractice {
    /// When set, the situation must belong to this course.
    #[serde(default)]
    pub course_id: Option<String>,
    #[serde(default)]
    pub situation_id: Option<String>,
    #[serde(default)]
    pub template_id: Option<String>,
    /// Template variable values.
    #[serde(default)]
    pub variables: HashMap<String, String>,
    /// Overrides a template's difficulty.
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
}

/// Messages sent from the client (browser) to the server.
#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Start(StartPractice),
    /// A transcript event forwarded verbatim from the vendor SDK.
    VendorMessage { payload: VendorPayload },
    ModeChange { mode: VendorMode },
    /// The vendor closed the conversation on its own.
    VendorDisconnect,
    Stop,
    TryAgain,
    DismissError,
}

/// Messages sent from the server to the client (browser).
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Open the vendor conversation with these credentials.
    SessionCredentials { url: String, agent_id: String },
    /// The full practice state after a change.
    State(PracticeSnapshot),
    /// Close the vendor conversation.
    StopVendorSession,
    /// A request could not be served. The practice state is unchanged.
    Error { message: String },
}
