//! Practice Session State Machine
//!
//! A practice attempt moves through `initial → conversation → analyzing →
//! feedback`, and back to `initial` on "try again" or on failure. The machine
//! is a pure transition function: [`PracticeSession::handle`] applies an event
//! and returns the [`PracticeCommand`]s the runtime must execute (start or stop
//! the vendor session, request feedback). It never performs I/O itself.
//!
//! The `analyzing` state is the single-flight guard for feedback: it can only
//! be entered from `conversation`, and stop/disconnect events received while
//! analyzing are ignored, so one attempt issues at most one feedback request.

use crate::{
    catalog::Situation,
    conversation::{Message, VendorMode},
    feedback::{FEEDBACK_FAILED_MESSAGE, Feedback, FeedbackRequest},
};
use serde::Serialize;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

/// The scenario text the feedback prompt needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub context: String,
    pub user_goal: String,
    pub ai_role: String,
}

impl From<&Situation> for Scenario {
    fn from(situation: &Situation) -> Self {
        Self {
            context: situation.context.clone(),
            user_goal: situation.user_goal.clone(),
            ai_role: situation.ai_role.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Initial,
    Conversation,
    Analyzing,
    Feedback,
}

#[derive(Debug, Clone, PartialEq)]
enum PracticeState {
    Initial,
    Conversation { ai_speaking: bool },
    /// A feedback request identified by `ticket` is in flight.
    Analyzing { ticket: u64 },
    Feedback(Feedback),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PracticeEvent {
    /// The user pressed start.
    Start,
    /// The vendor session could not be started.
    VendorStartFailed(String),
    /// A message already resolved at the ingestion boundary.
    Message(Message),
    ModeChanged(VendorMode),
    /// The user pressed stop.
    Stop,
    /// The vendor ended the session on its own.
    VendorDisconnected,
    FeedbackReady { ticket: u64, feedback: Feedback },
    FeedbackFailed { ticket: u64, reason: String },
    TryAgain,
    DismissError,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PracticeCommand {
    StartVendorSession,
    StopVendorSession,
    RequestFeedback {
        ticket: u64,
        request: FeedbackRequest,
    },
}

/// What the UI renders.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PracticeSnapshot {
    pub phase: Phase,
    pub messages: Vec<Message>,
    pub ai_speaking: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<Feedback>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug)]
pub struct PracticeSession {
    scenario: Scenario,
    state: PracticeState,
    messages: Vec<Message>,
    error: Option<String>,
    next_ticket: u64,
}

impl PracticeSession {
    pub fn new(scenario: Scenario) -> Self {
        Self {
            scenario,
            state: PracticeState::Initial,
            messages: Vec::new(),
            error: None,
            next_ticket: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        match self.state {
            PracticeState::Initial => Phase::Initial,
            PracticeState::Conversation { .. } => Phase::Conversation,
            PracticeState::Analyzing { .. } => Phase::Analyzing,
            PracticeState::Feedback(_) => Phase::Feedback,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn ai_speaking(&self) -> bool {
        matches!(self.state, PracticeState::Conversation { ai_speaking: true })
    }

    pub fn feedback(&self) -> Option<&Feedback> {
        match &self.state {
            PracticeState::Feedback(feedback) => Some(feedback),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn snapshot(&self) -> PracticeSnapshot {
        PracticeSnapshot {
            phase: self.phase(),
            messages: self.messages.clone(),
            ai_speaking: self.ai_speaking(),
            feedback: self.feedback().cloned(),
            error: self.error.clone(),
        }
    }

    /// Applies one event and returns the side effects to run, in order.
    pub fn handle(&mut self, event: PracticeEvent) -> Vec<PracticeCommand> {
        let phase = self.phase();
        let analyzing_ticket = match self.state {
            PracticeState::Analyzing { ticket } => Some(ticket),
            _ => None,
        };
        debug!(?phase, ?event, "Practice event");

        match (phase, event) {
            (Phase::Initial, PracticeEvent::Start) => {
                self.messages.clear();
                self.error = None;
                self.state = PracticeState::Conversation { ai_speaking: false };
                vec![PracticeCommand::StartVendorSession]
            }
            (Phase::Conversation, PracticeEvent::VendorStartFailed(reason)) => {
                warn!(%reason, "Vendor session failed to start");
                self.state = PracticeState::Initial;
                self.error = Some("Failed to start the conversation".to_string());
                vec![]
            }
            (Phase::Conversation, PracticeEvent::Message(message)) => {
                self.messages.push(message);
                vec![]
            }
            (Phase::Conversation, PracticeEvent::ModeChanged(mode)) => {
                self.state = PracticeState::Conversation {
                    ai_speaking: mode == VendorMode::Speaking,
                };
                vec![]
            }
            (Phase::Conversation, PracticeEvent::Stop) => {
                let mut commands = vec![PracticeCommand::StopVendorSession];
                commands.extend(self.finish_conversation());
                commands
            }
            (Phase::Conversation, PracticeEvent::VendorDisconnected) => self.finish_conversation(),
            (Phase::Analyzing, PracticeEvent::FeedbackReady { ticket, feedback })
                if analyzing_ticket == Some(ticket) =>
            {
                info!(ticket, "Feedback received");
                self.state = PracticeState::Feedback(feedback);
                vec![]
            }
            (Phase::Analyzing, PracticeEvent::FeedbackFailed { ticket, reason })
                if analyzing_ticket == Some(ticket) =>
            {
                warn!(ticket, %reason, "Feedback request failed");
                self.state = PracticeState::Initial;
                self.error = Some(FEEDBACK_FAILED_MESSAGE.to_string());
                vec![]
            }
            (Phase::Feedback | Phase::Initial, PracticeEvent::TryAgain) => {
                self.messages.clear();
                self.error = None;
                self.state = PracticeState::Initial;
                vec![]
            }
            (_, PracticeEvent::DismissError) => {
                self.error = None;
                vec![]
            }
            (phase, event) => {
                debug!(?phase, ?event, "Ignoring event in current phase");
                vec![]
            }
        }
    }

    /// Leaves `conversation`: analyze the transcript, or return to `initial`
    /// when nothing was said.
    fn finish_conversation(&mut self) -> Vec<PracticeCommand> {
        if self.messages.is_empty() {
            info!("Conversation ended without messages");
            self.state = PracticeState::Initial;
            return vec![];
        }
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        self.state = PracticeState::Analyzing { ticket };
        vec![PracticeCommand::RequestFeedback {
            ticket,
            request: FeedbackRequest {
                messages: self.messages.clone(),
                context: self.scenario.context.clone(),
                user_goal: self.scenario.user_goal.clone(),
                ai_role: self.scenario.ai_role.clone(),
            },
        }]
    }
}
