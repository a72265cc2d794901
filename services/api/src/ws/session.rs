//! Manages the practice WebSocket connection lifecycle.
//!
//! Each connection owns one [`PracticeSession`] state machine. Client messages
//! and results of background work (vendor session start, feedback generation)
//! are turned into practice events; the commands the machine returns are run
//! here, and a state snapshot is pushed to the client after every change.

use super::protocol::{ClientMessage, ServerMessage, StartPractice};
use crate::{
    auth::AuthUser,
    handlers::{
        ApiError,
        catalog::ensure_course_access,
        conversation::{ensure_conversation_allowance, record_conversation},
    },
    state::AppState,
};
use anyhow::Result;
use axum::{
    extract::{
        State,
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use oratoria_core::{
    catalog::{Catalog, Course, Situation},
    feedback::{Feedback, FeedbackError, FeedbackRequest, generate_with_timeout},
    practice::{Phase, PracticeCommand, PracticeEvent, PracticeSession, Scenario},
    voice::VoiceSessionCredentials,
};
use std::sync::Arc;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{Instrument, debug, error, info, instrument, warn};

/// Axum handler to upgrade an HTTP connection to a WebSocket.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, user_id))
}

/// Results of work the runtime runs in the background.
#[derive(Debug)]
enum RuntimeEvent {
    VendorStarted {
        attempt: u64,
        result: Result<VoiceSessionCredentials>,
    },
    FeedbackFinished {
        ticket: u64,
        result: Result<Feedback, FeedbackError>,
    },
}

#[instrument(name = "ws_session", skip_all, fields(session_id, user_id = %user_id))]
async fn handle_socket(socket: WebSocket, state: Arc<AppState>, user_id: String) {
    let temp_id: u32 = rand::random();
    tracing::Span::current().record("session_id", &temp_id.to_string());
    info!("New practice WebSocket connection.");

    let (mut socket_tx, mut socket_rx) = socket.split();
    let (events_tx, mut events_rx) = mpsc::channel(8);
    let mut runtime = PracticeRuntime::new(state, user_id, events_tx);

    loop {
        let outgoing = tokio::select! {
            // Handle messages from the client WebSocket.
            msg = socket_rx.next() => match msg {
                Some(Ok(WsMessage::Text(text))) => {
                    match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(msg) => runtime.on_client_message(msg).await,
                        Err(e) => {
                            warn!(error = %e, "Ignoring malformed client message.");
                            vec![ServerMessage::Error {
                                message: format!("Invalid message: {e}"),
                            }]
                        }
                    }
                }
                Some(Ok(WsMessage::Close(_))) | None => {
                    info!("Client closed the connection.");
                    break;
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    error!("Error receiving from client WebSocket: {:?}", e);
                    break;
                }
            },
            // Handle results of background work.
            Some(event) = events_rx.recv() => runtime.on_runtime_event(event).await,
        };

        if let Err(e) = send_all(&mut socket_tx, outgoing).await {
            error!(error = ?e, "Failed to send to client; closing session.");
            break;
        }
    }

    runtime.shutdown();
    info!("Practice session terminated.");
}

/// Drives one connection's practice state machine.
struct PracticeRuntime {
    state: Arc<AppState>,
    user_id: String,
    session: Option<PracticeSession>,
    events_tx: mpsc::Sender<RuntimeEvent>,
    tasks: Vec<JoinHandle<()>>,
    /// Identifies the most recent vendor start, so late credentials from an
    /// abandoned attempt are dropped.
    vendor_attempt: u64,
}

impl PracticeRuntime {
    fn new(state: Arc<AppState>, user_id: String, events_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self {
            state,
            user_id,
            session: None,
            events_tx,
            tasks: Vec::new(),
            vendor_attempt: 0,
        }
    }

    async fn on_client_message(&mut self, msg: ClientMessage) -> Vec<ServerMessage> {
        let event = match msg {
            ClientMessage::Start(start) => return self.start(start).await,
            ClientMessage::VendorMessage { payload } => match payload.into_message(Utc::now()) {
                Some(message) => PracticeEvent::Message(message),
                None => return vec![],
            },
            ClientMessage::ModeChange { mode } => PracticeEvent::ModeChanged(mode),
            ClientMessage::VendorDisconnect => PracticeEvent::VendorDisconnected,
            ClientMessage::Stop => PracticeEvent::Stop,
            ClientMessage::TryAgain => PracticeEvent::TryAgain,
            ClientMessage::DismissError => PracticeEvent::DismissError,
        };
        self.apply(event)
    }

    async fn on_runtime_event(&mut self, event: RuntimeEvent) -> Vec<ServerMessage> {
        match event {
            RuntimeEvent::VendorStarted { attempt, result } => {
                let current = attempt == self.vendor_attempt
                    && self.session.as_ref().map(PracticeSession::phase)
                        == Some(Phase::Conversation);
                if !current {
                    debug!(attempt, "Discarding result of an abandoned vendor start.");
                    return vec![];
                }
                match result {
                    Ok(credentials) => {
                        match record_conversation(&self.state, &self.user_id).await {
                            Ok(used) => info!(used, "Practice conversation started."),
                            Err(ApiError::Forbidden(message)) => {
                                let mut out = vec![ServerMessage::Error {
                                    message: message.clone(),
                                }];
                                out.extend(self.apply(PracticeEvent::VendorStartFailed(message)));
                                return out;
                            }
                            Err(e) => {
                                error!(error = ?e, "Failed to record conversation.")
                            }
                        }
                        vec![ServerMessage::SessionCredentials {
                            url: credentials.url,
                            agent_id: credentials.agent_id,
                        }]
                    }
                    Err(e) => self.apply(PracticeEvent::VendorStartFailed(e.to_string())),
                }
            }
            RuntimeEvent::FeedbackFinished { ticket, result } => {
                let event = match result {
                    Ok(feedback) => PracticeEvent::FeedbackReady { ticket, feedback },
                    Err(e) => PracticeEvent::FeedbackFailed {
                        ticket,
                        reason: e.to_string(),
                    },
                };
                self.apply(event)
            }
        }
    }

    /// Starts a new practice attempt, replacing a finished one.
    async fn start(&mut self, start: StartPractice) -> Vec<ServerMessage> {
        let busy = self
            .session
            .as_ref()
            .is_some_and(|s| matches!(s.phase(), Phase::Conversation | Phase::Analyzing));
        if busy {
            return vec![ServerMessage::Error {
                message: "A practice conversation is already in progress".to_string(),
            }];
        }

        match self.prepare(&start).await {
            Ok(scenario) => {
                self.session = Some(PracticeSession::new(scenario));
                self.apply(PracticeEvent::Start)
            }
            Err(e) => {
                if let ApiError::InternalServerError(err) = &e {
                    error!(error = ?err, "Failed to prepare practice session.");
                }
                vec![ServerMessage::Error {
                    message: e.public_message(),
                }]
            }
        }
    }

    async fn prepare(&self, start: &StartPractice) -> Result<Scenario, ApiError> {
        let (course, situation) = select_situation(&self.state.catalog, start)?;
        if let Some(course) = course {
            ensure_course_access(&self.state, &self.user_id, course).await?;
        }
        ensure_conversation_allowance(&self.state, &self.user_id).await?;
        info!(situation_id = %situation.id, "Practice session prepared.");
        Ok(Scenario::from(&situation))
    }

    /// Feeds one event to the state machine and runs the resulting commands.
    fn apply(&mut self, event: PracticeEvent) -> Vec<ServerMessage> {
        let Some(session) = self.session.as_mut() else {
            return vec![ServerMessage::Error {
                message: "No practice session has been started".to_string(),
            }];
        };
        let commands = session.handle(event);

        let mut outgoing = Vec::new();
        for command in commands {
            match command {
                PracticeCommand::StartVendorSession => self.spawn_vendor_start(),
                PracticeCommand::StopVendorSession => {
                    outgoing.push(ServerMessage::StopVendorSession)
                }
                PracticeCommand::RequestFeedback { ticket, request } => {
                    self.spawn_feedback(ticket, request)
                }
            }
        }
        if let Some(session) = &self.session {
            outgoing.push(ServerMessage::State(session.snapshot()));
        }
        outgoing
    }

    fn spawn_vendor_start(&mut self) {
        self.vendor_attempt += 1;
        let attempt = self.vendor_attempt;
        let voice = self.state.voice.clone();
        let events_tx = self.events_tx.clone();
        self.track(tokio::spawn(
            async move {
                let result = voice.start_session().await;
                let _ = events_tx
                    .send(RuntimeEvent::VendorStarted { attempt, result })
                    .await;
            }
            .in_current_span(),
        ));
    }

    fn spawn_feedback(&mut self, ticket: u64, request: FeedbackRequest) {
        let generator = self.state.feedback.clone();
        let timeout = self.state.config.feedback_timeout;
        let events_tx = self.events_tx.clone();
        self.track(tokio::spawn(
            async move {
                let result = generate_with_timeout(generator.as_ref(), &request, timeout).await;
                let _ = events_tx
                    .send(RuntimeEvent::FeedbackFinished { ticket, result })
                    .await;
            }
            .in_current_span(),
        ));
    }

    fn track(&mut self, handle: JoinHandle<()>) {
        self.tasks.retain(|task| !task.is_finished());
        self.tasks.push(handle);
    }

    /// Aborts background work still running for this connection.
    fn shutdown(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

/// Picks the situation a `start` message asks for. Course situations also
/// return their course, whose access rules the caller must check.
fn select_situation<'a>(
    catalog: &'a Catalog,
    start: &StartPractice,
) -> Result<(Option<&'a Course>, Situation), ApiError> {
    match (&start.template_id, &start.situation_id) {
        (Some(template_id), None) => {
            let template = catalog
                .template(template_id)
                .map_err(ApiError::from_catalog)?;
            Ok((None, template.resolve(&start.variables, start.difficulty)))
        }
        (None, Some(situation_id)) => {
            let (course, situation) = catalog.find_situation(situation_id).ok_or_else(|| {
                ApiError::NotFound(format!("Situation '{situation_id}' not found"))
            })?;
            if let Some(course_id) = &start.course_id {
                if *course_id != course.id {
                    return Err(ApiError::NotFound(format!(
                        "Situation '{situation_id}' not found in course '{course_id}'"
                    )));
                }
            }
            Ok((Some(course), situation.clone()))
        }
        _ => Err(ApiError::BadRequest(
            "start requires exactly one of situation_id and template_id".to_string(),
        )),
    }
}

/// A helper function to serialize and send `ServerMessage`s to the client.
async fn send_all(
    socket_tx: &mut SplitSink<WebSocket, WsMessage>,
    messages: Vec<ServerMessage>,
) -> Result<()> {
    for msg in messages {
        let serialized = serde_json::to_string(&msg)?;
        socket_tx.send(WsMessage::Text(serialized.into())).await?;
    }
    Ok(())
}
