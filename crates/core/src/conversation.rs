//! Conversation messages exchanged during a practice session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageSource {
    User,
    Ai,
}

impl MessageSource {
    /// The speaker label used when rendering a transcript.
    pub fn label(&self) -> &'static str {
        match self {
            MessageSource::User => "USER",
            MessageSource::Ai => "AI",
        }
    }
}

impl fmt::Display for MessageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageSource::User => write!(f, "user"),
            MessageSource::Ai => write!(f, "ai"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub struct Message {
    pub source: MessageSource,
    pub text: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(source: MessageSource, text: impl Into<String>) -> Self {
        Self {
            source,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// A message as the voice vendor delivers it: either a bare string or an
/// object naming its speaker.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum VendorPayload {
    RawText(String),
    Structured {
        #[serde(default)]
        source: Option<String>,
        #[serde(alias = "text")]
        message: String,
    },
}

impl VendorPayload {
    /// Resolves the payload into a canonical message.
    ///
    /// Bare strings and unknown speakers are attributed to the AI, which is
    /// what the vendor sends when it omits the source. Blank text yields `None`.
    pub fn into_message(self, timestamp: DateTime<Utc>) -> Option<Message> {
        let (source, text) = match self {
            VendorPayload::RawText(text) => (MessageSource::Ai, text),
            VendorPayload::Structured { source, message } => {
                let source = match source.as_deref().map(str::to_ascii_lowercase).as_deref() {
                    Some("user") => MessageSource::User,
                    _ => MessageSource::Ai,
                };
                (source, message)
            }
        };
        if text.trim().is_empty() {
            return None;
        }
        Some(Message {
            source,
            text,
            timestamp,
        })
    }
}

/// Speaking state reported by the voice vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VendorMode {
    Speaking,
    Listening,
}

/// Renders messages as `SOURCE: text` lines in arrival order.
pub fn render_transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.source.label(), m.text))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_text_payload_is_attributed_to_ai() {
        let payload: VendorPayload = serde_json::from_str(r#""Hello there""#).unwrap();
        let message = payload.into_message(Utc::now()).unwrap();
        assert_eq!(message.source, MessageSource::Ai);
        assert_eq!(message.text, "Hello there");
    }

    #[test]
    fn structured_payload_keeps_its_source() {
        let payload: VendorPayload =
            serde_json::from_str(r#"{"source": "user", "message": "Hi"}"#).unwrap();
        let message = payload.into_message(Utc::now()).unwrap();
        assert_eq!(message.source, MessageSource::User);
        assert_eq!(message.text, "Hi");
    }

    #[test]
    fn structured_payload_accepts_text_alias_and_unknown_source() {
        let payload: VendorPayload =
            serde_json::from_str(r#"{"source": "agent", "text": "Welcome"}"#).unwrap();
        assert_eq!(
            payload.into_message(Utc::now()).unwrap().source,
            MessageSource::Ai
        );
    }

    #[test]
    fn blank_payload_is_dropped() {
        let payload = VendorPayload::RawText("   ".to_string());
        assert!(payload.into_message(Utc::now()).is_none());
    }

    #[test]
    fn transcript_renders_in_arrival_order() {
        let messages = vec![
            Message::new(MessageSource::User, "Hi"),
            Message::new(MessageSource::Ai, "Hello"),
        ];
        assert_eq!(render_transcript(&messages), "USER: Hi\nAI: Hello");
        assert_eq!(render_transcript(&[]), "");
    }

    #[test]
    fn message_source_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&MessageSource::Ai).unwrap(), "\"ai\"");
        assert_eq!(MessageSource::User.to_string(), "user");
    }

    #[test]
    fn message_without_timestamp_deserializes() {
        let message: Message = serde_json::from_str(r#"{"source":"user","text":"Hi"}"#).unwrap();
        assert_eq!(message.source, MessageSource::User);
    }
}
