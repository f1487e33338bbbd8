use serde::Deserialize;
use serde_json::Value;

use crate::session::SessionRecord;

/// Host events the reconciler understands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    SessionCreated(SessionRecord),
    SessionUpdated(SessionRecord),
    SessionDeleted(SessionRecord),
    SessionIdle { session_id: String },
    SessionStatus { session_id: String, busy: bool },
    PermissionAsked { session_id: String },
    QuestionAsked { session_id: String },
    /// Session picked in the TUI
    SessionSelected { session_id: String },
    /// A message was exchanged on a session
    MessageUpdated { session_id: String },
    InstanceDisposed,
    /// Anything else, including known types with malformed properties.
    /// Ignored so newer hosts can add event types freely.
    Unknown(String),
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    properties: Value,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Envelope {
    /// Global stream shape: `{ "directory": ..., "payload": { ... } }`
    Global { payload: RawEvent },
    Bare(RawEvent),
}

#[derive(Debug, Deserialize)]
struct InfoProps {
    info: SessionRecord,
}

#[derive(Debug, Deserialize)]
struct SessionProps {
    #[serde(rename = "sessionID")]
    session_id: String,
}

#[derive(Debug, Deserialize)]
struct StatusProps {
    #[serde(rename = "sessionID")]
    session_id: String,
    status: Status,
}

#[derive(Debug, Deserialize)]
struct Status {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct MessageProps {
    info: MessageInfo,
}

#[derive(Debug, Deserialize)]
struct MessageInfo {
    #[serde(rename = "sessionID")]
    session_id: String,
}

impl Event {
    /// Build an event from its wire type and properties
    pub fn from_parts(kind: &str, properties: Value) -> Self {
        Self::try_from_parts(kind, properties).unwrap_or_else(|| Event::Unknown(kind.to_string()))
    }

    fn try_from_parts(kind: &str, properties: Value) -> Option<Self> {
        let session_id = |properties: Value| {
            serde_json::from_value::<SessionProps>(properties)
                .ok()
                .map(|p| p.session_id)
        };
        let info = |properties: Value| {
            serde_json::from_value::<InfoProps>(properties)
                .ok()
                .map(|p| p.info)
        };

        let event = match kind {
            "session.created" => Event::SessionCreated(info(properties)?),
            "session.updated" => Event::SessionUpdated(info(properties)?),
            "session.deleted" => Event::SessionDeleted(info(properties)?),
            "session.idle" => Event::SessionIdle {
                session_id: session_id(properties)?,
            },
            "session.status" => {
                let props: StatusProps = serde_json::from_value(properties).ok()?;
                Event::SessionStatus {
                    session_id: props.session_id,
                    busy: props.status.kind == "busy",
                }
            }
            "permission.asked" => Event::PermissionAsked {
                session_id: session_id(properties)?,
            },
            "question.asked" => Event::QuestionAsked {
                session_id: session_id(properties)?,
            },
            "tui.session.select" => Event::SessionSelected {
                session_id: session_id(properties)?,
            },
            "message.updated" => {
                let props: MessageProps = serde_json::from_value(properties).ok()?;
                Event::MessageUpdated {
                    session_id: props.info.session_id,
                }
            }
            "server.instance.disposed" => Event::InstanceDisposed,
            _ => return None,
        };
        Some(event)
    }
}

/// Parse one line of the event stream.
///
/// Accepts bare events, global-stream envelopes and SSE `data:` lines.
/// Returns `None` for blank lines, SSE comments/fields and invalid JSON.
pub fn parse_event_line(line: &str) -> Option<Event> {
    let line = line.trim();
    let json = match line.strip_prefix("data:") {
        Some(data) => data.trim_start(),
        None if line.starts_with('{') => line,
        None => return None,
    };
    if json.is_empty() {
        return None;
    }

    let raw = match serde_json::from_str::<Envelope>(json) {
        Ok(Envelope::Global { payload }) => payload,
        Ok(Envelope::Bare(raw)) => raw,
        Err(e) => {
            tracing::debug!(error = %e, "skipping unparseable event line");
            return None;
        }
    };
    Some(Event::from_parts(&raw.kind, raw.properties))
}
