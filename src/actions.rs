use crate::opencode::Event;

/// Actions that can be dispatched to the reconciler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// An event from the host event stream
    Event(Event),
    /// A message was exchanged on a session
    ChatMessage { session_id: String },
    /// This process is shutting down
    Shutdown,
}

impl From<Event> for Action {
    fn from(event: Event) -> Self {
        match event {
            Event::MessageUpdated { session_id } => Action::ChatMessage { session_id },
            event => Action::Event(event),
        }
    }
}
