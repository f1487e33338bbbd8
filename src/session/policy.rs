use std::collections::HashSet;

use super::{short_id, SessionLookup, SessionRegistry};

/// Outcome of resolving the name of a session about to be shown
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Name(String),
    /// The host reports the session as a sub-agent; it must not become active
    Subagent,
}

/// Decides which session is in focus and whether it waits for input.
///
/// New sessions only take focus when nothing is active. Explicit signals
/// (chat activity, manual selection) always move focus to their session.
#[derive(Debug)]
pub struct ActivationPolicy {
    active_session_id: Option<String>,
    waiting_for_input: bool,
    /// Ids whose lookup already failed or came back empty
    failed_lookups: HashSet<String>,
}

impl Default for ActivationPolicy {
    fn default() -> Self {
        Self {
            active_session_id: None,
            waiting_for_input: true,
            failed_lookups: HashSet::new(),
        }
    }
}

impl ActivationPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_session_id(&self) -> Option<&str> {
        self.active_session_id.as_deref()
    }

    pub fn is_waiting_for_input(&self) -> bool {
        self.waiting_for_input
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.active_session_id.as_deref() == Some(id)
    }

    /// A new top-level session appeared. Returns true if it took focus.
    pub fn on_created(&mut self, id: &str) -> bool {
        if self.active_session_id.is_some() {
            return false;
        }
        self.active_session_id = Some(id.to_string());
        true
    }

    /// Update the waiting flag if `id` is the active session. Returns true if applied.
    pub fn set_waiting(&mut self, id: &str, waiting: bool) -> bool {
        if !self.is_active(id) {
            return false;
        }
        self.waiting_for_input = waiting;
        true
    }

    /// Activity on a session moves focus to it. Returns true if focus changed.
    pub fn on_activity(&mut self, id: &str) -> bool {
        if self.is_active(id) {
            return false;
        }
        self.active_session_id = Some(id.to_string());
        true
    }

    /// Manual selection moves focus and assumes the session waits for input.
    pub fn on_select(&mut self, id: &str) -> bool {
        if !self.on_activity(id) {
            return false;
        }
        self.waiting_for_input = true;
        true
    }

    /// Drop focus entirely
    pub fn deactivate(&mut self) {
        self.active_session_id = None;
        self.waiting_for_input = false;
    }

    /// Forget failed lookups so they are attempted again
    pub fn reset_lookups(&mut self) {
        self.failed_lookups.clear();
    }

    /// Display name for `id`, consulting the host once for unknown ids.
    ///
    /// Lookup failures never escape; the shortened id is used instead.
    pub async fn resolve(
        &mut self,
        id: &str,
        registry: &mut SessionRegistry,
        lookup: &dyn SessionLookup,
    ) -> Resolution {
        if registry.is_subagent(id) {
            return Resolution::Subagent;
        }
        if let Some(record) = registry.get(id) {
            return Resolution::Name(record.display_name());
        }
        if self.failed_lookups.contains(id) {
            return Resolution::Name(short_id(id));
        }

        match lookup.lookup(id).await {
            Ok(Some(record)) if record.is_subagent() => {
                tracing::debug!(session = id, "lookup returned a sub-agent session");
                registry.mark_subagent(id);
                Resolution::Subagent
            }
            Ok(Some(record)) => {
                let name = record.display_name();
                registry.upsert(record);
                Resolution::Name(name)
            }
            Ok(None) => {
                tracing::debug!(session = id, "session unknown to host");
                self.failed_lookups.insert(id.to_string());
                Resolution::Name(short_id(id))
            }
            Err(e) => {
                tracing::debug!(session = id, error = %e, "session lookup failed");
                self.failed_lookups.insert(id.to_string());
                Resolution::Name(short_id(id))
            }
        }
    }
}
