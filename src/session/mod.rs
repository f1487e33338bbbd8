mod lookup;
pub mod policy;

pub use lookup::{LookupError, SessionLookup};
pub use policy::ActivationPolicy;

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Number of id characters shown when a session has no title
const SHORT_ID_LEN: usize = 8;

/// An agent session as reported by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    /// Set for sub-agent sessions, which are never tracked
    #[serde(rename = "parentID", default)]
    pub parent_id: Option<String>,
}

impl SessionRecord {
    #[cfg(test)]
    pub fn new(id: impl Into<String>, title: Option<&str>) -> Self {
        Self {
            id: id.into(),
            title: title.map(str::to_string),
            parent_id: None,
        }
    }

    pub fn is_subagent(&self) -> bool {
        self.parent_id.is_some()
    }

    /// Title if it is set and non-empty, otherwise the shortened id
    pub fn display_name(&self) -> String {
        match self.title.as_deref() {
            Some(title) if !title.is_empty() => title.to_string(),
            _ => short_id(&self.id),
        }
    }
}

/// First characters of a session id
pub fn short_id(id: &str) -> String {
    id.chars().take(SHORT_ID_LEN).collect()
}

/// Top-level sessions known to this process
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<String, SessionRecord>,
    /// Sub-agent ids seen on the event stream; never registered
    subagents: HashSet<String>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the record with the same id
    pub fn upsert(&mut self, record: SessionRecord) {
        self.sessions.insert(record.id.clone(), record);
    }

    pub fn get(&self, id: &str) -> Option<&SessionRecord> {
        self.sessions.get(id)
    }

    #[cfg(test)]
    pub fn contains(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }

    pub fn remove(&mut self, id: &str) -> Option<SessionRecord> {
        self.subagents.remove(id);
        self.sessions.remove(id)
    }

    pub fn clear(&mut self) {
        self.sessions.clear();
        self.subagents.clear();
    }

    pub fn mark_subagent(&mut self, id: &str) {
        self.subagents.insert(id.to_string());
    }

    pub fn is_subagent(&self, id: &str) -> bool {
        self.subagents.contains(id)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
