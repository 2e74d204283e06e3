use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How far a conversation has progressed.
///
/// Recorded per sender but not consulted when choosing a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogState {
    /// Waiting for a menu choice (weekday, date or calendar)
    #[default]
    AwaitingMenu,
    /// Waiting for the kind of garbage to throw out
    AwaitingGarbageType,
    /// Waiting for a day such as "15日"
    AwaitingTerm,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionContext {
    pub sender_id: String,
    pub state: DialogState,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
}

impl SessionContext {
    pub fn new(sender_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            sender_id: sender_id.into(),
            state: DialogState::default(),
            created_at: now,
            last_accessed: now,
        }
    }

    pub fn touch(&mut self) {
        self.last_accessed = Utc::now();
    }

    pub fn set_state(&mut self, state: DialogState) {
        self.state = state;
        self.touch();
    }
}
