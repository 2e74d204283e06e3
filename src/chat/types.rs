use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// LINE rejects text messages longer than this many characters.
pub const MAX_CONTENT_LENGTH: usize = 5000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub channel: String,
    pub sender_id: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_token: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub metadata: HashMap<String, Value>,
}

impl InboundMessage {
    pub fn new(
        channel: impl Into<String>,
        sender_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            channel: channel.into(),
            sender_id: sender_id.into(),
            text: text.into(),
            reply_token: None,
            timestamp: Utc::now(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_reply_token(mut self, token: impl Into<String>) -> Self {
        self.reply_token = Some(token.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Validates the message text.
    /// Returns false for empty or whitespace-only text. Text is otherwise kept
    /// verbatim, since commands are matched exactly, and only truncated when
    /// it exceeds `MAX_CONTENT_LENGTH`.
    pub fn sanitize(&mut self) -> bool {
        if self.text.trim().is_empty() {
            return false;
        }

        if self.text.chars().count() > MAX_CONTENT_LENGTH {
            tracing::warn!(
                channel = %self.channel,
                sender_id = %self.sender_id,
                original_length = self.text.len(),
                "Message too long, truncating to {}",
                MAX_CONTENT_LENGTH
            );
            // Truncate safely on UTF-8 character boundaries.
            self.text = self.text.chars().take(MAX_CONTENT_LENGTH).collect();
        }

        true
    }
}

/// A single reply payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reply {
    Text {
        text: String,
    },
    Image {
        content_url: String,
        preview_url: String,
    },
    /// A card/button template, passed through to the platform verbatim
    Template {
        alt_text: String,
        payload: Value,
    },
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Reply::Text { text: text.into() }
    }

    pub fn image(content_url: impl Into<String>, preview_url: impl Into<String>) -> Self {
        Reply::Image {
            content_url: content_url.into(),
            preview_url: preview_url.into(),
        }
    }

    /// The text body, for text replies only.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Reply::Text { text } => Some(text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub channel: String,
    pub sender_id: String,
    pub reply: Reply,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_token: Option<String>,
}

impl OutboundMessage {
    pub fn new(channel: impl Into<String>, sender_id: impl Into<String>, reply: Reply) -> Self {
        Self {
            channel: channel.into(),
            sender_id: sender_id.into(),
            reply,
            reply_token: None,
        }
    }

    pub fn reply_to(mut self, reply_token: impl Into<String>) -> Self {
        self.reply_token = Some(reply_token.into());
        self
    }
}
