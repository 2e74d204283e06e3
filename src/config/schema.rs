use crate::assets::{DEFAULT_CALENDAR_URL, DEFAULT_TEMPLATE_ALT_TEXT, DEFAULT_TEMPLATE_KEYWORD};
use crate::channels::line::DEFAULT_API_BASE;
use crate::schedule::ReferenceMonth;
use crate::session::DEFAULT_SESSION_CAPACITY;
use crate::session::cleanup::SESSION_TTL_DAYS;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5000";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_access_token: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_secret: Option<String>,

    pub bind_addr: String,

    pub api_base: String,

    pub reference_month: ReferenceMonth,

    pub session_capacity: usize,

    pub session_ttl_days: i64,

    pub calendar_image_url: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub calendar_preview_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_path: Option<PathBuf>,

    pub template_keyword: String,

    pub template_alt_text: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            channel_access_token: None,
            channel_secret: None,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            reference_month: ReferenceMonth::default(),
            session_capacity: DEFAULT_SESSION_CAPACITY,
            session_ttl_days: SESSION_TTL_DAYS,
            calendar_image_url: DEFAULT_CALENDAR_URL.to_string(),
            calendar_preview_url: None,
            template_path: None,
            template_keyword: DEFAULT_TEMPLATE_KEYWORD.to_string(),
            template_alt_text: DEFAULT_TEMPLATE_ALT_TEXT.to_string(),
        }
    }
}

/// Secret-free view of the configuration, for logging.
#[derive(Debug, Clone)]
pub struct SafeSummary {
    pub access_token_configured: bool,
    pub channel_secret_configured: bool,
    pub bind_addr: String,
    pub reference_month: ReferenceMonth,
    pub template_configured: bool,
}

impl Config {
    pub fn get_safe_summary(&self) -> SafeSummary {
        SafeSummary {
            access_token_configured: self.channel_access_token.is_some(),
            channel_secret_configured: self.channel_secret.is_some(),
            bind_addr: self.bind_addr.clone(),
            reference_month: self.reference_month,
            template_configured: self.template_path.is_some(),
        }
    }

    /// Preview image URL, falling back to the full-size image.
    pub fn calendar_preview(&self) -> &str {
        self.calendar_preview_url
            .as_deref()
            .unwrap_or(&self.calendar_image_url)
    }
}
