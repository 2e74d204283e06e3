//! Static reply assets: the calendar image and template card documents.
//!
//! Templates are read once at startup. The router never performs I/O.

use crate::chat::Reply;
use crate::utils::{Result, TrashdayError};
use serde_json::Value;
use std::path::Path;

pub const DEFAULT_CALENDAR_URL: &str = "https://lh3.googleusercontent.com/pw/AIL4fc-maDzKU9dHw_KHoCHSXkirKPhZfPbON-6K1Ji61cIhHtg0FUZYPqnGQ6MkkhoByAqGEc5nwMtv5yWLnbOiM6pK7fmDQpcu5OnpN1V-9IxlGyEw4V5BC7uDgkrWEQMjqNY3AkgoRG80RMftfoiyi-4=w884-h1249-s-no?authuser=0";

pub const DEFAULT_TEMPLATE_KEYWORD: &str = "じゃんけん";
pub const DEFAULT_TEMPLATE_ALT_TEXT: &str = "最初はぐー";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarImage {
    pub content_url: String,
    pub preview_url: String,
}

impl Default for CalendarImage {
    fn default() -> Self {
        Self {
            content_url: DEFAULT_CALENDAR_URL.to_string(),
            preview_url: DEFAULT_CALENDAR_URL.to_string(),
        }
    }
}

/// A card template answered when the user sends `keyword`.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateAsset {
    pub keyword: String,
    pub alt_text: String,
    pub payload: Value,
}

impl TemplateAsset {
    /// Reads a JSON template document. A leading UTF-8 byte order mark is
    /// tolerated, since hand-edited template files often carry one.
    pub fn load(
        keyword: impl Into<String>,
        alt_text: impl Into<String>,
        path: &Path,
    ) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| TrashdayError::io(path, e))?;
        let body = raw.strip_prefix('\u{feff}').unwrap_or(&raw);
        let payload: Value = serde_json::from_str(body)
            .map_err(|e| TrashdayError::asset(path, format!("invalid JSON: {}", e)))?;

        if !payload.is_object() {
            return Err(TrashdayError::asset(path, "template must be a JSON object"));
        }

        tracing::debug!(path = %path.display(), "Loaded template asset");

        Ok(Self {
            keyword: keyword.into(),
            alt_text: alt_text.into(),
            payload,
        })
    }

    pub fn reply(&self) -> Reply {
        Reply::Template {
            alt_text: self.alt_text.clone(),
            payload: self.payload.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AssetStore {
    pub calendar: CalendarImage,
    templates: Vec<TemplateAsset>,
}

impl AssetStore {
    pub fn new(calendar: CalendarImage) -> Self {
        Self {
            calendar,
            templates: Vec::new(),
        }
    }

    pub fn with_template(mut self, template: TemplateAsset) -> Self {
        self.templates.push(template);
        self
    }

    pub fn template_for(&self, keyword: &str) -> Option<&TemplateAsset> {
        self.templates.iter().find(|t| t.keyword == keyword)
    }

    pub fn templates(&self) -> &[TemplateAsset] {
        &self.templates
    }

    pub fn calendar_reply(&self) -> Reply {
        Reply::image(&self.calendar.content_url, &self.calendar.preview_url)
    }
}
