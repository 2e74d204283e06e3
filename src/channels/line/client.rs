//! Outbound side of the LINE channel: the reply API client.

use crate::chat::Reply;
use crate::utils::{Result, TrashdayError};
use serde_json::{Value, json};
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://api.line.me";
const REPLY_PATH: &str = "/v2/bot/message/reply";
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Encodes a reply as a LINE message object.
pub fn to_line_message(reply: &Reply) -> Value {
    match reply {
        Reply::Text { text } => json!({ "type": "text", "text": text }),
        Reply::Image {
            content_url,
            preview_url,
        } => json!({
            "type": "image",
            "originalContentUrl": content_url,
            "previewImageUrl": preview_url,
        }),
        Reply::Template { alt_text, payload } => json!({
            "type": "flex",
            "altText": alt_text,
            "contents": payload,
        }),
    }
}

#[derive(Clone)]
pub struct LineClient {
    http: reqwest::Client,
    access_token: String,
    api_base: String,
}

impl LineClient {
    pub fn new(access_token: impl Into<String>, api_base: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| TrashdayError::external_service("line", e.to_string()))?;

        Ok(Self {
            http,
            access_token: access_token.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn reply_url(&self) -> String {
        format!("{}{}", self.api_base, REPLY_PATH)
    }

    /// Sends `replies` in answer to the event that issued `reply_token`.
    pub async fn reply(&self, reply_token: &str, replies: &[Reply]) -> Result<()> {
        let body = json!({
            "replyToken": reply_token,
            "messages": replies.iter().map(to_line_message).collect::<Vec<_>>(),
        });

        let response = self
            .http
            .post(self.reply_url())
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| TrashdayError::external_service("line", e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(TrashdayError::external_service(
                "line",
                format!("reply API returned {}: {}", status, detail),
            ));
        }

        tracing::debug!(messages = replies.len(), "Sent LINE reply");
        Ok(())
    }
}

impl std::fmt::Debug for LineClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineClient")
            .field("api_base", &self.api_base)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_encoding() {
        assert_eq!(
            to_line_message(&Reply::text("水曜日です")),
            json!({"type": "text", "text": "水曜日です"})
        );
    }

    #[test]
    fn test_image_encoding() {
        assert_eq!(
            to_line_message(&Reply::image("https://a/full.png", "https://a/small.png")),
            json!({
                "type": "image",
                "originalContentUrl": "https://a/full.png",
                "previewImageUrl": "https://a/small.png"
            })
        );
    }

    #[test]
    fn test_template_encoding_is_verbatim() {
        let payload = json!({"type": "bubble", "body": {"type": "box", "contents": []}});
        let reply = Reply::Template {
            alt_text: "最初はぐー".to_string(),
            payload: payload.clone(),
        };
        let encoded = to_line_message(&reply);
        assert_eq!(encoded["type"], "flex");
        assert_eq!(encoded["altText"], "最初はぐー");
        assert_eq!(encoded["contents"], payload);
    }

    #[test]
    fn test_reply_url_trims_slash() {
        let client = LineClient::new("secret-token", "http://127.0.0.1:9999/").unwrap();
        assert_eq!(client.reply_url(), "http://127.0.0.1:9999/v2/bot/message/reply");
        assert!(!format!("{:?}", client).contains("secret-token"));
    }
}
