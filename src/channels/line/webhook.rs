//! Inbound side of the LINE channel: webhook payloads and the axum endpoint.

use crate::channels::line::LINE_CHANNEL_NAME;
use crate::chat::{ChatHub, InboundMessage};
use crate::utils::SignatureVerifier;
use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tower_http::trace::TraceLayer;

pub const SIGNATURE_HEADER: &str = "x-line-signature";

#[derive(Error, Debug)]
pub enum WebhookError {
    #[error("missing X-Line-Signature header")]
    MissingSignature,
    #[error("signature verification failed")]
    InvalidSignature,
    #[error("invalid webhook payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
    #[error("failed to queue message: {0}")]
    Queue(String),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = match &self {
            WebhookError::MissingSignature
            | WebhookError::InvalidSignature
            | WebhookError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            WebhookError::Queue(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct WebhookBody {
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub events: Vec<WebhookEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WebhookEvent {
    Message {
        #[serde(rename = "replyToken")]
        reply_token: Option<String>,
        source: Option<EventSource>,
        message: EventMessage,
    },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Deserialize)]
pub struct EventSource {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
    #[serde(rename = "groupId")]
    pub group_id: Option<String>,
    #[serde(rename = "roomId")]
    pub room_id: Option<String>,
}

impl EventSource {
    /// The user when known, otherwise the group or room the event came from.
    pub fn sender_id(&self) -> Option<&str> {
        self.user_id
            .as_deref()
            .or(self.group_id.as_deref())
            .or(self.room_id.as_deref())
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EventMessage {
    Text { id: String, text: String },
    #[serde(other)]
    Unsupported,
}

impl WebhookEvent {
    /// Converts a text message event into an inbound message. Other events,
    /// and events without any sender id, yield `None`.
    pub fn into_inbound(self) -> Option<InboundMessage> {
        let WebhookEvent::Message {
            reply_token,
            source,
            message: EventMessage::Text { id, text },
        } = self
        else {
            return None;
        };

        let sender_id = source.as_ref().and_then(EventSource::sender_id)?.to_string();
        let mut inbound = InboundMessage::new(LINE_CHANNEL_NAME, sender_id, text)
            .with_metadata("message_id", serde_json::json!(id));
        if let Some(token) = reply_token {
            inbound = inbound.with_reply_token(token);
        }
        Some(inbound)
    }
}

/// Verifies and decodes a raw webhook request into inbound messages.
pub fn parse_webhook(
    verifier: &SignatureVerifier,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<Vec<InboundMessage>, WebhookError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(WebhookError::MissingSignature)?;

    if !verifier.verify(body, signature) {
        return Err(WebhookError::InvalidSignature);
    }

    let payload: WebhookBody = serde_json::from_slice(body)?;
    let total = payload.events.len();
    let messages: Vec<InboundMessage> = payload
        .events
        .into_iter()
        .filter_map(WebhookEvent::into_inbound)
        .collect();

    if messages.len() < total {
        tracing::debug!(
            ignored = total - messages.len(),
            "Ignoring non-text webhook events"
        );
    }
    Ok(messages)
}

#[derive(Clone)]
pub struct WebhookState {
    pub verifier: SignatureVerifier,
    pub hub: Arc<ChatHub>,
}

/// GET / - liveness check.
pub async fn health() -> &'static str {
    "Hello"
}

/// POST /callback - LINE webhook endpoint.
pub async fn callback(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<&'static str, WebhookError> {
    let messages = parse_webhook(&state.verifier, &headers, &body).inspect_err(|e| {
        tracing::warn!(error = %e, "Rejected webhook request");
    })?;

    for message in messages {
        tracing::info!(
            sender_id = %message.sender_id,
            content_preview = %message.text.chars().take(50).collect::<String>(),
            "Received LINE message"
        );
        state
            .hub
            .send_inbound(message)
            .await
            .map_err(|e| WebhookError::Queue(e.to_string()))?;
    }

    Ok("OK")
}

pub fn build_router(state: WebhookState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/callback", post(callback))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const SECRET: &str = "test-secret";

    fn signed_headers(body: &[u8]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let signature = SignatureVerifier::new(SECRET).sign(body);
        headers.insert(SIGNATURE_HEADER, HeaderValue::from_str(&signature).unwrap());
        headers
    }

    fn text_event_body() -> &'static str {
        r#"{
            "destination": "Uxxxxxxxx",
            "events": [
                {
                    "type": "message",
                    "replyToken": "rt-1",
                    "timestamp": 1693526400000,
                    "mode": "active",
                    "source": {"type": "user", "userId": "U123"},
                    "message": {"type": "text", "id": "m-1", "text": "今日"}
                },
                {
                    "type": "message",
                    "replyToken": "rt-2",
                    "source": {"type": "user", "userId": "U123"},
                    "message": {"type": "sticker", "id": "m-2", "packageId": "1", "stickerId": "1"}
                },
                {
                    "type": "follow",
                    "replyToken": "rt-3",
                    "source": {"type": "user", "userId": "U456"}
                }
            ]
        }"#
    }

    #[test]
    fn test_parse_text_events_only() {
        let body = text_event_body().as_bytes();
        let verifier = SignatureVerifier::new(SECRET);

        let messages = parse_webhook(&verifier, &signed_headers(body), body).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].channel, LINE_CHANNEL_NAME);
        assert_eq!(messages[0].sender_id, "U123");
        assert_eq!(messages[0].text, "今日");
        assert_eq!(messages[0].reply_token.as_deref(), Some("rt-1"));
        assert_eq!(messages[0].metadata.get("message_id").unwrap(), "m-1");
    }

    #[test]
    fn test_missing_signature() {
        let verifier = SignatureVerifier::new(SECRET);
        let result = parse_webhook(&verifier, &HeaderMap::new(), b"{}");
        assert!(matches!(result, Err(WebhookError::MissingSignature)));
    }

    #[test]
    fn test_bad_signature() {
        let verifier = SignatureVerifier::new(SECRET);
        let headers = signed_headers(b"{\"events\":[]}");
        let result = parse_webhook(&verifier, &headers, b"{\"events\":[{}]}");
        assert!(matches!(result, Err(WebhookError::InvalidSignature)));
    }

    #[test]
    fn test_invalid_json_after_valid_signature() {
        let verifier = SignatureVerifier::new(SECRET);
        let body = b"not json";
        let result = parse_webhook(&verifier, &signed_headers(body), body);
        assert!(matches!(result, Err(WebhookError::InvalidPayload(_))));
    }

    #[test]
    fn test_verification_request_has_no_events() {
        let verifier = SignatureVerifier::new(SECRET);
        let body = br#"{"destination":"U0","events":[]}"#;
        let messages = parse_webhook(&verifier, &signed_headers(body), body).unwrap();
        assert!(messages.is_empty());
    }

    #[test]
    fn test_group_source_falls_back_to_group_id() {
        let event: WebhookEvent = serde_json::from_str(
            r#"{"type":"message","replyToken":"rt","source":{"type":"group","groupId":"G1"},
                "message":{"type":"text","id":"1","text":"明日"}}"#,
        )
        .unwrap();
        assert_eq!(event.into_inbound().unwrap().sender_id, "G1");
    }

    #[test]
    fn test_event_without_source_dropped() {
        let event: WebhookEvent = serde_json::from_str(
            r#"{"type":"message","replyToken":"rt","message":{"type":"text","id":"1","text":"明日"}}"#,
        )
        .unwrap();
        assert!(event.into_inbound().is_none());
    }

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            WebhookError::InvalidSignature.into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            WebhookError::Queue("closed".to_string()).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_callback_queues_messages() {
        let hub = Arc::new(ChatHub::new());
        let state = WebhookState {
            verifier: SignatureVerifier::new(SECRET),
            hub: Arc::clone(&hub),
        };
        let body = text_event_body();
        let result = callback(
            State(state),
            signed_headers(body.as_bytes()),
            Bytes::from_static(body.as_bytes()),
        )
        .await;
        assert_eq!(result.unwrap(), "OK");
    }

    #[tokio::test]
    async fn test_callback_rejects_unsigned() {
        let state = WebhookState {
            verifier: SignatureVerifier::new(SECRET),
            hub: Arc::new(ChatHub::new()),
        };
        let result = callback(State(state), HeaderMap::new(), Bytes::from_static(b"{}")).await;
        assert_eq!(
            result.unwrap_err().into_response().status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn test_health() {
        assert_eq!(health().await, "Hello");
    }
}
