//! Security utilities for trashday
//!
//! Webhook signature checking for the LINE Messaging API. LINE signs every
//! webhook body with HMAC-SHA256 keyed by the channel secret and sends the
//! base64 digest in the `X-Line-Signature` header.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Verifies webhook bodies against a channel secret.
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: Vec<u8>,
}

impl SignatureVerifier {
    pub fn new(channel_secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: channel_secret.as_ref().to_vec(),
        }
    }

    /// Computes the base64 signature LINE would send for `body`.
    pub fn sign(&self, body: &[u8]) -> String {
        // HMAC accepts keys of any length
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .unwrap_or_else(|_| unreachable!("HMAC-SHA256 accepts any key length"));
        mac.update(body);
        STANDARD.encode(mac.finalize().into_bytes())
    }

    /// Returns `true` when `signature` is the base64 HMAC of `body`.
    ///
    /// The digest comparison is constant time.
    pub fn verify(&self, body: &[u8], signature: &str) -> bool {
        let Ok(expected) = STANDARD.decode(signature.trim()) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(&self.secret) else {
            return false;
        };
        mac.update(body);
        mac.verify_slice(&expected).is_ok()
    }
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("secret", &"<redacted>")
            .finish()
    }
}
