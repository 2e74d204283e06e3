//! Utility modules for cross-cutting concerns

pub mod error;
pub mod security;

// Re-export commonly used items
pub use error::{Result, TrashdayError, log_error, suggestion_for};
pub use security::SignatureVerifier;
