pub mod cleanup;
pub mod manager;
pub mod types;

pub use manager::{DEFAULT_SESSION_CAPACITY, SessionManager};
pub use types::{DialogState, SessionContext};
