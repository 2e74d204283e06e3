pub mod assets;
pub mod channels;
pub mod chat;
pub mod cli;
pub mod config;
pub mod gateway;
pub mod router;
pub mod schedule;
pub mod session;
pub mod utils;
