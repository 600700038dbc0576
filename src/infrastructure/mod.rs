//! Infrastructure layer - Framework implementations
//!
//! This layer contains:
//! - Database connection and migrations (db)
//! - HTTP server setup (server)
//! - Configuration loading (config)
//! - Authentication (auth)
//! - Audit and mail adapters (activity_sink, mailer)
//! - Application state (state)

pub mod activity_sink;
pub mod auth;
pub mod config;
pub mod db;
pub mod mailer;
pub mod seed;
pub mod server;
pub mod state;

pub use activity_sink::SeaOrmActivitySink;
pub use mailer::{HttpMailer, LogNotifier};
pub use state::AppState;
