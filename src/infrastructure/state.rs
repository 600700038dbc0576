//! Application state containing the connection and side-effect adapters

use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::domain::{ActivitySink, Notifier};
use crate::infrastructure::config::Config;
use crate::infrastructure::mailer::notifier_from_config;
use crate::infrastructure::SeaOrmActivitySink;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    db: DatabaseConnection,
    pub config: Arc<Config>,
    /// Audit trail, flushed after each committed mutation
    pub activity: Arc<dyn ActivitySink>,
    /// Outbound mail for expiration notices
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    pub fn new(db: DatabaseConnection, config: Config) -> Self {
        let activity = Arc::new(SeaOrmActivitySink::new(db.clone()));
        let notifier = notifier_from_config(config.mail.as_ref());

        Self {
            db,
            config: Arc::new(config),
            activity,
            notifier,
        }
    }

    /// Replace the notifier (tests, alternative providers)
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

impl AsRef<DatabaseConnection> for AppState {
    fn as_ref(&self) -> &DatabaseConnection {
        &self.db
    }
}

// Implement FromRef to allow extracting DatabaseConnection from AppState
impl axum::extract::FromRef<AppState> for DatabaseConnection {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}
