//! Periodic expiration runner

use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::infrastructure::AppState;
use crate::services::expiration::{ExpirationReport, run_expiration_cycle};

/// Run one expiration cycle against today's (UTC) date.
pub async fn run_once(state: &AppState) -> ExpirationReport {
    run_expiration_cycle(
        state.db(),
        state.activity.as_ref(),
        state.notifier.as_ref(),
        Utc::now().date_naive(),
    )
    .await
}

/// Start the background loop. The first cycle runs immediately; a failed
/// cycle is only retried on the next tick.
pub fn spawn_expiration_loop(state: AppState, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!("⏰ Expiration scheduler started (every {:?})", every);

        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let report = run_once(&state).await;
            if !report.errors.is_empty() {
                tracing::error!("❌ Expiration cycle had failures: {:?}", report.errors);
            }
        }
    })
}
