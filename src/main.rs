use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dormkeeper::infrastructure::AppState;
use dormkeeper::{config, db, scheduler, seed, server};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dormkeeper=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    // Initialize database
    let db = db::init_db(&config.database_url)
        .await
        .expect("Failed to initialize database");

    if let Some(bootstrap) = &config.admin {
        if let Err(e) = seed::ensure_admin(&db, bootstrap).await {
            tracing::error!("Failed to create bootstrap administrator: {}", e);
        }
    }

    let state = AppState::new(db, config);

    if state.config.seed_demo {
        tracing::info!("Seeding demo data...");
        if let Err(e) = seed::seed_demo_data(state.db(), state.activity.as_ref()).await {
            tracing::error!("Failed to seed data: {}", e);
        } else {
            tracing::info!("Demo data seeded successfully.");
        }
    }

    // Occupancy is a cache; rebuild it once before serving
    match dormkeeper::services::occupancy::recompute_all(state.db()).await {
        Ok(0) => {}
        Ok(n) => tracing::warn!("Repaired occupancy of {} room(s) at startup", n),
        Err(e) => tracing::error!("Startup occupancy check failed: {}", e),
    }

    let _expiration = scheduler::spawn_expiration_loop(state.clone(), state.config.expiration_interval);

    tracing::info!("🚀 Starting Dormkeeper v{}", env!("CARGO_PKG_VERSION"));
    if let Err(e) = server::serve(state).await {
        tracing::error!("Server stopped: {}", e);
        std::process::exit(1);
    }
}
