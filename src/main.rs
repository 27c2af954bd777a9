use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use owlstore::infrastructure::AppState;
use owlstore::{config, db, seed, server};

#[tokio::main]
async fn main() {
    // Load configuration first so RUST_LOG from .env reaches the filter
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "owlstore=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Check for --profile CLI argument
    let args: Vec<String> = std::env::args().collect();
    if let Some(pos) = args.iter().position(|arg| arg == "--profile")
        && let Some(val) = args.get(pos + 1)
    {
        // SAFETY: nothing else reads the environment yet
        unsafe { std::env::set_var("PROFILE", val) };
    }

    let config = config::Config::from_env();

    let db = db::init_db(&config.database_url)
        .await
        .expect("Failed to initialize database");

    let state = AppState::new(db, config);

    if std::env::var("SEED_LOCATIONS").is_ok() {
        tracing::info!("Seeding locations...");
        match seed::seed_locations(&state).await {
            Ok(counts) => tracing::info!(
                "Seeded {} provinces, {} districts, {} wards",
                counts.provinces,
                counts.districts,
                counts.wards
            ),
            Err(e) => tracing::error!("Failed to seed locations: {}", e),
        }
    }

    if let Err(e) = server::serve(state).await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}
