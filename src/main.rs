use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use biblioteca::domain::BookFilter;
use biblioteca::services::inventory_service;
use biblioteca::{AppState, config, db, seed};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "biblioteca=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    // Check for --profile and --seed CLI arguments
    let args: Vec<String> = std::env::args().collect();
    let mut config = match args.iter().position(|arg| arg == "--profile") {
        Some(pos) => match args.get(pos + 1) {
            Some(profile) => config::Config::for_profile(profile.clone()),
            None => {
                tracing::error!("--profile needs a value");
                std::process::exit(2);
            }
        },
        None => config::Config::from_env(),
    };
    if args.iter().any(|arg| arg == "--seed") {
        config.seed_demo = true;
    }

    // Initialize database
    let db = match db::init_db(&config.database_url).await {
        Ok(db) => db,
        Err(e) => {
            tracing::error!("Failed to initialize database: {}", e);
            std::process::exit(1);
        }
    };
    tracing::info!("Using database {} (profile {})", config.database_url, config.profile);

    let state = AppState::new(db, config.media_root.clone());

    if config.seed_demo {
        tracing::info!("Seeding demo data...");
        if let Err(e) = seed::seed_demo_data(&state).await {
            tracing::error!("Failed to seed data: {}", e);
        }
    }

    match inventory_service::audit(state.db()).await {
        Ok(found) => {
            for d in &found {
                tracing::warn!(
                    "Book {}: stored {}/{} but counted {}/{}",
                    d.isbn,
                    d.stored_available,
                    d.stored_total,
                    d.counted_available,
                    d.counted_total
                );
            }
        }
        Err(e) => tracing::error!("Inventory audit failed: {}", e),
    }

    match state.books.find_all(BookFilter::default()).await {
        Ok(books) => match serde_json::to_string_pretty(&books) {
            Ok(json) => println!("{}", json),
            Err(e) => tracing::error!("Failed to serialize catalog: {}", e),
        },
        Err(e) => {
            tracing::error!("Failed to list books: {}", e);
            std::process::exit(1);
        }
    }
}
