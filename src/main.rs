use std::net::SocketAddr;

use tokio::net::TcpListener;

use huddle_server::config::{generate_config_template, Config};
use huddle_server::routes;
use huddle_server::state::AppState;
use huddle_server::store;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load config with layered precedence: defaults < TOML < env < CLI
    let config = Config::load()?;

    // Handle --generate-config: print template and exit
    if config.generate_config {
        print!("{}", generate_config_template());
        return Ok(());
    }

    // Initialize tracing/logging
    if config.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "huddle_server=info".parse().unwrap()),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .pretty()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "huddle_server=info".parse().unwrap()),
            )
            .init();
    }

    tracing::info!("HUDDLE server v{} starting", env!("CARGO_PKG_VERSION"));

    // Initialize SQLite database
    let db = store::init_db(&config.data_dir)?;

    // Build application state: connection registry, presence, room index
    let app_state = AppState::new(db);

    // Build router
    let app = routes::build_router(app_state);

    // Bind and serve
    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
