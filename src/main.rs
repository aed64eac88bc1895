use actix_web::HttpServer;
use ito_insight::{ServerConfig, SharedState, create_app, logging::init_logging};
use tracing::info;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let config = ServerConfig::from_env();
    if let Err(e) = init_logging(&config) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let (host, port) = config.bind_address();
    info!(
        host = %host,
        port,
        version = env!("CARGO_PKG_VERSION"),
        commit = env!("VERGEN_GIT_SHA"),
        "Starting ITO Insight"
    );

    let shared = SharedState::from_env().map_err(|e| std::io::Error::other(e.to_string()))?;

    HttpServer::new(move || create_app(shared.clone()))
        .bind((host.as_str(), port))?
        .run()
        .await
}
