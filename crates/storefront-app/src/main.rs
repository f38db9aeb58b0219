use storefront_hex::config::Config;
use storefront_hex::inbound::http::{AppState, HttpServer, HttpServerConfig};
use storefront_hex::outbound::khalti::{KhaltiGateway, KhaltiSettings};
use storefront_repo::{build_repo, Repo};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env for DATABASE_URL / JWT_SECRET / KHALTI_* when present.
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "debug".to_string()))
        .init();

    let config = Config::from_env()?;
    let repo: Repo = build_repo(config.database_url.as_deref()).await?;
    let gateway = KhaltiGateway::new(KhaltiSettings::from_config(&config))?;
    if config.khalti.secret_key.is_none() || config.public_api_url.is_none() {
        tracing::warn!("KHALTI_SECRET_KEY or PUBLIC_API_URL unset; payment initiation will fail");
    }

    let server_cfg = HttpServerConfig {
        port: config.server_port.clone(),
    };
    let state = AppState::new(repo, gateway, config);

    let http = HttpServer::new(state, server_cfg).await?;
    http.run().await
}
