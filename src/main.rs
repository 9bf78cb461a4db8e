use edu_platform_api::{config, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();
    server::init_tracing();

    let app_config = config::config().clone();
    let migrate = std::env::var("DATABASE_MIGRATE_ON_START")
        .ok()
        .and_then(|v| config::parse_flag(&v))
        .unwrap_or(false);

    server::serve(app_config, migrate).await
}
