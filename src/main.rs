use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use grindstone::app::AppContext;
use grindstone::config::Config;
use grindstone::db::Store;
use grindstone::llm::OpenAiCoach;
use grindstone::server;
use grindstone::statement::BrowserlessFetcher;

/// Real-time coaching daemon for competitive programming practice.
#[derive(Debug, Parser)]
#[command(name = "grindstone", version)]
struct Args {
    /// Override the HTTP port from the environment.
    #[arg(long)]
    port: Option<u16>,

    /// Skip running database migrations on startup.
    #[arg(long)]
    skip_migrations: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut config = Config::from_env()?;
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let store = Store::connect(&config.database).await?;
    if !args.skip_migrations {
        store.run_migrations().await?;
    }

    let fetcher = BrowserlessFetcher::new(config.fetcher.clone());
    let model = OpenAiCoach::new(config.llm.clone())?;

    let ctx = Arc::new(AppContext::new(
        Arc::new(store),
        Arc::new(model),
        Arc::new(fetcher),
        config.session.clone(),
    ));

    server::serve(&config.server, ctx, async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("shutdown signal received");
    })
    .await?;

    Ok(())
}
