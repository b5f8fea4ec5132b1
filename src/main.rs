//! Parent in the Loop API server.
//!
//! Reads configuration from the environment (and `.env`), opens the document
//! registry under the media root, and serves the `/api/` routes.

use parent_loop::{api, config::Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("parent_loop=info".parse()?)
                .add_directive("tower_http=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let state = api::AppState::from_config(&config)?;

    tracing::info!(
        addr = %config.bind_addr,
        media_root = %config.media_root.display(),
        llm = state.llm.mode(),
        agent = state.agent.is_configured(),
        documents = state.store.count()?,
        "starting Parent in the Loop API"
    );

    let app = api::build_router(state);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
