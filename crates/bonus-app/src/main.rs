// Bonus calculator bot entry point.
//
// Startup sequence:
// 1. Initialize tracing
// 2. Load config
// 3. Build the session store and reply client
// 4. Spawn the session sweeper
// 5. Serve the webhook until Ctrl+C
// 6. Stop the sweeper

use std::sync::Arc;

use bonus_app::app::{self, BotState};
use bonus_app::config;
use bonus_app::line::LineClient;
use bonus_app::server;
use bonus_core::SessionStore;

use anyhow::Context;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing
    init_tracing()?;
    info!("Bonus bot starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: bind={}, idle timeout={}s",
        config.server.bind_addr(),
        config.sessions.idle_timeout_secs
    );

    // 3. Build the session store and reply client
    let store = Arc::new(SessionStore::new());
    let client = LineClient::from_config(&config);
    match &client {
        LineClient::Active(_) => info!("LINE client initialized (channel token configured)"),
        LineClient::Disabled => warn!(
            "LINE client disabled (no channel token); replies will only be logged"
        ),
    }
    let state = BotState::new(Arc::clone(&store), Arc::new(client));

    // 4. Spawn the session sweeper
    let sweeper = tokio::spawn(app::run_session_sweeper(
        Arc::clone(&store),
        config.sessions.sweep_interval(),
        config.sessions.idle_timeout(),
    ));

    // 5. Serve the webhook until Ctrl+C
    let bind_addr = config.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received");
    };

    server::serve(listener, state, shutdown)
        .await
        .context("webhook server error")?;

    // 6. Stop the sweeper (it loops forever)
    sweeper.abort();

    info!("Bonus bot shut down cleanly");
    Ok(())
}

/// Initialize tracing to stdout with an env-overridable filter.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("bonus_app=info,bonus_core=info,warn")),
        )
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
