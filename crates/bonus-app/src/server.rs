// HTTP surface: the LINE webhook endpoint and a health check.

use axum::body::Bytes;
use axum::extract::State;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::app::BotState;
use crate::protocol;

/// Build the router. Split out from [`serve`] so tests can drive it without
/// binding a port.
pub fn build_router(state: BotState) -> Router {
    Router::new()
        .route("/webhook", post(webhook))
        .route("/health", get(health))
        .with_state(state)
}

/// Serve until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: BotState, shutdown: F) -> anyhow::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let local_addr = listener.local_addr()?;
    info!("Webhook server listening on {local_addr}");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Webhook server stopped");
    Ok(())
}

/// Always answers `200 OK`: LINE retries on anything else, and its
/// verification requests carry no events.
async fn webhook(State(state): State<BotState>, body: Bytes) -> &'static str {
    let messages = protocol::parse_webhook(&body);
    if messages.is_empty() {
        debug!("webhook carried no text messages ({} bytes)", body.len());
        return "OK";
    }

    for inbound in messages {
        // Fire-and-forget: the reply task outlives this request.
        drop(state.dispatch(inbound));
    }
    "OK"
}

async fn health() -> &'static str {
    "OK"
}
