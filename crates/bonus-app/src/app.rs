// Application state shared by webhook handlers, plus the session sweeper.
//
// A handler runs the state machine synchronously under the user's session
// lock, then spawns the reply delivery. Delivery failures are logged and
// never roll back the session change.

use std::sync::Arc;
use std::time::Duration;

use bonus_core::SessionStore;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::line::ReplySender;
use crate::protocol::InboundText;

/// Shared state handed to every webhook request.
#[derive(Clone)]
pub struct BotState {
    pub store: Arc<SessionStore>,
    pub sender: Arc<dyn ReplySender>,
}

impl BotState {
    pub fn new(store: Arc<SessionStore>, sender: Arc<dyn ReplySender>) -> Self {
        Self { store, sender }
    }

    /// Apply one inbound message and start delivering the reply.
    ///
    /// The session is updated before this returns. The returned handle
    /// resolves once delivery finishes; the webhook handler drops it.
    pub fn dispatch(&self, inbound: InboundText) -> JoinHandle<()> {
        let InboundText {
            user_id,
            reply_token,
            text,
        } = inbound;

        let directives = self.store.apply(&user_id, &text);
        debug!(
            user_id = %user_id,
            directives = directives.len(),
            "message handled"
        );

        let sender = Arc::clone(&self.sender);
        tokio::spawn(async move {
            if let Err(e) = sender.reply(&reply_token, &directives).await {
                warn!("Failed to deliver reply to {}: {}", user_id, e);
            }
        })
    }
}

/// Periodically evict sessions idle for longer than `idle_timeout`.
///
/// Runs until the task is aborted.
pub async fn run_session_sweeper(
    store: Arc<SessionStore>,
    sweep_interval: Duration,
    idle_timeout: Duration,
) {
    info!(
        "Session sweeper started (every {:?}, idle timeout {:?})",
        sweep_interval, idle_timeout
    );

    let mut ticker = tokio::time::interval(sweep_interval);
    // The first tick completes immediately; consume it so the first real
    // sweep happens after one full interval.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let evicted = store.sweep_idle(idle_timeout);
        debug!(evicted, remaining = store.len(), "session sweep finished");
    }
}
