// Inbound LINE webhook payload types.
//
// Parsing is deliberately forgiving: LINE sends verification pings with no
// events, and only text messages from a known user with a reply token are of
// interest. Anything else is dropped without an error.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// Top-level webhook body. Events are kept as raw JSON so one malformed
/// event does not discard the others in the batch.
#[derive(Debug, Default, Deserialize)]
pub struct WebhookBody {
    #[serde(default)]
    pub events: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub reply_token: Option<String>,
    pub source: Option<EventSource>,
    pub message: Option<EventMessage>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSource {
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventMessage {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub text: Option<String>,
}

/// A text message that the state machine should handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundText {
    pub user_id: String,
    pub reply_token: String,
    pub text: String,
}

impl WebhookEvent {
    /// Keep only `message` events carrying a `text` message with a user id
    /// and reply token.
    pub fn into_inbound_text(self) -> Option<InboundText> {
        if self.kind.as_deref() != Some("message") {
            return None;
        }
        let message = self.message?;
        if message.kind.as_deref() != Some("text") {
            return None;
        }
        Some(InboundText {
            user_id: self.source?.user_id?,
            reply_token: self.reply_token?,
            text: message.text?,
        })
    }
}

/// Extract every handleable text message from a raw webhook body, in
/// payload order. Unparseable bodies and events yield nothing.
pub fn parse_webhook(body: &[u8]) -> Vec<InboundText> {
    let parsed: WebhookBody = match serde_json::from_slice(body) {
        Ok(b) => b,
        Err(e) => {
            debug!("ignoring unparseable webhook body: {e}");
            return Vec::new();
        }
    };

    parsed
        .events
        .into_iter()
        .filter_map(|raw| match serde_json::from_value::<WebhookEvent>(raw) {
            Ok(event) => event.into_inbound_text(),
            Err(e) => {
                debug!("ignoring malformed webhook event: {e}");
                None
            }
        })
        .collect()
}
