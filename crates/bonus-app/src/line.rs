// LINE Messaging API reply client and directive rendering.
//
// Directives from the state machine are rendered into LINE message objects
// (text with quick replies, or a flex bubble for the result card) and posted
// to the reply endpoint with the event's reply token.

use async_trait::async_trait;
use bonus_core::{Directive, Suggestion, BONUS_RATE};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::Config;

/// LINE rejects quick replies with more items than this.
pub const MAX_QUICK_REPLY_ITEMS: usize = 13;

/// LINE accepts at most this many messages per reply.
pub const MAX_MESSAGES_PER_REPLY: usize = 5;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum LineError {
    #[error("request to LINE failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("LINE returned {status}: {body}")]
    Status { status: u16, body: String },
}

// ---------------------------------------------------------------------------
// ReplySender
// ---------------------------------------------------------------------------

/// Delivers rendered directives back to the user who sent an event.
#[async_trait]
pub trait ReplySender: Send + Sync {
    async fn reply(&self, reply_token: &str, directives: &[Directive]) -> Result<(), LineError>;
}

/// Low-level Messaging API client.
pub struct LineApi {
    http: reqwest::Client,
    api_base: String,
    access_token: String,
}

impl LineApi {
    pub fn new(api_base: String, access_token: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            access_token,
        }
    }

    /// POST `body` to `{api_base}{path}` with bearer auth.
    async fn post(&self, path: &str, body: &Value) -> Result<(), LineError> {
        let response = self
            .http
            .post(format!("{}{}", self.api_base, path))
            .bearer_auth(&self.access_token)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LineError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

/// LINE reply transport: live when a channel token is configured, otherwise
/// a logging no-op so the bot can run locally without credentials.
pub enum LineClient {
    Active(LineApi),
    Disabled,
}

impl LineClient {
    /// Returns `Active` if a channel access token is present, otherwise
    /// `Disabled`.
    pub fn from_config(config: &Config) -> Self {
        match &config.credentials.line_channel_access_token {
            Some(token) if !token.is_empty() => LineClient::Active(LineApi::new(
                config.line.api_base.clone(),
                token.clone(),
            )),
            _ => LineClient::Disabled,
        }
    }
}

#[async_trait]
impl ReplySender for LineClient {
    async fn reply(&self, reply_token: &str, directives: &[Directive]) -> Result<(), LineError> {
        match self {
            LineClient::Active(api) => {
                let body = reply_body(reply_token, directives);
                api.post("/message/reply", &body).await
            }
            LineClient::Disabled => {
                for directive in directives {
                    info!("(reply disabled) {}", directive.render_text());
                }
                Ok(())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Full reply request body.
pub fn reply_body(reply_token: &str, directives: &[Directive]) -> Value {
    let mut messages: Vec<Value> = directives.iter().map(render_message).collect();
    if messages.len() > MAX_MESSAGES_PER_REPLY {
        debug!(dropped = messages.len() - MAX_MESSAGES_PER_REPLY, "truncating reply");
        messages.truncate(MAX_MESSAGES_PER_REPLY);
    }
    json!({
        "replyToken": reply_token,
        "messages": messages,
    })
}

/// Render one directive as a LINE message object.
pub fn render_message(directive: &Directive) -> Value {
    match directive {
        Directive::ResultCard { name, total, bonus } => {
            result_card(name, &total.to_string(), &bonus.to_string())
        }
        other => {
            let mut msg = json!({
                "type": "text",
                "text": other.render_text(),
            });
            let items = quick_reply_items(other.choices().suggestions());
            if !items.is_empty() {
                msg["quickReply"] = json!({ "items": items });
            }
            msg
        }
    }
}

/// Quick-reply items, capped at the platform limit. When over the cap the
/// trailing back button survives and entries before it are trimmed.
fn quick_reply_items(mut suggestions: Vec<Suggestion>) -> Vec<Value> {
    if suggestions.len() > MAX_QUICK_REPLY_ITEMS {
        let last = suggestions.pop();
        suggestions.truncate(MAX_QUICK_REPLY_ITEMS - 1);
        suggestions.extend(last);
    }
    suggestions
        .into_iter()
        .map(|s| {
            json!({
                "type": "action",
                "action": {
                    "type": "message",
                    "label": s.label,
                    "text": s.text,
                }
            })
        })
        .collect()
}

fn line_box(label: &str, value: &str) -> Value {
    json!({
        "type": "box",
        "layout": "horizontal",
        "contents": [
            { "type": "text", "text": label, "weight": "bold", "size": "sm", "flex": 2 },
            { "type": "text", "text": value, "size": "sm", "flex": 3 }
        ]
    })
}

fn result_card(name: &str, total: &str, bonus: &str) -> Value {
    json!({
        "type": "flex",
        "altText": "計算結果",
        "contents": {
            "type": "bubble",
            "header": {
                "type": "box",
                "layout": "vertical",
                "contents": [
                    { "type": "text", "text": "獎金計算機", "weight": "bold", "size": "sm", "color": "#555555" },
                    { "type": "text", "text": "✨ 計算完成", "weight": "bold", "size": "xl", "margin": "md" }
                ]
            },
            "body": {
                "type": "box",
                "layout": "vertical",
                "spacing": "md",
                "contents": [
                    line_box("姓名", name),
                    line_box("總支數", total),
                    line_box(&format!("獎金（×{BONUS_RATE}）"), &format!("{bonus} 元")),
                ]
            }
        }
    })
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
