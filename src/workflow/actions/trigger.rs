use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use crate::{
    Result,
    blocks::BlockType,
    common::Vars,
    workflow::actions::{Action, ActionContext, ActionOutput},
};

/// Keys that may carry the text of an incoming chat message.
const MESSAGE_ALIASES: &[&str] = &["message", "text", "userMessage", "lastUserMessage", "body"];

/// Trigger blocks only seed the run. When one is reached in the middle of a
/// graph it is passed through.
pub struct TriggerAction {
    block_type: BlockType,
}

impl TriggerAction {
    pub fn new(block_type: BlockType) -> Self {
        Self {
            block_type,
        }
    }

    /// Normalizes a trigger payload into the shape the block outputs declare.
    pub fn seed_payload(
        block_type: BlockType,
        payload: Value,
        now: DateTime<Utc>,
    ) -> Vars {
        match block_type {
            BlockType::WhatsappMessage => {
                let mut vars = match payload {
                    Value::String(text) => Vars::new().with("message", text),
                    other => Vars::from(other),
                };
                if !vars.contains_key("message") {
                    if let Some(text) = MESSAGE_ALIASES.iter().find_map(|k| vars.get_value(k).filter(|v| v.is_string()).cloned()) {
                        vars.set("message", text);
                    }
                }
                if !vars.contains_key("sessionId") {
                    if let Some(from) = vars.get_value("from").cloned() {
                        vars.set("sessionId", from);
                    }
                }
                vars
            }
            BlockType::Webhook => {
                let mut vars = match &payload {
                    Value::Object(_) => Vars::from(payload.clone()),
                    _ => Vars::new(),
                };
                if !vars.contains_key("body") {
                    vars.set("body", payload);
                }
                vars
            }
            _ => {
                let mut vars = Vars::from(payload);
                if !vars.contains_key("firedAt") {
                    vars.set("firedAt", now.to_rfc3339_opts(SecondsFormat::Secs, true));
                }
                vars
            }
        }
    }

    /// Log message of the seeding entry.
    pub fn seed_message(block_type: BlockType) -> &'static str {
        match block_type {
            BlockType::WhatsappMessage => "message received, workflow triggered",
            BlockType::Webhook => "webhook received, workflow triggered",
            _ => "schedule fired, workflow triggered",
        }
    }
}

#[async_trait]
impl Action for TriggerAction {
    type Settings = Vars;

    fn block_type(&self) -> BlockType {
        self.block_type
    }

    async fn run(
        &self,
        _ctx: &ActionContext<'_>,
        _settings: Vars,
    ) -> Result<ActionOutput> {
        Ok(ActionOutput::success("trigger passed through"))
    }
}
