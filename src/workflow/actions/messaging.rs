use async_trait::async_trait;
use chrono::SecondsFormat;
use serde::Deserialize;

use crate::{
    Result,
    blocks::BlockType,
    common::Vars,
    runtime::capabilities::{DeliveryReceipt, MessageContent, OutgoingMessage},
    workflow::actions::{Action, ActionContext, ActionOutput},
};

const MESSAGE_ID_KEY: &str = "messageId";
const STATUS_KEY: &str = "status";
const TIMESTAMP_KEY: &str = "timestamp";

/// Recipient of an outgoing message: the configured one, else the sender of
/// the triggering message.
pub(super) fn recipient(
    ctx: &ActionContext<'_>,
    configured: &str,
) -> Result<String> {
    let configured = configured.trim();
    if !configured.is_empty() {
        return Ok(configured.to_string());
    }
    ctx.run.trigger_str("from").filter(|from| !from.is_empty()).ok_or_else(|| ctx.error("no recipient configured and the trigger has no sender"))
}

fn receipt_outputs(
    ctx: &ActionContext<'_>,
    receipt: &DeliveryReceipt,
) -> Vars {
    Vars::new()
        .with(MESSAGE_ID_KEY, receipt.message_id.as_str())
        .with(STATUS_KEY, receipt.status.as_str())
        .with(TIMESTAMP_KEY, ctx.now().to_rfc3339_opts(SecondsFormat::Secs, true))
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ParseMode {
    Plain,
    #[default]
    Whatsapp,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendTextSettings {
    pub message: String,
    #[serde(default)]
    pub recipient: String,
    #[serde(default)]
    pub parse_mode: ParseMode,
    #[serde(default = "preview_default")]
    pub preview_url: bool,
}

fn preview_default() -> bool {
    true
}

pub struct SendTextAction;

#[async_trait]
impl Action for SendTextAction {
    type Settings = SendTextSettings;

    fn block_type(&self) -> BlockType {
        BlockType::SendText
    }

    async fn run(
        &self,
        ctx: &ActionContext<'_>,
        settings: SendTextSettings,
    ) -> Result<ActionOutput> {
        let body = ctx.personalize(settings.message.trim());
        let body = body.trim();
        if body.is_empty() {
            return Err(ctx.error("message is empty"));
        }

        let recipient = recipient(ctx, &settings.recipient)?;
        let receipt = ctx
            .services
            .messenger
            .send(OutgoingMessage {
                recipient: recipient.clone(),
                content: MessageContent::Text {
                    body: body.to_string(),
                    preview_url: settings.preview_url,
                    formatted: settings.parse_mode == ParseMode::Whatsapp,
                },
            })
            .await?;

        Ok(ActionOutput::success(format!("message sent to {}", recipient))
            .with_outputs(receipt_outputs(ctx, &receipt))
            .with_reply(body.to_string()))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendImageSettings {
    pub url: String,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub recipient: String,
}

pub struct SendImageAction;

#[async_trait]
impl Action for SendImageAction {
    type Settings = SendImageSettings;

    fn block_type(&self) -> BlockType {
        BlockType::SendImage
    }

    async fn run(
        &self,
        ctx: &ActionContext<'_>,
        settings: SendImageSettings,
    ) -> Result<ActionOutput> {
        let url = settings.url.trim();
        if url.is_empty() {
            return Err(ctx.error("image url is empty"));
        }

        let recipient = recipient(ctx, &settings.recipient)?;
        let caption = ctx.personalize(settings.caption.trim()).trim().to_string();
        let receipt = ctx
            .services
            .messenger
            .send(OutgoingMessage {
                recipient: recipient.clone(),
                content: MessageContent::Image {
                    url: url.to_string(),
                    caption: caption.clone(),
                },
            })
            .await?;

        let reply = if caption.is_empty() { url.to_string() } else { caption };
        Ok(ActionOutput::success(format!("image sent to {}", recipient))
            .with_outputs(receipt_outputs(ctx, &receipt))
            .with_reply(reply))
    }
}
