use async_trait::async_trait;
use serde::Deserialize;

use crate::{
    Result,
    blocks::BlockType,
    runtime::capabilities::{MessageContent, OutgoingMessage},
    workflow::actions::{Action, ActionContext, ActionOutput, Route, messaging},
};

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EndKind {
    #[default]
    Stop,
    /// send `message` before stopping
    Message,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndFlowSettings {
    #[serde(default)]
    pub action: EndKind,
    #[serde(default)]
    pub message: String,
}

pub struct EndFlowAction;

#[async_trait]
impl Action for EndFlowAction {
    type Settings = EndFlowSettings;

    fn block_type(&self) -> BlockType {
        BlockType::EndFlow
    }

    async fn run(
        &self,
        ctx: &ActionContext<'_>,
        settings: EndFlowSettings,
    ) -> Result<ActionOutput> {
        let text = ctx.personalize(settings.message.trim());
        let text = text.trim();
        if settings.action == EndKind::Stop || text.is_empty() {
            return Ok(ActionOutput::success("flow ended").with_route(Route::End));
        }

        let recipient = messaging::recipient(ctx, "")?;
        let message = OutgoingMessage {
            recipient,
            content: MessageContent::Text {
                body: text.to_string(),
                preview_url: false,
                formatted: true,
            },
        };
        let receipt = ctx.services.messenger.send(message).await?;

        Ok(ActionOutput::success(format!("closing message sent ({}), flow ended", receipt.message_id))
            .with_route(Route::End)
            .with_reply(text.to_string()))
    }
}
