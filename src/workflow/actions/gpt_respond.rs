use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use crate::{
    Result,
    blocks::BlockType,
    common::Vars,
    runtime::{
        capabilities::{LocalResponder, MessageContent, OutgoingMessage, RespondRequest},
        session::SessionMessage,
    },
    workflow::{
        actions::{Action, ActionContext, ActionOutput, Route, messaging},
        template,
    },
};

const AI_RESPONSE_KEY: &str = "aiResponse";
const MESSAGE_ID_KEY: &str = "messageId";
const STATUS_KEY: &str = "status";
/// Run variable written by the analysis block.
const INTENT_KEY: &str = "intent";

const DEFAULT_SYSTEM_PROMPT: &str = "Tu es un assistant professionnel. Réponds de manière concise (2-3 phrases max) en français.";
const DEFAULT_MODEL: &str = "gpt-4o";
const EMPTY_REPLY: &str = "Je n'ai pas pu générer de réponse.";

/// milliseconds
const REPLY_DELAY: u64 = 2000;
const FALLBACK_DELAY: u64 = 1000;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GptRespondSettings {
    #[serde(default)]
    pub input_field: String,
    #[serde(default)]
    pub system: String,
    /// used as the system prompt when `system` is empty
    #[serde(default)]
    pub ai_instructions: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub recipient: String,
}

impl GptRespondSettings {
    /// System prompt with the detected intent appended.
    fn system_prompt(
        &self,
        intent: Option<&str>,
    ) -> String {
        let base = [self.system.trim(), self.ai_instructions.trim()].into_iter().find(|s| !s.is_empty()).unwrap_or(DEFAULT_SYSTEM_PROMPT);
        match intent {
            Some(intent) => format!("{}\n\nContexte: L'intention détectée du client est \"{}\". Adapte ta réponse en conséquence.", base, intent),
            None => base.to_string(),
        }
    }

    fn model(&self) -> String {
        match self.model.trim() {
            "" => DEFAULT_MODEL.to_string(),
            model => model.to_string(),
        }
    }
}

/// Generates a reply with the engine responder and sends it to the contact.
///
/// When the responder fails the canned reply for the detected intent is sent
/// instead and the node is logged as a warning.
pub struct GptRespondAction;

#[async_trait]
impl Action for GptRespondAction {
    type Settings = GptRespondSettings;

    fn block_type(&self) -> BlockType {
        BlockType::GptRespond
    }

    async fn run(
        &self,
        ctx: &ActionContext<'_>,
        settings: GptRespondSettings,
    ) -> Result<ActionOutput> {
        let text = template::stringify(&ctx.field_value(ctx.node.config.get_value("inputField"), &settings.input_field));
        let intent = ctx.vars().get::<String>(INTENT_KEY).filter(|i| !i.trim().is_empty());
        let recipient = messaging::recipient(ctx, &settings.recipient)?;
        let session_id = ctx.run.trigger_str("sessionId").filter(|s| !s.is_empty());

        let history = match &session_id {
            Some(id) => ctx.services.sessions.get(id).await?,
            None => Vec::new(),
        };

        let request = RespondRequest {
            text,
            system: settings.system_prompt(intent.as_deref()),
            model: settings.model(),
            intent: intent.clone(),
            history,
        };

        let (reply, fallback) = match ctx.services.responder.respond(request).await {
            Ok(reply) if reply.trim().is_empty() => (EMPTY_REPLY.to_string(), None),
            Ok(reply) => (reply.trim().to_string(), None),
            Err(err) => {
                warn!(node_id = ctx.node.id, error = %err, "responder failed, using canned reply");
                (LocalResponder::fallback_response(intent.as_deref()).to_string(), Some(err))
            }
        };
        let reply = ctx.personalize(&reply);

        let receipt = ctx
            .services
            .messenger
            .send(OutgoingMessage {
                recipient: recipient.clone(),
                content: MessageContent::Text {
                    body: reply.clone(),
                    preview_url: false,
                    formatted: true,
                },
            })
            .await?;

        if let Some(id) = &session_id {
            ctx.services.sessions.create(id).await?;
            ctx.services.sessions.append(id, SessionMessage::assistant(reply.as_str(), ctx.now())).await?;
        }

        let outputs = Vars::new()
            .with(AI_RESPONSE_KEY, reply.as_str())
            .with(MESSAGE_ID_KEY, receipt.message_id.as_str())
            .with(STATUS_KEY, receipt.status.as_str());

        let output = match fallback {
            None => ActionOutput::success(format!("reply sent to {}", recipient)).with_wait_delay(REPLY_DELAY),
            Some(err) => ActionOutput::warning(format!("canned reply sent to {} ({})", recipient, err)).with_route(Route::Next).with_wait_delay(FALLBACK_DELAY),
        };
        Ok(output.with_outputs(outputs).with_reply(reply))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::{Value, json};

    use super::*;
    use crate::{
        execution::LogStatus,
        runtime::{
            Services,
            session::{MemorySessionStore, Role, SessionStore},
        },
        testing::{self, FailingResponder, RecordingMessenger, ScriptedResponder},
    };

    async fn run(
        services: &Services,
        config: Value,
        intent: Option<&str>,
    ) -> Result<ActionOutput> {
        let mut run = testing::run_context(json!({"message": "Combien coûte la livraison ?", "from": "+225", "userName": "Awa"}));
        if let Some(intent) = intent {
            run.set_global(INTENT_KEY, json!(intent));
        }
        let node = testing::node(11, "gpt_respond", "Answer", config);
        testing::run_handler(&GptRespondAction, &node, &run, services).await
    }

    #[test]
    fn test_system_prompt() {
        let settings: GptRespondSettings = serde_json::from_value(json!({"aiInstructions": "Sois bref."})).unwrap();
        assert_eq!(settings.system_prompt(None), "Sois bref.");
        assert!(settings.system_prompt(Some("plainte")).ends_with("L'intention détectée du client est \"plainte\". Adapte ta réponse en conséquence."));

        let settings: GptRespondSettings = serde_json::from_value(json!({"system": "Tu vends des pagnes.", "aiInstructions": "ignored"})).unwrap();
        assert_eq!(settings.system_prompt(None), "Tu vends des pagnes.");

        let settings: GptRespondSettings = serde_json::from_value(json!({})).unwrap();
        assert_eq!(settings.system_prompt(None), DEFAULT_SYSTEM_PROMPT);
        assert_eq!(settings.model(), DEFAULT_MODEL);
    }

    #[tokio::test]
    async fn test_reply_with_intent_context() {
        let responder = Arc::new(ScriptedResponder::new("La livraison coûte 1000 FCFA, {nom}."));
        let messenger = Arc::new(RecordingMessenger::default());
        let sessions = Arc::new(MemorySessionStore::default());
        let mut services = testing::services();
        services.responder = responder.clone();
        services.messenger = messenger.clone();
        services.sessions = sessions.clone();
        sessions.append("+225", SessionMessage::user("Bonjour", testing::fixed_now())).await.unwrap();

        let output = run(&services, json!({"model": "gpt-4o-mini"}), Some("question_prix")).await.unwrap();
        assert_eq!(output.status, LogStatus::Success);
        assert_eq!(output.route, Route::Next);
        assert_eq!(output.wait_delay, Some(REPLY_DELAY));
        assert_eq!(output.reply.as_deref(), Some("La livraison coûte 1000 FCFA, Awa."));
        assert_eq!(output.outputs.get::<String>(AI_RESPONSE_KEY), Some("La livraison coûte 1000 FCFA, Awa.".into()));

        let requests = responder.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].text, "Combien coûte la livraison ?");
        assert_eq!(requests[0].model, "gpt-4o-mini");
        assert_eq!(requests[0].intent.as_deref(), Some("question_prix"));
        assert!(requests[0].system.contains("\"question_prix\""));
        assert_eq!(requests[0].history.len(), 1);

        assert_eq!(messenger.sent()[0].recipient, "+225");
        let history = sessions.get("+225").await.unwrap();
        assert_eq!(history.last().map(|m| m.role), Some(Role::Assistant));
    }

    #[tokio::test]
    async fn test_responder_failure_sends_canned_reply() {
        let messenger = Arc::new(RecordingMessenger::default());
        let mut services = testing::services();
        services.responder = Arc::new(FailingResponder);
        services.messenger = messenger.clone();

        let output = run(&services, json!({}), Some("question_prix")).await.unwrap();
        assert_eq!(output.status, LogStatus::Warning);
        assert_eq!(output.route, Route::Next);
        assert_eq!(output.wait_delay, Some(FALLBACK_DELAY));
        assert_eq!(output.reply.as_deref(), Some(LocalResponder::fallback_response(Some("question_prix"))));
        assert_eq!(messenger.sent().len(), 1);

        let output = run(&services, json!({}), None).await.unwrap();
        assert_eq!(output.reply.as_deref(), Some(LocalResponder::fallback_response(None)));
    }

    #[tokio::test]
    async fn test_empty_reply() {
        let mut services = testing::services();
        services.responder = Arc::new(ScriptedResponder::new("   "));

        let output = run(&services, json!({}), None).await.unwrap();
        assert_eq!(output.reply.as_deref(), Some(EMPTY_REPLY));
    }
}
