use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use crate::{
    Result,
    blocks::BlockType,
    common::Vars,
    runtime::{
        capabilities::{Classification, ClassifyRequest, LocalClassifier},
        session::SessionMessage,
    },
    workflow::{
        actions::{Action, ActionContext, ActionOutput, Route},
        template,
    },
};

const INTENT_KEY: &str = "intent";
const URGENCY_KEY: &str = "urgency";
const SENTIMENT_KEY: &str = "sentiment";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GptAnalyzeSettings {
    #[serde(default)]
    pub input_field: String,
    /// comma or newline separated
    #[serde(default)]
    pub categories: String,
    #[serde(default)]
    pub ai_instructions: String,
    /// classify locally when the classifier fails
    #[serde(default)]
    pub local_fallback: bool,
}

impl GptAnalyzeSettings {
    fn category_list(&self) -> Vec<String> {
        self.categories.split(['\n', ',']).map(str::trim).filter(|c| !c.is_empty()).map(str::to_string).collect()
    }
}

/// Classifies the incoming text with the engine classifier.
///
/// The conversation history of `trigger.sessionId` is passed along and the
/// classified message is appended to it.
pub struct GptAnalyzeAction;

impl GptAnalyzeAction {
    fn outputs(classification: &Classification) -> Vars {
        Vars::new()
            .with(INTENT_KEY, classification.intent.as_str())
            .with(URGENCY_KEY, classification.urgency)
            .with(SENTIMENT_KEY, classification.sentiment.as_ref())
    }
}

#[async_trait]
impl Action for GptAnalyzeAction {
    type Settings = GptAnalyzeSettings;

    fn block_type(&self) -> BlockType {
        BlockType::GptAnalyze
    }

    async fn run(
        &self,
        ctx: &ActionContext<'_>,
        settings: GptAnalyzeSettings,
    ) -> Result<ActionOutput> {
        let text = template::stringify(&ctx.field_value(ctx.node.config.get_value("inputField"), &settings.input_field));
        let categories = settings.category_list();
        let session_id = ctx.run.trigger_str("sessionId").filter(|s| !s.is_empty());

        let history = match &session_id {
            Some(id) => ctx.services.sessions.get(id).await?,
            None => Vec::new(),
        };

        let request = ClassifyRequest {
            text: text.clone(),
            categories: categories.clone(),
            instructions: settings.ai_instructions.clone(),
            history,
        };

        let (classification, fallback) = match ctx.services.classifier.classify(request).await {
            Ok(c) => (c.normalized(), None),
            Err(err) if settings.local_fallback => {
                warn!(node_id = ctx.node.id, error = %err, "classifier failed, using local classification");
                (LocalClassifier.classify_text(&text, &categories), Some(err))
            }
            Err(err) => return Err(ctx.error(format!("classification failed: {}", err))),
        };

        if let Some(id) = &session_id {
            ctx.services.sessions.create(id).await?;
            ctx.services.sessions.append(id, SessionMessage::user(text.as_str(), ctx.now()).with_intent(&classification.intent)).await?;
        }

        let summary = format!("intent {}, urgency {}/5, sentiment {}", classification.intent, classification.urgency, classification.sentiment);
        let outputs = Self::outputs(&classification);

        let output = match fallback {
            None => ActionOutput::success(summary),
            Some(err) => ActionOutput::warning(format!("{} (local fallback: {})", summary, err)).with_route(Route::Next),
        };
        Ok(output.with_outputs(outputs.clone()).with_globals(outputs))
    }
}
