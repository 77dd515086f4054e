use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::{
    Result,
    blocks::BlockType,
    common::Vars,
    workflow::{
        actions::{Action, ActionContext, ActionOutput},
        template,
    },
};

const TRIGGERED_KEY: &str = "keywordTriggered";
const MATCHED_KEY: &str = "matchedKeyword";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordSettings {
    /// one keyword per line or comma separated
    #[serde(default)]
    pub keywords: String,
    #[serde(default)]
    pub input_field: String,
}

impl KeywordSettings {
    pub fn keyword_list(&self) -> Vec<&str> {
        self.keywords.split(['\n', ',']).map(str::trim).filter(|k| !k.is_empty()).collect()
    }
}

/// Lets the run continue only when the message holds one of the keywords.
pub struct KeywordAction;

#[async_trait]
impl Action for KeywordAction {
    type Settings = KeywordSettings;

    fn block_type(&self) -> BlockType {
        BlockType::Keyword
    }

    async fn run(
        &self,
        ctx: &ActionContext<'_>,
        settings: KeywordSettings,
    ) -> Result<ActionOutput> {
        let keywords = settings.keyword_list();
        if keywords.is_empty() {
            let outputs = Vars::new().with(TRIGGERED_KEY, true).with(MATCHED_KEY, Value::Null);
            return Ok(ActionOutput::success("no keyword configured, passing through").with_outputs(outputs));
        }

        let input = template::stringify(&ctx.field_value(ctx.node.config.get_value("inputField"), &settings.input_field)).to_lowercase();
        match keywords.iter().find(|k| input.contains(&k.to_lowercase())) {
            Some(keyword) => {
                let outputs = Vars::new().with(TRIGGERED_KEY, true).with(MATCHED_KEY, *keyword);
                Ok(ActionOutput::success(format!("keyword '{}' detected", keyword)).with_outputs(outputs))
            }
            None => {
                let outputs = Vars::new().with(TRIGGERED_KEY, false).with(MATCHED_KEY, Value::Null);
                Ok(ActionOutput::warning(format!("none of {} keyword(s) found", keywords.len())).with_outputs(outputs))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{execution::LogStatus, testing, workflow::actions::Route};

    async fn run(
        keywords: &str,
        message: &str,
    ) -> ActionOutput {
        let services = testing::services();
        let run = testing::run_context(json!({"message": message}));
        let node = testing::node(4, "keyword", "Filter", json!({"keywords": keywords}));
        testing::run_handler(&KeywordAction, &node, &run, &services).await.unwrap()
    }

    #[tokio::test]
    async fn test_keyword_found() {
        let output = run("prix\ntarif, devis", "Quel est votre TARIF ?").await;
        assert_eq!(output.status, LogStatus::Success);
        assert_eq!(output.route, Route::Next);
        assert_eq!(output.outputs.get::<String>(MATCHED_KEY), Some("tarif".into()));
    }

    #[tokio::test]
    async fn test_keyword_missing_ends_run() {
        let output = run("prix", "bonjour").await;
        assert_eq!(output.status, LogStatus::Warning);
        assert_eq!(output.route, Route::End);
        assert_eq!(output.outputs.get::<bool>(TRIGGERED_KEY), Some(false));
    }

    #[tokio::test]
    async fn test_no_keywords_passes() {
        let output = run(" \n ", "bonjour").await;
        assert_eq!(output.status, LogStatus::Success);
        assert_eq!(output.outputs.get::<bool>(TRIGGERED_KEY), Some(true));
    }
}
