use async_trait::async_trait;
use regex::RegexBuilder;
use serde_json::Value;

use crate::{
    Result,
    blocks::BlockType,
    common::Vars,
    workflow::{
        actions::{Action, ActionContext, ActionOutput, Route},
        consts::{BRANCH_DEFAULT, CASE_BRANCH_PREFIX},
        template,
    },
};

use super::models::*;

const MATCHED_CASE_KEY: &str = "matchedCase";
const INPUT_VALUE_KEY: &str = "inputValue";
const CASE_INDEX_KEY: &str = "caseIndex";
const IS_DEFAULT_KEY: &str = "isDefault";

pub struct SwitchAction;

impl SwitchAction {
    fn is_match(
        &self,
        input: &str,
        case: &str,
        settings: &SwitchSettings,
    ) -> Result<bool> {
        if settings.match_mode == MatchMode::Regex {
            let re = RegexBuilder::new(case).case_insensitive(!settings.case_sensitive).build()?;
            return Ok(re.is_match(input));
        }

        let (input, case) = if settings.case_sensitive { (input.to_string(), case.to_string()) } else { (input.to_lowercase(), case.to_lowercase()) };
        let matched = match settings.match_mode {
            MatchMode::Exact => input == case,
            MatchMode::Contains => input.contains(&case),
            MatchMode::StartsWith => input.starts_with(&case),
            MatchMode::EndsWith => input.ends_with(&case),
            MatchMode::Regex => false,
        };
        Ok(matched)
    }
}

#[async_trait]
impl Action for SwitchAction {
    type Settings = SwitchSettings;

    fn block_type(&self) -> BlockType {
        BlockType::Switch
    }

    async fn run(
        &self,
        ctx: &ActionContext<'_>,
        settings: SwitchSettings,
    ) -> Result<ActionOutput> {
        let value = ctx.field_value(ctx.node.config.get_value("inputField"), &settings.input_field);
        let mut input = template::stringify(&value);
        if settings.trim_input {
            input = input.trim().to_string();
        }

        let mut outputs = Vars::new().with(INPUT_VALUE_KEY, input.as_str());

        for (i, case) in settings.case_list().into_iter().enumerate() {
            if self.is_match(&input, case, &settings)? {
                outputs.set(MATCHED_CASE_KEY, case);
                outputs.set(CASE_INDEX_KEY, i);
                outputs.set(IS_DEFAULT_KEY, false);
                let keys = [case.to_string(), format!("{}{}", CASE_BRANCH_PREFIX, i)];
                return Ok(ActionOutput::success(format!("matched case '{}' (#{}, {})", case, i, settings.match_mode.as_ref()))
                    .with_outputs(outputs)
                    .with_route(Route::branch(&keys, false)));
            }
        }

        outputs.set(MATCHED_CASE_KEY, Value::Null);
        outputs.set(CASE_INDEX_KEY, -1);
        outputs.set(IS_DEFAULT_KEY, true);

        if settings.default_case {
            return Ok(ActionOutput::success("no case matched, taking the default branch")
                .with_outputs(outputs)
                .with_route(Route::branch(&[BRANCH_DEFAULT], true)));
        }

        Ok(ActionOutput::skipped("no case matched and no default case").with_outputs(outputs))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{execution::LogStatus, testing};

    async fn run(
        config: Value,
        message: &str,
    ) -> Result<ActionOutput> {
        let services = testing::services();
        let run = testing::run_context(json!({"message": message}));
        let node = testing::node(3, "switch", "Route", config);
        testing::run_handler(&SwitchAction, &node, &run, &services).await
    }

    #[tokio::test]
    async fn test_contains_ignores_case() {
        let output = run(
            json!({
                "inputField": "<trigger.message>",
                "cases": "commande\nquestion",
                "matchMode": "contains",
                "caseSensitive": false
            }),
            "Je veux une COMMANDE",
        )
        .await
        .unwrap();

        assert_eq!(output.status, LogStatus::Success);
        assert_eq!(output.outputs.get::<i64>(CASE_INDEX_KEY), Some(0));
        assert_eq!(output.outputs.get::<String>(MATCHED_CASE_KEY), Some("commande".into()));
        assert_eq!(output.route, Route::branch(&["commande", "case_0"], false));
    }

    #[tokio::test]
    async fn test_modes() {
        let config = |mode: &str, cases: &str| json!({"inputField": "<trigger.message>", "cases": cases, "matchMode": mode});

        let output = run(config("startsWith", "bonsoir\nbonjour"), "Bonjour à tous").await.unwrap();
        assert_eq!(output.outputs.get::<i64>(CASE_INDEX_KEY), Some(1));

        let output = run(config("endsWith", "?\n!"), "vraiment !").await.unwrap();
        assert_eq!(output.outputs.get::<i64>(CASE_INDEX_KEY), Some(1));

        let output = run(config("regex", r"^cmd-\d+$"), "CMD-12").await.unwrap();
        assert_eq!(output.outputs.get::<i64>(CASE_INDEX_KEY), Some(0));

        let output = run(config("exact", "oui"), "  OUI  ").await.unwrap();
        assert_eq!(output.outputs.get::<String>(INPUT_VALUE_KEY), Some("OUI".into()));
        assert_eq!(output.outputs.get::<i64>(CASE_INDEX_KEY), Some(0));
    }

    #[tokio::test]
    async fn test_case_sensitive_and_untrimmed() {
        let output = run(
            json!({"inputField": "<trigger.message>", "cases": "oui", "caseSensitive": true, "trimInput": false, "defaultCase": false}),
            " oui",
        )
        .await
        .unwrap();
        assert_eq!(output.status, LogStatus::Skipped);
        assert_eq!(output.outputs.get::<bool>(IS_DEFAULT_KEY), Some(true));
        assert_eq!(output.route, Route::End);
    }

    #[tokio::test]
    async fn test_default_branch() {
        let output = run(json!({"inputField": "<trigger.message>", "cases": "a\n\n  \nb"}), "zzz").await.unwrap();
        assert_eq!(output.status, LogStatus::Success);
        assert_eq!(output.outputs.get::<i64>(CASE_INDEX_KEY), Some(-1));
        assert_eq!(output.route, Route::branch(&["default"], true));
    }

    #[tokio::test]
    async fn test_bare_path_input() {
        let output = run(json!({"inputField": "trigger.message", "cases": "salut"}), "salut").await.unwrap();
        assert_eq!(output.outputs.get::<i64>(CASE_INDEX_KEY), Some(0));
    }
}
