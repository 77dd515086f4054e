use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::{
    Result,
    blocks::BlockType,
    common::Vars,
    workflow::{
        actions::{Action, ActionContext, ActionOutput},
        consts::{RESERVED_NAMES, VARIABLES_KEY},
        template,
    },
};

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentKind {
    #[default]
    Static,
    /// stored as its resolved text, never evaluated
    Expression,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Assignment {
    pub name: String,
    #[serde(default)]
    pub value: Value,
    #[serde(default, rename = "type")]
    pub kind: AssignmentKind,
    #[serde(default)]
    pub expression: Option<String>,
}

impl Assignment {
    fn resolved_value(&self) -> Value {
        match (&self.kind, &self.expression) {
            (AssignmentKind::Expression, Some(expr)) => Value::String(expr.clone()),
            _ => self.value.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetVariableSettings {
    #[serde(default)]
    pub variables: Vec<Assignment>,
    /// single assignment form of older automations
    #[serde(default)]
    pub variable_name: Option<String>,
    #[serde(default)]
    pub value: Value,
}

impl SetVariableSettings {
    fn assignments(&self) -> Vec<(String, Value)> {
        let list: Vec<(String, Value)> = self.variables.iter().filter(|a| !a.name.trim().is_empty()).map(|a| (a.name.trim().to_string(), a.resolved_value())).collect();
        if !list.is_empty() {
            return list;
        }
        match &self.variable_name {
            Some(name) if !name.trim().is_empty() => vec![(name.trim().to_string(), self.value.clone())],
            _ => Vec::new(),
        }
    }
}

/// Writes run-wide variables.
pub struct SetVariableAction;

#[async_trait]
impl Action for SetVariableAction {
    type Settings = SetVariableSettings;

    fn block_type(&self) -> BlockType {
        BlockType::SetVariable
    }

    async fn run(
        &self,
        ctx: &ActionContext<'_>,
        settings: SetVariableSettings,
    ) -> Result<ActionOutput> {
        let assignments = settings.assignments();
        if assignments.is_empty() {
            return Ok(ActionOutput::success("no variable set"));
        }

        if let Some((name, _)) = assignments.iter().find(|(name, _)| RESERVED_NAMES.contains(&name.as_str())) {
            return Err(ctx.error(format!("variable name '{}' is reserved", name)));
        }

        let mut globals = Vars::new();
        for (name, value) in &assignments {
            debug!(node_id = ctx.node.id, name = name.as_str(), "set variable");
            globals.set(name, value.clone());
        }
        let assigned: Map<String, Value> = assignments.iter().cloned().collect();
        let message = match assignments.as_slice() {
            [(name, value)] => format!("{} = {}", name, template::stringify(value)),
            list => format!("{} variables set", list.len()),
        };

        Ok(ActionOutput::success(message).with_outputs(Vars::new().with(VARIABLES_KEY, assigned)).with_globals(globals))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::testing;

    async fn run(config: Value) -> ActionOutput {
        let services = testing::services();
        let run = testing::run_context(json!({"message": "Je suis Awa", "from": "+225"}));
        let node = testing::node(6, "set_variable", "Remember", config);
        testing::run_handler(&SetVariableAction, &node, &run, &services).await.unwrap()
    }

    #[tokio::test]
    async fn test_assign_list() {
        let output = run(json!({
            "variables": [
                {"name": "customer", "value": "<trigger.from>"},
                {"name": "greeting", "type": "expression", "expression": "Bonjour {{trigger.message}}"},
                {"name": " ", "value": "ignored"}
            ]
        }))
        .await;

        assert_eq!(output.message, "2 variables set");
        assert_eq!(output.globals.get::<String>("customer"), Some("+225".into()));
        assert_eq!(output.globals.get::<String>("greeting"), Some("Bonjour Je suis Awa".into()));
        assert_eq!(output.outputs.get_value("variables"), Some(&json!({"customer": "+225", "greeting": "Bonjour Je suis Awa"})));
    }

    #[tokio::test]
    async fn test_single_assignment_form() {
        let output = run(json!({"variableName": "plan", "value": 3})).await;
        assert_eq!(output.message, "plan = 3");
        assert_eq!(output.globals.get::<i64>("plan"), Some(3));
    }

    #[tokio::test]
    async fn test_reserved_names_are_refused() {
        let services = testing::services();
        let run = testing::run_context(json!({"message": "salut", "from": "+225"}));

        let node = testing::node(6, "set_variable", "Remember", json!({"variableName": "trigger", "value": "x"}));
        let err = testing::run_handler(&SetVariableAction, &node, &run, &services).await.unwrap_err();
        assert_eq!(err.to_string(), "node 6 (set_variable): variable name 'trigger' is reserved");

        let node = testing::node(6, "set_variable", "Remember", json!({"variables": [{"name": "plan", "value": 1}, {"name": " variables ", "value": 2}]}));
        let err = testing::run_handler(&SetVariableAction, &node, &run, &services).await.unwrap_err();
        assert!(err.to_string().contains("'variables' is reserved"));
    }

    #[tokio::test]
    async fn test_nothing_to_set() {
        let output = run(json!({})).await;
        assert_eq!(output.message, "no variable set");
        assert!(output.globals.is_empty());
    }
}
