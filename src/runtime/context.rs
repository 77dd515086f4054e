use std::sync::Arc;

use serde_json::{Map, Value};

use crate::{
    common::Vars,
    config::EngineConfig,
    runtime::{
        capabilities::{Classifier, Clock, Messenger, Responder},
        session::SessionStore,
    },
    workflow::{
        consts::{TRIGGER_KEY, VARIABLES_KEY},
        node::Node,
        template,
    },
};

/// Everything a handler may call out to. Shared by all runs of an engine.
#[derive(Clone)]
pub struct Services {
    pub classifier: Arc<dyn Classifier>,
    pub responder: Arc<dyn Responder>,
    pub messenger: Arc<dyn Messenger>,
    pub clock: Arc<dyn Clock>,
    pub sessions: Arc<dyn SessionStore>,
    pub http: reqwest::Client,
    pub config: EngineConfig,
}

/// Accumulated state of a single run.
///
/// Node outputs are stored under the node name and aliased under the block
/// type; the trigger payload lives under `trigger`. Entries are only ever
/// added or overwritten, never removed.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    run_id: String,
    workflow_id: String,
    vars: Vars,
    responses: Vec<String>,
}

impl ExecutionContext {
    pub fn new(
        run_id: String,
        workflow_id: &str,
    ) -> Self {
        Self {
            run_id,
            workflow_id: workflow_id.to_string(),
            vars: Vars::new(),
            responses: Vec::new(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    pub fn vars(&self) -> &Vars {
        &self.vars
    }

    /// Seeds the trigger payload; also visible under the trigger node name.
    pub fn seed_trigger(
        &mut self,
        node: &Node,
        payload: Vars,
    ) {
        self.vars.set(TRIGGER_KEY, payload.clone());
        self.add_output(node, payload);
    }

    pub fn trigger(&self) -> Option<&Map<String, Value>> {
        self.vars.get_value(TRIGGER_KEY).and_then(Value::as_object)
    }

    /// A trigger field rendered as text.
    pub fn trigger_str(
        &self,
        key: &str,
    ) -> Option<String> {
        self.trigger().and_then(|t| t.get(key)).filter(|v| !v.is_null()).map(template::stringify)
    }

    /// Stores node outputs under the node name and the block type alias.
    pub fn add_output(
        &mut self,
        node: &Node,
        outputs: Vars,
    ) {
        self.vars.set(node.block_type.as_ref(), outputs.clone());
        self.vars.set(&node.name, outputs);
    }

    /// Sets a run-wide variable, readable as `{{name}}` and `{{variables.name}}`.
    pub fn set_global(
        &mut self,
        key: &str,
        value: Value,
    ) {
        let mut variables = match self.vars.get_value(VARIABLES_KEY) {
            Some(Value::Object(m)) => m.clone(),
            _ => Map::new(),
        };
        variables.insert(key.to_string(), value.clone());
        self.vars.set(VARIABLES_KEY, variables);
        self.vars.set(key, value);
    }

    pub fn push_response(
        &mut self,
        text: String,
    ) {
        self.responses.push(text);
    }

    pub fn responses(&self) -> &[String] {
        &self.responses
    }

    pub fn resolve(
        &self,
        text: &str,
    ) -> String {
        template::resolve(text, &self.vars)
    }

    pub fn into_parts(self) -> (Vars, Vec<String>) {
        (self.vars, self.responses)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{blocks::BlockRegistry, model::NodeModel};

    fn node(
        id: i64,
        ty: &str,
        name: &str,
        config: Value,
    ) -> Node {
        let registry = BlockRegistry::standard().unwrap();
        Node::new(&NodeModel::new(id, ty, name).with_config(config), &registry).unwrap()
    }

    #[test]
    fn test_seed_and_outputs() {
        let mut ctx = ExecutionContext::new("run".into(), "wf");
        let trigger = node(1, "whatsapp_message", "Incoming", json!({}));
        ctx.seed_trigger(&trigger, Vars::from(json!({"message": "salut", "from": "+225"})));

        assert_eq!(ctx.trigger_str("message").as_deref(), Some("salut"));
        assert_eq!(ctx.resolve("<Incoming.from>/<whatsapp_message.from>"), "+225/+225");

        let analyze = node(2, "gpt_analyze", "Analyse", json!({}));
        ctx.add_output(&analyze, Vars::new().with("intent", "salutation"));
        assert_eq!(ctx.resolve("<Analyse.intent> <gpt_analyze.intent>"), "salutation salutation");
    }

    #[test]
    fn test_globals() {
        let mut ctx = ExecutionContext::new("run".into(), "wf");
        ctx.set_global("plan", json!("pro"));
        ctx.set_global("seats", json!(3));
        assert_eq!(ctx.resolve("{{plan}} {{variables.seats}}"), "pro 3");
    }

    #[test]
    fn test_latest_alias_wins() {
        let mut ctx = ExecutionContext::new("run".into(), "wf");
        ctx.add_output(&node(2, "send_text", "First", json!({"message": "a"})), Vars::new().with("status", "sent"));
        ctx.add_output(&node(3, "send_text", "Second", json!({"message": "b"})), Vars::new().with("status", "queued"));
        assert_eq!(ctx.resolve("<send_text.status> <First.status>"), "queued sent");
    }
}
