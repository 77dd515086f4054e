pub mod condition;
pub mod delay;
pub mod end_flow;
pub mod gpt_analyze;
pub mod gpt_respond;
pub mod http_request;
pub mod keyword;
pub mod messaging;
pub mod set_variable;
pub mod switch;
pub mod trigger;

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use strum::IntoEnumIterator;

use crate::{
    BlockflowError, Result,
    blocks::{BlockRegistry, BlockType},
    common::Vars,
    execution::LogStatus,
    runtime::{ExecutionContext, Services},
    workflow::{node::Node, template},
};

pub use condition::ConditionAction;
pub use delay::DelayAction;
pub use end_flow::EndFlowAction;
pub use gpt_analyze::GptAnalyzeAction;
pub use gpt_respond::GptRespondAction;
pub use http_request::HttpRequestAction;
pub use keyword::KeywordAction;
pub use messaging::{SendImageAction, SendTextAction};
pub use set_variable::SetVariableAction;
pub use switch::SwitchAction;
pub use trigger::TriggerAction;

/// What a handler sees while it runs: the node, a read-only view of the run
/// context and the engine services.
pub struct ActionContext<'a> {
    pub node: &'a Node,
    pub run: &'a ExecutionContext,
    pub services: &'a Services,
}

impl ActionContext<'_> {
    pub fn vars(&self) -> &Vars {
        self.run.vars()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.services.clock.now()
    }

    /// Value designated by a resolved field setting.
    ///
    /// A field written as a template stands for its resolved text. A bare
    /// dotted path is looked up in the context and falls back to the text.
    pub fn field_value(
        &self,
        raw: Option<&Value>,
        resolved: &str,
    ) -> Value {
        let templated = raw.and_then(Value::as_str).is_some_and(|r| !template::references(r).is_empty());
        if !templated {
            if let Some(value) = template::lookup(self.vars(), resolved.trim()) {
                return value.clone();
            }
        }
        Value::String(resolved.to_string())
    }

    /// Fills the contact placeholders (`{nom}`, `{prenom}`, `{email}`) of an outgoing text.
    pub fn personalize(
        &self,
        text: &str,
    ) -> String {
        template::personalize(text, self.vars())
    }

    /// Builds an error scoped to the running node.
    pub fn error(
        &self,
        message: impl Into<String>,
    ) -> BlockflowError {
        BlockflowError::node(self.node.id, self.node.block_type.as_ref(), message)
    }
}

/// Where the run goes after a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Follow `connectedTo`.
    Next,
    /// Take the first of `keys` present in the node branches; fall back to
    /// `connectedTo` when `fallback_next` is set, otherwise end the run.
    Branch {
        keys: Vec<String>,
        fallback_next: bool,
    },
    /// Stop here.
    End,
}

impl Route {
    pub fn branch<S: AsRef<str>>(
        keys: &[S],
        fallback_next: bool,
    ) -> Self {
        Route::Branch {
            keys: keys.iter().map(|k| k.as_ref().to_string()).collect(),
            fallback_next,
        }
    }
}

/// Output returned by an action's run method
#[derive(Debug, Clone)]
pub struct ActionOutput {
    /// log status of the node, `error` stops the run
    pub status: LogStatus,
    /// human readable summary for the log entry
    pub message: String,
    /// stored under the node name and block type
    pub outputs: Vars,
    /// run-wide variables
    pub globals: Vars,
    pub route: Route,
    /// milliseconds
    pub wait_delay: Option<u64>,
    /// text sent to the contact
    pub reply: Option<String>,
}

impl ActionOutput {
    fn new(
        status: LogStatus,
        message: impl Into<String>,
        route: Route,
    ) -> Self {
        Self {
            status,
            message: message.into(),
            outputs: Vars::new(),
            globals: Vars::new(),
            route,
            wait_delay: None,
            reply: None,
        }
    }

    /// Create a successful action output
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(LogStatus::Success, message, Route::Next)
    }

    /// Create a skipped action output, the run ends at this node
    pub fn skipped(message: impl Into<String>) -> Self {
        Self::new(LogStatus::Skipped, message, Route::End)
    }

    /// Create a warning action output, the run ends at this node
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(LogStatus::Warning, message, Route::End)
    }

    pub fn with_outputs(
        mut self,
        outputs: Vars,
    ) -> Self {
        self.outputs = outputs;
        self
    }

    pub fn with_globals(
        mut self,
        globals: Vars,
    ) -> Self {
        self.globals = globals;
        self
    }

    pub fn with_route(
        mut self,
        route: Route,
    ) -> Self {
        self.route = route;
        self
    }

    pub fn with_wait_delay(
        mut self,
        wait_delay: u64,
    ) -> Self {
        self.wait_delay = Some(wait_delay);
        self
    }

    pub fn with_reply(
        mut self,
        reply: String,
    ) -> Self {
        self.reply = Some(reply);
        self
    }
}

/// Behavior of one block type, over its typed settings.
///
/// Settings are deserialized from the node config after template resolution.
#[async_trait]
pub trait Action: Send + Sync {
    type Settings: DeserializeOwned + Send;

    /// Returns the block type handled by the action.
    fn block_type(&self) -> BlockType;

    /// Executes the node's action with the given context and settings.
    async fn run(
        &self,
        ctx: &ActionContext<'_>,
        settings: Self::Settings,
    ) -> Result<ActionOutput>;
}

/// Type-erased [`Action`], as stored in the [`HandlerTable`].
#[async_trait]
pub trait Handler: Send + Sync {
    fn block_type(&self) -> BlockType;

    /// Checks the unresolved config of `node` when the workflow is loaded.
    fn validate(
        &self,
        _node: &Node,
    ) -> Result<()> {
        Ok(())
    }

    async fn handle(
        &self,
        ctx: &ActionContext<'_>,
        config: Vars,
    ) -> Result<ActionOutput>;
}

#[async_trait]
impl<A: Action> Handler for A {
    fn block_type(&self) -> BlockType {
        Action::block_type(self)
    }

    fn validate(
        &self,
        node: &Node,
    ) -> Result<()> {
        serde_json::from_value::<A::Settings>(Value::from(node.config.clone()))
            .map(|_| ())
            .map_err(|e| BlockflowError::node(node.id, node.block_type.as_ref(), format!("invalid settings: {}", e)))
    }

    async fn handle(
        &self,
        ctx: &ActionContext<'_>,
        config: Vars,
    ) -> Result<ActionOutput> {
        let settings: A::Settings = serde_json::from_value(config.into()).map_err(|e| ctx.error(format!("invalid settings: {}", e)))?;
        self.run(ctx, settings).await
    }
}

/// Maps every block type to its handler.
#[derive(Clone)]
pub struct HandlerTable {
    handlers: HashMap<BlockType, Arc<dyn Handler>>,
}

impl HandlerTable {
    /// One built-in handler per block type.
    pub fn standard() -> Self {
        Self {
            handlers: BlockType::iter().map(|t| (t, Self::builtin(t))).collect(),
        }
    }

    fn builtin(block_type: BlockType) -> Arc<dyn Handler> {
        match block_type {
            BlockType::WhatsappMessage | BlockType::Webhook | BlockType::Scheduled => Arc::new(TriggerAction::new(block_type)),
            BlockType::Condition => Arc::new(ConditionAction),
            BlockType::Switch => Arc::new(SwitchAction),
            BlockType::Keyword => Arc::new(KeywordAction),
            BlockType::Delay => Arc::new(DelayAction),
            BlockType::SetVariable => Arc::new(SetVariableAction),
            BlockType::EndFlow => Arc::new(EndFlowAction),
            BlockType::GptAnalyze => Arc::new(GptAnalyzeAction),
            BlockType::GptRespond => Arc::new(GptRespondAction),
            BlockType::SendText => Arc::new(SendTextAction),
            BlockType::SendImage => Arc::new(SendImageAction),
            BlockType::HttpRequest => Arc::new(HttpRequestAction),
        }
    }

    /// Replaces the handler of `handler.block_type()`.
    pub fn register(
        &mut self,
        handler: Arc<dyn Handler>,
    ) {
        self.handlers.insert(handler.block_type(), handler);
    }

    pub fn get(
        &self,
        block_type: BlockType,
    ) -> Option<Arc<dyn Handler>> {
        self.handlers.get(&block_type).cloned()
    }

    /// Every registered block must have a handler for its own type.
    pub fn ensure_complete(
        &self,
        registry: &BlockRegistry,
    ) -> Result<()> {
        let missing: Vec<String> = registry.types().filter(|t| !self.handlers.get(t).is_some_and(|h| h.block_type() == *t)).map(|t| t.as_ref().to_string()).collect();
        if !missing.is_empty() {
            return Err(BlockflowError::Config(format!("no handler for block type(s): {}", missing.join(", "))));
        }
        Ok(())
    }
}

impl Default for HandlerTable {
    fn default() -> Self {
        Self::standard()
    }
}
