//! Workflow engine - the main entry point for Blockflow.
//!
//! The engine loads stored automations, compiles them against the block
//! registry and runs them. It holds no per-run state: every run gets its own
//! context, so one engine can serve many runs at once.

use std::sync::Arc;

use futures::future::join_all;
use serde_json::Value;
use tracing::{info, warn};

use crate::{
    Result,
    blocks::{BlockConfig, BlockRegistry},
    dispatcher::Dispatcher,
    execution::ExecutionResult,
    model::WorkflowModel,
    runtime::Services,
    store::{ExecutionLogStore, WorkflowStore, data::LogRecord},
    utils,
    workflow::{Workflow, actions::HandlerTable},
};

/// The main workflow engine.
///
/// Cheap to clone; all shared parts live behind `Arc`.
///
/// # Example
///
/// ```rust,ignore
/// let engine = EngineBuilder::new().store(Arc::new(store)).build()?;
/// let result = engine.run_workflow("wf-1", json!({"message": "Bonjour", "from": "+225"})).await;
/// println!("{}", result.response());
/// ```
#[derive(Clone)]
pub struct Engine {
    registry: Arc<BlockRegistry>,
    handlers: Arc<HandlerTable>,
    services: Services,
    workflows: Arc<dyn WorkflowStore>,
    logs: Arc<dyn ExecutionLogStore>,
}

impl Engine {
    pub(crate) fn new(
        registry: Arc<BlockRegistry>,
        handlers: Arc<HandlerTable>,
        services: Services,
        workflows: Arc<dyn WorkflowStore>,
        logs: Arc<dyn ExecutionLogStore>,
    ) -> Self {
        Self {
            registry,
            handlers,
            services,
            workflows,
            logs,
        }
    }

    pub fn registry(&self) -> &BlockRegistry {
        &self.registry
    }

    /// Every block the engine can run, for palettes and config forms.
    pub fn blocks(&self) -> impl Iterator<Item = &BlockConfig> {
        self.registry.list_blocks()
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Validates a workflow definition against the registry, then every node
    /// config against the typed settings of its handler.
    pub fn compile(
        &self,
        model: &WorkflowModel,
    ) -> Result<Workflow> {
        let workflow = Workflow::new(model, &self.registry)?;
        for node in workflow.nodes() {
            if let Some(handler) = self.handlers.get(node.block_type) {
                handler.validate(node)?;
            }
        }
        Ok(workflow)
    }

    /// Loads and compiles a stored workflow. Fails on the first invalid node.
    pub async fn load(
        &self,
        workflow_id: &str,
    ) -> Result<Workflow> {
        let model = self.workflows.find(workflow_id).await?;
        self.compile(&model)
    }

    /// Runs a compiled workflow once.
    pub async fn execute(
        &self,
        workflow: &Workflow,
        payload: Value,
    ) -> ExecutionResult {
        Dispatcher::new(workflow, &self.handlers, &self.services).run(utils::longid(), payload).await
    }

    /// Loads a workflow and runs it for one trigger payload.
    ///
    /// Never fails: a workflow that cannot be loaded yields a failed result
    /// with no executed node.
    pub async fn run_workflow(
        &self,
        workflow_id: &str,
        payload: Value,
    ) -> ExecutionResult {
        match self.load(workflow_id).await {
            Ok(workflow) => self.execute(&workflow, payload).await,
            Err(err) => {
                warn!(workflow_id, error = %err, "workflow rejected");
                ExecutionResult::rejected(utils::longid(), workflow_id, &err.to_string())
            }
        }
    }

    /// Runs the workflow once per payload, concurrently. Results keep the
    /// order of `payloads`.
    pub async fn run_batch(
        &self,
        workflow_id: &str,
        payloads: Vec<Value>,
    ) -> Vec<ExecutionResult> {
        let workflow = match self.load(workflow_id).await {
            Ok(workflow) => workflow,
            Err(err) => {
                warn!(workflow_id, error = %err, runs = payloads.len(), "workflow rejected");
                let reason = err.to_string();
                return payloads.iter().map(|_| ExecutionResult::rejected(utils::longid(), workflow_id, &reason)).collect();
            }
        };

        info!(workflow_id, runs = payloads.len(), "batch started");
        join_all(payloads.into_iter().map(|payload| self.execute(&workflow, payload))).await
    }

    /// Persists the log entries of a finished run.
    pub async fn record(
        &self,
        result: &ExecutionResult,
    ) -> Result<usize> {
        self.logs.save(result).await
    }

    /// Stored log entries of a workflow, oldest first.
    pub async fn history(
        &self,
        workflow_id: &str,
    ) -> Result<Vec<LogRecord>> {
        self.logs.list(workflow_id).await
    }
}
