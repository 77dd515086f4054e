//! Workflow dispatcher: walks one run from the trigger to termination.
//!
//! A run is strictly sequential. Each visited node gets exactly one log
//! entry; branches that are not taken are never evaluated.

use std::{any::Any, collections::HashSet, panic::AssertUnwindSafe};

use futures::FutureExt;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::{
    common::Vars,
    execution::{ExecutionResult, LogStatus, NodeExecutionLog, RunState},
    runtime::{ExecutionContext, Services},
    utils,
    workflow::{
        Successor, Workflow,
        actions::{ActionContext, ActionOutput, HandlerTable, Route, TriggerAction},
        edge::Handle,
        node::Node,
        template,
    },
};

/// Resolves every string of the node config against the run context.
pub(crate) fn resolve_config(
    node: &Node,
    vars: &Vars,
) -> Vars {
    Vars::from(template::resolve_json_value(&Value::from(node.config.clone()), vars))
}

/// Outcome of dispatching one node.
enum Step {
    /// The node ran; follow the route.
    Done(Route),
    /// The node failed; the run stops.
    Failed,
}

/// Executes runs of one workflow.
pub struct Dispatcher<'a> {
    workflow: &'a Workflow,
    handlers: &'a HandlerTable,
    services: &'a Services,
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        workflow: &'a Workflow,
        handlers: &'a HandlerTable,
        services: &'a Services,
    ) -> Self {
        Self {
            workflow,
            handlers,
            services,
        }
    }

    /// Runs the workflow once for `payload`.
    ///
    /// Never fails: handler errors and panics end up as an `error` entry in
    /// the returned result.
    pub async fn run(
        &self,
        run_id: String,
        payload: Value,
    ) -> ExecutionResult {
        let workflow = self.workflow;
        let mut ctx = ExecutionContext::new(run_id, workflow.id());
        let mut logs: Vec<NodeExecutionLog> = Vec::new();

        let trigger = workflow.trigger();
        let started = self.services.clock.now();
        ctx.seed_trigger(trigger, TriggerAction::seed_payload(trigger.block_type, payload, started));
        let elapsed = utils::time::elapsed_millis(started, self.services.clock.now());
        logs.push(NodeExecutionLog::new(trigger, LogStatus::Success, TriggerAction::seed_message(trigger.block_type), started).with_duration(elapsed));
        info!(run_id = ctx.run_id(), workflow_id = ctx.workflow_id(), node_id = trigger.id, state = RunState::Running.as_ref(), "run started");

        let mut visited = HashSet::from([trigger.id]);
        let mut next = workflow.successor(trigger.id, &Handle::Next);

        loop {
            let node = match next {
                Successor::End => break,
                Successor::Missing(target) => {
                    warn!(run_id = ctx.run_id(), workflow_id = ctx.workflow_id(), target, "broken link");
                    flag_last(&mut logs, format!("broken link: node {} does not exist", target));
                    break;
                }
                Successor::Node(node) => node,
            };

            if !visited.insert(node.id) {
                warn!(run_id = ctx.run_id(), workflow_id = ctx.workflow_id(), node_id = node.id, "loop detected");
                flag_last(&mut logs, format!("loop detected: node {} was already visited", node.id));
                break;
            }

            let (entry, step) = self.dispatch(node, &mut ctx).await;
            logs.push(entry);

            next = match step {
                Step::Done(route) => self.follow(node, &route),
                Step::Failed => break,
            };
        }

        let run_id = ctx.run_id().to_string();
        let (vars, responses) = ctx.into_parts();
        let result = ExecutionResult::finish(run_id, workflow.id(), logs, responses, vars);
        info!(run_id = result.run_id.as_str(), workflow_id = result.workflow_id.as_str(), state = result.state.as_ref(), nodes = result.executed_nodes.len(), "run finished");
        result
    }

    /// Runs the handler of `node` and merges its output into the context.
    async fn dispatch(
        &self,
        node: &Node,
        ctx: &mut ExecutionContext,
    ) -> (NodeExecutionLog, Step) {
        let started = self.services.clock.now();

        let Some(handler) = self.handlers.get(node.block_type) else {
            let entry = NodeExecutionLog::new(node, LogStatus::Error, format!("no handler for block type {}", node.block_type), started);
            return (entry, Step::Failed);
        };

        let config = resolve_config(node, ctx.vars());
        let outcome = {
            let action_ctx = ActionContext {
                node,
                run: &*ctx,
                services: self.services,
            };
            AssertUnwindSafe(handler.handle(&action_ctx, config)).catch_unwind().await
        };
        let elapsed = utils::time::elapsed_millis(started, self.services.clock.now());

        let output: ActionOutput = match outcome {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => {
                error!(run_id = ctx.run_id(), workflow_id = ctx.workflow_id(), node_id = node.id, error = %err, "node failed");
                let entry = NodeExecutionLog::new(node, LogStatus::Error, err.to_string(), started).with_duration(elapsed);
                return (entry, Step::Failed);
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(run_id = ctx.run_id(), workflow_id = ctx.workflow_id(), node_id = node.id, panic = message.as_str(), "node panicked");
                let entry = NodeExecutionLog::new(node, LogStatus::Error, format!("handler panicked: {}", message), started).with_duration(elapsed);
                return (entry, Step::Failed);
            }
        };

        if output.status == LogStatus::Error {
            error!(run_id = ctx.run_id(), workflow_id = ctx.workflow_id(), node_id = node.id, message = output.message.as_str(), "node reported an error");
            let entry = NodeExecutionLog::new(node, LogStatus::Error, output.message, started).with_duration(elapsed);
            return (entry, Step::Failed);
        }

        ctx.add_output(node, output.outputs);
        for (key, value) in output.globals.iter() {
            ctx.set_global(key, value.clone());
        }
        if let Some(reply) = output.reply {
            ctx.push_response(reply);
        }

        debug!(run_id = ctx.run_id(), workflow_id = ctx.workflow_id(), node_id = node.id, status = %output.status, "node executed");
        let entry = NodeExecutionLog::new(node, output.status, output.message, started).with_duration(elapsed).with_wait_delay(output.wait_delay);
        (entry, Step::Done(output.route))
    }

    /// Picks the successor named by `route`.
    fn follow(
        &self,
        node: &Node,
        route: &Route,
    ) -> Successor<'a> {
        match route {
            Route::End => Successor::End,
            Route::Next => self.workflow.successor(node.id, &Handle::Next),
            Route::Branch {
                keys,
                fallback_next,
            } => match keys.iter().find(|k| node.branches.contains_key(k.as_str())) {
                Some(key) => self.workflow.successor(node.id, &Handle::branch(key)),
                None if *fallback_next => self.workflow.successor(node.id, &Handle::Next),
                None => Successor::End,
            },
        }
    }
}

/// Downgrades the last entry to a warning and appends `note` to its message.
fn flag_last(
    logs: &mut [NodeExecutionLog],
    note: String,
) {
    if let Some(last) = logs.last_mut() {
        if last.status == LogStatus::Success {
            last.status = LogStatus::Warning;
        }
        last.message = format!("{} ({})", last.message, note);
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
