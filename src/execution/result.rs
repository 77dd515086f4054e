use serde::{Deserialize, Serialize};

use crate::{
    common::Vars,
    execution::{LogStatus, NodeExecutionLog},
};

/// Joins the texts sent during a run into a single reply.
pub const RESPONSE_SEPARATOR: &str = "\n\n---\n\n";

/// Lifecycle of a run: `Idle` until the trigger is seeded, `Running` while
/// nodes are dispatched, then one of the terminal states.
///
/// A run executes within a single call, so an [`ExecutionResult`] only ever
/// carries a terminal state; `Running` only shows up in the run traces.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunState {
    #[default]
    Idle,
    Running,
    Succeeded,
    Failed,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Succeeded | RunState::Failed)
    }
}

/// What a run hands back to its caller.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub run_id: String,
    pub workflow_id: String,
    pub state: RunState,
    pub success: bool,
    pub executed_nodes: Vec<NodeExecutionLog>,
    pub logs: Vec<String>,
    /// Texts sent to the contact, in order.
    pub responses: Vec<String>,
    pub context: Vars,
}

impl ExecutionResult {
    /// Builds the result of a run that reached a terminal state.
    pub fn finish(
        run_id: String,
        workflow_id: &str,
        executed_nodes: Vec<NodeExecutionLog>,
        responses: Vec<String>,
        context: Vars,
    ) -> Self {
        let success = !executed_nodes.iter().any(|l| l.status == LogStatus::Error);
        let logs = executed_nodes.iter().map(NodeExecutionLog::line).collect();

        Self {
            run_id,
            workflow_id: workflow_id.to_string(),
            state: if success { RunState::Succeeded } else { RunState::Failed },
            success,
            executed_nodes,
            logs,
            responses,
            context,
        }
    }

    /// A run that never started, e.g. the workflow could not be loaded.
    pub fn rejected(
        run_id: String,
        workflow_id: &str,
        reason: &str,
    ) -> Self {
        Self {
            run_id,
            workflow_id: workflow_id.to_string(),
            state: RunState::Failed,
            success: false,
            executed_nodes: Vec::new(),
            logs: vec![format!("[ERROR] System: {}", reason)],
            responses: Vec::new(),
            context: Vars::new(),
        }
    }

    /// All responses as one message.
    pub fn response(&self) -> String {
        self.responses.join(RESPONSE_SEPARATOR)
    }

    pub fn statuses(&self) -> Vec<LogStatus> {
        self.executed_nodes.iter().map(|l| l.status).collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::blocks::BlockType;

    fn log(status: LogStatus) -> NodeExecutionLog {
        NodeExecutionLog {
            node_id: 1,
            node_type: BlockType::SendText,
            node_name: "Reply".into(),
            status,
            message: "m".into(),
            duration: 0,
            wait_delay: None,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_finish_success() {
        let result = ExecutionResult::finish("r".into(), "wf", vec![log(LogStatus::Success), log(LogStatus::Warning)], vec![], Vars::new());
        assert!(result.success);
        assert_eq!(result.state, RunState::Succeeded);
        assert_eq!(result.logs, vec!["[SUCCESS] Reply: m", "[WARNING] Reply: m"]);
    }

    #[test]
    fn test_finish_failure() {
        let result = ExecutionResult::finish("r".into(), "wf", vec![log(LogStatus::Success), log(LogStatus::Error)], vec![], Vars::new());
        assert!(!result.success);
        assert_eq!(result.state, RunState::Failed);
        assert!(result.state.is_terminal());
    }

    #[test]
    fn test_terminal_states() {
        assert!(!RunState::default().is_terminal());
        assert!(!RunState::Running.is_terminal());
        assert!(RunState::Succeeded.is_terminal());
        assert_eq!(RunState::Running.as_ref(), "running");
    }

    #[test]
    fn test_rejected() {
        let result = ExecutionResult::rejected("r".into(), "missing", "workflow 'missing' not found");
        assert!(!result.success);
        assert!(result.executed_nodes.is_empty());
        assert_eq!(result.logs, vec!["[ERROR] System: workflow 'missing' not found"]);
        assert!(result.state.is_terminal());
    }

    #[test]
    fn test_response_join() {
        let mut result = ExecutionResult::finish("r".into(), "wf", vec![], vec!["a".into(), "b".into()], Vars::new());
        assert_eq!(result.response(), "a\n\n---\n\nb");
        result.responses.clear();
        assert_eq!(result.response(), "");
    }
}
