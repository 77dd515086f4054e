use serde::{Deserialize, Serialize};

use crate::{
    execution::{ExecutionResult, NodeExecutionLog},
    utils,
};

/// A stored node execution log entry.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    pub id: String,
    pub run_id: String,
    pub workflow_id: String,
    #[serde(flatten)]
    pub entry: NodeExecutionLog,
}

impl LogRecord {
    /// One record per executed node of `result`, in visit order.
    pub fn from_result(result: &ExecutionResult) -> Vec<LogRecord> {
        result
            .executed_nodes
            .iter()
            .map(|entry| LogRecord {
                id: utils::longid(),
                run_id: result.run_id.clone(),
                workflow_id: result.workflow_id.clone(),
                entry: entry.clone(),
            })
            .collect()
    }
}
