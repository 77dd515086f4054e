use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use async_trait::async_trait;
use tracing::debug;

use crate::{
    BlockflowError, Result, ShareLock,
    execution::ExecutionResult,
    model::WorkflowModel,
    store::{ExecutionLogStore, WorkflowStore, data::LogRecord, map_db_err, not_found},
};

/// Automations and logs kept in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemStore {
    workflows: ShareLock<HashMap<String, WorkflowModel>>,
    logs: ShareLock<Vec<LogRecord>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self {
            workflows: Arc::new(RwLock::new(HashMap::new())),
            logs: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Stores or replaces an automation. Returns true when it is new.
    pub fn deploy(
        &self,
        workflow: &WorkflowModel,
    ) -> Result<bool> {
        if workflow.id.trim().is_empty() {
            return Err(BlockflowError::Workflow("missing id in workflow".into()));
        }
        let mut workflows = self.workflows.write().map_err(map_db_err)?;
        let created = workflows.insert(workflow.id.clone(), workflow.clone()).is_none();
        debug!(workflow_id = workflow.id.as_str(), created, "workflow deployed");
        Ok(created)
    }
}

#[async_trait]
impl WorkflowStore for MemStore {
    async fn find(
        &self,
        workflow_id: &str,
    ) -> Result<WorkflowModel> {
        let workflows = self.workflows.read().map_err(map_db_err)?;
        workflows.get(workflow_id).cloned().ok_or_else(|| not_found(workflow_id))
    }
}

#[async_trait]
impl ExecutionLogStore for MemStore {
    async fn save(
        &self,
        result: &ExecutionResult,
    ) -> Result<usize> {
        let records = LogRecord::from_result(result);
        let count = records.len();
        self.logs.write().map_err(map_db_err)?.extend(records);
        Ok(count)
    }

    async fn list(
        &self,
        workflow_id: &str,
    ) -> Result<Vec<LogRecord>> {
        let logs = self.logs.read().map_err(map_db_err)?;
        Ok(logs.iter().filter(|r| r.workflow_id == workflow_id).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NodeModel;

    fn model(id: &str) -> WorkflowModel {
        WorkflowModel {
            id: id.into(),
            name: "Bot".into(),
            nodes: vec![NodeModel::new(1, "whatsapp_message", "Incoming")],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_deploy_and_find() {
        let store = MemStore::new();
        assert!(store.deploy(&model("wf-1")).unwrap());
        assert!(!store.deploy(&model("wf-1")).unwrap());
        assert_eq!(store.find("wf-1").await.unwrap().nodes.len(), 1);

        let err = store.find("nope").await.unwrap_err();
        assert_eq!(err, BlockflowError::Store("workflow nope not found".into()));
        assert!(store.deploy(&model(" ")).is_err());
    }

    #[tokio::test]
    async fn test_save_and_list() {
        let store = MemStore::new();
        let rejected = ExecutionResult::rejected("r0".into(), "wf-1", "boom");
        assert_eq!(store.save(&rejected).await.unwrap(), 0);
        assert!(store.list("wf-1").await.unwrap().is_empty());
    }
}
