use serde::{Deserialize, Serialize};

use crate::{BlockflowError, Result, model::NodeModel};

/// A stored automation: its node list plus the optional starting trigger.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowModel {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub nodes: Vec<NodeModel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_node_id: Option<i64>,
}

impl WorkflowModel {
    pub fn from_json(s: &str) -> Result<Self> {
        let workflow = serde_json::from_str::<WorkflowModel>(s);
        match workflow {
            Ok(v) => Ok(v),
            Err(e) => Err(BlockflowError::Workflow(format!("{}", e))),
        }
    }

    pub fn node(
        &self,
        id: i64,
    ) -> Option<&NodeModel> {
        self.nodes.iter().find(|n| n.id == id)
    }
}
