use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    BlockflowError, Result,
    model::{NodeModel, WorkflowModel},
};

/// A row of the automation table.
///
/// `nodes` is the JSON node list saved by the editor, sometimes stored as a
/// JSON string.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Automation {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub nodes: Value,
}

impl Automation {
    pub fn into_model(self) -> Result<WorkflowModel> {
        let nodes = match self.nodes {
            Value::String(text) => serde_json::from_str::<Vec<NodeModel>>(&text),
            value => serde_json::from_value::<Vec<NodeModel>>(value),
        }
        .map_err(|e| BlockflowError::Workflow(format!("automation {} has invalid nodes: {}", self.id, e)))?;

        Ok(WorkflowModel {
            id: self.id,
            name: self.name,
            description: self.description.unwrap_or_default(),
            nodes,
            trigger_node_id: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_nodes_as_json_or_text() {
        let nodes = json!([{"id": 1, "type": "whatsapp_message", "name": "Incoming", "config": "{}"}]);
        let row = Automation {
            id: "a1".into(),
            name: "Bot".into(),
            description: None,
            nodes: nodes.clone(),
        };
        assert_eq!(row.into_model().unwrap().nodes.len(), 1);

        let row = Automation {
            id: "a1".into(),
            name: "Bot".into(),
            description: Some("desc".into()),
            nodes: Value::String(nodes.to_string()),
        };
        let model = row.into_model().unwrap();
        assert_eq!(model.description, "desc");
        assert_eq!(model.nodes[0].node_type, "whatsapp_message");
    }

    #[test]
    fn test_invalid_nodes() {
        let row = Automation {
            id: "a2".into(),
            name: "Bot".into(),
            description: None,
            nodes: json!({"not": "a list"}),
        };
        let err = row.into_model().unwrap_err();
        assert!(err.to_string().contains("automation a2"));
    }
}
