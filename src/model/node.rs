use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{BlockflowError, Result};

/// A node as stored by the automation builder.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeModel {
    pub id: i64,
    #[serde(rename = "type")]
    pub node_type: String,
    pub name: String,
    /// Either a serialized JSON object or an inline one.
    #[serde(default)]
    pub config: Value,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connected_to: Option<i64>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub branches: HashMap<String, i64>,
}

impl NodeModel {
    pub fn new(
        id: i64,
        node_type: &str,
        name: &str,
    ) -> Self {
        Self {
            id,
            node_type: node_type.to_string(),
            name: name.to_string(),
            config: Value::Object(Map::new()),
            ..Default::default()
        }
    }

    pub fn with_config(
        mut self,
        config: Value,
    ) -> Self {
        self.config = config;
        self
    }

    pub fn connect(
        mut self,
        target: i64,
    ) -> Self {
        self.connected_to = Some(target);
        self
    }

    pub fn branch(
        mut self,
        key: &str,
        target: i64,
    ) -> Self {
        self.branches.insert(key.to_string(), target);
        self
    }

    pub fn at(
        mut self,
        x: f64,
        y: f64,
    ) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    /// The decoded config. An empty string or null decodes to `{}`.
    pub fn config_value(&self) -> Result<Value> {
        match &self.config {
            Value::Null => Ok(Value::Object(Map::new())),
            Value::String(s) if s.trim().is_empty() => Ok(Value::Object(Map::new())),
            Value::String(s) => {
                serde_json::from_str(s).map_err(|e| BlockflowError::node(self.id, self.node_type.as_str(), format!("config is not valid JSON: {}", e)))
            }
            v => Ok(v.clone()),
        }
    }

    /// Default successor; negative ids mean "disconnected".
    pub fn next(&self) -> Option<i64> {
        self.connected_to.filter(|id| *id >= 0)
    }
}
