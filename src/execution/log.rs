use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{blocks::BlockType, workflow::node::Node};

/// Outcome of one visited node.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr, strum::Display, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LogStatus {
    Success,
    Error,
    Skipped,
    Warning,
}

/// Append-only record of a node visit.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeExecutionLog {
    pub node_id: i64,
    pub node_type: BlockType,
    pub node_name: String,
    pub status: LogStatus,
    pub message: String,
    /// milliseconds
    pub duration: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_delay: Option<u64>,
    pub timestamp: DateTime<Utc>,
}

impl NodeExecutionLog {
    pub fn new(
        node: &Node,
        status: LogStatus,
        message: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            node_id: node.id,
            node_type: node.block_type,
            node_name: node.name.clone(),
            status,
            message: message.into(),
            duration: 0,
            wait_delay: None,
            timestamp,
        }
    }

    pub fn with_duration(
        mut self,
        duration: u64,
    ) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_wait_delay(
        mut self,
        wait_delay: Option<u64>,
    ) -> Self {
        self.wait_delay = wait_delay;
        self
    }

    /// Trace line, `[STATUS] name: message`.
    pub fn line(&self) -> String {
        format!("[{}] {}: {}", self.status.as_ref().to_uppercase(), self.node_name, self.message)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn entry() -> NodeExecutionLog {
        NodeExecutionLog {
            node_id: 2,
            node_type: BlockType::Condition,
            node_name: "Check".into(),
            status: LogStatus::Skipped,
            message: "no condition matched".into(),
            duration: 3,
            wait_delay: None,
            timestamp: DateTime::parse_from_rfc3339("2026-01-02T03:04:05Z").unwrap().with_timezone(&Utc),
        }
    }

    #[test]
    fn test_line() {
        assert_eq!(entry().line(), "[SKIPPED] Check: no condition matched");
    }

    #[test]
    fn test_serialize_camel_case() {
        let value = serde_json::to_value(entry()).unwrap();
        assert_eq!(value["nodeId"], json!(2));
        assert_eq!(value["nodeType"], json!("condition"));
        assert_eq!(value["status"], json!("skipped"));
        assert_eq!(value["timestamp"], json!("2026-01-02T03:04:05Z"));
        assert!(value.get("waitDelay").is_none());
    }
}
