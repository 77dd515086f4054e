//! Block catalog: the static description of every block a workflow can use.
//!
//! A [`BlockConfig`] declares the configurable fields of a block (its
//! sub-blocks) and its typed input/output ports. The catalog is built once at
//! startup and never changes at runtime.

mod definitions;
mod registry;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::warn;

use crate::{BlockflowError, Result, common::Vars};

pub use registry::BlockRegistry;

/// Accepted spellings of a condition rule operator, aliases included.
pub const CONDITION_OPERATORS: &[&str] = &[
    "equals", "eq", "not_equals", "ne", "contains", "not_contains", "starts_with", "starts", "ends_with", "ends", "is_empty", "is_not_empty", "matches",
    "greater_than", "gt", "less_than", "lt", "greater_or_equal", "ge", "less_or_equal", "le",
];

/// Closed set of block kinds known to the engine.
#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, strum::AsRefStr, strum::Display, strum::EnumString, strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BlockType {
    WhatsappMessage,
    Webhook,
    Scheduled,
    Condition,
    Switch,
    Keyword,
    Delay,
    SetVariable,
    EndFlow,
    GptAnalyze,
    GptRespond,
    SendText,
    SendImage,
    HttpRequest,
}

impl BlockType {
    /// Trigger blocks start a run; they are seeded, never dispatched.
    pub fn is_trigger(&self) -> bool {
        matches!(self, BlockType::WhatsappMessage | BlockType::Webhook | BlockType::Scheduled)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BlockCategory {
    Triggers,
    Messages,
    Ai,
    Logic,
    Tools,
}

/// Value type carried by a block port.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ParamType {
    String,
    Number,
    Boolean,
    Array,
    Object,
    Json,
    Any,
}

/// Editor widget of a configurable field; also decides the accepted JSON type.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum SubBlockKind {
    ShortInput,
    LongInput,
    NumberInput,
    Dropdown,
    Switch,
    ConditionInput,
    VariablesInput,
    KeyValue,
}

/// A configurable field of a block.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SubBlockConfig {
    pub id: &'static str,
    pub title: &'static str,
    #[serde(rename = "type")]
    pub kind: SubBlockKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    pub required: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<&'static str>,
}

impl SubBlockConfig {
    pub fn new(
        id: &'static str,
        title: &'static str,
        kind: SubBlockKind,
    ) -> Self {
        Self {
            id,
            title,
            kind,
            default_value: None,
            required: false,
            options: Vec::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value<T: Into<Value>>(
        mut self,
        value: T,
    ) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn options(
        mut self,
        options: &[&'static str],
    ) -> Self {
        self.options = options.to_vec();
        self
    }

    /// JSON schema fragment for this field.
    fn schema(&self) -> Value {
        match self.kind {
            SubBlockKind::ShortInput | SubBlockKind::LongInput => json!({ "type": "string" }),
            SubBlockKind::NumberInput => json!({ "type": ["number", "string"] }),
            SubBlockKind::Dropdown => json!({ "type": "string", "enum": self.options }),
            SubBlockKind::Switch => json!({ "type": "boolean" }),
            SubBlockKind::ConditionInput => json!({
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "string" },
                        "field": { "type": "string" },
                        "operator": { "type": "string", "enum": CONDITION_OPERATORS },
                        "caseSensitive": { "type": "boolean" }
                    },
                    "required": ["field", "operator"]
                }
            }),
            SubBlockKind::VariablesInput => json!({
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": { "name": { "type": "string" } },
                    "required": ["name"]
                }
            }),
            SubBlockKind::KeyValue => json!({
                "type": "object",
                "additionalProperties": { "type": "string" }
            }),
        }
    }
}

/// A named, typed input or output port.
#[derive(Serialize, Debug, Clone)]
pub struct Port {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub ty: ParamType,
    pub description: &'static str,
}

impl Port {
    pub fn new(
        name: &'static str,
        ty: ParamType,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            ty,
            description,
        }
    }
}

/// Registry entry describing one block type.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BlockConfig {
    #[serde(rename = "type")]
    pub block_type: BlockType,
    pub name: &'static str,
    pub description: &'static str,
    pub category: BlockCategory,
    pub sub_blocks: Vec<SubBlockConfig>,
    pub inputs: Vec<Port>,
    pub outputs: Vec<Port>,
}

impl BlockConfig {
    pub fn sub_block(
        &self,
        id: &str,
    ) -> Option<&SubBlockConfig> {
        self.sub_blocks.iter().find(|s| s.id == id)
    }

    pub fn is_trigger(&self) -> bool {
        self.category == BlockCategory::Triggers
    }

    /// JSON schema of a node config for this block, derived from the sub-blocks.
    pub fn schema(&self) -> Value {
        let properties: Map<String, Value> = self.sub_blocks.iter().map(|s| (s.id.to_string(), s.schema())).collect();
        let required: Vec<&str> = self.sub_blocks.iter().filter(|s| s.required).map(|s| s.id).collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Validates a raw node config and fills in sub-block defaults.
    ///
    /// Unknown keys are kept but reported with a warning.
    pub fn prepare_config(
        &self,
        node_id: i64,
        config: &Value,
    ) -> Result<Vars> {
        let Value::Object(raw) = config else {
            return Err(BlockflowError::node(node_id, self.block_type.as_ref(), "config must be a JSON object"));
        };

        for key in raw.keys() {
            if self.sub_block(key).is_none() {
                warn!(node_id, block = self.block_type.as_ref(), key = key.as_str(), "unknown config key");
            }
        }

        let mut prepared = Vars::from(raw.clone());
        for sub in &self.sub_blocks {
            if prepared.contains_key(sub.id) {
                continue;
            }
            if let Some(default) = &sub.default_value {
                prepared.set(sub.id, default.clone());
            }
        }

        let instance: Value = prepared.clone().into();
        jsonschema::validate(&self.schema(), &instance).map_err(|e| BlockflowError::node(node_id, self.block_type.as_ref(), e.to_string()))?;

        Ok(prepared)
    }
}
