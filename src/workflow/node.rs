use std::collections::HashMap;

use serde::Serialize;

use crate::{
    BlockflowError, Result,
    blocks::{BlockRegistry, BlockType},
    common::Vars,
    model::NodeModel,
};

/// node id
pub type NodeId = i64;

/// A validated node, ready to be dispatched.
///
/// `config` holds the raw (unresolved) config with sub-block defaults filled in.
#[derive(Serialize, Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub block_type: BlockType,
    pub name: String,
    pub config: Vars,
    pub next: Option<NodeId>,
    pub branches: HashMap<String, NodeId>,
    /// Horizontal position, only used to pick the default trigger.
    pub x: f64,
}

impl Node {
    /// Checks the node against its block definition.
    ///
    /// Fails with a node-scoped error on unknown block types, undecodable
    /// configs and configs that break the block schema.
    pub fn new(
        model: &NodeModel,
        registry: &BlockRegistry,
    ) -> Result<Self> {
        let block = registry.get_block(&model.node_type).map_err(|e| BlockflowError::node(model.id, model.node_type.as_str(), e.to_string()))?;
        let raw = model.config_value()?;
        let config = block.prepare_config(model.id, &raw)?;

        Ok(Self {
            id: model.id,
            block_type: block.block_type,
            name: model.name.clone(),
            config,
            next: model.next(),
            branches: model.branches.iter().filter(|(_, target)| **target >= 0).map(|(k, v)| (k.clone(), *v)).collect(),
            x: model.x,
        })
    }

    pub fn is_trigger(&self) -> bool {
        self.block_type.is_trigger()
    }
}
