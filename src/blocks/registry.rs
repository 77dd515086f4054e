use std::{collections::HashMap, str::FromStr};

use tracing::debug;

use crate::{BlockflowError, Result};

use super::{BlockCategory, BlockConfig, BlockType, definitions};

/// Catalog of block definitions, keyed by block type.
#[derive(Debug, Clone)]
pub struct BlockRegistry {
    blocks: Vec<BlockConfig>,
    index: HashMap<BlockType, usize>,
}

impl BlockRegistry {
    /// Builds a registry from a list of definitions.
    ///
    /// Fails if two definitions share the same type.
    pub fn new(blocks: Vec<BlockConfig>) -> Result<Self> {
        let mut index = HashMap::with_capacity(blocks.len());
        for (i, block) in blocks.iter().enumerate() {
            if index.insert(block.block_type, i).is_some() {
                return Err(BlockflowError::Block(format!("block type '{}' is registered twice", block.block_type)));
            }
        }
        debug!(count = blocks.len(), "block registry built");

        Ok(Self {
            blocks,
            index,
        })
    }

    /// The built-in catalog.
    pub fn standard() -> Result<Self> {
        Self::new(definitions::all())
    }

    pub fn get(
        &self,
        block_type: BlockType,
    ) -> Option<&BlockConfig> {
        self.index.get(&block_type).map(|i| &self.blocks[*i])
    }

    /// Looks a block up by its string identifier.
    pub fn get_block(
        &self,
        block_type: &str,
    ) -> Result<&BlockConfig> {
        BlockType::from_str(block_type)
            .ok()
            .and_then(|t| self.get(t))
            .ok_or_else(|| BlockflowError::Block(format!("block type '{}' is not registered", block_type)))
    }

    pub fn list_blocks(&self) -> impl Iterator<Item = &BlockConfig> {
        self.blocks.iter()
    }

    pub fn by_category(
        &self,
        category: BlockCategory,
    ) -> Vec<&BlockConfig> {
        self.blocks.iter().filter(|b| b.category == category).collect()
    }

    pub fn types(&self) -> impl Iterator<Item = BlockType> + '_ {
        self.blocks.iter().map(|b| b.block_type)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_standard_registry_covers_every_type() {
        let registry = BlockRegistry::standard().unwrap();
        for ty in BlockType::iter() {
            assert!(registry.get(ty).is_some(), "missing definition for {}", ty);
        }
        assert_eq!(registry.len(), BlockType::iter().count());
    }

    #[test]
    fn test_get_block_by_name() {
        let registry = BlockRegistry::standard().unwrap();
        let block = registry.get_block("condition").unwrap();
        assert_eq!(block.block_type, BlockType::Condition);
        assert!(block.sub_block("evaluationMode").is_some());
    }

    #[test]
    fn test_get_block_not_found() {
        let registry = BlockRegistry::standard().unwrap();
        let err = registry.get_block("send_fax").unwrap_err();
        assert!(err.to_string().contains("send_fax"));
    }

    #[test]
    fn test_duplicate_type_is_rejected() {
        let mut blocks = definitions::all();
        blocks.push(blocks[0].clone());
        assert!(BlockRegistry::new(blocks).is_err());
    }

    #[test]
    fn test_by_category() {
        let registry = BlockRegistry::standard().unwrap();
        let triggers = registry.by_category(BlockCategory::Triggers);
        assert_eq!(triggers.len(), 3);
        assert!(triggers.iter().all(|b| b.is_trigger() && b.block_type.is_trigger()));
    }
}
