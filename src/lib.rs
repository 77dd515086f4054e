//! # Blockflow
//!
//! Blockflow is an embeddable engine for block-based chat automations.
//! An automation is a list of blocks (a trigger, conditions, routing, AI
//! analysis, messaging, HTTP calls) linked into a graph by a visual builder.
//!
//! ## Core Features
//!
//! - **Block Registry**: Every block type declares its config fields, validated with JSON Schema
//! - **Variable Resolver**: `{{path}}` and `<block.field>` references resolved against the run context
//! - **Sequential Runs**: One log entry per visited node; branches not taken are never evaluated
//! - **Pluggable Services**: Classifier, messenger, clock and session memory are supplied by the host
//! - **Pluggable Storage**: In-memory storage (testing) and PostgreSQL (production)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use blockflow::{EngineBuilder, MemStore, WorkflowModel};
//!
//! let store = Arc::new(MemStore::new());
//! store.deploy(&WorkflowModel::from_json(json_str)?)?;
//!
//! let engine = EngineBuilder::new().store(store).build()?;
//! let result = engine.run_workflow("wf-1", json!({"message": "Bonjour", "from": "+225"})).await;
//! assert!(result.success);
//! ```

pub mod blocks;
mod builder;
mod common;
mod config;
mod dispatcher;
mod engine;
mod error;
pub mod execution;
mod model;
pub mod runtime;
pub mod store;
mod utils;
pub mod workflow;

#[cfg(test)]
mod testing;

use std::sync::{Arc, RwLock};

pub use builder::EngineBuilder;
pub use common::Vars;
pub use config::{Config, EngineConfig, PostgresConfig, SessionConfig, StoreConfig, StoreType};
pub use engine::Engine;
pub use error::BlockflowError;
pub use execution::{ExecutionResult, LogStatus, NodeExecutionLog, RunState};
pub use model::*;
pub use store::{MemStore, PostgresStore};
pub use workflow::Workflow;

/// Result type alias for Blockflow operations.
pub type Result<T> = std::result::Result<T, BlockflowError>;

/// Thread-safe shared lock wrapper using Arc<RwLock<T>>.
pub(crate) type ShareLock<T> = Arc<RwLock<T>>;
