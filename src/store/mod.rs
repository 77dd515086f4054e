//! Storage layer for automations and execution logs.
//!
//! Provides an abstraction over different storage backends:
//! - `MemStore`: In-memory storage for tests and local runs
//! - `PostgresStore`: PostgreSQL, reading the automation table of the host app

pub mod data;
mod db;

use std::error::Error;

use async_trait::async_trait;

use crate::{BlockflowError, Result, execution::ExecutionResult, model::WorkflowModel};

use data::LogRecord;

pub use db::{MemStore, PostgresStore};

/// Maps database errors to BlockflowError.
fn map_db_err(err: impl Error) -> BlockflowError {
    BlockflowError::Store(err.to_string())
}

fn not_found(workflow_id: &str) -> BlockflowError {
    BlockflowError::Store(format!("workflow {} not found", workflow_id))
}

/// Read access to stored automations.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// Finds an automation by id.
    async fn find(
        &self,
        workflow_id: &str,
    ) -> Result<WorkflowModel>;
}

/// Persistence of node execution logs. Called by the host, never by a run.
#[async_trait]
pub trait ExecutionLogStore: Send + Sync {
    /// Stores one record per executed node; returns the number stored.
    async fn save(
        &self,
        result: &ExecutionResult,
    ) -> Result<usize>;

    /// Records of a workflow, oldest first.
    async fn list(
        &self,
        workflow_id: &str,
    ) -> Result<Vec<LogRecord>>;
}

/// A backend providing both stores.
pub trait Store: WorkflowStore + ExecutionLogStore {}

impl<T: WorkflowStore + ExecutionLogStore> Store for T {}
