//! PostgreSQL backend.
//!
//! Automations are read from the `Automation` table owned by the host
//! application; node execution logs go to `NodeExecutionLog`.

mod automation;
mod log;

use std::time::Duration;

use async_trait::async_trait;
use sqlx::{
    Error as DbError, PgPool,
    postgres::{PgPoolOptions, PgRow},
};
use tracing::info;

use crate::{
    Result,
    execution::ExecutionResult,
    model::WorkflowModel,
    store::{ExecutionLogStore, WorkflowStore, data::LogRecord, map_db_err},
};

trait DbRow {
    fn from_row(row: &PgRow) -> std::result::Result<Self, DbError>
    where
        Self: Sized;
}

#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    const MAX_CONNECTIONS: u32 = 10;
    const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

    /// Creates the pool; connections are opened on first use.
    pub fn connect_lazy(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(Self::MAX_CONNECTIONS)
            .acquire_timeout(Self::ACQUIRE_TIMEOUT)
            .connect_lazy(database_url)
            .map_err(map_db_err)?;
        Ok(Self {
            pool,
        })
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self {
            pool,
        }
    }

    /// Creates the execution log table and its indexes when missing.
    pub async fn init(&self) -> Result<()> {
        for sql in log::schema() {
            sqlx::query(&sql).execute(&self.pool).await.map_err(map_db_err)?;
        }
        info!("execution log table ready");
        Ok(())
    }
}

#[async_trait]
impl WorkflowStore for PostgresStore {
    async fn find(
        &self,
        workflow_id: &str,
    ) -> Result<WorkflowModel> {
        automation::find(&self.pool, workflow_id).await
    }
}

#[async_trait]
impl ExecutionLogStore for PostgresStore {
    async fn save(
        &self,
        result: &ExecutionResult,
    ) -> Result<usize> {
        let records = LogRecord::from_result(result);
        log::insert(&self.pool, &records).await
    }

    async fn list(
        &self,
        workflow_id: &str,
    ) -> Result<Vec<LogRecord>> {
        log::list(&self.pool, workflow_id).await
    }
}
