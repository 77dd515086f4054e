use std::str::FromStr;

use chrono::DateTime;
use sea_query::{ColumnDef, Expr, Iden, Index, Order, PostgresQueryBuilder, Query, Table};
use sea_query_binder::{SqlxBinder, SqlxValues};
use sqlx::{Error as DbError, PgPool, Row, postgres::PgRow};

use crate::{
    Result,
    blocks::BlockType,
    execution::{LogStatus, NodeExecutionLog},
    store::{data::LogRecord, map_db_err},
};

use super::DbRow;

#[derive(Iden)]
#[iden = "NodeExecutionLog"]
enum LogIden {
    Table,

    Id,
    #[iden = "runId"]
    RunId,
    #[iden = "workflowId"]
    WorkflowId,
    #[iden = "nodeId"]
    NodeId,
    #[iden = "nodeType"]
    NodeType,
    #[iden = "nodeName"]
    NodeName,
    Status,
    Message,
    Duration,
    #[iden = "waitDelay"]
    WaitDelay,
    Timestamp,
}

const COLUMNS: [LogIden; 11] = [
    LogIden::Id,
    LogIden::RunId,
    LogIden::WorkflowId,
    LogIden::NodeId,
    LogIden::NodeType,
    LogIden::NodeName,
    LogIden::Status,
    LogIden::Message,
    LogIden::Duration,
    LogIden::WaitDelay,
    LogIden::Timestamp,
];

pub(super) fn schema() -> Vec<String> {
    vec![
        Table::create()
            .table(LogIden::Table)
            .if_not_exists()
            .col(ColumnDef::new(LogIden::Id).string().not_null().primary_key())
            .col(ColumnDef::new(LogIden::RunId).string().not_null())
            .col(ColumnDef::new(LogIden::WorkflowId).string().not_null())
            .col(ColumnDef::new(LogIden::NodeId).big_integer().not_null())
            .col(ColumnDef::new(LogIden::NodeType).string().not_null())
            .col(ColumnDef::new(LogIden::NodeName).string().not_null())
            .col(ColumnDef::new(LogIden::Status).string().not_null())
            .col(ColumnDef::new(LogIden::Message).text().default(""))
            .col(ColumnDef::new(LogIden::Duration).big_integer().default(0))
            .col(ColumnDef::new(LogIden::WaitDelay).big_integer().null())
            .col(ColumnDef::new(LogIden::Timestamp).big_integer().default(0))
            .build(PostgresQueryBuilder),
        Index::create()
            .name("idx_node_execution_log_workflow")
            .if_not_exists()
            .table(LogIden::Table)
            .col(LogIden::WorkflowId)
            .build(PostgresQueryBuilder),
        Index::create().name("idx_node_execution_log_run").if_not_exists().table(LogIden::Table).col(LogIden::RunId).build(PostgresQueryBuilder),
    ]
}

fn insert_query(records: &[LogRecord]) -> Result<(String, SqlxValues)> {
    let mut binding = Query::insert();
    let stmt = binding.into_table(LogIden::Table).columns(COLUMNS);

    for record in records {
        let entry = &record.entry;
        stmt.values(vec![
            record.id.clone().into(),
            record.run_id.clone().into(),
            record.workflow_id.clone().into(),
            entry.node_id.into(),
            entry.node_type.to_string().into(),
            entry.node_name.clone().into(),
            entry.status.to_string().into(),
            entry.message.clone().into(),
            (entry.duration as i64).into(),
            entry.wait_delay.map(|d| d as i64).into(),
            entry.timestamp.timestamp_millis().into(),
        ])
        .map_err(map_db_err)?;
    }

    Ok(stmt.build_sqlx(PostgresQueryBuilder))
}

pub(super) async fn insert(
    pool: &PgPool,
    records: &[LogRecord],
) -> Result<usize> {
    if records.is_empty() {
        return Ok(0);
    }
    let (sql, values) = insert_query(records)?;
    let result = sqlx::query_with(&sql, values).execute(pool).await.map_err(map_db_err)?;
    Ok(result.rows_affected() as usize)
}

pub(super) async fn list(
    pool: &PgPool,
    workflow_id: &str,
) -> Result<Vec<LogRecord>> {
    let (sql, values) = Query::select()
        .columns(COLUMNS)
        .from(LogIden::Table)
        .and_where(Expr::col(LogIden::WorkflowId).eq(workflow_id))
        .order_by(LogIden::Timestamp, Order::Asc)
        .order_by(LogIden::NodeId, Order::Asc)
        .build_sqlx(PostgresQueryBuilder);

    let rows = sqlx::query_with(&sql, values).fetch_all(pool).await.map_err(map_db_err)?;
    rows.iter().map(|row| LogRecord::from_row(row).map_err(map_db_err)).collect()
}

fn decode_err(
    column: &str,
    message: String,
) -> DbError {
    DbError::ColumnDecode {
        index: column.to_string(),
        source: message.into(),
    }
}

impl DbRow for LogRecord {
    fn from_row(row: &PgRow) -> std::result::Result<Self, DbError> {
        let node_type: String = row.try_get("nodeType")?;
        let status: String = row.try_get("status")?;
        let millis: i64 = row.try_get("timestamp")?;
        let duration: i64 = row.try_get("duration")?;
        let wait_delay: Option<i64> = row.try_get("waitDelay")?;

        Ok(Self {
            id: row.try_get("id")?,
            run_id: row.try_get("runId")?,
            workflow_id: row.try_get("workflowId")?,
            entry: NodeExecutionLog {
                node_id: row.try_get("nodeId")?,
                node_type: BlockType::from_str(&node_type).map_err(|e| decode_err("nodeType", format!("{}: {}", node_type, e)))?,
                node_name: row.try_get("nodeName")?,
                status: LogStatus::from_str(&status).map_err(|e| decode_err("status", format!("{}: {}", status, e)))?,
                message: row.try_get("message")?,
                duration: duration.max(0) as u64,
                wait_delay: wait_delay.map(|d| d.max(0) as u64),
                timestamp: DateTime::from_timestamp_millis(millis).ok_or_else(|| decode_err("timestamp", format!("out of range: {}", millis)))?,
            },
        })
    }
}
