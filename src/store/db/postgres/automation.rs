use sea_query::{Expr, Iden, PostgresQueryBuilder, Query};
use sea_query_binder::{SqlxBinder, SqlxValues};
use sqlx::{Error as DbError, PgPool, Row, postgres::PgRow};

use crate::{
    Result,
    model::WorkflowModel,
    store::{data::Automation, map_db_err, not_found},
};

use super::DbRow;

#[derive(Iden)]
#[iden = "Automation"]
enum AutomationIden {
    Table,

    Id,
    Name,
    Description,
    Nodes,
}

fn find_query(workflow_id: &str) -> (String, SqlxValues) {
    Query::select()
        .columns([AutomationIden::Id, AutomationIden::Name, AutomationIden::Description, AutomationIden::Nodes])
        .from(AutomationIden::Table)
        .and_where(Expr::col(AutomationIden::Id).eq(workflow_id))
        .build_sqlx(PostgresQueryBuilder)
}

pub(super) async fn find(
    pool: &PgPool,
    workflow_id: &str,
) -> Result<WorkflowModel> {
    let (sql, values) = find_query(workflow_id);
    let row = sqlx::query_with(&sql, values).fetch_optional(pool).await.map_err(map_db_err)?;
    let row = row.ok_or_else(|| not_found(workflow_id))?;
    Automation::from_row(&row).map_err(map_db_err)?.into_model()
}

impl DbRow for Automation {
    fn from_row(row: &PgRow) -> std::result::Result<Self, DbError> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            nodes: row.try_get("nodes")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_query() {
        let (sql, _) = find_query("a1");
        assert!(sql.contains(r#"FROM "Automation""#));
        assert!(sql.contains(r#""nodes""#));
        assert!(sql.contains(r#""id" = $1"#));
    }
}
