use sqlx::{Connection, Executor, PgConnection};
use tracing::info;
use vinyl_config::{IntoConnectOptions, PgConnectionConfig, STAGE_OPTIONS};

use crate::error::EtlResult;
use crate::extract::StagingPlan;

/// Statements that tear down and rebuild the staging namespace.
const DROP_STAGING_SCHEMA: &str = "DROP SCHEMA IF EXISTS itunes CASCADE";
const CREATE_STAGING_SCHEMA: &str = "CREATE SCHEMA itunes";
const CREATE_STAGING_INDEX: &str =
    "CREATE UNIQUE INDEX idx_itunes_itunes_id ON itunes.itunes (persistent_id)";

/// Recreates the staging area and bulk-loads the extracted records as-is.
///
/// Opens its own session, drops and recreates the staging schema, applies
/// the extraction step's table definition, constrains the external
/// persistent identifier to be unique, then executes every insert in order
/// with its values bound positionally. Any failing insert aborts the step;
/// there is no partial-success mode.
pub async fn stage(config: &PgConnectionConfig, plan: &StagingPlan) -> EtlResult<()> {
    let mut conn = PgConnection::connect_with(&config.with_db(Some(&STAGE_OPTIONS))).await?;

    conn.execute(DROP_STAGING_SCHEMA).await?;
    conn.execute(CREATE_STAGING_SCHEMA).await?;
    conn.execute(&*plan.create_table_sql).await?;
    conn.execute(CREATE_STAGING_INDEX).await?;

    for insert in &plan.inserts {
        let mut query = sqlx::query(&insert.sql);
        for param in &insert.params {
            query = query.bind(param);
        }
        query.execute(&mut conn).await?;
    }

    info!(rows = plan.inserts.len(), "staged library records");

    conn.close().await?;

    Ok(())
}
