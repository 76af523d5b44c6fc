use std::path::PathBuf;

use tracing::info;
use vinyl_config::PgConnectionConfig;

use crate::error::EtlResult;
use crate::{extract, library, normalize, stage};

/// Configuration for one import run.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// Path to the library export file.
    pub library_path: PathBuf,
    /// Target database connection.
    pub connection: PgConnectionConfig,
    /// Schema receiving the normalized tables.
    pub schema: String,
}

/// Runs the full import pipeline: extract, stage, normalize.
///
/// Each database step opens, commits and closes its own session; there is no
/// cross-step transactionality. If normalization fails partway, the staged
/// data remains committed and the run can simply be repeated: the DDL and
/// all transformation passes are idempotent.
pub async fn run_import(config: &ImportConfig) -> EtlResult<()> {
    info!(path = %config.library_path.display(), "parsing library file");
    let library = library::load(&config.library_path)?;

    info!("extracting track data from library");
    let plan = extract::extract_tracks(&library)?;

    info!("importing data into staging schema");
    stage::stage(&config.connection, &plan).await?;

    info!(schema = %config.schema, "creating the normalized tables");
    normalize::create_schema(&config.connection, &config.schema).await?;

    info!("migrating data into the normalized tables");
    normalize::normalize(&config.connection, &config.schema).await?;

    Ok(())
}
