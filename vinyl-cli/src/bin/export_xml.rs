//! One-shot structured playlist export job.
//!
//! Exports a curated view of the imported library as a property-list
//! playlist file consumable by media players.

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use vinyl_config::{LibraryMetadata, PgConnectionConfig};
use vinyl_etl::export::xml;
use vinyl_etl::EtlResult;
use vinyl_telemetry::tracing::init_tracing;

#[derive(Parser, Debug)]
#[command(name = "vinyl-export-xml")]
#[command(about = "Export a playlist view as a structured property-list file")]
struct Args {
    /// Name of the Postgres database.
    #[arg(long = "db", short = 'd', default_value = "music")]
    database: String,

    /// Playlist name; also the output file name.
    #[arg(long, short = 'n', default_value = "Top 2019")]
    name: String,

    /// Table or view to export as a playlist.
    #[arg(long, short = 'v', default_value = "year_2019")]
    view: String,

    /// Database port.
    #[arg(long, short = 'p', default_value = "4359")]
    port: u16,

    /// Postgres username.
    #[arg(long, short = 'u', default_value = "postgres")]
    user: String,

    /// Postgres password.
    #[arg(long = "pass", short = 'x', default_value = "postgres")]
    password: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing(env!("CARGO_BIN_NAME")).expect("failed to initialize tracing");

    if let Err(err) = run().await {
        error!("{err}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn run() -> EtlResult<()> {
    let args = Args::parse();

    let config = PgConnectionConfig {
        host: "localhost".to_string(),
        port: args.port,
        name: args.database,
        username: args.user,
        password: Some(args.password.into()),
    };

    info!(view = %args.view, playlist = %args.name, "exporting structured playlist");

    xml::export_xml(&config, &args.view, &args.name, &LibraryMetadata::default()).await
}
