//! One-shot playlist export job.
//!
//! Exports a curated view of the imported library as a playlist file,
//! dispatching on the requested format. Plain-text (`M3U`) is the default;
//! `XML` produces the structured property-list variant. Anything else is
//! rejected before any database work starts.

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use vinyl_config::{LibraryMetadata, PgConnectionConfig};
use vinyl_etl::export::{m3u, xml};
use vinyl_etl::{EtlError, EtlResult};
use vinyl_telemetry::tracing::init_tracing;

#[derive(Parser, Debug)]
#[command(name = "vinyl-export-m3u")]
#[command(about = "Export a playlist view from the imported library")]
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

    /// Playlist file format (M3U or XML).
    #[arg(long, short = 'f', default_value = "M3U")]
    format: String,

    /// Open the finished playlist with the platform player, then delete it.
    #[arg(long)]
    open: bool,
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

    info!(
        view = %args.view,
        playlist = %args.name,
        format = %args.format,
        "exporting playlist"
    );

    match args.format.as_str() {
        "M3U" => m3u::export_m3u(&config, &args.view, &args.name, args.open).await,
        "XML" => {
            xml::export_xml(&config, &args.view, &args.name, &LibraryMetadata::default()).await
        }
        other => Err(EtlError::UnsupportedFormat(other.to_string())),
    }
}
