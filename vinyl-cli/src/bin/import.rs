//! One-shot import job: library export file to normalized Postgres schema.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use vinyl_config::PgConnectionConfig;
use vinyl_etl::import::{ImportConfig, run_import};
use vinyl_etl::EtlResult;
use vinyl_telemetry::tracing::init_tracing;

#[derive(Parser, Debug)]
#[command(name = "vinyl-import")]
#[command(about = "Import a music-library export into a normalized Postgres schema")]
struct Args {
    /// Path to the library XML file.
    #[arg(
        long,
        default_value = "/Users/stephan/Music/iTunes/iTunes Music Library.xml"
    )]
    library: PathBuf,

    /// Name of the Postgres database.
    #[arg(long = "db", short = 'd', default_value = "music")]
    database: String,

    /// Local database port.
    #[arg(long, short = 'p', default_value = "5432")]
    port: u16,

    /// Name of the database schema receiving the normalized tables.
    #[arg(long, short = 's', default_value = "public")]
    schema: String,

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

    info!(
        database = %args.database,
        port = args.port,
        user = %args.user,
        schema = %args.schema,
        "importing library into database"
    );

    let config = ImportConfig {
        library_path: args.library,
        connection: PgConnectionConfig {
            host: "localhost".to_string(),
            port: args.port,
            name: args.database,
            username: args.user,
            password: Some(args.password.into()),
        },
        schema: args.schema,
    };

    run_import(&config).await
}
