use plist::{Dictionary, Value};
use rand::Rng;
use sqlx::{Connection, Executor, PgConnection, PgPool};
use vinyl_config::{IntoConnectOptions, PgConnectionConfig};
use vinyl_etl::library::Library;

/// Builds connection parameters for an isolated test database.
///
/// Each invocation generates a unique database name so concurrently running
/// tests never see each other's data. Host and credentials target a local
/// Postgres instance with default superuser credentials.
pub fn test_pg_config() -> PgConnectionConfig {
    let suffix: u32 = rand::thread_rng().gen();

    PgConnectionConfig {
        host: "localhost".to_string(),
        port: 5432,
        name: format!("vinyl_test_{suffix:08x}"),
        username: "postgres".to_string(),
        password: Some("postgres".to_string().into()),
    }
}

/// Creates the test database named by `config` and returns a pool connected
/// to it.
///
/// # Panics
/// Panics if connection or database creation fails.
pub async fn create_pg_database(config: &PgConnectionConfig) -> PgPool {
    let mut connection = PgConnection::connect_with(&config.without_db(None))
        .await
        .expect("Failed to connect to Postgres");
    connection
        .execute(&*format!(r#"create database "{}";"#, config.name))
        .await
        .expect("Failed to create database");

    PgPool::connect_with(config.with_db(None))
        .await
        .expect("Failed to connect to Postgres")
}

/// Drops the test database named by `config`, terminating any remaining
/// connections first.
///
/// Logs and continues on errors so cleanup never fails a test that already
/// passed.
pub async fn drop_pg_database(config: &PgConnectionConfig) {
    let mut connection = match PgConnection::connect_with(&config.without_db(None)).await {
        Ok(conn) => conn,
        Err(e) => {
            eprintln!("warning: failed to connect to Postgres for cleanup: {e}");
            return;
        }
    };

    if let Err(e) = connection
        .execute(&*format!(
            "select pg_terminate_backend(pg_stat_activity.pid) \
             from pg_stat_activity \
             where pg_stat_activity.datname = '{}' \
             and pid <> pg_backend_pid();",
            config.name
        ))
        .await
    {
        eprintln!(
            "warning: failed to terminate connections for database {}: {}",
            config.name, e
        );
    }

    if let Err(e) = connection
        .execute(&*format!(r#"drop database if exists "{}";"#, config.name))
        .await
    {
        eprintln!("warning: failed to drop database {}: {}", config.name, e);
    }
}

/// Builds a track record carrying every field the normalization passes read,
/// so the staged table always has the full column set.
pub fn full_track(name: &str, artist: &str, album: &str, year: i64, persistent_id: &str) -> Value {
    let mut track = Dictionary::new();
    track.insert("Name".to_string(), Value::String(name.to_string()));
    track.insert("Artist".to_string(), Value::String(artist.to_string()));
    track.insert("Album".to_string(), Value::String(album.to_string()));
    track.insert("Year".to_string(), Value::Integer(year.into()));
    track.insert(
        "Persistent ID".to_string(),
        Value::String(persistent_id.to_string()),
    );
    track.insert("Total Time".to_string(), Value::Integer(185000i64.into()));
    track.insert("Track Number".to_string(), Value::Integer(1i64.into()));
    track.insert("Play Count".to_string(), Value::Integer(5i64.into()));
    track.insert(
        "Play Date UTC".to_string(),
        Value::String("2019-06-01T10:00:00Z".to_string()),
    );
    track.insert(
        "Date Added".to_string(),
        Value::String("2019-01-05T08:00:00Z".to_string()),
    );
    Value::Dictionary(track)
}

/// Wraps tracks keyed by their library identifier into a decoded library.
pub fn library_of(tracks: Vec<(&str, Value)>) -> Library {
    let mut dict = Dictionary::new();
    for (id, track) in tracks {
        dict.insert(id.to_string(), track);
    }
    Library::from_tracks(dict)
}
