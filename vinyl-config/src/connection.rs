use std::sync::LazyLock;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sqlx::postgres::{PgConnectOptions, PgSslMode};

/// Common Postgres session settings shared across all vinyl connection types.
const COMMON_DATESTYLE: &str = "ISO";
const COMMON_CLIENT_ENCODING: &str = "UTF8";
const COMMON_TIMEZONE: &str = "UTC";

const APP_NAME_STAGE: &str = "vinyl_stage";
const APP_NAME_NORMALIZE: &str = "vinyl_normalize";
const APP_NAME_EXPORT: &str = "vinyl_export";

/// Session options for the staging step, which bulk-loads one statement per track.
pub static STAGE_OPTIONS: LazyLock<PgConnectionOptions> = LazyLock::new(|| PgConnectionOptions {
    datestyle: COMMON_DATESTYLE.to_string(),
    client_encoding: COMMON_CLIENT_ENCODING.to_string(),
    timezone: COMMON_TIMEZONE.to_string(),
    statement_timeout: 60_000,
    lock_timeout: 10_000,
    application_name: APP_NAME_STAGE.to_string(),
});

/// Session options for the normalization step, which runs set-based passes
/// over the whole staging table.
pub static NORMALIZE_OPTIONS: LazyLock<PgConnectionOptions> =
    LazyLock::new(|| PgConnectionOptions {
        datestyle: COMMON_DATESTYLE.to_string(),
        client_encoding: COMMON_CLIENT_ENCODING.to_string(),
        timezone: COMMON_TIMEZONE.to_string(),
        statement_timeout: 300_000,
        lock_timeout: 10_000,
        application_name: APP_NAME_NORMALIZE.to_string(),
    });

/// Session options for the read-only playlist export queries.
pub static EXPORT_OPTIONS: LazyLock<PgConnectionOptions> = LazyLock::new(|| PgConnectionOptions {
    datestyle: COMMON_DATESTYLE.to_string(),
    client_encoding: COMMON_CLIENT_ENCODING.to_string(),
    timezone: COMMON_TIMEZONE.to_string(),
    statement_timeout: 60_000,
    lock_timeout: 5_000,
    application_name: APP_NAME_EXPORT.to_string(),
});

/// Per-session Postgres options applied when a pipeline step opens its
/// connection.
#[derive(Debug, Clone)]
pub struct PgConnectionOptions {
    pub datestyle: String,
    pub client_encoding: String,
    pub timezone: String,
    pub statement_timeout: u32,
    pub lock_timeout: u32,
    pub application_name: String,
}

impl PgConnectionOptions {
    pub fn to_key_value_pairs(&self) -> Vec<(String, String)> {
        vec![
            ("datestyle".to_string(), self.datestyle.clone()),
            ("client_encoding".to_string(), self.client_encoding.clone()),
            ("timezone".to_string(), self.timezone.clone()),
            (
                "statement_timeout".to_string(),
                self.statement_timeout.to_string(),
            ),
            ("lock_timeout".to_string(), self.lock_timeout.to_string()),
            (
                "application_name".to_string(),
                self.application_name.clone(),
            ),
        ]
    }
}

/// Connection parameters for the target Postgres database.
///
/// Every job step derives its own short-lived session from this config;
/// there is no shared long-lived connection between steps.
#[derive(Debug, Clone, Deserialize)]
pub struct PgConnectionConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub username: String,
    pub password: Option<SecretString>,
}

pub trait IntoConnectOptions<Output> {
    fn without_db(&self, options: Option<&PgConnectionOptions>) -> Output;
    fn with_db(&self, options: Option<&PgConnectionOptions>) -> Output;
}

impl IntoConnectOptions<PgConnectOptions> for PgConnectionConfig {
    fn without_db(&self, options: Option<&PgConnectionOptions>) -> PgConnectOptions {
        let mut connect_options = PgConnectOptions::new_without_pgpass()
            .host(&self.host)
            .username(&self.username)
            .port(self.port)
            .ssl_mode(PgSslMode::Prefer);

        if let Some(password) = &self.password {
            connect_options = connect_options.password(password.expose_secret());
        }

        if let Some(opts) = options {
            connect_options = connect_options.options(opts.to_key_value_pairs());
        }

        connect_options
    }

    fn with_db(&self, options: Option<&PgConnectionOptions>) -> PgConnectOptions {
        let connect_options: PgConnectOptions = self.without_db(options);
        connect_options.database(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_options() {
        assert_eq!(STAGE_OPTIONS.statement_timeout, 60_000);
        assert_eq!(STAGE_OPTIONS.application_name, "vinyl_stage");
    }

    #[test]
    fn test_normalize_options_key_value_pairs() {
        let pairs = NORMALIZE_OPTIONS.to_key_value_pairs();
        assert!(pairs.contains(&("statement_timeout".to_string(), "300000".to_string())));
        assert!(pairs.contains(&("application_name".to_string(), "vinyl_normalize".to_string())));
        assert!(pairs.contains(&("timezone".to_string(), "UTC".to_string())));
    }
}
