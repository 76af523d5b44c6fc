use std::collections::BTreeSet;

use plist::{Dictionary, Value};
use tracing::debug;

use crate::error::EtlResult;
use crate::library::{Library, scalar_text};

/// Schema holding the ephemeral staging table, recreated on every import.
pub const STAGING_SCHEMA: &str = "itunes";
/// Name of the staging table inside [`STAGING_SCHEMA`].
pub const STAGING_TABLE: &str = "itunes";

/// Marker field that excludes a track when its value is truthy.
const PODCAST_KEY: &str = "Podcast";
/// Marker fields that exclude a track on presence alone.
const PRESENCE_MARKER_KEYS: &[&str] = &["Playlist Only", "Music Video"];
/// Fields a track must carry to be retained.
const REQUIRED_KEYS: &[&str] = &["Artist", "Album", "Year"];

/// One parameterized staging insert.
///
/// Field values are carried only in `params` and bound positionally at
/// execution time; the statement text contains nothing but identifiers from
/// the fixed canonicalization and `$n` placeholders. Untrusted values are
/// never interpolated into `sql`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingInsert {
    pub sql: String,
    pub params: Vec<String>,
}

/// Output of the extraction step: the staging DDL plus one insert per
/// retained track, in library order.
#[derive(Debug)]
pub struct StagingPlan {
    pub create_table_sql: String,
    pub inserts: Vec<StagingInsert>,
}

/// Canonicalizes a source field name into its staging column form.
///
/// Both the column-union and every per-track insert go through this same
/// function; diverging canonicalization would surface as a missing-column
/// error at staging time.
pub fn slugify(name: &str) -> String {
    name.to_lowercase().replace(' ', "_")
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Boolean(flag) => *flag,
        Value::Integer(int) => int.as_signed() != Some(0) && int.as_unsigned() != Some(0),
        Value::String(text) => !text.is_empty(),
        _ => true,
    }
}

/// Decides whether a track survives into staging.
///
/// Podcast entries are excluded only when the marker is truthy; the
/// playlist-only and music-video markers exclude on presence alone. Tracks
/// missing any of artist, album or year are discarded entirely.
fn is_retained(track: &Dictionary) -> bool {
    if track.get(PODCAST_KEY).is_some_and(is_truthy) {
        return false;
    }
    if PRESENCE_MARKER_KEYS
        .iter()
        .any(|key| track.contains_key(key))
    {
        return false;
    }

    REQUIRED_KEYS.iter().all(|key| track.contains_key(key))
}

/// Derives the staging schema and insert statements from a decoded library.
///
/// The staging table's columns are the sorted union of every canonical field
/// name observed across all retained tracks, each typed as nullable text.
/// Every retained track yields one sparse insert listing only the fields it
/// actually carries.
pub fn extract_tracks(library: &Library) -> EtlResult<StagingPlan> {
    let mut columns: BTreeSet<String> = BTreeSet::new();
    let mut inserts = Vec::new();
    let mut skipped = 0usize;

    for (_, track) in library.tracks() {
        if !is_retained(track) {
            skipped += 1;
            continue;
        }

        let mut names = Vec::new();
        let mut params = Vec::new();
        for (key, value) in track.iter() {
            let Some(text) = scalar_text(value) else {
                continue;
            };
            names.push(slugify(key));
            params.push(text);
        }

        columns.extend(names.iter().cloned());
        inserts.push(build_insert(&names, params));
    }

    debug!(
        retained = inserts.len(),
        skipped, "extracted track records from library"
    );

    Ok(StagingPlan {
        create_table_sql: build_create_table(&columns),
        inserts,
    })
}

fn build_create_table(columns: &BTreeSet<String>) -> String {
    let columns = columns
        .iter()
        .map(|name| format!("{name} TEXT"))
        .collect::<Vec<_>>()
        .join(", ");

    format!("CREATE TABLE IF NOT EXISTS {STAGING_SCHEMA}.{STAGING_TABLE} ({columns})")
}

fn build_insert(columns: &[String], params: Vec<String>) -> StagingInsert {
    let placeholders = (1..=params.len())
        .map(|n| format!("${n}"))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!(
        "INSERT INTO {STAGING_SCHEMA}.{STAGING_TABLE} ({}) VALUES ({})",
        columns.join(", "),
        placeholders
    );

    StagingInsert { sql, params }
}
