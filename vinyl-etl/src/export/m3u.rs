use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use percent_encoding::percent_decode_str;
use sqlx::{Connection, PgConnection, Row};
use tracing::{info, warn};
use vinyl_config::{EXPORT_OPTIONS, IntoConnectOptions, PgConnectionConfig};

use crate::error::EtlResult;
use crate::export::view_join_sql;

/// Marker line opening an extended plain-text playlist.
const HEADER_LINE: &str = "#EXTM3U";
/// Scheme prefix stripped from local file locations.
const FILE_SCHEME: &str = "file://";

#[cfg(target_os = "macos")]
const OPEN_COMMAND: &str = "open";
#[cfg(not(target_os = "macos"))]
const OPEN_COMMAND: &str = "xdg-open";

/// One playlist entry as read from the export view.
///
/// Every column comes out of the all-text staging table, so each field is
/// optional text; only a missing location affects the export (the row is
/// skipped with a warning).
#[derive(Debug, Clone, Default)]
pub struct M3uTrack {
    pub name: Option<String>,
    pub artist: Option<String>,
    pub total_time: Option<String>,
    pub location: Option<String>,
}

/// Fetches the playlist rows in view order.
pub async fn fetch_m3u_tracks(
    config: &PgConnectionConfig,
    view: &str,
) -> EtlResult<Vec<M3uTrack>> {
    let sql = view_join_sql("name, artist, total_time, location", view);

    let mut conn = PgConnection::connect_with(&config.with_db(Some(&EXPORT_OPTIONS))).await?;
    let rows = sqlx::query(&sql).fetch_all(&mut conn).await?;
    conn.close().await?;

    let mut tracks = Vec::with_capacity(rows.len());
    for row in rows {
        tracks.push(M3uTrack {
            name: row.try_get(0)?,
            artist: row.try_get(1)?,
            total_time: row.try_get(2)?,
            location: row.try_get(3)?,
        });
    }

    Ok(tracks)
}

/// Rounds a millisecond duration to whole seconds, half-up.
fn duration_seconds(milliseconds: f64) -> i64 {
    (milliseconds / 1000.0).round() as i64
}

/// Turns a staged file location into a playable local path.
///
/// Undoes URL escaping and strips the local-file scheme prefix.
fn local_path(location: &str) -> String {
    percent_decode_str(location)
        .decode_utf8_lossy()
        .replace(FILE_SCHEME, "")
}

/// Writes playlist entries in the extended plain-text convention.
///
/// Rows without a file location are warned about and skipped; rows missing
/// only tag fields are warned about and written with empty or zero defaults.
/// The export still completes for the remaining rows. Returns the number of
/// entries written.
pub fn write_m3u<W: Write>(out: &mut W, tracks: &[M3uTrack]) -> io::Result<usize> {
    writeln!(out, "{HEADER_LINE}")?;

    let mut written = 0usize;
    for track in tracks {
        let name = track.name.as_deref().unwrap_or_default();
        let artist = track.artist.as_deref().unwrap_or_default();

        let Some(location) = track.location.as_deref() else {
            warn!(track = name, artist, "no file location found, skipping");
            continue;
        };

        if track.name.is_none() || track.artist.is_none() || track.total_time.is_none() {
            warn!(track = name, artist, "incomplete row, defaulting missing fields");
        }

        let seconds = track
            .total_time
            .as_deref()
            .and_then(|ms| ms.parse::<f64>().ok())
            .map(duration_seconds)
            .unwrap_or_default();

        writeln!(out, "#EXTINF:{seconds},{name} - {artist}")?;
        writeln!(out, "{}", local_path(location))?;
        written += 1;
    }

    Ok(written)
}

/// Appends a suffix to the full file name.
///
/// A dot inside the playlist name is part of the name, not an extension
/// boundary, so the suffix is always appended rather than substituted.
fn append_extension(base: &Path, extension: &str) -> PathBuf {
    let mut name = base.as_os_str().to_os_string();
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

/// Writes the playlist to disk, materializing the final name only when the
/// content is complete.
///
/// The file is first written under a temporary `.txt` suffix and then
/// renamed to `.m3u8`, so the output never exists half-written under its
/// final name.
fn write_playlist_file(base: &Path, tracks: &[M3uTrack]) -> io::Result<PathBuf> {
    let temp_path = append_extension(base, "txt");
    let final_path = append_extension(base, "m3u8");

    let mut file = BufWriter::new(File::create(&temp_path)?);
    let written = write_m3u(&mut file, tracks)?;
    file.flush()?;
    drop(file);

    fs::rename(&temp_path, &final_path)?;

    info!(entries = written, path = %final_path.display(), "playlist written");

    Ok(final_path)
}

/// Exports the view as a plain-text playlist file named
/// `<playlist_name>.m3u8`.
///
/// When `open_after` is set, the finished file is handed to the platform
/// opener and removed afterwards; this mirrors the original tool's
/// listen-once convenience behavior and is off by default.
pub async fn export_m3u(
    config: &PgConnectionConfig,
    view: &str,
    playlist_name: &str,
    open_after: bool,
) -> EtlResult<()> {
    let tracks = fetch_m3u_tracks(config, view).await?;
    let final_path = write_playlist_file(Path::new(playlist_name), &tracks)?;

    if open_after {
        Command::new(OPEN_COMMAND).arg(&final_path).status()?;
        fs::remove_file(&final_path)?;
    }

    Ok(())
}
