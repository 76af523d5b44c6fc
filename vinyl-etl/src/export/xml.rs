use std::path::PathBuf;
use std::time::SystemTime;

use chrono::DateTime;
use plist::{Dictionary, Value};
use rand::Rng;
use sqlx::{Connection, PgConnection, Row};
use tracing::{info, warn};
use vinyl_config::{EXPORT_OPTIONS, IntoConnectOptions, LibraryMetadata, PgConnectionConfig};

use crate::error::EtlResult;
use crate::export::scrub::scrub_xml_text;
use crate::export::view_join_sql;

/// Fixed kind attribute stamped onto every exported track.
const TRACK_KIND: &str = "MPEG audio file";

/// Columns selected for the structured export, in result order.
const XML_COLUMNS: &str = "track_id, name, artist, album_artist, album, grouping, genre, \
     size, total_time, track_number, year, bpm, date_added, bit_rate, \
     sample_rate, comments, play_count, play_date, play_date_utc, \
     compilation, persistent_id, location";

/// The full track attribute set as read from the export view.
///
/// All values are staged text; typing back into integers, dates and
/// booleans happens while the property-list document is built, and absent
/// values stay absent (the exported record is sparse, not null-padded).
#[derive(Debug, Clone, Default)]
pub struct XmlTrack {
    pub track_id: Option<String>,
    pub name: Option<String>,
    pub artist: Option<String>,
    pub album_artist: Option<String>,
    pub album: Option<String>,
    pub grouping: Option<String>,
    pub genre: Option<String>,
    pub size: Option<String>,
    pub total_time: Option<String>,
    pub track_number: Option<String>,
    pub year: Option<String>,
    pub bpm: Option<String>,
    pub date_added: Option<String>,
    pub bit_rate: Option<String>,
    pub sample_rate: Option<String>,
    pub comments: Option<String>,
    pub play_count: Option<String>,
    pub play_date: Option<String>,
    pub play_date_utc: Option<String>,
    pub compilation: Option<String>,
    pub persistent_id: Option<String>,
    pub location: Option<String>,
}

/// Fetches the full attribute set for every playlist row, in view order.
pub async fn fetch_xml_tracks(
    config: &PgConnectionConfig,
    view: &str,
) -> EtlResult<Vec<XmlTrack>> {
    let sql = view_join_sql(XML_COLUMNS, view);

    let mut conn = PgConnection::connect_with(&config.with_db(Some(&EXPORT_OPTIONS))).await?;
    let rows = sqlx::query(&sql).fetch_all(&mut conn).await?;
    conn.close().await?;

    let mut tracks = Vec::with_capacity(rows.len());
    for row in rows {
        tracks.push(XmlTrack {
            track_id: row.try_get(0)?,
            name: row.try_get(1)?,
            artist: row.try_get(2)?,
            album_artist: row.try_get(3)?,
            album: row.try_get(4)?,
            grouping: row.try_get(5)?,
            genre: row.try_get(6)?,
            size: row.try_get(7)?,
            total_time: row.try_get(8)?,
            track_number: row.try_get(9)?,
            year: row.try_get(10)?,
            bpm: row.try_get(11)?,
            date_added: row.try_get(12)?,
            bit_rate: row.try_get(13)?,
            sample_rate: row.try_get(14)?,
            comments: row.try_get(15)?,
            play_count: row.try_get(16)?,
            play_date: row.try_get(17)?,
            play_date_utc: row.try_get(18)?,
            compilation: row.try_get(19)?,
            persistent_id: row.try_get(20)?,
            location: row.try_get(21)?,
        });
    }

    Ok(tracks)
}

fn insert_text(dict: &mut Dictionary, key: &str, value: &Option<String>) {
    if let Some(text) = value {
        dict.insert(
            key.to_string(),
            Value::String(scrub_xml_text(text).into_owned()),
        );
    }
}

fn insert_raw_text(dict: &mut Dictionary, key: &str, value: &Option<String>) {
    if let Some(text) = value {
        dict.insert(key.to_string(), Value::String(text.clone()));
    }
}

fn insert_integer(dict: &mut Dictionary, key: &str, value: &Option<String>) {
    if let Some(number) = value.as_deref().and_then(|text| text.parse::<i64>().ok()) {
        dict.insert(key.to_string(), Value::Integer(number.into()));
    }
}

fn insert_date(dict: &mut Dictionary, key: &str, value: &Option<String>) {
    let Some(text) = value.as_deref() else {
        return;
    };
    match DateTime::parse_from_rfc3339(text) {
        Ok(timestamp) => {
            let timestamp: SystemTime = timestamp.into();
            dict.insert(key.to_string(), Value::Date(timestamp.into()));
        }
        Err(_) => warn!(key, value = text, "unparseable timestamp dropped from export"),
    }
}

fn insert_boolean(dict: &mut Dictionary, key: &str, value: &Option<String>) {
    if let Some(text) = value.as_deref() {
        let flag = matches!(text, "true" | "t" | "1");
        dict.insert(key.to_string(), Value::Boolean(flag));
    }
}

fn track_dictionary(track: &XmlTrack, track_id: i64) -> Dictionary {
    let mut dict = Dictionary::new();
    dict.insert("Track ID".to_string(), Value::Integer(track_id.into()));
    insert_text(&mut dict, "Name", &track.name);
    insert_text(&mut dict, "Artist", &track.artist);
    insert_text(&mut dict, "Album Artist", &track.album_artist);
    insert_text(&mut dict, "Album", &track.album);
    insert_text(&mut dict, "Grouping", &track.grouping);
    insert_text(&mut dict, "Genre", &track.genre);
    insert_integer(&mut dict, "Size", &track.size);
    insert_integer(&mut dict, "Total Time", &track.total_time);
    insert_integer(&mut dict, "Track Number", &track.track_number);
    insert_integer(&mut dict, "Year", &track.year);
    insert_integer(&mut dict, "BPM", &track.bpm);
    insert_integer(&mut dict, "Bit Rate", &track.bit_rate);
    insert_integer(&mut dict, "Sample Rate", &track.sample_rate);
    insert_text(&mut dict, "Comments", &track.comments);
    insert_integer(&mut dict, "Play Count", &track.play_count);
    insert_boolean(&mut dict, "Compilation", &track.compilation);
    insert_raw_text(&mut dict, "Persistent ID", &track.persistent_id);
    insert_raw_text(&mut dict, "Location", &track.location);
    dict.insert(
        "Kind".to_string(),
        Value::String(TRACK_KIND.to_string()),
    );
    insert_date(&mut dict, "Date Added", &track.date_added);
    insert_integer(&mut dict, "Play Date", &track.play_date);
    insert_date(&mut dict, "Play Date UTC", &track.play_date_utc);
    dict
}

/// Generates a playlist id within the original's six-digit range.
fn random_playlist_id<R: Rng>(rng: &mut R) -> i64 {
    rng.gen_range(100_000..=999_999)
}

/// Generates a 16-hex-digit playlist persistent id.
fn random_persistent_id<R: Rng>(rng: &mut R) -> String {
    const HEX_DIGITS: &[u8] = b"0123456789ABCDEF";
    (0..16)
        .map(|_| HEX_DIGITS[rng.gen_range(0..HEX_DIGITS.len())] as char)
        .collect()
}

/// Builds the complete playlist document.
///
/// The header carries the configured library metadata, then a `Tracks`
/// dictionary keyed by track identifier (one sparse record per row), then a
/// single synthetic playlist listing every exported track identifier in
/// insertion order. Key order is significant and preserved as constructed.
pub fn build_playlist(
    tracks: &[XmlTrack],
    metadata: &LibraryMetadata,
    playlist_name: &str,
    date: SystemTime,
    playlist_id: i64,
    playlist_persistent_id: &str,
) -> Value {
    let mut root = Dictionary::new();
    root.insert(
        "Major Version".to_string(),
        Value::Integer(i64::from(metadata.major_version).into()),
    );
    root.insert(
        "Minor Version".to_string(),
        Value::Integer(i64::from(metadata.minor_version).into()),
    );
    root.insert("Date".to_string(), Value::Date(date.into()));
    root.insert(
        "Features".to_string(),
        Value::Integer(i64::from(metadata.features).into()),
    );
    root.insert(
        "Show Content Ratings".to_string(),
        Value::Boolean(metadata.show_content_ratings),
    );
    root.insert(
        "Application Version".to_string(),
        Value::String(metadata.application_version.clone()),
    );
    root.insert(
        "Music Folder".to_string(),
        Value::String(metadata.music_folder.clone()),
    );
    root.insert(
        "Library Persistent ID".to_string(),
        Value::String(metadata.library_persistent_id.clone()),
    );

    let mut track_map = Dictionary::new();
    let mut track_ids = Vec::with_capacity(tracks.len());
    for track in tracks {
        let Some(track_id) = track
            .track_id
            .as_deref()
            .and_then(|id| id.parse::<i64>().ok())
        else {
            warn!("track row without a usable track id dropped from export");
            continue;
        };

        track_map.insert(
            track_id.to_string(),
            Value::Dictionary(track_dictionary(track, track_id)),
        );
        track_ids.push(track_id);
    }
    root.insert("Tracks".to_string(), Value::Dictionary(track_map));

    let playlist_items = track_ids
        .into_iter()
        .map(|id| {
            let mut item = Dictionary::new();
            item.insert("Track ID".to_string(), Value::Integer(id.into()));
            Value::Dictionary(item)
        })
        .collect::<Vec<_>>();

    let mut playlist = Dictionary::new();
    playlist.insert(
        "Name".to_string(),
        Value::String(playlist_name.to_string()),
    );
    playlist.insert("Playlist ID".to_string(), Value::Integer(playlist_id.into()));
    playlist.insert(
        "Playlist Persistent ID".to_string(),
        Value::String(playlist_persistent_id.to_string()),
    );
    playlist.insert("All Items".to_string(), Value::Boolean(true));
    playlist.insert("Playlist Items".to_string(), Value::Array(playlist_items));

    root.insert(
        "Playlists".to_string(),
        Value::Array(vec![Value::Dictionary(playlist)]),
    );

    Value::Dictionary(root)
}

/// Exports the view as a structured property-list playlist named
/// `<playlist_name>.xml`.
pub async fn export_xml(
    config: &PgConnectionConfig,
    view: &str,
    playlist_name: &str,
    metadata: &LibraryMetadata,
) -> EtlResult<()> {
    let tracks = fetch_xml_tracks(config, view).await?;

    let mut rng = rand::thread_rng();
    let playlist_id = random_playlist_id(&mut rng);
    let playlist_persistent_id = random_persistent_id(&mut rng);
    info!(playlist_persistent_id = %playlist_persistent_id, "generating library playlist");

    let document = build_playlist(
        &tracks,
        metadata,
        playlist_name,
        SystemTime::now(),
        playlist_id,
        &playlist_persistent_id,
    );

    let path = PathBuf::from(format!("{playlist_name}.xml"));
    document.to_file_xml(&path)?;

    info!(tracks = tracks.len(), path = %path.display(), "playlist written");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_track(id: &str, name: &str) -> XmlTrack {
        XmlTrack {
            track_id: Some(id.to_string()),
            name: Some(name.to_string()),
            artist: Some("Artist A".to_string()),
            album: Some("Album A".to_string()),
            total_time: Some("185000".to_string()),
            play_count: Some("12".to_string()),
            compilation: Some("false".to_string()),
            persistent_id: Some("A1B2C3D4E5F60718".to_string()),
            location: Some("file:///Music/Song%20One.mp3".to_string()),
            date_added: Some("2019-01-01T00:00:00Z".to_string()),
            ..XmlTrack::default()
        }
    }

    fn build_sample(tracks: &[XmlTrack]) -> Dictionary {
        let document = build_playlist(
            tracks,
            &LibraryMetadata::default(),
            "Top 2019",
            SystemTime::UNIX_EPOCH,
            123_456,
            "0123456789ABCDEF",
        );
        document.into_dictionary().unwrap()
    }

    #[test]
    fn test_header_key_order_is_preserved() {
        let root = build_sample(&[sample_track("1001", "Song One")]);
        let keys: Vec<&str> = root.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![
                "Major Version",
                "Minor Version",
                "Date",
                "Features",
                "Show Content Ratings",
                "Application Version",
                "Music Folder",
                "Library Persistent ID",
                "Tracks",
                "Playlists",
            ]
        );
    }

    #[test]
    fn test_track_records_are_sparse() {
        let root = build_sample(&[sample_track("1001", "Song One")]);
        let tracks = root.get("Tracks").unwrap().as_dictionary().unwrap();
        let track = tracks.get("1001").unwrap().as_dictionary().unwrap();

        // Present attributes are typed; absent ones are dropped entirely.
        assert_eq!(
            track.get("Total Time").unwrap().as_signed_integer(),
            Some(185000)
        );
        assert_eq!(track.get("Compilation").unwrap().as_boolean(), Some(false));
        assert!(track.get("Date Added").unwrap().as_date().is_some());
        assert!(track.get("Year").is_none());
        assert!(track.get("Genre").is_none());
        assert_eq!(
            track.get("Kind").unwrap().as_string(),
            Some("MPEG audio file")
        );
    }

    #[test]
    fn test_free_text_fields_are_scrubbed() {
        let mut track = sample_track("1001", "Song\u{01}One");
        track.comments = Some("loud\u{0c}".to_string());
        let root = build_sample(&[track]);

        let tracks = root.get("Tracks").unwrap().as_dictionary().unwrap();
        let track = tracks.get("1001").unwrap().as_dictionary().unwrap();
        assert_eq!(track.get("Name").unwrap().as_string(), Some("Song?One"));
        assert_eq!(track.get("Comments").unwrap().as_string(), Some("loud?"));
    }

    #[test]
    fn test_playlist_lists_exactly_the_exported_tracks() {
        let rows = vec![
            sample_track("1001", "Song One"),
            sample_track("1002", "Song Two"),
            XmlTrack::default(), // no track id, dropped
        ];
        let root = build_sample(&rows);

        let tracks = root.get("Tracks").unwrap().as_dictionary().unwrap();
        assert_eq!(tracks.len(), 2);

        let playlists = root.get("Playlists").unwrap().as_array().unwrap();
        assert_eq!(playlists.len(), 1);
        let playlist = playlists[0].as_dictionary().unwrap();
        assert_eq!(playlist.get("Name").unwrap().as_string(), Some("Top 2019"));
        assert_eq!(playlist.get("All Items").unwrap().as_boolean(), Some(true));

        let items = playlist.get("Playlist Items").unwrap().as_array().unwrap();
        let item_ids: Vec<i64> = items
            .iter()
            .map(|item| {
                item.as_dictionary()
                    .unwrap()
                    .get("Track ID")
                    .unwrap()
                    .as_signed_integer()
                    .unwrap()
            })
            .collect();
        assert_eq!(item_ids, vec![1001, 1002]);
    }

    #[test]
    fn test_random_identifiers_have_required_shape() {
        let mut rng = rand::thread_rng();
        for _ in 0..100 {
            let id = random_playlist_id(&mut rng);
            assert!((100_000..=999_999).contains(&id));

            let persistent_id = random_persistent_id(&mut rng);
            assert_eq!(persistent_id.len(), 16);
            assert!(persistent_id
                .chars()
                .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
        }
    }
}
