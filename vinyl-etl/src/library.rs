use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, SecondsFormat, Utc};
use plist::{Dictionary, Value};

use crate::error::{EtlError, EtlResult};

/// A decoded music-library export.
///
/// Wraps the top-level tracks collection: a mapping from track identifier to
/// a per-track field dictionary. Field sets vary per track; no fixed schema
/// is assumed here.
#[derive(Debug)]
pub struct Library {
    tracks: Dictionary,
}

impl Library {
    /// Builds a library directly from a tracks dictionary.
    pub fn from_tracks(tracks: Dictionary) -> Self {
        Self { tracks }
    }

    /// Iterates over tracks, skipping any entry that is not a dictionary.
    pub fn tracks(&self) -> impl Iterator<Item = (&str, &Dictionary)> {
        self.tracks
            .iter()
            .filter_map(|(id, value)| value.as_dictionary().map(|track| (id.as_str(), track)))
    }
}

/// Loads and decodes a library export file.
///
/// A file without a top-level `Tracks` dictionary is a structural error and
/// fails the whole job; per-track field heterogeneity is never an error.
pub fn load(path: &Path) -> EtlResult<Library> {
    let root = Value::from_file(path)?;
    from_value(root)
}

fn from_value(root: Value) -> EtlResult<Library> {
    let mut root = match root {
        Value::Dictionary(dict) => dict,
        _ => return Err(EtlError::MissingTracks),
    };

    match root.remove("Tracks") {
        Some(Value::Dictionary(tracks)) => Ok(Library::from_tracks(tracks)),
        _ => Err(EtlError::MissingTracks),
    }
}

/// Converts a property-list scalar into its staging text form.
///
/// The staging table is all-text, so every scalar is rendered as a string
/// the database can cast back later: integers and reals in decimal, booleans
/// as `true`/`false`, dates in RFC 3339 so a `:: TIMESTAMP` cast succeeds.
/// Non-scalar values (nested arrays, dictionaries, raw data) have no staging
/// representation and yield `None`.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Integer(int) => int
            .as_signed()
            .map(|v| v.to_string())
            .or_else(|| int.as_unsigned().map(|v| v.to_string())),
        Value::Real(real) => Some(real.to_string()),
        Value::Boolean(flag) => Some(if *flag { "true" } else { "false" }.to_string()),
        Value::Date(date) => {
            let timestamp: SystemTime = (*date).into();
            let timestamp: DateTime<Utc> = timestamp.into();
            Some(timestamp.to_rfc3339_opts(SecondsFormat::Secs, true))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, UNIX_EPOCH};

    use super::*;

    #[test]
    fn test_missing_tracks_dictionary_is_fatal() {
        let root = Value::Dictionary(Dictionary::new());
        assert!(matches!(from_value(root), Err(EtlError::MissingTracks)));

        let root = Value::String("not a library".to_string());
        assert!(matches!(from_value(root), Err(EtlError::MissingTracks)));
    }

    #[test]
    fn test_tracks_are_exposed_in_document_order() {
        let mut tracks = Dictionary::new();
        let mut track = Dictionary::new();
        track.insert("Name".to_string(), Value::String("Song One".to_string()));
        tracks.insert("1001".to_string(), Value::Dictionary(track));
        tracks.insert("1002".to_string(), Value::String("garbage".to_string()));

        let mut root = Dictionary::new();
        root.insert("Tracks".to_string(), Value::Dictionary(tracks));

        let library = from_value(Value::Dictionary(root)).unwrap();
        let ids: Vec<&str> = library.tracks().map(|(id, _)| id).collect();
        // The non-dictionary entry is dropped, not an error.
        assert_eq!(ids, vec!["1001"]);
    }

    #[test]
    fn test_scalar_text_forms() {
        assert_eq!(
            scalar_text(&Value::String("Artist A".to_string())),
            Some("Artist A".to_string())
        );
        assert_eq!(
            scalar_text(&Value::Integer(185000i64.into())),
            Some("185000".to_string())
        );
        assert_eq!(
            scalar_text(&Value::Boolean(true)),
            Some("true".to_string())
        );
        assert_eq!(scalar_text(&Value::Dictionary(Dictionary::new())), None);
    }

    #[test]
    fn test_date_renders_as_rfc3339() {
        let date = plist::Date::from(UNIX_EPOCH + Duration::from_secs(1_546_300_800));
        assert_eq!(
            scalar_text(&Value::Date(date)),
            Some("2019-01-01T00:00:00Z".to_string())
        );
    }
}
