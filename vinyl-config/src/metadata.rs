use serde::{Deserialize, Serialize};

/// Library-level metadata written into the header of the structured playlist
/// export.
///
/// The exported file has to look like it came out of a real library, so the
/// defaults carry fixed version numbers, a fabricated media folder and a
/// fabricated library persistent id. Callers can override any field before
/// exporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryMetadata {
    pub major_version: u32,
    pub minor_version: u32,
    pub features: u32,
    pub show_content_ratings: bool,
    pub application_version: String,
    pub music_folder: String,
    pub library_persistent_id: String,
}

impl Default for LibraryMetadata {
    fn default() -> Self {
        Self {
            major_version: 1,
            minor_version: 1,
            features: 5,
            show_content_ratings: true,
            application_version: "12.1.2.27".to_string(),
            music_folder: "file:///Users/stephan/Music/iTunes/iTunes%20Media/".to_string(),
            library_persistent_id: "23D7636E9EB97DA0".to_string(),
        }
    }
}
