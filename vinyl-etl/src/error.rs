use thiserror::Error;

/// Convenient result type for ETL operations using [`EtlError`] as the error
/// type.
pub type EtlResult<T> = Result<T, EtlError>;

/// Error type for the vinyl ETL and export jobs.
///
/// Every variant is fatal to the step that raised it; there are no retries.
/// Row-level incompleteness (a track without a file location, an absent
/// optional field) is not an error and is handled inline by logging and
/// skipping the row.
#[derive(Debug, Error)]
pub enum EtlError {
    /// The library export could not be decoded as a property list.
    #[error("failed to decode library file: {0}")]
    Library(#[from] plist::Error),

    /// The library export has no top-level tracks collection. The job
    /// cannot proceed without it.
    #[error("library file has no top-level 'Tracks' dictionary")]
    MissingTracks,

    /// A database statement failed. The current step's session is abandoned;
    /// previously committed steps are left in place.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Filesystem error while writing a playlist file.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The user asked for a playlist format this tool does not produce.
    #[error("unsupported format selected: {0}")]
    UnsupportedFormat(String),
}
