//! Shared configuration types for the vinyl jobs.
//!
//! Holds the Postgres connection configuration used by every pipeline step
//! and the overridable library metadata emitted by the structured playlist
//! export.

pub mod connection;
pub mod metadata;

pub use connection::{
    EXPORT_OPTIONS, IntoConnectOptions, NORMALIZE_OPTIONS, PgConnectionConfig,
    PgConnectionOptions, STAGE_OPTIONS,
};
pub use metadata::LibraryMetadata;
