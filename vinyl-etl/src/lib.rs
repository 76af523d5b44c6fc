//! Core library for the vinyl music-library ETL.
//!
//! Migrates a property-list music-library export into a normalized Postgres
//! schema and re-exports curated subsets of that schema as playlist files.
//! The pipeline is three one-shot steps, each on its own database session:
//!
//! 1. extract: derive a dynamic staging schema from the observed track
//!    fields and build one parameterized insert per retained track,
//! 2. stage: recreate the staging schema and bulk-load the records as-is,
//! 3. normalize: fold staged rows into artist/album/track/play tables with
//!    idempotent DDL and conflict-resolving inserts.
//!
//! The playlist exporters are independent downstream jobs that read the
//! staged data through a caller-supplied view.

pub mod error;
pub mod export;
pub mod extract;
pub mod import;
pub mod library;
pub mod normalize;
pub mod stage;

pub use error::{EtlError, EtlResult};
