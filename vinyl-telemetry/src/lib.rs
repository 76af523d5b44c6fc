//! Tracing setup shared by the vinyl job binaries.

pub mod tracing;
