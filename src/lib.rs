//! Venue seed tooling - shared modules for all binaries.

pub mod anthropic;
pub mod csv_io;
pub mod dedupe;
pub mod discovery;
pub mod enrich;
pub mod error;
pub mod insert_sql;
pub mod merge;
pub mod models;
pub mod normalize;
pub mod progress;
pub mod safety;
pub mod seed_sql;
pub mod sql;
