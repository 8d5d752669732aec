//! Bulk import of shelter records from delimited files.
//!
//! # Responsibility
//! - Parse CSV rows into records with per-column type inference.
//! - Feed every row through `AnimalRepository::create`.
//!
//! # Invariants
//! - A failing row never aborts the import; it is counted and skipped.
//! - Individual error messages are capped while counts stay exact.
//! - No atomicity across rows: a partial import is a valid outcome.

pub mod csv_loader;
