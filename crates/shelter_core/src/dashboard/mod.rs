//! Dashboard application model.
//!
//! # Responsibility
//! - Hold the in-memory table and interaction state (`state`).
//! - Derive every rendered surface as a pure function of that state (`views`).
//! - Recompute only the derivations an event touched (`graph`, `app`).
//! - Resolve all colors through one palette lookup (`theme`).
//!
//! # Invariants
//! - The table is read from the repository once; afterwards it only changes
//!   through local patches after an edit commit.
//! - Derivations never fail; bad data falls back to placeholder values.

pub mod app;
pub mod graph;
pub mod state;
pub mod theme;
pub mod views;
