//! Repository layer over the document store.
//!
//! # Responsibility
//! - `collection`: driver-level document operations that report every
//!   backend failure as a typed `StoreError`.
//! - `shelter_repo`: the `AnimalRepository` contract used by the loader and
//!   the dashboard.
//!
//! # Invariants
//! - Missing required arguments are hard failures (`ArgumentError`).
//! - Backend failures never cross the repository boundary; they are logged
//!   and replaced by a safe default.

pub mod collection;
pub mod shelter_repo;
