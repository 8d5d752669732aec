//! Shelter document model.
//!
//! # Responsibility
//! - Define the flat record shape shared by store, loader and dashboard.
//! - Define equality-filter and merge mappings used by the repository.
//!
//! # Invariants
//! - Every field value is a scalar; nested documents are not representable.
//! - Field order carries no meaning; comparisons are key-based.

pub mod record;
