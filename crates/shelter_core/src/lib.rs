//! Core domain logic for the animal shelter records service.
//! This crate owns the data-access contract and the dashboard update model;
//! the web and CLI crates are thin shells around it.

pub mod config;
pub mod dashboard;
pub mod db;
pub mod import;
pub mod logging;
pub mod model;
pub mod repo;

pub use config::{ConfigError, ShelterConfig, StoreConfig};
pub use dashboard::app::{Dashboard, DashboardEvent, DispatchOutcome, PatchPolicy};
pub use dashboard::graph::{Derivation, DependencyGraph, GraphError, Node, StateInput};
pub use dashboard::views::{DashboardViews, ViewFragment};
pub use import::csv_loader::{import_csv, import_reader, ImportError, ImportReport, ParseError};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::record::{FieldValue, Query, Record, UpdateSet};
pub use repo::collection::{Collection, StoreError, StoreResult, UpdateCounts};
pub use repo::shelter_repo::{AnimalRepository, AnimalShelter, ArgumentError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
