//! In-memory analytical engine for the retail sales dashboard.
//!
//! A parallel dictionary-encoding CSV loader turns the transactions file
//! into a struct-of-arrays [`ColumnStore`] in one pass; a second parallel
//! scan reduces the store into the [`DashboardData`] snapshot served by
//! the HTTP layer through a [`SnapshotHolder`].

pub mod aggregate;
pub mod chunk;
pub mod loader;
pub mod parse;
pub mod snapshot;
pub mod store;

pub use aggregate::aggregate;
pub use loader::{load_columnar, load_from_bytes};
pub use snapshot::{DashboardData, SnapshotHolder};
pub use store::ColumnStore;
