//! Domain types and collaborator interfaces for the annotation store.
//!
//! Nothing in this crate touches the database or the filesystem; the `db`
//! and `storage` crates build on these definitions.

pub mod error;
pub mod graph;
pub mod identity;
pub mod importer;
pub mod layout;
pub mod registry;
pub mod schema;
pub mod state;
pub mod types;
