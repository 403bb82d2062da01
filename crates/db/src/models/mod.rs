//! Row types and create/update DTOs, one module per table.

pub mod annotation_document;
pub mod permission;
pub mod project;
pub mod source_document;
pub mod user;
