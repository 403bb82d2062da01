//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod annotation_document_repo;
pub mod project_permission_repo;
pub mod project_repo;
pub mod source_document_repo;
pub mod user_repo;

pub use annotation_document_repo::AnnotationDocumentRepo;
pub use project_permission_repo::ProjectPermissionRepo;
pub use project_repo::ProjectRepo;
pub use source_document_repo::SourceDocumentRepo;
pub use user_repo::UserRepo;
