//! Addressing scheme of the blob repository.
//!
//! ```text
//! project/{project_id}/document/{document_id}/source/{document_name}
//! project/{project_id}/document/{document_id}/annotation/{identity}.json
//! ```
//!
//! All paths are relative to the repository root.

use std::path::PathBuf;

use crate::error::CoreError;
use crate::identity::Identity;
use crate::types::DbId;

pub const PROJECT_DIR: &str = "project";
pub const DOCUMENT_DIR: &str = "document";
pub const SOURCE_DIR: &str = "source";
pub const ANNOTATION_DIR: &str = "annotation";

/// Extension of serialized annotation graph blobs.
pub const ANNOTATION_BLOB_EXTENSION: &str = "json";

/// Maximum accepted document name length.
pub const MAX_DOCUMENT_NAME_LEN: usize = 255;

/// Container holding every document of a project.
pub fn project_dir(project_id: DbId) -> PathBuf {
    PathBuf::from(PROJECT_DIR).join(project_id.to_string())
}

/// Container holding the source bytes and all annotation blobs of a document.
pub fn document_dir(project_id: DbId, document_id: DbId) -> PathBuf {
    project_dir(project_id)
        .join(DOCUMENT_DIR)
        .join(document_id.to_string())
}

/// Location of the raw uploaded bytes.
pub fn source_path(project_id: DbId, document_id: DbId, document_name: &str) -> PathBuf {
    document_dir(project_id, document_id)
        .join(SOURCE_DIR)
        .join(document_name)
}

/// Location of the annotation graph blob of `identity`.
pub fn annotation_path(project_id: DbId, document_id: DbId, identity: &Identity) -> PathBuf {
    document_dir(project_id, document_id)
        .join(ANNOTATION_DIR)
        .join(format!("{}.{ANNOTATION_BLOB_EXTENSION}", identity.as_str()))
}

/// Validate that a document name is a single, non-empty path component.
pub fn validate_document_name(name: &str) -> Result<(), CoreError> {
    if name.trim().is_empty() {
        return Err(CoreError::Validation("Document name must not be empty".into()));
    }
    if name.len() > MAX_DOCUMENT_NAME_LEN {
        return Err(CoreError::Validation(format!(
            "Document name exceeds {MAX_DOCUMENT_NAME_LEN} bytes"
        )));
    }
    if name == "." || name == ".." || name.contains(['/', '\\', '\0']) {
        return Err(CoreError::Validation(format!(
            "Document name '{name}' must be a plain file name"
        )));
    }
    Ok(())
}
