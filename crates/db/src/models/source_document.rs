//! Source document entity model and DTOs.

use annostore_core::error::CoreError;
use annostore_core::state::{SourceDocumentState, StatusId};
use annostore_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A raw uploaded document from the `source_documents` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct SourceDocument {
    pub id: DbId,
    pub project_id: DbId,
    /// Display name, unique within the project. Also the source file name.
    pub name: String,
    /// Format tag understood by the format importer.
    pub format: String,
    pub state_id: StatusId,
    /// Training documents are never offered for annotation.
    pub training_document: bool,
    pub sentence_accessed: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl SourceDocument {
    pub fn state(&self) -> Result<SourceDocumentState, CoreError> {
        SourceDocumentState::from_id(self.state_id)
    }
}

/// DTO for registering a new source document.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSourceDocument {
    pub project_id: DbId,
    pub name: String,
    pub format: String,
    /// Defaults to `false` if omitted.
    pub training_document: Option<bool>,
}

/// DTO for updating an existing source document. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSourceDocument {
    pub name: Option<String>,
    pub format: Option<String>,
    pub state_id: Option<StatusId>,
    pub training_document: Option<bool>,
    pub sentence_accessed: Option<i32>,
}
