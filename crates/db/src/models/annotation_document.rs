//! Annotation document entity model and DTOs.

use annostore_core::error::CoreError;
use annostore_core::identity::validate_username;
use annostore_core::state::{AnnotationDocumentState, StatusId};
use annostore_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

use crate::models::source_document::SourceDocument;

/// One user's progress on one source document (`annotation_documents`).
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct AnnotationDocument {
    pub id: DbId,
    /// Always equal to the referenced document's project.
    pub project_id: DbId,
    pub document_id: DbId,
    /// Copy of the source document name.
    pub name: String,
    pub username: String,
    pub state_id: StatusId,
    pub sentence_accessed: i32,
    /// Last time the user wrote with a timestamp update.
    pub accessed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl AnnotationDocument {
    pub fn state(&self) -> Result<AnnotationDocumentState, CoreError> {
        AnnotationDocumentState::from_id(self.state_id)
    }

    /// Check the denormalized references against `document`.
    pub fn ensure_belongs_to(&self, document: &SourceDocument) -> Result<(), CoreError> {
        if self.document_id != document.id {
            return Err(CoreError::InvariantViolation(format!(
                "Annotation document {} refers to document {}, not {}",
                self.id, self.document_id, document.id
            )));
        }
        if self.project_id != document.project_id {
            return Err(CoreError::InvariantViolation(format!(
                "Annotation document {} is in project {} but document {} is in project {}",
                self.id, self.project_id, document.id, document.project_id
            )));
        }
        Ok(())
    }
}

/// DTO for creating an annotation document.
///
/// Only constructible from a [`SourceDocument`] so the project reference is
/// always copied from the document itself.
#[derive(Debug, Clone)]
pub struct CreateAnnotationDocument {
    project_id: DbId,
    document_id: DbId,
    name: String,
    username: String,
}

impl CreateAnnotationDocument {
    pub fn for_document(document: &SourceDocument, username: &str) -> Result<Self, CoreError> {
        validate_username(username)?;
        Ok(Self {
            project_id: document.project_id,
            document_id: document.id,
            name: document.name.clone(),
            username: username.to_string(),
        })
    }

    pub fn project_id(&self) -> DbId {
        self.project_id
    }

    pub fn document_id(&self) -> DbId {
        self.document_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

/// DTO for updating an annotation document. All fields are optional.
#[derive(Debug, Clone, Default)]
pub struct UpdateAnnotationDocument {
    pub state_id: Option<StatusId>,
    pub sentence_accessed: Option<i32>,
    pub accessed_at: Option<Timestamp>,
}
