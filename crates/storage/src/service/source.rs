//! Source document registration, lookup and upload.

use std::path::PathBuf;

use annostore_core::error::CoreError;
use annostore_core::identity::Identity;
use annostore_core::layout::validate_document_name;
use annostore_core::state::SourceDocumentStateTransition;
use annostore_core::types::DbId;
use annostore_db::is_unique_violation;
use annostore_db::models::source_document::{
    CreateSourceDocument, SourceDocument, UpdateSourceDocument,
};
use annostore_db::repositories::SourceDocumentRepo;

use super::{found, DocumentService};
use crate::error::{StoreError, StoreResult};

impl DocumentService {
    /// Register a document without any bytes. Assigns the id.
    ///
    /// A name already taken in the project is a [`CoreError::Conflict`].
    pub async fn create_source_document(
        &self,
        input: &CreateSourceDocument,
    ) -> StoreResult<SourceDocument> {
        validate_document_name(&input.name)?;
        let document = SourceDocumentRepo::create(&self.pool, input)
            .await
            .map_err(|e| duplicate_name(e, input.project_id, &input.name))?;
        tracing::debug!(
            project_id = document.project_id,
            document_id = document.id,
            name = %document.name,
            "Created source document record"
        );
        Ok(document)
    }

    /// Apply a partial update. A rename moves the stored source bytes to the
    /// new name.
    pub async fn update_source_document(
        &self,
        document: &SourceDocument,
        input: &UpdateSourceDocument,
    ) -> StoreResult<SourceDocument> {
        if let Some(name) = &input.name {
            validate_document_name(name)?;
        }
        let updated = SourceDocumentRepo::update(&self.pool, document.id, input)
            .await
            .map_err(|e| {
                duplicate_name(
                    e,
                    document.project_id,
                    input.name.as_deref().unwrap_or(&document.name),
                )
            })?;
        let updated = found(updated, "SourceDocument", document.id)?;

        if updated.name != document.name && self.blobs.source_exists(document).await? {
            let bytes = self.blobs.read_source(document).await?;
            self.blobs.write_source(&updated, &bytes).await?;
            self.blobs.delete_source(document).await?;
            tracing::debug!(
                project_id = updated.project_id,
                document_id = updated.id,
                from = %document.name,
                to = %updated.name,
                "Moved source bytes after rename"
            );
        }
        Ok(updated)
    }

    pub async fn exists_source_document(&self, project_id: DbId, name: &str) -> StoreResult<bool> {
        Ok(SourceDocumentRepo::exists_by_name(&self.pool, project_id, name).await?)
    }

    pub async fn get_source_document(
        &self,
        project_id: DbId,
        name: &str,
    ) -> StoreResult<SourceDocument> {
        let document = SourceDocumentRepo::find_by_name(&self.pool, project_id, name).await?;
        found(document, "SourceDocument", format!("{project_id}/{name}"))
    }

    pub async fn get_source_document_by_id(
        &self,
        project_id: DbId,
        id: DbId,
    ) -> StoreResult<SourceDocument> {
        let document = SourceDocumentRepo::find_by_id(&self.pool, project_id, id).await?;
        found(document, "SourceDocument", id)
    }

    /// Documents of a project ordered by name, training formats excluded.
    pub async fn list_source_documents(&self, project_id: DbId) -> StoreResult<Vec<SourceDocument>> {
        Ok(SourceDocumentRepo::list_by_project(&self.pool, project_id).await?)
    }

    /// Apply a lifecycle transition.
    ///
    /// Succeeds when the document is in the transition's source state, or
    /// is already in its target state. Any other current state is a
    /// [`CoreError::Validation`].
    pub async fn transition_source_document(
        &self,
        document: &SourceDocument,
        transition: SourceDocumentStateTransition,
    ) -> StoreResult<SourceDocument> {
        let (from, to) = (transition.from_state(), transition.to_state());
        if let Some(moved) =
            SourceDocumentRepo::transition_state(&self.pool, document.id, from, to).await?
        {
            tracing::info!(
                project_id = moved.project_id,
                document_id = moved.id,
                from = from.name(),
                to = to.name(),
                "Source document state changed"
            );
            return Ok(moved);
        }

        let current = self
            .get_source_document_by_id(document.project_id, document.id)
            .await?;
        if current.state()? == to {
            return Ok(current);
        }
        Err(CoreError::Validation(format!(
            "Document {} is {}, cannot apply {transition:?}",
            current.id,
            current.state()?.name()
        ))
        .into())
    }

    /// Absolute location of a document's raw bytes.
    pub fn source_document_path(&self, document: &SourceDocument) -> PathBuf {
        self.blobs.source_path(document)
    }

    /// Absolute location of a user's annotation blob.
    pub fn annotation_blob_path(
        &self,
        document: &SourceDocument,
        username: &str,
    ) -> StoreResult<PathBuf> {
        let identity = Identity::user(username)?;
        Ok(self
            .blobs
            .annotation_path(document.project_id, document.id, &identity))
    }

    /// Register a document, store its bytes and materialize its baseline.
    ///
    /// If storing or converting fails, the stored bytes, any partial blob
    /// container and the metadata row are removed before the error is
    /// returned, so a failed upload never shows up in listings.
    pub async fn upload(
        &self,
        input: &CreateSourceDocument,
        raw: &[u8],
    ) -> StoreResult<SourceDocument> {
        let document = self.create_source_document(input).await?;

        let imported = async {
            self.blobs.write_source(&document, raw).await?;
            self.baseline.get_or_create(&document).await
        }
        .await;

        match imported {
            Ok(graph) => {
                tracing::info!(
                    project_id = document.project_id,
                    document_id = document.id,
                    name = %document.name,
                    format = %document.format,
                    size = raw.len(),
                    annotations = graph.annotations.len(),
                    "Imported source document"
                );
                Ok(document)
            }
            Err(err) => {
                tracing::error!(
                    project_id = document.project_id,
                    document_id = document.id,
                    name = %document.name,
                    error = %err,
                    "Upload failed, rolling back"
                );
                self.rollback_upload(&document).await;
                Err(err)
            }
        }
    }

    /// Compensating actions for a failed upload. Failures here are logged;
    /// the caller reports the original error.
    async fn rollback_upload(&self, document: &SourceDocument) {
        if let Err(e) = self.blobs.delete_document(document.project_id, document.id).await {
            tracing::error!(
                project_id = document.project_id,
                document_id = document.id,
                error = %e,
                "Rollback could not remove document blobs"
            );
        }
        if let Err(e) = SourceDocumentRepo::delete(&self.pool, document.id).await {
            tracing::error!(
                project_id = document.project_id,
                document_id = document.id,
                error = %e,
                "Rollback could not remove document record"
            );
        }
        self.baseline.evict(document.id);
    }
}

fn duplicate_name(err: sqlx::Error, project_id: DbId, name: &str) -> StoreError {
    if is_unique_violation(&err) {
        CoreError::Conflict(format!(
            "Document [{name}] already exists in project {project_id}"
        ))
        .into()
    } else {
        err.into()
    }
}
