//! Per-user annotation records and progress queries.

use annostore_core::error::CoreError;
use annostore_core::state::{AnnotationDocumentState, PermissionLevel};
use annostore_core::types::DbId;
use annostore_db::is_unique_violation;
use annostore_db::models::annotation_document::{
    AnnotationDocument, CreateAnnotationDocument, UpdateAnnotationDocument,
};
use annostore_db::models::source_document::SourceDocument;
use annostore_db::repositories::{
    AnnotationDocumentRepo, ProjectPermissionRepo, SourceDocumentRepo,
};

use super::{found, DocumentService};
use crate::error::StoreResult;

impl DocumentService {
    pub async fn exists_annotation_document(
        &self,
        document: &SourceDocument,
        username: &str,
    ) -> StoreResult<bool> {
        Ok(AnnotationDocumentRepo::exists(&self.pool, document.id, username).await?)
    }

    /// The record of `username` for `document`; `NotFound` if there is none.
    pub async fn get_annotation_document(
        &self,
        document: &SourceDocument,
        username: &str,
    ) -> StoreResult<AnnotationDocument> {
        let record = AnnotationDocumentRepo::find(&self.pool, document.id, username).await?;
        let record = found(
            record,
            "AnnotationDocument",
            format!("{}/{username}", document.id),
        )?;
        record.ensure_belongs_to(document)?;
        Ok(record)
    }

    pub async fn get_annotation_document_by_id(&self, id: DbId) -> StoreResult<AnnotationDocument> {
        let record = AnnotationDocumentRepo::find_by_id(&self.pool, id).await?;
        found(record, "AnnotationDocument", id)
    }

    /// Return the record of `username` for `document`, creating it in state
    /// `new` if there is none.
    ///
    /// Concurrent callers may both miss the lookup; the loser of the insert
    /// race sees a unique violation and re-reads the winner's row.
    pub async fn create_or_get_annotation_document(
        &self,
        document: &SourceDocument,
        username: &str,
    ) -> StoreResult<AnnotationDocument> {
        if let Some(record) = AnnotationDocumentRepo::find(&self.pool, document.id, username).await?
        {
            record.ensure_belongs_to(document)?;
            return Ok(record);
        }

        let input = CreateAnnotationDocument::for_document(document, username)?;
        match AnnotationDocumentRepo::create(&self.pool, &input).await {
            Ok(record) => {
                tracing::info!(
                    project_id = record.project_id,
                    document_id = record.document_id,
                    username,
                    annotation_document_id = record.id,
                    "Created annotation document"
                );
                Ok(record)
            }
            Err(e) if is_unique_violation(&e) => {
                tracing::debug!(
                    document_id = document.id,
                    username,
                    "Annotation document created concurrently, re-reading"
                );
                self.get_annotation_document(document, username).await
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete one record. The user's blob is left in place.
    pub async fn remove_annotation_document(&self, record: &AnnotationDocument) -> StoreResult<()> {
        AnnotationDocumentRepo::delete(&self.pool, record.id).await?;
        tracing::info!(
            project_id = record.project_id,
            document_id = record.document_id,
            username = %record.username,
            "Removed annotation document"
        );
        Ok(())
    }

    /// Move a record to `next`, enforcing the annotation state machine.
    pub async fn transition_annotation_document(
        &self,
        record: &AnnotationDocument,
        next: AnnotationDocumentState,
    ) -> StoreResult<AnnotationDocument> {
        let current = record.state()?;
        current.transition_to(next)?;
        let updated = AnnotationDocumentRepo::set_state(&self.pool, record.id, next).await?;
        let updated = found(updated, "AnnotationDocument", record.id)?;
        if current != next {
            tracing::info!(
                document_id = updated.document_id,
                username = %updated.username,
                from = current.name(),
                to = next.name(),
                "Annotation document state changed"
            );
        }
        Ok(updated)
    }

    /// Apply a partial update to a record.
    ///
    /// A new state must be reachable under the annotation state machine; the
    /// sentence position must not be negative.
    pub async fn update_annotation_document(
        &self,
        record: &AnnotationDocument,
        input: &UpdateAnnotationDocument,
    ) -> StoreResult<AnnotationDocument> {
        let current = record.state()?;
        let next = match input.state_id {
            Some(id) => {
                let next = AnnotationDocumentState::from_id(id)
                    .map_err(|e| CoreError::Validation(e.to_string()))?;
                current.transition_to(next)?
            }
            None => current,
        };
        if input.sentence_accessed.is_some_and(|sentence| sentence < 0) {
            return Err(CoreError::Validation(
                "Sentence position must not be negative".into(),
            )
            .into());
        }

        let updated = AnnotationDocumentRepo::update(&self.pool, record.id, input).await?;
        let updated = found(updated, "AnnotationDocument", record.id)?;
        tracing::info!(
            document_id = updated.document_id,
            username = %updated.username,
            from = current.name(),
            to = next.name(),
            sentence_accessed = updated.sentence_accessed,
            "Updated annotation document"
        );
        Ok(updated)
    }

    /// Whether `username` has finished `document`. No record means no.
    pub async fn is_annotation_finished(
        &self,
        document: &SourceDocument,
        username: &str,
    ) -> StoreResult<bool> {
        match AnnotationDocumentRepo::find(&self.pool, document.id, username).await? {
            Some(record) => Ok(record.state()? == AnnotationDocumentState::Finished),
            None => Ok(false),
        }
    }

    /// Whether any user has finished `document`.
    pub async fn exists_finished_annotation(&self, document: &SourceDocument) -> StoreResult<bool> {
        Ok(AnnotationDocumentRepo::exists_in_state_for_document(
            &self.pool,
            document.id,
            AnnotationDocumentState::Finished,
        )
        .await?)
    }

    /// Whether any document of the project has a finished record.
    pub async fn exists_finished_annotation_in_project(
        &self,
        project_id: DbId,
    ) -> StoreResult<bool> {
        Ok(AnnotationDocumentRepo::exists_in_state_for_project(
            &self.pool,
            project_id,
            AnnotationDocumentState::Finished,
        )
        .await?)
    }

    /// Usernames holding the annotator permission on the project that still
    /// exist in the user registry.
    pub async fn annotators(&self, project_id: DbId) -> StoreResult<Vec<String>> {
        let permitted =
            ProjectPermissionRepo::list_usernames(&self.pool, project_id, PermissionLevel::User)
                .await?;
        let mut annotators = Vec::with_capacity(permitted.len());
        for username in permitted {
            if self.users.username_exists(&username).await? {
                annotators.push(username);
            } else {
                tracing::debug!(project_id, username = %username, "Skipping stale permission");
            }
        }
        Ok(annotators)
    }

    /// Records of `document` held by current annotators.
    pub async fn list_annotation_documents(
        &self,
        document: &SourceDocument,
    ) -> StoreResult<Vec<AnnotationDocument>> {
        let annotators = self.annotators(document.project_id).await?;
        Ok(AnnotationDocumentRepo::list_by_document_users(
            &self.pool,
            document.project_id,
            document.id,
            &annotators,
        )
        .await?)
    }

    /// Every record of `document`, regardless of permissions.
    pub async fn list_all_annotation_documents(
        &self,
        document: &SourceDocument,
    ) -> StoreResult<Vec<AnnotationDocument>> {
        Ok(
            AnnotationDocumentRepo::list_by_document(&self.pool, document.project_id, document.id)
                .await?,
        )
    }

    /// Records in the project held by current annotators, ordered by
    /// document name then username.
    pub async fn list_project_annotation_documents(
        &self,
        project_id: DbId,
    ) -> StoreResult<Vec<AnnotationDocument>> {
        let annotators = self.annotators(project_id).await?;
        Ok(AnnotationDocumentRepo::list_by_project_users(&self.pool, project_id, &annotators).await?)
    }

    pub async fn list_annotation_documents_for_user(
        &self,
        project_id: DbId,
        username: &str,
    ) -> StoreResult<Vec<AnnotationDocument>> {
        Ok(AnnotationDocumentRepo::list_by_project_user(&self.pool, project_id, username).await?)
    }

    /// Finished records of current annotators in the project.
    pub async fn list_finished_annotation_documents(
        &self,
        project_id: DbId,
    ) -> StoreResult<Vec<AnnotationDocument>> {
        let annotators = self.annotators(project_id).await?;
        Ok(AnnotationDocumentRepo::list_by_project_state_users(
            &self.pool,
            project_id,
            AnnotationDocumentState::Finished,
            &annotators,
        )
        .await?)
    }

    /// `documents × annotators − ignored`, the number of records a fully
    /// annotated project ends up with.
    ///
    /// Documents are those [`list_source_documents`](Self::list_source_documents)
    /// returns; ignored records are counted for current annotators only.
    pub async fn count_expected_annotation_documents(&self, project_id: DbId) -> StoreResult<i64> {
        let documents = SourceDocumentRepo::list_by_project(&self.pool, project_id).await?;
        let annotators = self.annotators(project_id).await?;
        let ignored = AnnotationDocumentRepo::count_by_project_state_users(
            &self.pool,
            project_id,
            AnnotationDocumentState::Ignore,
            &annotators,
        )
        .await?;
        Ok(documents.len() as i64 * annotators.len() as i64 - ignored)
    }

    /// Documents offered to `username`, ordered by name, each with the
    /// user's record if one exists. Ignored records are reported as `None`.
    pub async fn list_annotatable_documents(
        &self,
        project_id: DbId,
        username: &str,
    ) -> StoreResult<Vec<(SourceDocument, Option<AnnotationDocument>)>> {
        let documents = SourceDocumentRepo::list_annotatable(&self.pool, project_id).await?;
        let mut records = AnnotationDocumentRepo::list_by_project_user_excluding_state(
            &self.pool,
            project_id,
            username,
            AnnotationDocumentState::Ignore,
        )
        .await?;

        Ok(documents
            .into_iter()
            .map(|document| {
                let record = records
                    .iter()
                    .position(|r| r.document_id == document.id)
                    .map(|idx| records.swap_remove(idx));
                (document, record)
            })
            .collect())
    }
}
