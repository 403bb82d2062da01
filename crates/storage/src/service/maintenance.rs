//! Removal of documents and projects, and recovery of orphan blobs.

use std::collections::HashSet;

use annostore_core::types::DbId;
use annostore_db::models::source_document::SourceDocument;
use annostore_db::repositories::{AnnotationDocumentRepo, SourceDocumentRepo};
use serde::Serialize;

use super::DocumentService;
use crate::error::StoreResult;

/// Outcome of [`DocumentService::sweep_orphan_blobs`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Document containers found on disk.
    pub scanned: usize,
    /// Ids of the containers removed because no record refers to them.
    pub removed: Vec<DbId>,
}

impl DocumentService {
    /// Remove a document with all its annotation records and blobs.
    ///
    /// Records go first, then the document row, then the blob container,
    /// so an interrupted removal leaves only orphan blobs behind.
    pub async fn remove_source_document(&self, document: &SourceDocument) -> StoreResult<()> {
        let records = AnnotationDocumentRepo::delete_by_document(&self.pool, document.id).await?;
        SourceDocumentRepo::delete(&self.pool, document.id).await?;
        self.blobs
            .delete_document(document.project_id, document.id)
            .await?;
        self.baseline.evict(document.id);

        tracing::info!(
            project_id = document.project_id,
            document_id = document.id,
            name = %document.name,
            annotation_documents = records,
            "Removed source document"
        );
        Ok(())
    }

    /// Remove every document of a project, training documents included,
    /// then the project's blob container. The project row itself is left to
    /// its owner.
    pub async fn remove_project(&self, project_id: DbId) -> StoreResult<()> {
        let documents = SourceDocumentRepo::list_all_by_project(&self.pool, project_id).await?;
        let count = documents.len();
        for document in &documents {
            self.remove_source_document(document).await?;
        }
        self.blobs.delete_project(project_id).await?;
        tracing::info!(project_id, documents = count, "Removed project documents");
        Ok(())
    }

    /// Delete document containers of `project_id` that have no document row.
    ///
    /// Such containers are left behind when a removal is interrupted between
    /// its metadata and blob steps.
    pub async fn sweep_orphan_blobs(&self, project_id: DbId) -> StoreResult<SweepReport> {
        let on_disk = self.blobs.list_document_ids(project_id).await?;
        let known: HashSet<DbId> = SourceDocumentRepo::list_ids_by_project(&self.pool, project_id)
            .await?
            .into_iter()
            .collect();

        let mut report = SweepReport {
            scanned: on_disk.len(),
            removed: Vec::new(),
        };
        for document_id in on_disk {
            if known.contains(&document_id) {
                continue;
            }
            if self.blobs.delete_document(project_id, document_id).await? {
                tracing::warn!(project_id, document_id, "Removed orphan document blobs");
                report.removed.push(document_id);
            }
            self.baseline.evict(document_id);
        }
        Ok(report)
    }
}
