//! Reading, writing and upgrading annotation graphs.

use annostore_core::graph::AnnotationGraph;
use annostore_core::identity::Identity;
use annostore_core::schema::UpgradeOutcome;
use annostore_core::state::SourceDocumentState;
use annostore_db::models::annotation_document::AnnotationDocument;
use annostore_db::models::source_document::SourceDocument;
use annostore_db::repositories::{AnnotationDocumentRepo, SourceDocumentRepo};
use chrono::Utc;

use super::{AccessUpdate, DocumentService};
use crate::error::StoreResult;

impl DocumentService {
    /// Whether `username` has a stored graph for `document`.
    pub async fn exists_annotation_graph(
        &self,
        document: &SourceDocument,
        username: &str,
    ) -> StoreResult<bool> {
        let identity = Identity::user(username)?;
        self.blobs
            .exists(document.project_id, document.id, &identity)
            .await
    }

    pub async fn exists_baseline_graph(&self, document: &SourceDocument) -> StoreResult<bool> {
        self.baseline.exists(document).await
    }

    /// The baseline graph, materialized on first use.
    pub async fn create_or_read_baseline_graph(
        &self,
        document: &SourceDocument,
    ) -> StoreResult<AnnotationGraph> {
        self.baseline.get_or_create(document).await
    }

    /// Read the graph a record's user holds for `document`.
    ///
    /// On first read the baseline graph is copied into the user's own blob.
    /// An existing user graph is returned exactly as stored: neither repair
    /// nor upgrade runs here, so annotation ids stay stable between reads.
    /// Use [`upgrade_and_save`](Self::upgrade_and_save) to upgrade.
    pub async fn read_annotation_graph(
        &self,
        document: &SourceDocument,
        record: &AnnotationDocument,
    ) -> StoreResult<AnnotationGraph> {
        record.ensure_belongs_to(document)?;
        let identity = Identity::user(&record.username)?;

        if self
            .blobs
            .exists(document.project_id, document.id, &identity)
            .await?
        {
            return self
                .blobs
                .read_graph(document.project_id, document.id, &identity)
                .await;
        }

        let graph = self.baseline.get_or_create(document).await?;
        self.blobs
            .write_graph(document.project_id, document.id, &identity, &graph)
            .await?;
        tracing::info!(
            project_id = document.project_id,
            document_id = document.id,
            username = %record.username,
            "Copied baseline graph for user"
        );
        Ok(graph)
    }

    /// Get-or-create the user's record, mark a fresh document as being
    /// annotated, and read the user's graph.
    pub async fn read_annotation_graph_for_user(
        &self,
        document: &SourceDocument,
        username: &str,
    ) -> StoreResult<AnnotationGraph> {
        let record = self
            .create_or_get_annotation_document(document, username)
            .await?;
        if SourceDocumentRepo::transition_state(
            &self.pool,
            document.id,
            SourceDocumentState::New,
            SourceDocumentState::AnnotationInProgress,
        )
        .await?
        .is_some()
        {
            tracing::info!(
                project_id = document.project_id,
                document_id = document.id,
                username,
                "Annotation started on document"
            );
        }
        self.read_annotation_graph(document, &record).await
    }

    /// Overwrite the user's graph.
    ///
    /// With `Some(update)`, the user's record (created if missing) also gets
    /// a new access timestamp and sentence position and moves to
    /// `in_progress`. `finished` and `ignore` records keep their state.
    pub async fn write_annotation_graph(
        &self,
        graph: &AnnotationGraph,
        document: &SourceDocument,
        username: &str,
        update: Option<AccessUpdate>,
    ) -> StoreResult<()> {
        let identity = Identity::user(username)?;
        self.blobs
            .write_graph(document.project_id, document.id, &identity, graph)
            .await?;

        if let Some(update) = update {
            let record = self
                .create_or_get_annotation_document(document, username)
                .await?;
            AnnotationDocumentRepo::touch(
                &self.pool,
                record.id,
                update.sentence_accessed,
                Utc::now(),
            )
            .await?;
        }
        Ok(())
    }

    /// Upgrade the user's stored graph to the current type system and write
    /// it back.
    ///
    /// Best effort: a missing record or graph, an already current graph, or
    /// any failure leaves the blob untouched and returns `false`.
    pub async fn upgrade_and_save(&self, document: &SourceDocument, username: &str) -> bool {
        match self.try_upgrade(document, username).await {
            Ok(upgraded) => upgraded,
            Err(e) => {
                tracing::warn!(
                    project_id = document.project_id,
                    document_id = document.id,
                    username,
                    error = %e,
                    "Annotation graph upgrade skipped"
                );
                false
            }
        }
    }

    async fn try_upgrade(&self, document: &SourceDocument, username: &str) -> StoreResult<bool> {
        if !AnnotationDocumentRepo::exists(&self.pool, document.id, username).await? {
            return Ok(false);
        }
        let identity = Identity::user(username)?;
        if !self
            .blobs
            .exists(document.project_id, document.id, &identity)
            .await?
        {
            return Ok(false);
        }

        let graph = self
            .blobs
            .read_graph(document.project_id, document.id, &identity)
            .await?;
        let from_version = graph.schema_version;
        match self.schema.upgrade(graph, document.id, username).await? {
            UpgradeOutcome::Upgraded(upgraded) => {
                self.blobs
                    .write_graph(document.project_id, document.id, &identity, &upgraded)
                    .await?;
                tracing::info!(
                    project_id = document.project_id,
                    document_id = document.id,
                    username,
                    from_version,
                    to_version = upgraded.schema_version,
                    "Upgraded annotation graph"
                );
                Ok(true)
            }
            UpgradeOutcome::AlreadyCurrent => Ok(false),
        }
    }
}
