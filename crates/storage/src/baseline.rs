//! Lazy materialization of baseline annotation graphs.
//!
//! The baseline graph of a document is what the format importer produces
//! from its raw bytes, before any user has annotated it. Conversion is
//! expensive and deterministic, so the result is persisted as the blob of
//! the baseline pseudo-identity and reused by every later caller.
//!
//! A per-document lock is held across "check existence, import, repair,
//! persist", so concurrent first access converts at most once and nobody
//! observes a half-written baseline.

use std::sync::Arc;

use annostore_core::error::CoreError;
use annostore_core::graph::AnnotationGraph;
use annostore_core::identity::Identity;
use annostore_core::importer::FormatImporter;
use annostore_core::schema::SchemaService;
use annostore_core::types::DbId;
use annostore_db::models::source_document::SourceDocument;

use crate::blob::BlobStore;
use crate::error::{StoreError, StoreResult};
use crate::locks::KeyedLocks;

pub struct BaselineCache {
    blobs: BlobStore,
    importer: Arc<dyn FormatImporter>,
    schema: Arc<dyn SchemaService>,
    locks: KeyedLocks<DbId>,
}

impl BaselineCache {
    pub fn new(
        blobs: BlobStore,
        importer: Arc<dyn FormatImporter>,
        schema: Arc<dyn SchemaService>,
    ) -> Self {
        Self {
            blobs,
            importer,
            schema,
            locks: KeyedLocks::new(),
        }
    }

    /// Whether the baseline graph has been materialized.
    pub async fn exists(&self, document: &SourceDocument) -> StoreResult<bool> {
        self.blobs
            .exists(document.project_id, document.id, &Identity::Baseline)
            .await
    }

    /// Return the baseline graph of `document`, converting and persisting it
    /// on first use.
    ///
    /// Repair runs on every return path; conversion runs only when no
    /// baseline blob exists. Importer or repair failures surface as
    /// [`CoreError::Conversion`] and leave no blob behind.
    pub async fn get_or_create(&self, document: &SourceDocument) -> StoreResult<AnnotationGraph> {
        let guard = self.locks.lock(&document.id).await;
        let result = self.load_or_convert(document).await;
        drop(guard);
        // Keep only contended entries in the table.
        self.locks.remove_idle(&document.id);
        result
    }

    async fn load_or_convert(&self, document: &SourceDocument) -> StoreResult<AnnotationGraph> {
        if self.exists(document).await? {
            tracing::debug!(
                project_id = document.project_id,
                document_id = document.id,
                "Baseline graph cache hit"
            );
            let mut graph = self
                .blobs
                .read_graph(document.project_id, document.id, &Identity::Baseline)
                .await?;
            self.repair(document, &mut graph).await?;
            return Ok(graph);
        }

        let graph = self.convert(document).await?;
        self.blobs
            .write_graph(document.project_id, document.id, &Identity::Baseline, &graph)
            .await?;
        tracing::info!(
            project_id = document.project_id,
            document_id = document.id,
            format = %document.format,
            annotations = graph.annotations.len(),
            "Materialized baseline graph"
        );
        Ok(graph)
    }

    /// Forget the lock entry of a removed document.
    pub fn evict(&self, document_id: DbId) {
        self.locks.remove_idle(&document_id);
    }

    /// Number of documents with a lock entry.
    pub fn lock_count(&self) -> usize {
        self.locks.len()
    }

    async fn convert(&self, document: &SourceDocument) -> StoreResult<AnnotationGraph> {
        let raw = self.blobs.read_source(document).await?;
        let mut graph = self
            .importer
            .import(&raw, &document.format)
            .await
            .map_err(|e| conversion_failure(document, e))?;
        self.repair(document, &mut graph).await?;
        Ok(graph)
    }

    async fn repair(
        &self,
        document: &SourceDocument,
        graph: &mut AnnotationGraph,
    ) -> StoreResult<()> {
        self.schema
            .validate_and_repair(graph, document.id, &Identity::Baseline)
            .await
            .map_err(|e| conversion_failure(document, e))
    }
}

fn conversion_failure(document: &SourceDocument, err: CoreError) -> StoreError {
    tracing::error!(
        project_id = document.project_id,
        document_id = document.id,
        format = %document.format,
        error = %err,
        "The reader is unable to digest data"
    );
    match err {
        conversion @ CoreError::Conversion { .. } => conversion.into(),
        other => CoreError::conversion(&document.format, other).into(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use annostore_core::importer::{PlainTextImporter, FORMAT_PLAIN_TEXT};
    use annostore_core::schema::{NormalizingSchemaService, UpgradeOutcome};
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use chrono::Utc;

    use super::*;
    use crate::error::ErrorKind;

    /// Plain-text importer that counts calls and sleeps to widen races.
    struct CountingImporter {
        calls: AtomicUsize,
        delay: Duration,
    }

    impl CountingImporter {
        fn new(delay: Duration) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                delay,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl FormatImporter for CountingImporter {
        async fn import(&self, raw: &[u8], format: &str) -> Result<AnnotationGraph, CoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            PlainTextImporter.import(raw, format).await
        }
    }

    /// Schema service whose repair always fails.
    struct RejectingSchema;

    #[async_trait]
    impl SchemaService for RejectingSchema {
        async fn validate_and_repair(
            &self,
            _graph: &mut AnnotationGraph,
            _document_id: DbId,
            _identity: &Identity,
        ) -> Result<(), CoreError> {
            Err(CoreError::Validation("offsets out of range".into()))
        }

        async fn upgrade(
            &self,
            _graph: AnnotationGraph,
            _document_id: DbId,
            _username: &str,
        ) -> Result<UpgradeOutcome, CoreError> {
            Ok(UpgradeOutcome::AlreadyCurrent)
        }
    }

    fn document(id: DbId, format: &str) -> SourceDocument {
        SourceDocument {
            id,
            project_id: 1,
            name: format!("doc-{id}.txt"),
            format: format.into(),
            state_id: 1,
            training_document: false,
            sentence_accessed: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    async fn setup(
        importer: Arc<dyn FormatImporter>,
        schema: Arc<dyn SchemaService>,
    ) -> (tempfile::TempDir, BlobStore, BaselineCache) {
        let dir = tempfile::tempdir().unwrap();
        let blobs = BlobStore::new(dir.path());
        let cache = BaselineCache::new(blobs.clone(), importer, schema);
        (dir, blobs, cache)
    }

    #[tokio::test]
    async fn first_call_converts_and_persists() {
        let importer = Arc::new(CountingImporter::new(Duration::ZERO));
        let (_dir, blobs, cache) =
            setup(importer.clone(), Arc::new(NormalizingSchemaService)).await;
        let doc = document(1, FORMAT_PLAIN_TEXT);
        blobs.write_source(&doc, b"One.\nTwo.").await.unwrap();

        assert!(!cache.exists(&doc).await.unwrap());
        let graph = cache.get_or_create(&doc).await.unwrap();
        assert_eq!(graph.annotations.len(), 2);
        assert!(cache.exists(&doc).await.unwrap());

        let again = cache.get_or_create(&doc).await.unwrap();
        assert_eq!(again, graph);
        assert_eq!(importer.calls(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_first_access_converts_once() {
        let importer = Arc::new(CountingImporter::new(Duration::from_millis(50)));
        let (_dir, blobs, cache) =
            setup(importer.clone(), Arc::new(NormalizingSchemaService)).await;
        let cache = Arc::new(cache);
        let doc = document(7, FORMAT_PLAIN_TEXT);
        blobs
            .write_source(&doc, b"Alpha beta.\nGamma delta.\nEpsilon.")
            .await
            .unwrap();

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let doc = doc.clone();
                tokio::spawn(async move { cache.get_or_create(&doc).await })
            })
            .collect();

        let graphs: Vec<AnnotationGraph> = futures::future::join_all(tasks)
            .await
            .into_iter()
            .map(|joined| joined.unwrap().unwrap())
            .collect();

        assert_eq!(importer.calls(), 1);
        assert!(graphs.windows(2).all(|pair| pair[0] == pair[1]));
        assert_eq!(graphs[0].annotations.len(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn different_documents_convert_independently() {
        let importer = Arc::new(CountingImporter::new(Duration::from_millis(10)));
        let (_dir, blobs, cache) =
            setup(importer.clone(), Arc::new(NormalizingSchemaService)).await;
        let cache = Arc::new(cache);

        let docs: Vec<_> = (1..=4).map(|id| document(id, FORMAT_PLAIN_TEXT)).collect();
        for doc in &docs {
            blobs.write_source(doc, b"Text.").await.unwrap();
        }

        let tasks: Vec<_> = docs
            .iter()
            .cloned()
            .flat_map(|doc| {
                let cache = Arc::clone(&cache);
                (0..3).map(move |_| {
                    let cache = Arc::clone(&cache);
                    let doc = doc.clone();
                    tokio::spawn(async move { cache.get_or_create(&doc).await })
                })
            })
            .collect();
        for joined in futures::future::join_all(tasks).await {
            joined.unwrap().unwrap();
        }

        assert_eq!(importer.calls(), 4);
        assert_eq!(cache.lock_count(), 0);
    }

    #[tokio::test]
    async fn lock_entry_released_after_each_call() {
        let (_dir, blobs, cache) = setup(
            Arc::new(PlainTextImporter),
            Arc::new(NormalizingSchemaService),
        )
        .await;
        let doc = document(6, FORMAT_PLAIN_TEXT);
        blobs.write_source(&doc, b"Text.").await.unwrap();

        cache.get_or_create(&doc).await.unwrap();
        assert_eq!(cache.lock_count(), 0);

        cache.get_or_create(&doc).await.unwrap();
        assert_eq!(cache.lock_count(), 0);

        let failing = document(8, FORMAT_PLAIN_TEXT);
        cache.get_or_create(&failing).await.unwrap_err();
        assert_eq!(cache.lock_count(), 0);
    }

    #[tokio::test]
    async fn importer_failure_leaves_no_baseline() {
        let (_dir, blobs, cache) = setup(
            Arc::new(PlainTextImporter),
            Arc::new(NormalizingSchemaService),
        )
        .await;
        let doc = document(2, FORMAT_PLAIN_TEXT);
        blobs.write_source(&doc, &[0xff, 0xfe, 0xfd]).await.unwrap();

        let err = cache.get_or_create(&doc).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConversionFailure);
        assert!(!cache.exists(&doc).await.unwrap());
    }

    #[tokio::test]
    async fn repair_failure_is_a_conversion_failure_with_format() {
        let (_dir, blobs, cache) =
            setup(Arc::new(PlainTextImporter), Arc::new(RejectingSchema)).await;
        let doc = document(3, FORMAT_PLAIN_TEXT);
        blobs.write_source(&doc, b"Fine text.").await.unwrap();

        let err = cache.get_or_create(&doc).await.unwrap_err();
        assert_matches!(
            err,
            StoreError::Core(CoreError::Conversion { ref format, ref cause })
                if format == "text" && cause.contains("offsets out of range")
        );
        assert!(!cache.exists(&doc).await.unwrap());
    }

    #[tokio::test]
    async fn missing_source_is_io_failure() {
        let (_dir, _blobs, cache) = setup(
            Arc::new(PlainTextImporter),
            Arc::new(NormalizingSchemaService),
        )
        .await;
        let err = cache
            .get_or_create(&document(4, FORMAT_PLAIN_TEXT))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IoFailure);
    }

    #[tokio::test]
    async fn cached_baseline_is_repaired_on_read() {
        let (_dir, blobs, cache) = setup(
            Arc::new(PlainTextImporter),
            Arc::new(NormalizingSchemaService),
        )
        .await;
        let doc = document(5, FORMAT_PLAIN_TEXT);
        let mut stored = AnnotationGraph::new("Hello");
        stored.add("Token", 0, 5);
        stored.add("Token", 2, 99);
        blobs
            .write_graph(doc.project_id, doc.id, &Identity::Baseline, &stored)
            .await
            .unwrap();

        let graph = cache.get_or_create(&doc).await.unwrap();
        assert_eq!(graph.annotations.len(), 1);
        assert_eq!(graph.annotations[0].id, 1);
    }
}
