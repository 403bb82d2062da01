//! Filesystem blob repository.
//!
//! Holds the raw source bytes of every document and one serialized
//! annotation graph per (document, identity), addressed as described in
//! [`annostore_core::layout`]. Writes go to a temporary sibling, are synced,
//! then renamed into place, so a reader sees either the old or the new blob
//! and a successful `write` is visible to every later `read`.

use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use annostore_core::graph::AnnotationGraph;
use annostore_core::identity::Identity;
use annostore_core::layout;
use annostore_core::types::DbId;
use annostore_db::models::source_document::SourceDocument;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::{StoreError, StoreResult};

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Blob store rooted at an explicit repository directory.
#[derive(Debug, Clone)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of the annotation blob of `identity`.
    pub fn annotation_path(
        &self,
        project_id: DbId,
        document_id: DbId,
        identity: &Identity,
    ) -> PathBuf {
        self.root
            .join(layout::annotation_path(project_id, document_id, identity))
    }

    /// Absolute location of a document's raw source bytes.
    pub fn source_path(&self, document: &SourceDocument) -> PathBuf {
        self.root
            .join(layout::source_path(document.project_id, document.id, &document.name))
    }

    pub fn document_dir(&self, project_id: DbId, document_id: DbId) -> PathBuf {
        self.root.join(layout::document_dir(project_id, document_id))
    }

    pub fn project_dir(&self, project_id: DbId) -> PathBuf {
        self.root.join(layout::project_dir(project_id))
    }

    // -----------------------------------------------------------------------
    // Annotation blobs
    // -----------------------------------------------------------------------

    pub async fn exists(
        &self,
        project_id: DbId,
        document_id: DbId,
        identity: &Identity,
    ) -> StoreResult<bool> {
        path_exists(&self.annotation_path(project_id, document_id, identity)).await
    }

    pub async fn read(
        &self,
        project_id: DbId,
        document_id: DbId,
        identity: &Identity,
    ) -> StoreResult<Vec<u8>> {
        let path = self.annotation_path(project_id, document_id, identity);
        fs::read(&path).await.map_err(|e| StoreError::io(path, e))
    }

    /// Overwrite the blob of `identity`, creating parent containers as needed.
    pub async fn write(
        &self,
        project_id: DbId,
        document_id: DbId,
        identity: &Identity,
        bytes: &[u8],
    ) -> StoreResult<()> {
        let path = self.annotation_path(project_id, document_id, identity);
        write_atomic(&path, bytes).await?;
        tracing::debug!(
            project_id,
            document_id,
            identity = %identity,
            size = bytes.len(),
            "Wrote annotation blob"
        );
        Ok(())
    }

    /// Delete one annotation blob. Returns `false` if it did not exist.
    pub async fn delete(
        &self,
        project_id: DbId,
        document_id: DbId,
        identity: &Identity,
    ) -> StoreResult<bool> {
        remove_file_if_exists(&self.annotation_path(project_id, document_id, identity)).await
    }

    /// Read and decode an annotation graph.
    pub async fn read_graph(
        &self,
        project_id: DbId,
        document_id: DbId,
        identity: &Identity,
    ) -> StoreResult<AnnotationGraph> {
        let bytes = self.read(project_id, document_id, identity).await?;
        AnnotationGraph::from_json_bytes(&bytes).map_err(|source| StoreError::CorruptBlob {
            path: self.annotation_path(project_id, document_id, identity),
            source,
        })
    }

    /// Encode and write an annotation graph.
    pub async fn write_graph(
        &self,
        project_id: DbId,
        document_id: DbId,
        identity: &Identity,
        graph: &AnnotationGraph,
    ) -> StoreResult<()> {
        let bytes = graph
            .to_json_bytes()
            .map_err(|source| StoreError::CorruptBlob {
                path: self.annotation_path(project_id, document_id, identity),
                source,
            })?;
        self.write(project_id, document_id, identity, &bytes).await
    }

    // -----------------------------------------------------------------------
    // Source bytes
    // -----------------------------------------------------------------------

    pub async fn write_source(&self, document: &SourceDocument, bytes: &[u8]) -> StoreResult<()> {
        write_atomic(&self.source_path(document), bytes).await
    }

    pub async fn read_source(&self, document: &SourceDocument) -> StoreResult<Vec<u8>> {
        let path = self.source_path(document);
        fs::read(&path).await.map_err(|e| StoreError::io(path, e))
    }

    pub async fn source_exists(&self, document: &SourceDocument) -> StoreResult<bool> {
        path_exists(&self.source_path(document)).await
    }

    pub async fn delete_source(&self, document: &SourceDocument) -> StoreResult<bool> {
        remove_file_if_exists(&self.source_path(document)).await
    }

    // -----------------------------------------------------------------------
    // Containers
    // -----------------------------------------------------------------------

    /// Remove a document's whole sub-container (source and every blob).
    /// Returns `false` if there was nothing to remove.
    pub async fn delete_document(&self, project_id: DbId, document_id: DbId) -> StoreResult<bool> {
        remove_dir_if_exists(&self.document_dir(project_id, document_id)).await
    }

    /// Remove a project's container and everything below it.
    pub async fn delete_project(&self, project_id: DbId) -> StoreResult<bool> {
        remove_dir_if_exists(&self.project_dir(project_id)).await
    }

    /// IDs of the document sub-containers present for a project. Entries
    /// that are not numeric directories are ignored.
    pub async fn list_document_ids(&self, project_id: DbId) -> StoreResult<Vec<DbId>> {
        let dir = self.project_dir(project_id).join(layout::DOCUMENT_DIR);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(dir, e)),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::io(&dir, e))?
        {
            let is_dir = entry
                .file_type()
                .await
                .map_err(|e| StoreError::io(entry.path(), e))?
                .is_dir();
            if !is_dir {
                continue;
            }
            if let Some(id) = entry.file_name().to_str().and_then(|n| n.parse::<DbId>().ok()) {
                ids.push(id);
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }
}

async fn path_exists(path: &Path) -> StoreResult<bool> {
    fs::try_exists(path)
        .await
        .map_err(|e| StoreError::io(path, e))
}

/// Write `bytes` to a unique temporary sibling, fsync, then rename over `path`.
async fn write_atomic(path: &Path, bytes: &[u8]) -> StoreResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| StoreError::io(parent, e))?;
    }

    // Fixed-length name: the target name may already be at the file-name limit.
    let seq = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let tmp_path = path.with_file_name(format!(".tmp.{}.{seq}", std::process::id()));

    let result = async {
        let mut file = fs::File::create(&tmp_path)
            .await
            .map_err(|e| StoreError::io(&tmp_path, e))?;
        file.write_all(bytes)
            .await
            .map_err(|e| StoreError::io(&tmp_path, e))?;
        file.sync_all()
            .await
            .map_err(|e| StoreError::io(&tmp_path, e))?;
        drop(file);
        fs::rename(&tmp_path, path)
            .await
            .map_err(|e| StoreError::io(path, e))
    }
    .await;

    if result.is_err() {
        let _ = fs::remove_file(&tmp_path).await;
    }
    result
}

async fn remove_file_if_exists(path: &Path) -> StoreResult<bool> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == IoErrorKind::NotFound => Ok(false),
        Err(e) => Err(StoreError::io(path, e)),
    }
}

async fn remove_dir_if_exists(path: &Path) -> StoreResult<bool> {
    match fs::remove_dir_all(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == IoErrorKind::NotFound => Ok(false),
        Err(e) => Err(StoreError::io(path, e)),
    }
}
