//! Document and annotation lifecycle manager.
//!
//! [`DocumentService`] composes the metadata store, the [`BlobStore`] and
//! the [`BaselineCache`]. The two stores share no transaction; multi-step
//! operations order their steps so that a crash leaves orphan blobs rather
//! than orphan rows, and undo completed steps explicitly when a later one
//! fails.
//!
//! Operations are grouped by concern:
//!
//! | Module        | Operations                                            |
//! |---------------|-------------------------------------------------------|
//! | `source`      | upload, create/update/get/list source documents       |
//! | `annotation`  | per-user records, state transitions, progress queries |
//! | `graph`       | baseline and per-user graph read/write/upgrade        |
//! | `maintenance` | document/project removal, orphan sweep                |

mod annotation;
mod graph;
mod maintenance;
mod source;

use std::sync::Arc;

use annostore_core::error::CoreError;
use annostore_core::importer::FormatImporter;
use annostore_core::registry::UserRegistry;
use annostore_core::schema::SchemaService;
use sqlx::PgPool;

use crate::baseline::BaselineCache;
use crate::blob::BlobStore;
use crate::error::{StoreError, StoreResult};

pub use maintenance::SweepReport;

/// Position update applied together with a graph write.
///
/// Passing `Some(AccessUpdate)` to
/// [`DocumentService::write_annotation_graph`] advances the record's access
/// timestamp and sentence position and moves it to `in_progress` unless it
/// is already `finished` or `ignore`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessUpdate {
    pub sentence_accessed: i32,
}

/// Lifecycle manager for source documents and their annotation artifacts.
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
pub struct DocumentService {
    pool: PgPool,
    blobs: BlobStore,
    baseline: Arc<BaselineCache>,
    schema: Arc<dyn SchemaService>,
    users: Arc<dyn UserRegistry>,
}

impl DocumentService {
    pub fn new(
        pool: PgPool,
        blobs: BlobStore,
        importer: Arc<dyn FormatImporter>,
        schema: Arc<dyn SchemaService>,
        users: Arc<dyn UserRegistry>,
    ) -> Self {
        let baseline = Arc::new(BaselineCache::new(
            blobs.clone(),
            importer,
            Arc::clone(&schema),
        ));
        Self {
            pool,
            blobs,
            baseline,
            schema,
            users,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }

    pub fn baseline(&self) -> &BaselineCache {
        &self.baseline
    }
}

/// Turn a lookup miss into a [`CoreError::NotFound`].
fn found<T>(row: Option<T>, entity: &'static str, key: impl std::fmt::Display) -> StoreResult<T> {
    row.ok_or_else(|| StoreError::from(CoreError::not_found(entity, key)))
}
