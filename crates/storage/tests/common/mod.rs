#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use annostore_core::error::CoreError;
use annostore_core::graph::AnnotationGraph;
use annostore_core::importer::{FormatImporter, PlainTextImporter, FORMAT_PLAIN_TEXT};
use annostore_core::schema::NormalizingSchemaService;
use annostore_core::state::PermissionLevel;
use annostore_core::types::DbId;
use annostore_db::models::project::{CreateProject, Project};
use annostore_db::models::source_document::{CreateSourceDocument, SourceDocument};
use annostore_db::models::user::CreateUser;
use annostore_db::repositories::{ProjectPermissionRepo, ProjectRepo, UserRepo};
use annostore_db::DbUserRegistry;
use annostore_storage::{BlobStore, DocumentService};
use async_trait::async_trait;
use sqlx::PgPool;
use tempfile::TempDir;

/// Plain-text importer that counts calls and can be slowed down to widen
/// race windows.
pub struct CountingImporter {
    calls: AtomicUsize,
    delay: Duration,
}

impl CountingImporter {
    pub fn new(delay: Duration) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FormatImporter for CountingImporter {
    async fn import(&self, raw: &[u8], format: &str) -> Result<AnnotationGraph, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        PlainTextImporter.import(raw, format).await
    }
}

/// A service over a fresh blob directory plus handles tests inspect.
pub struct TestEnv {
    pub service: Arc<DocumentService>,
    pub importer: Arc<CountingImporter>,
    pub blobs: BlobStore,
    _dir: TempDir,
}

pub fn test_env(pool: PgPool) -> TestEnv {
    test_env_with_delay(pool, Duration::ZERO)
}

pub fn test_env_with_delay(pool: PgPool, delay: Duration) -> TestEnv {
    let dir = tempfile::tempdir().unwrap();
    let blobs = BlobStore::new(dir.path());
    let importer = Arc::new(CountingImporter::new(delay));
    let service = DocumentService::new(
        pool.clone(),
        blobs.clone(),
        importer.clone(),
        Arc::new(NormalizingSchemaService),
        Arc::new(DbUserRegistry::new(pool)),
    );
    TestEnv {
        service: Arc::new(service),
        importer,
        blobs,
        _dir: dir,
    }
}

pub async fn new_project(pool: &PgPool, name: &str) -> Project {
    ProjectRepo::create(
        pool,
        &CreateProject {
            name: name.to_string(),
        },
    )
    .await
    .unwrap()
}

/// Create an account and grant it the annotator permission on `project_id`.
pub async fn new_annotator(pool: &PgPool, project_id: DbId, username: &str) {
    UserRepo::create(
        pool,
        &CreateUser {
            username: username.to_string(),
        },
    )
    .await
    .unwrap();
    ProjectPermissionRepo::grant(pool, project_id, username, PermissionLevel::User)
        .await
        .unwrap();
}

pub fn text_document(project_id: DbId, name: &str) -> CreateSourceDocument {
    CreateSourceDocument {
        project_id,
        name: name.to_string(),
        format: FORMAT_PLAIN_TEXT.to_string(),
        training_document: None,
    }
}

/// Upload a plain-text document with the given content.
pub async fn upload_text(
    env: &TestEnv,
    project_id: DbId,
    name: &str,
    content: &str,
) -> SourceDocument {
    env.service
        .upload(&text_document(project_id, name), content.as_bytes())
        .await
        .unwrap()
}
