use std::sync::Arc;

use anyhow::Context;
use annostore_core::importer::PlainTextImporter;
use annostore_core::schema::NormalizingSchemaService;
use annostore_db::repositories::ProjectRepo;
use annostore_db::DbUserRegistry;
use annostore_storage::{BlobStore, DocumentService, StorageConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "annostore_storage=debug,annostore_sweep=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = StorageConfig::from_env();
    tracing::info!(
        repository = %config.repository_path.display(),
        max_connections = config.max_connections,
        "Loaded storage configuration"
    );

    // --- Database ---
    let database_url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL must be set")?;

    let pool = annostore_db::create_pool(database_url, config.max_connections)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connection pool created");

    annostore_db::health_check(&pool)
        .await
        .context("Database health check failed")?;

    annostore_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    // --- Service ---
    let service = DocumentService::new(
        pool.clone(),
        BlobStore::new(config.repository_path.clone()),
        Arc::new(PlainTextImporter),
        Arc::new(NormalizingSchemaService),
        Arc::new(DbUserRegistry::new(pool.clone())),
    );

    // --- Sweep ---
    let projects = ProjectRepo::list(&pool).await.context("Failed to list projects")?;
    let mut removed = 0;
    for project in &projects {
        let report = service
            .sweep_orphan_blobs(project.id)
            .await
            .with_context(|| format!("Sweep of project {} failed", project.id))?;
        tracing::info!(
            project_id = project.id,
            project = %project.name,
            scanned = report.scanned,
            removed = report.removed.len(),
            "Swept project"
        );
        removed += report.removed.len();
    }

    tracing::info!(projects = projects.len(), removed, "Orphan sweep complete");
    Ok(())
}
