//! Repository for the `source_documents` table.

use annostore_core::importer::TRAINING_FORMATS;
use annostore_core::state::SourceDocumentState;
use annostore_core::types::DbId;
use sqlx::PgPool;

use crate::models::source_document::{
    CreateSourceDocument, SourceDocument, UpdateSourceDocument,
};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, project_id, name, format, state_id, training_document, \
                       sentence_accessed, created_at, updated_at";

fn training_formats() -> Vec<String> {
    TRAINING_FORMATS.iter().map(|f| f.to_string()).collect()
}

/// Provides CRUD operations for source documents.
pub struct SourceDocumentRepo;

impl SourceDocumentRepo {
    /// Insert a new source document in state `new`, assigning its ID.
    ///
    /// Fails with a `uq_source_documents_project_name` violation if the
    /// project already holds a document with that name.
    pub async fn create(
        pool: &PgPool,
        input: &CreateSourceDocument,
    ) -> Result<SourceDocument, sqlx::Error> {
        let query = format!(
            "INSERT INTO source_documents (project_id, name, format, training_document)
             VALUES ($1, $2, $3, COALESCE($4, FALSE))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SourceDocument>(&query)
            .bind(input.project_id)
            .bind(&input.name)
            .bind(&input.format)
            .bind(input.training_document)
            .fetch_one(pool)
            .await
    }

    /// Update a source document. Only non-`None` fields in `input` are applied.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateSourceDocument,
    ) -> Result<Option<SourceDocument>, sqlx::Error> {
        let query = format!(
            "UPDATE source_documents SET
                name = COALESCE($2, name),
                format = COALESCE($3, format),
                state_id = COALESCE($4, state_id),
                training_document = COALESCE($5, training_document),
                sentence_accessed = COALESCE($6, sentence_accessed)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SourceDocument>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.format)
            .bind(input.state_id)
            .bind(input.training_document)
            .bind(input.sentence_accessed)
            .fetch_optional(pool)
            .await
    }

    /// Whether the project holds a document called `name`.
    pub async fn exists_by_name(
        pool: &PgPool,
        project_id: DbId,
        name: &str,
    ) -> Result<bool, sqlx::Error> {
        let row: (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM source_documents WHERE project_id = $1 AND name = $2)",
        )
        .bind(project_id)
        .bind(name)
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }

    /// Find a document by project and name.
    pub async fn find_by_name(
        pool: &PgPool,
        project_id: DbId,
        name: &str,
    ) -> Result<Option<SourceDocument>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM source_documents WHERE project_id = $1 AND name = $2");
        sqlx::query_as::<_, SourceDocument>(&query)
            .bind(project_id)
            .bind(name)
            .fetch_optional(pool)
            .await
    }

    /// Find a document by ID, scoped to its project.
    pub async fn find_by_id(
        pool: &PgPool,
        project_id: DbId,
        id: DbId,
    ) -> Result<Option<SourceDocument>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM source_documents WHERE id = $1 AND project_id = $2");
        sqlx::query_as::<_, SourceDocument>(&query)
            .bind(id)
            .bind(project_id)
            .fetch_optional(pool)
            .await
    }

    /// List a project's documents ordered by name, excluding training-only
    /// formats.
    pub async fn list_by_project(
        pool: &PgPool,
        project_id: DbId,
    ) -> Result<Vec<SourceDocument>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM source_documents
             WHERE project_id = $1 AND format <> ALL($2)
             ORDER BY name ASC"
        );
        sqlx::query_as::<_, SourceDocument>(&query)
            .bind(project_id)
            .bind(training_formats())
            .fetch_all(pool)
            .await
    }

    /// List every document of a project ordered by name, training formats
    /// included.
    pub async fn list_all_by_project(
        pool: &PgPool,
        project_id: DbId,
    ) -> Result<Vec<SourceDocument>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM source_documents WHERE project_id = $1 ORDER BY name ASC"
        );
        sqlx::query_as::<_, SourceDocument>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }

    /// IDs of every document of a project.
    pub async fn list_ids_by_project(
        pool: &PgPool,
        project_id: DbId,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "SELECT id FROM source_documents WHERE project_id = $1 ORDER BY id ASC",
        )
        .bind(project_id)
        .fetch_all(pool)
        .await
    }

    /// Documents offered for annotation: everything not flagged as training
    /// data, ordered by name.
    pub async fn list_annotatable(
        pool: &PgPool,
        project_id: DbId,
    ) -> Result<Vec<SourceDocument>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM source_documents
             WHERE project_id = $1 AND training_document = FALSE
             ORDER BY name ASC"
        );
        sqlx::query_as::<_, SourceDocument>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }

    /// Move a document from `from` to `to`. Returns `None` if the document
    /// is missing or not currently in `from`.
    pub async fn transition_state(
        pool: &PgPool,
        id: DbId,
        from: SourceDocumentState,
        to: SourceDocumentState,
    ) -> Result<Option<SourceDocument>, sqlx::Error> {
        let query = format!(
            "UPDATE source_documents SET state_id = $3
             WHERE id = $1 AND state_id = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SourceDocument>(&query)
            .bind(id)
            .bind(from.id())
            .bind(to.id())
            .fetch_optional(pool)
            .await
    }

    /// Permanently delete a document. Cascades to its annotation documents.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM source_documents WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
