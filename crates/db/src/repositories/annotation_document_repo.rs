//! Repository for the `annotation_documents` table.
//!
//! Methods taking a `usernames` slice are "known annotator" queries; an
//! empty slice short-circuits to an empty result without touching the
//! database.

use annostore_core::state::AnnotationDocumentState;
use annostore_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::annotation_document::{
    AnnotationDocument, CreateAnnotationDocument, UpdateAnnotationDocument,
};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, project_id, document_id, name, username, state_id, \
                       sentence_accessed, accessed_at, created_at, updated_at";

/// Provides CRUD operations for annotation documents.
pub struct AnnotationDocumentRepo;

impl AnnotationDocumentRepo {
    /// Insert a new annotation document in state `new`.
    ///
    /// A second record for the same (document, user) fails with a
    /// `uq_annotation_documents_document_user` violation.
    pub async fn create(
        pool: &PgPool,
        input: &CreateAnnotationDocument,
    ) -> Result<AnnotationDocument, sqlx::Error> {
        let query = format!(
            "INSERT INTO annotation_documents (project_id, document_id, name, username)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AnnotationDocument>(&query)
            .bind(input.project_id())
            .bind(input.document_id())
            .bind(input.name())
            .bind(input.username())
            .fetch_one(pool)
            .await
    }

    /// Update an annotation document. Only non-`None` fields are applied.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateAnnotationDocument,
    ) -> Result<Option<AnnotationDocument>, sqlx::Error> {
        let query = format!(
            "UPDATE annotation_documents SET
                state_id = COALESCE($2, state_id),
                sentence_accessed = COALESCE($3, sentence_accessed),
                accessed_at = COALESCE($4, accessed_at)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AnnotationDocument>(&query)
            .bind(id)
            .bind(input.state_id)
            .bind(input.sentence_accessed)
            .bind(input.accessed_at)
            .fetch_optional(pool)
            .await
    }

    /// Record a write: advance the access timestamp and sentence position
    /// and move `new`/`in_progress` records to `in_progress`. `finished`
    /// and `ignore` records keep their state.
    pub async fn touch(
        pool: &PgPool,
        id: DbId,
        sentence_accessed: i32,
        accessed_at: Timestamp,
    ) -> Result<Option<AnnotationDocument>, sqlx::Error> {
        let query = format!(
            "UPDATE annotation_documents SET
                sentence_accessed = $2,
                accessed_at = $3,
                state_id = CASE WHEN state_id IN ($4, $5) THEN $5 ELSE state_id END
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AnnotationDocument>(&query)
            .bind(id)
            .bind(sentence_accessed)
            .bind(accessed_at)
            .bind(AnnotationDocumentState::New.id())
            .bind(AnnotationDocumentState::InProgress.id())
            .fetch_optional(pool)
            .await
    }

    /// Set the state unconditionally. Callers enforce the state machine.
    pub async fn set_state(
        pool: &PgPool,
        id: DbId,
        state: AnnotationDocumentState,
    ) -> Result<Option<AnnotationDocument>, sqlx::Error> {
        let query = format!(
            "UPDATE annotation_documents SET state_id = $2 WHERE id = $1 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AnnotationDocument>(&query)
            .bind(id)
            .bind(state.id())
            .fetch_optional(pool)
            .await
    }

    /// Whether `username` has a record for the document.
    pub async fn exists(
        pool: &PgPool,
        document_id: DbId,
        username: &str,
    ) -> Result<bool, sqlx::Error> {
        let row: (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM annotation_documents \
             WHERE document_id = $1 AND username = $2)",
        )
        .bind(document_id)
        .bind(username)
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }

    /// Find the record of `username` for a document.
    pub async fn find(
        pool: &PgPool,
        document_id: DbId,
        username: &str,
    ) -> Result<Option<AnnotationDocument>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM annotation_documents WHERE document_id = $1 AND username = $2"
        );
        sqlx::query_as::<_, AnnotationDocument>(&query)
            .bind(document_id)
            .bind(username)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<AnnotationDocument>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM annotation_documents WHERE id = $1");
        sqlx::query_as::<_, AnnotationDocument>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Every record of a document regardless of user.
    pub async fn list_by_document(
        pool: &PgPool,
        project_id: DbId,
        document_id: DbId,
    ) -> Result<Vec<AnnotationDocument>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM annotation_documents
             WHERE project_id = $1 AND document_id = $2
             ORDER BY username ASC"
        );
        sqlx::query_as::<_, AnnotationDocument>(&query)
            .bind(project_id)
            .bind(document_id)
            .fetch_all(pool)
            .await
    }

    /// Records of a document restricted to `usernames`.
    pub async fn list_by_document_users(
        pool: &PgPool,
        project_id: DbId,
        document_id: DbId,
        usernames: &[String],
    ) -> Result<Vec<AnnotationDocument>, sqlx::Error> {
        if usernames.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!(
            "SELECT {COLUMNS} FROM annotation_documents
             WHERE project_id = $1 AND document_id = $2 AND username = ANY($3)
             ORDER BY username ASC"
        );
        sqlx::query_as::<_, AnnotationDocument>(&query)
            .bind(project_id)
            .bind(document_id)
            .bind(usernames)
            .fetch_all(pool)
            .await
    }

    /// Records one user holds in a project, ordered by document name.
    pub async fn list_by_project_user(
        pool: &PgPool,
        project_id: DbId,
        username: &str,
    ) -> Result<Vec<AnnotationDocument>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM annotation_documents
             WHERE project_id = $1 AND username = $2
             ORDER BY name ASC"
        );
        sqlx::query_as::<_, AnnotationDocument>(&query)
            .bind(project_id)
            .bind(username)
            .fetch_all(pool)
            .await
    }

    /// Records one user holds in a project whose state is not `excluded`.
    pub async fn list_by_project_user_excluding_state(
        pool: &PgPool,
        project_id: DbId,
        username: &str,
        excluded: AnnotationDocumentState,
    ) -> Result<Vec<AnnotationDocument>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM annotation_documents
             WHERE project_id = $1 AND username = $2 AND state_id <> $3
             ORDER BY name ASC"
        );
        sqlx::query_as::<_, AnnotationDocument>(&query)
            .bind(project_id)
            .bind(username)
            .bind(excluded.id())
            .fetch_all(pool)
            .await
    }

    /// Records in a project held by `usernames`.
    pub async fn list_by_project_users(
        pool: &PgPool,
        project_id: DbId,
        usernames: &[String],
    ) -> Result<Vec<AnnotationDocument>, sqlx::Error> {
        if usernames.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!(
            "SELECT {COLUMNS} FROM annotation_documents
             WHERE project_id = $1 AND username = ANY($2)
             ORDER BY name ASC, username ASC"
        );
        sqlx::query_as::<_, AnnotationDocument>(&query)
            .bind(project_id)
            .bind(usernames)
            .fetch_all(pool)
            .await
    }

    /// Records in a project in `state` held by `usernames`.
    pub async fn list_by_project_state_users(
        pool: &PgPool,
        project_id: DbId,
        state: AnnotationDocumentState,
        usernames: &[String],
    ) -> Result<Vec<AnnotationDocument>, sqlx::Error> {
        if usernames.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!(
            "SELECT {COLUMNS} FROM annotation_documents
             WHERE project_id = $1 AND state_id = $2 AND username = ANY($3)
             ORDER BY name ASC, username ASC"
        );
        sqlx::query_as::<_, AnnotationDocument>(&query)
            .bind(project_id)
            .bind(state.id())
            .bind(usernames)
            .fetch_all(pool)
            .await
    }

    /// Count records in a project in `state` held by `usernames`.
    pub async fn count_by_project_state_users(
        pool: &PgPool,
        project_id: DbId,
        state: AnnotationDocumentState,
        usernames: &[String],
    ) -> Result<i64, sqlx::Error> {
        if usernames.is_empty() {
            return Ok(0);
        }
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM annotation_documents \
             WHERE project_id = $1 AND state_id = $2 AND username = ANY($3)",
        )
        .bind(project_id)
        .bind(state.id())
        .bind(usernames)
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }

    /// Whether any record of the document is in `state`.
    pub async fn exists_in_state_for_document(
        pool: &PgPool,
        document_id: DbId,
        state: AnnotationDocumentState,
    ) -> Result<bool, sqlx::Error> {
        let row: (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM annotation_documents \
             WHERE document_id = $1 AND state_id = $2)",
        )
        .bind(document_id)
        .bind(state.id())
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }

    /// Whether any record in the project is in `state`.
    pub async fn exists_in_state_for_project(
        pool: &PgPool,
        project_id: DbId,
        state: AnnotationDocumentState,
    ) -> Result<bool, sqlx::Error> {
        let row: (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM annotation_documents \
             WHERE project_id = $1 AND state_id = $2)",
        )
        .bind(project_id)
        .bind(state.id())
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }

    /// Permanently delete a record. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM annotation_documents WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every record of a document. Returns the number of rows removed.
    pub async fn delete_by_document(pool: &PgPool, document_id: DbId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM annotation_documents WHERE document_id = $1")
            .bind(document_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
