//! Repository for the `project_permissions` table.

use annostore_core::state::PermissionLevel;
use annostore_core::types::DbId;
use sqlx::PgPool;

use crate::models::permission::ProjectPermission;

const COLUMNS: &str = "id, project_id, username, level_id, created_at";

pub struct ProjectPermissionRepo;

impl ProjectPermissionRepo {
    /// Grant `level` on a project. Granting an existing permission returns
    /// the existing row.
    pub async fn grant(
        pool: &PgPool,
        project_id: DbId,
        username: &str,
        level: PermissionLevel,
    ) -> Result<ProjectPermission, sqlx::Error> {
        let query = format!(
            "INSERT INTO project_permissions (project_id, username, level_id) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (project_id, username, level_id) \
             DO UPDATE SET username = project_permissions.username \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ProjectPermission>(&query)
            .bind(project_id)
            .bind(username)
            .bind(level.id())
            .fetch_one(pool)
            .await
    }

    /// Revoke a permission. Returns `true` if a row was removed.
    pub async fn revoke(
        pool: &PgPool,
        project_id: DbId,
        username: &str,
        level: PermissionLevel,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM project_permissions \
             WHERE project_id = $1 AND username = $2 AND level_id = $3",
        )
        .bind(project_id)
        .bind(username)
        .bind(level.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// All permissions held on a project.
    pub async fn list_by_project(
        pool: &PgPool,
        project_id: DbId,
    ) -> Result<Vec<ProjectPermission>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM project_permissions WHERE project_id = $1 \
             ORDER BY username ASC, level_id ASC"
        );
        sqlx::query_as::<_, ProjectPermission>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }

    /// Distinct usernames holding `level` on a project, ordered by name.
    ///
    /// Not filtered against the `users` table; stale rows are returned too.
    pub async fn list_usernames(
        pool: &PgPool,
        project_id: DbId,
        level: PermissionLevel,
    ) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT username FROM project_permissions \
             WHERE project_id = $1 AND level_id = $2 \
             ORDER BY username ASC",
        )
        .bind(project_id)
        .bind(level.id())
        .fetch_all(pool)
        .await
    }
}
