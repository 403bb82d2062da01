use annostore_core::error::CoreError;
use annostore_core::state::{PermissionLevel, StatusId};
use annostore_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `project_permissions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ProjectPermission {
    pub id: DbId,
    pub project_id: DbId,
    pub username: String,
    pub level_id: StatusId,
    pub created_at: Timestamp,
}

impl ProjectPermission {
    pub fn level(&self) -> Result<PermissionLevel, CoreError> {
        PermissionLevel::from_id(self.level_id)
    }
}
