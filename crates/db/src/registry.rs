use annostore_core::error::CoreError;
use annostore_core::registry::UserRegistry;
use async_trait::async_trait;
use sqlx::PgPool;

use crate::repositories::UserRepo;

/// [`UserRegistry`] backed by the `users` table.
#[derive(Debug, Clone)]
pub struct DbUserRegistry {
    pool: PgPool,
}

impl DbUserRegistry {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRegistry for DbUserRegistry {
    async fn username_exists(&self, username: &str) -> Result<bool, CoreError> {
        UserRepo::exists(&self.pool, username).await.map_err(|e| {
            tracing::error!(error = %e, username, "User lookup failed");
            CoreError::Internal(format!("User lookup failed: {e}"))
        })
    }
}
