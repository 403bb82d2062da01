use async_trait::async_trait;

use crate::error::CoreError;

/// Lookup of accounts known to the platform.
///
/// Permission rows can outlive their users (e.g. after a project import),
/// so annotator queries filter usernames through this registry.
#[async_trait]
pub trait UserRegistry: Send + Sync {
    async fn username_exists(&self, username: &str) -> Result<bool, CoreError>;
}
