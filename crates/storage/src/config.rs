use std::path::PathBuf;

/// Storage configuration loaded from environment variables.
///
/// All fields except the database URL have defaults suitable for local
/// development.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Root directory of the blob repository.
    pub repository_path: PathBuf,
    /// PostgreSQL connection string. Required by binaries that connect.
    pub database_url: Option<String>,
    /// Upper bound on pooled database connections.
    pub max_connections: u32,
}

impl StorageConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var              | Default          |
    /// |----------------------|------------------|
    /// | `REPOSITORY_PATH`    | `./repository`   |
    /// | `DATABASE_URL`       | (none)           |
    /// | `DB_MAX_CONNECTIONS` | `20`             |
    pub fn from_env() -> Self {
        let repository_path = std::env::var("REPOSITORY_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./repository"));

        let database_url = std::env::var("DATABASE_URL").ok();

        let max_connections: u32 = std::env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "20".into())
            .parse()
            .expect("DB_MAX_CONNECTIONS must be a valid u32");

        Self {
            repository_path,
            database_url,
            max_connections,
        }
    }
}
