//! SurrealDB connection configuration and setup
//!
//! Supports an in-memory engine (tests, local runs) and remote WebSocket
//! endpoints with root or database-user authentication.

use crate::error::StorageError;
use crate::migrations;
use surrealdb::engine::any::Any;
use surrealdb::opt::auth::{Database, Root};
use surrealdb::Surreal;
use tracing::{info, instrument};

const DEFAULT_NAMESPACE: &str = "octanalysis";
const DEFAULT_DATABASE: &str = "main";

/// Connection settings for the imaging database
#[derive(Debug, Clone)]
pub struct RepositoryConfig {
    /// Endpoint URL (e.g. "ws://10.0.0.5:8000" or "mem://")
    pub endpoint: String,
    /// Database username (ignored for `mem://`)
    pub username: Option<String>,
    /// Database password
    pub password: Option<String>,
    /// Namespace (default: "octanalysis")
    pub namespace: String,
    /// Database name (default: "main")
    pub database: String,
    /// Whether the credentials belong to a root user
    pub is_root: bool,
}

impl RepositoryConfig {
    /// Configuration for an endpoint without credentials.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            username: None,
            password: None,
            namespace: DEFAULT_NAMESPACE.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            is_root: false,
        }
    }

    /// In-memory engine
    pub fn in_memory() -> Self {
        Self::new("mem://")
    }

    /// Set credentials
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Set custom namespace
    pub fn with_namespace(mut self, ns: impl Into<String>) -> Self {
        self.namespace = ns.into();
        self
    }

    /// Set custom database
    pub fn with_database(mut self, db: impl Into<String>) -> Self {
        self.database = db.into();
        self
    }

    /// Set whether this is a root user
    pub fn with_root(mut self, is_root: bool) -> Self {
        self.is_root = is_root;
        self
    }

    /// Create from environment variables
    ///
    /// Reads:
    /// - QUALIFIER_DB_ENDPOINT (required)
    /// - QUALIFIER_DB_USERNAME / QUALIFIER_DB_PASSWORD (optional, both or neither)
    /// - QUALIFIER_DB_NAMESPACE (optional, default: "octanalysis")
    /// - QUALIFIER_DB_DATABASE (optional, default: "main")
    /// - QUALIFIER_DB_ROOT (optional, default: "false")
    pub fn from_env() -> Result<Self, StorageError> {
        let endpoint = std::env::var("QUALIFIER_DB_ENDPOINT").map_err(|_| {
            StorageError::Connection("QUALIFIER_DB_ENDPOINT not set".to_string())
        })?;
        let mut config = Self::new(endpoint);

        match (
            std::env::var("QUALIFIER_DB_USERNAME"),
            std::env::var("QUALIFIER_DB_PASSWORD"),
        ) {
            (Ok(user), Ok(pass)) => config = config.with_credentials(user, pass),
            (Err(_), Err(_)) => {}
            _ => {
                return Err(StorageError::Connection(
                    "QUALIFIER_DB_USERNAME and QUALIFIER_DB_PASSWORD must be set together"
                        .to_string(),
                ))
            }
        }

        if let Ok(ns) = std::env::var("QUALIFIER_DB_NAMESPACE") {
            config.namespace = ns;
        }
        if let Ok(db) = std::env::var("QUALIFIER_DB_DATABASE") {
            config.database = db;
        }
        config.is_root = std::env::var("QUALIFIER_DB_ROOT")
            .map(|v| v.to_lowercase() == "true")
            .unwrap_or(false);

        Ok(config)
    }
}

/// Open a connection, authenticate, select namespace/database and make sure
/// the schema exists.
#[instrument(skip(config), fields(endpoint = %config.endpoint, namespace = %config.namespace, database = %config.database))]
pub async fn connect(config: &RepositoryConfig) -> Result<Surreal<Any>, StorageError> {
    info!("Connecting to imaging database (root={})", config.is_root);

    let db = surrealdb::engine::any::connect(config.endpoint.as_str())
        .await
        .map_err(|e| {
            StorageError::Connection(format!("Failed to connect to {}: {}", config.endpoint, e))
        })?;

    if let (Some(username), Some(password)) = (&config.username, &config.password) {
        if config.is_root {
            db.signin(Root { username, password })
                .await
                .map_err(|e| StorageError::Connection(format!("Root auth failed: {e}")))?;
        } else {
            db.signin(Database {
                namespace: &config.namespace,
                database: &config.database,
                username,
                password,
            })
            .await
            .map_err(|e| StorageError::Connection(format!("DB auth failed: {e}")))?;
        }
    }

    db.use_ns(&config.namespace)
        .use_db(&config.database)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

    migrations::init_schema(&db).await?;

    info!("Imaging database connected and schema initialized");
    Ok(db)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = RepositoryConfig::new("ws://db:8000");
        assert_eq!(config.namespace, "octanalysis");
        assert_eq!(config.database, "main");
        assert!(config.username.is_none());
        assert!(!config.is_root);
    }

    #[test]
    fn test_config_builders() {
        let config = RepositoryConfig::in_memory()
            .with_credentials("reader", "secret")
            .with_namespace("study")
            .with_database("drcr")
            .with_root(true);
        assert_eq!(config.endpoint, "mem://");
        assert_eq!(config.username.as_deref(), Some("reader"));
        assert_eq!(config.namespace, "study");
        assert_eq!(config.database, "drcr");
        assert!(config.is_root);
    }

    #[tokio::test]
    async fn test_connect_in_memory() {
        let db = connect(&RepositoryConfig::in_memory()).await;
        assert!(db.is_ok());
    }

    #[tokio::test]
    async fn test_connect_unreachable_endpoint_is_connection_error() {
        let err = connect(&RepositoryConfig::new("ws://127.0.0.1:1"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Connection(_)));
    }
}
