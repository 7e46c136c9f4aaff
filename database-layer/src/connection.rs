// Database connection management
use crate::error::{DatabaseError, DatabaseResult};
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use std::time::Duration;
use tracing::{debug, info, warn};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Pool settings for the Postgres connection
#[derive(Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 50,
            min_connections: 5,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            max_lifetime: Duration::from_secs(1800),
        }
    }

    /// Build the connection URL from discrete settings.
    ///
    /// Username and password are percent-encoded; `ssl` adds
    /// `sslmode=require`.
    pub fn from_parts(
        host: &str,
        port: u16,
        username: &str,
        password: &str,
        database: &str,
        ssl: bool,
    ) -> DatabaseResult<Self> {
        if host.is_empty() || username.is_empty() || database.is_empty() {
            return Err(DatabaseError::ConfigurationError(
                "host, username and database name are required".to_string(),
            ));
        }

        let mut url = url::Url::parse(&format!("postgres://{}:{}", host, port))
            .map_err(|e| DatabaseError::ConfigurationError(format!("invalid host: {}", e)))?;
        url.set_path(database);
        url.set_username(username)
            .map_err(|_| DatabaseError::ConfigurationError("invalid username".to_string()))?;
        if !password.is_empty() {
            url.set_password(Some(password))
                .map_err(|_| DatabaseError::ConfigurationError("invalid password".to_string()))?;
        }
        if ssl {
            url.query_pairs_mut().append_pair("sslmode", "require");
        }

        Ok(Self::new(url.to_string()))
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self.min_connections = self.min_connections.min(max);
        self
    }

    fn pool_options(&self) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(self.acquire_timeout)
            .idle_timeout(self.idle_timeout)
            .max_lifetime(self.max_lifetime)
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redacted = match url::Url::parse(&self.url) {
            Ok(mut url) => {
                if url.password().is_some() {
                    let _ = url.set_password(Some("***"));
                }
                url.to_string()
            }
            Err(_) => "<unparseable>".to_string(),
        };

        f.debug_struct("DatabaseConfig")
            .field("url", &redacted)
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .field("acquire_timeout", &self.acquire_timeout)
            .finish()
    }
}

/// Database connection pool wrapper
#[derive(Clone, Debug)]
pub struct DatabasePool {
    pool: PgPool,
}

impl DatabasePool {
    /// Connect eagerly; fails when the database is unreachable
    pub async fn connect(config: &DatabaseConfig) -> DatabaseResult<Self> {
        let pool = config
            .pool_options()
            .connect(&config.url)
            .await
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            "Database connection pool created successfully"
        );

        Ok(Self { pool })
    }

    /// Build the pool without opening a connection. Connections are made on
    /// first use. Must be called inside a tokio runtime.
    pub fn connect_lazy(config: &DatabaseConfig) -> DatabaseResult<Self> {
        let pool = config
            .pool_options()
            .connect_lazy(&config.url)
            .map_err(|e| DatabaseError::ConfigurationError(e.to_string()))?;

        debug!("Lazy database pool created");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the underlying PgPool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check if the pool is healthy
    pub async fn is_healthy(&self) -> bool {
        match sqlx::query("SELECT 1").fetch_one(&self.pool).await {
            Ok(_) => true,
            Err(e) => {
                warn!("Database health check failed: {}", e);
                false
            }
        }
    }

    /// Apply pending embedded migrations
    pub async fn migrate(&self) -> DatabaseResult<()> {
        MIGRATOR.run(&self.pool).await?;
        info!(
            migrations = MIGRATOR.iter().count(),
            "Database migrations applied"
        );
        Ok(())
    }

    pub async fn begin(&self) -> DatabaseResult<Transaction<'static, Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(|e| DatabaseError::QueryFailed(format!("Failed to begin transaction: {}", e)))
    }

    /// Close the pool
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database connection pool closed");
    }
}
