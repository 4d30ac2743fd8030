//! # supernote-db
//!
//! PostgreSQL + pgvector persistence gateway for supernote.
//!
//! This crate is the only place that talks to the store. It provides:
//! - Connection pool management with configurable bounds
//! - [`PgNoteRepository`], the note CRUD and similarity-search gateway
//! - The embedded schema migration (feature `migrations`)
//!
//! ## Example
//!
//! ```rust,ignore
//! use supernote_db::{Database, NewNote, NoteRepository};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/supernote").await?;
//!
//!     let note = db.notes.insert(NewNote::new("Hello", "world")).await?;
//!     println!("Created note: {}", note.id);
//!     Ok(())
//! }
//! ```

pub mod notes;
pub mod pool;

// Test fixtures for integration tests
pub mod test_fixtures;

use async_trait::async_trait;

// Re-export core types
pub use supernote_core::*;

pub use notes::PgNoteRepository;
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};

/// Combined database context.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Note repository for CRUD and similarity search.
    pub notes: PgNoteRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            notes: PgNoteRepository::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Connect using the process configuration (pool bounds and query deadline).
    pub async fn from_config(config: &Config) -> Result<Self> {
        let pool =
            create_pool_with_config(&config.database_url, PoolConfig::from(&config.pool)).await?;
        let mut db = Self::new(pool);
        db.notes = db.notes.with_query_timeout(config.pool.query_timeout);
        Ok(db)
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }

    /// Close every connection. Later operations fail with [`Error::Cancelled`].
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!(
            subsystem = "database",
            component = "pool",
            op = "close",
            "Database connection closed"
        );
    }
}

#[async_trait]
impl HealthProbe for Database {
    async fn ping(&self) -> Result<()> {
        let timeout = self.notes.query_timeout();
        let result = tokio::time::timeout(timeout, sqlx::query("SELECT 1").execute(&self.pool))
            .await
            .map_err(|_| Error::Timeout(format!("ping exceeded {}ms", timeout.as_millis())))?;
        log_pool_metrics(&self.pool);
        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::PoolClosed) => {
                Err(Error::Cancelled("connection pool closed".to_string()))
            }
            Err(e) => Err(Error::Database(e)),
        }
    }
}
