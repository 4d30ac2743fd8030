//! Note repository implementation.
//!
//! Each operation checks out one connection, learns its backend pid, and runs
//! a single statement under the repository deadline. If the deadline passes or
//! the caller drops the future first, the statement is cancelled on the server
//! with `pg_cancel_backend` and the connection is kept out of the pool.

use std::future::Future;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use pgvector::Vector;
use serde_json::Value as JsonValue;
use sqlx::pool::PoolConnection;
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, Pool, Postgres, Row};
use tracing::{debug, warn};
use uuid::Uuid;

use supernote_core::{
    defaults, Error, Metadata, NewNote, Note, NoteRepository, Page, Result, SearchResult,
};

const NOTE_COLUMNS: &str =
    "id, user_id, title, content, chunk_content, metadata, created_at, updated_at";

/// SQLSTATE for `statement_timeout` and `pg_cancel_backend` aborts.
const QUERY_CANCELED: &str = "57014";

/// PostgreSQL implementation of NoteRepository.
#[derive(Clone)]
pub struct PgNoteRepository {
    pool: Pool<Postgres>,
    query_timeout: Duration,
}

/// A connection checked out for one statement.
///
/// Dropped while armed, it cancels whatever that backend is running and
/// detaches the connection so the pool never hands it out mid-cancel.
struct Lease {
    conn: Option<PoolConnection<Postgres>>,
    pool: Pool<Postgres>,
    pid: i32,
    op: &'static str,
    armed: bool,
}

impl Lease {
    fn conn(&mut self) -> Result<&mut PgConnection> {
        self.conn
            .as_deref_mut()
            .ok_or_else(|| Error::Internal("connection already released".to_string()))
    }

    /// Hand the outcome back, disarming unless the statement was abandoned.
    fn settle<T>(mut self, result: Result<T>) -> Result<T> {
        if !matches!(result, Err(Error::Timeout(_))) {
            self.armed = false;
        }
        result
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let Some(conn) = self.conn.take() else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let pool = self.pool.clone();
        let (pid, op) = (self.pid, self.op);

        runtime.spawn(async move {
            let raw = conn.detach();
            match sqlx::query_scalar::<_, bool>("SELECT pg_cancel_backend($1)")
                .bind(pid)
                .fetch_one(&pool)
                .await
            {
                Ok(signalled) => debug!(
                    subsystem = "database",
                    component = "notes",
                    op,
                    backend_pid = pid,
                    signalled,
                    "Abandoned statement cancelled"
                ),
                Err(e) => warn!(
                    subsystem = "database",
                    component = "notes",
                    op,
                    backend_pid = pid,
                    error = %e,
                    "Failed to cancel abandoned statement"
                ),
            }
            drop(raw);
        });
    }
}

impl PgNoteRepository {
    /// Create a new PgNoteRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            pool,
            query_timeout: Duration::from_secs(defaults::DB_QUERY_TIMEOUT_SECS),
        }
    }

    /// Override the per-operation deadline.
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    pub fn query_timeout(&self) -> Duration {
        self.query_timeout
    }

    fn deadline(&self) -> tokio::time::Instant {
        tokio::time::Instant::now() + self.query_timeout
    }

    async fn within<T, F>(
        &self,
        op: &'static str,
        deadline: tokio::time::Instant,
        fut: F,
    ) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout_at(deadline, fut).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(format!(
                "{} exceeded {}ms",
                op,
                self.query_timeout.as_millis()
            ))),
        }
    }

    async fn lease(&self, op: &'static str, deadline: tokio::time::Instant) -> Result<Lease> {
        self.within(op, deadline, async {
            let mut conn = self.pool.acquire().await.map_err(store_error)?;
            let pid: i32 = sqlx::query_scalar("SELECT pg_backend_pid()")
                .fetch_one(&mut *conn)
                .await
                .map_err(store_error)?;
            Ok(Lease {
                conn: Some(conn),
                pool: self.pool.clone(),
                pid,
                op,
                armed: true,
            })
        })
        .await
    }
}

/// Classify a driver error into the domain taxonomy.
fn store_error(err: sqlx::Error) -> Error {
    match err {
        sqlx::Error::PoolClosed => Error::Cancelled("connection pool closed".to_string()),
        sqlx::Error::PoolTimedOut => {
            Error::Timeout("timed out waiting for a database connection".to_string())
        }
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            Error::Conflict(db_err.message().to_string())
        }
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(QUERY_CANCELED) => {
            Error::Timeout(db_err.message().to_string())
        }
        other => Error::Database(other),
    }
}

fn check_dimension(embedding: &[f32]) -> Result<()> {
    if embedding.len() != defaults::EMBED_DIMENSION {
        return Err(Error::InvalidInput(format!(
            "embedding must have {} dimensions, got {}",
            defaults::EMBED_DIMENSION,
            embedding.len()
        )));
    }
    Ok(())
}

/// Decode the JSONB metadata column. NULL reads as an empty map.
fn decode_metadata(value: Option<JsonValue>) -> Result<Metadata> {
    match value {
        None | Some(JsonValue::Null) => Ok(Metadata::new()),
        Some(JsonValue::Object(map)) => Ok(map),
        Some(other) => Err(Error::Serialization(format!(
            "metadata must be a JSON object, found {}",
            other
        ))),
    }
}

/// Map a database row to a Note.
fn map_row_to_note(row: &PgRow) -> Result<Note> {
    let embedding = match row.try_get::<Option<Vector>, _>("embedding") {
        Ok(v) => v.map(|v| v.to_vec()),
        Err(sqlx::Error::ColumnNotFound(_)) => None,
        Err(e) => return Err(store_error(e)),
    };
    Ok(Note {
        id: row.try_get("id").map_err(store_error)?,
        user_id: row.try_get("user_id").map_err(store_error)?,
        title: row.try_get("title").map_err(store_error)?,
        content: row.try_get("content").map_err(store_error)?,
        chunk_content: row
            .try_get::<Option<String>, _>("chunk_content")
            .map_err(store_error)?
            .unwrap_or_default(),
        embedding,
        metadata: decode_metadata(row.try_get("metadata").map_err(store_error)?)?,
        created_at: row.try_get("created_at").map_err(store_error)?,
        updated_at: row.try_get("updated_at").map_err(store_error)?,
    })
}

#[async_trait]
impl NoteRepository for PgNoteRepository {
    async fn insert(&self, note: NewNote) -> Result<Note> {
        note.validate()?;
        if let Some(embedding) = &note.embedding {
            check_dimension(embedding)?;
        }
        let metadata = serde_json::to_value(&note.metadata)?;
        let id = note.resolved_id().unwrap_or_else(Uuid::now_v7);
        let start = Instant::now();

        let deadline = self.deadline();
        let mut lease = self.lease("insert", deadline).await?;
        let conn = lease.conn()?;
        let result = self
            .within("insert", deadline, async {
                sqlx::query(
                    "INSERT INTO notes (id, user_id, title, content, chunk_content, embedding, metadata, created_at, updated_at)
                     VALUES ($1, $2, $3, $4, $5, $6, $7, COALESCE($8, NOW()), COALESCE($9, NOW()))
                     RETURNING id, created_at, updated_at",
                )
                .bind(id)
                .bind(note.user_id)
                .bind(&note.title)
                .bind(&note.content)
                .bind(&note.chunk_content)
                .bind(note.embedding.clone().map(Vector::from))
                .bind(&metadata)
                .bind(note.created_at)
                .bind(note.updated_at)
                .fetch_one(conn)
                .await
                .map_err(store_error)
            })
            .await;
        let row = lease.settle(result)?;

        let stored = Note {
            id: row.try_get("id").map_err(store_error)?,
            user_id: note.user_id,
            title: note.title,
            content: note.content,
            chunk_content: note.chunk_content,
            embedding: note.embedding,
            metadata: note.metadata,
            created_at: row.try_get("created_at").map_err(store_error)?,
            updated_at: row.try_get("updated_at").map_err(store_error)?,
        };

        debug!(
            subsystem = "database",
            component = "notes",
            op = "insert",
            note_id = %stored.id,
            duration_ms = start.elapsed().as_millis() as u64,
            "Note inserted"
        );
        Ok(stored)
    }

    async fn fetch(&self, id: Uuid) -> Result<Note> {
        let start = Instant::now();
        let sql = format!("SELECT {}, embedding FROM notes WHERE id = $1", NOTE_COLUMNS);

        let deadline = self.deadline();
        let mut lease = self.lease("fetch", deadline).await?;
        let conn = lease.conn()?;
        let result = self
            .within("fetch", deadline, async {
                sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(conn)
                    .await
                    .map_err(store_error)
            })
            .await;
        let row = lease.settle(result)?.ok_or(Error::NoteNotFound(id))?;

        let note = map_row_to_note(&row)?;
        debug!(
            subsystem = "database",
            component = "notes",
            op = "fetch",
            note_id = %id,
            duration_ms = start.elapsed().as_millis() as u64,
            "Note fetched"
        );
        Ok(note)
    }

    async fn list(&self, page: Page) -> Result<Vec<Note>> {
        let start = Instant::now();
        let sql = format!(
            "SELECT {} FROM notes ORDER BY created_at DESC LIMIT $1 OFFSET $2",
            NOTE_COLUMNS
        );

        let deadline = self.deadline();
        let mut lease = self.lease("list", deadline).await?;
        let conn = lease.conn()?;
        let result = self
            .within("list", deadline, async {
                sqlx::query(&sql)
                    .bind(page.limit.max(0))
                    .bind(page.offset.max(0))
                    .fetch_all(conn)
                    .await
                    .map_err(store_error)
            })
            .await;
        let rows = lease.settle(result)?;

        let notes = rows.iter().map(map_row_to_note).collect::<Result<Vec<_>>>()?;
        debug!(
            subsystem = "database",
            component = "notes",
            op = "list",
            limit = page.limit,
            offset = page.offset,
            result_count = notes.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Notes listed"
        );
        Ok(notes)
    }

    async fn search_by_similarity(
        &self,
        query_embedding: &[f32],
        limit: i64,
    ) -> Result<Vec<SearchResult>> {
        if query_embedding.is_empty() {
            return Err(Error::InvalidInput(
                "query embedding must not be empty".to_string(),
            ));
        }
        check_dimension(query_embedding)?;
        if limit < 1 {
            return Err(Error::InvalidInput("limit must be >= 1".to_string()));
        }
        let start = Instant::now();
        let query_vec = Vector::from(query_embedding.to_vec());
        let sql = format!(
            "SELECT {}, (embedding <=> $1)::float8 AS similarity_score
             FROM notes
             WHERE embedding IS NOT NULL
             ORDER BY similarity_score ASC
             LIMIT $2",
            NOTE_COLUMNS
        );

        let deadline = self.deadline();
        let mut lease = self.lease("search", deadline).await?;
        let conn = lease.conn()?;
        let result = self
            .within("search", deadline, async {
                sqlx::query(&sql)
                    .bind(&query_vec)
                    .bind(limit)
                    .fetch_all(conn)
                    .await
                    .map_err(store_error)
            })
            .await;
        let rows = lease.settle(result)?;

        let results = rows
            .iter()
            .map(|row| {
                Ok(SearchResult {
                    note: map_row_to_note(row)?,
                    similarity_score: row
                        .try_get::<f64, _>("similarity_score")
                        .map_err(store_error)? as f32,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            subsystem = "database",
            component = "notes",
            op = "search",
            limit,
            result_count = results.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Similarity search complete"
        );
        Ok(results)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let start = Instant::now();
        let deadline = self.deadline();
        let mut lease = self.lease("delete", deadline).await?;
        let conn = lease.conn()?;
        let result = self
            .within("delete", deadline, async {
                sqlx::query("DELETE FROM notes WHERE id = $1")
                    .bind(id)
                    .execute(conn)
                    .await
                    .map_err(store_error)
            })
            .await;
        let result = lease.settle(result)?;

        if result.rows_affected() == 0 {
            return Err(Error::NoteNotFound(id));
        }

        debug!(
            subsystem = "database",
            component = "notes",
            op = "delete",
            note_id = %id,
            duration_ms = start.elapsed().as_millis() as u64,
            "Note deleted"
        );
        Ok(())
    }
}
