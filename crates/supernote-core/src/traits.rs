//! Core traits for supernote abstractions.
//!
//! Handlers depend on these traits rather than on the PostgreSQL types, so
//! the HTTP layer can be exercised against an in-memory store.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

/// Repository for note persistence.
#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// Insert a note and return it with id and timestamps populated.
    async fn insert(&self, note: NewNote) -> Result<Note>;

    /// Fetch a note by ID.
    async fn fetch(&self, id: Uuid) -> Result<Note>;

    /// List notes, newest first.
    async fn list(&self, page: Page) -> Result<Vec<Note>>;

    /// Nearest notes to `query_embedding`, closest first, at most `limit`.
    async fn search_by_similarity(
        &self,
        query_embedding: &[f32],
        limit: i64,
    ) -> Result<Vec<SearchResult>>;

    /// Permanently delete a note.
    async fn delete(&self, id: Uuid) -> Result<()>;
}

/// Store reachability probe used by the health endpoint.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn ping(&self) -> Result<()>;
}
