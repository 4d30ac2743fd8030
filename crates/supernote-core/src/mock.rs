//! In-memory note store for deterministic testing.
//!
//! Implements [`NoteRepository`] and [`HealthProbe`] without a database, and
//! records every gateway call so tests can assert that invalid input never
//! reached the store.
//!
//! ```rust
//! use supernote_core::mock::MockNoteStore;
//! use supernote_core::{NewNote, NoteRepository};
//!
//! # async fn demo() {
//! let store = MockNoteStore::new();
//! let note = store.insert(NewNote::new("Title", "Body")).await.unwrap();
//! assert_eq!(store.fetch(note.id).await.unwrap(), note);
//! assert_eq!(store.call_count(), 2);
//! # }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{NewNote, Note, Page, SearchResult};
use crate::traits::{HealthProbe, NoteRepository};

/// A recorded gateway call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    pub operation: &'static str,
    pub note_id: Option<Uuid>,
}

/// Builds the error an injected failure returns, given the operation name.
pub type FailureFn = fn(&'static str) -> Error;

/// Mock note store for testing.
#[derive(Clone, Default)]
pub struct MockNoteStore {
    notes: Arc<Mutex<Vec<Note>>>,
    call_log: Arc<Mutex<Vec<MockCall>>>,
    unhealthy: Arc<AtomicBool>,
    failure: Arc<Mutex<Option<FailureFn>>>,
    latency: Arc<Mutex<Option<StdDuration>>>,
}

impl MockNoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `ping` fail.
    pub fn set_healthy(&self, healthy: bool) {
        self.unhealthy.store(!healthy, Ordering::SeqCst);
    }

    /// Make every repository call fail with an internal error.
    pub fn set_failing(&self, failing: bool) {
        let injected: FailureFn = |op| Error::Internal(format!("injected {} failure", op));
        *self.failure.lock().expect("failure slot poisoned") = failing.then_some(injected);
    }

    /// Make every repository call fail with the error `failure` builds.
    pub fn fail_with(&self, failure: FailureFn) {
        *self.failure.lock().expect("failure slot poisoned") = Some(failure);
    }

    /// Delay every repository call, as a slow store would.
    pub fn set_latency(&self, latency: StdDuration) {
        *self.latency.lock().expect("latency slot poisoned") = Some(latency);
    }

    /// All repository calls so far, oldest first.
    pub fn calls(&self) -> Vec<MockCall> {
        self.call_log.lock().expect("call log poisoned").clone()
    }

    pub fn call_count(&self) -> usize {
        self.call_log.lock().expect("call log poisoned").len()
    }

    async fn record(&self, operation: &'static str, note_id: Option<Uuid>) -> Result<()> {
        self.call_log
            .lock()
            .expect("call log poisoned")
            .push(MockCall { operation, note_id });
        let latency = *self.latency.lock().expect("latency slot poisoned");
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        let failure = *self.failure.lock().expect("failure slot poisoned");
        match failure {
            Some(build) => Err(build(operation)),
            None => Ok(()),
        }
    }

    fn notes(&self) -> std::sync::MutexGuard<'_, Vec<Note>> {
        self.notes.lock().expect("note store poisoned")
    }
}

/// Cosine distance, matching pgvector's `<=>`.
fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a * norm_b)
}

#[async_trait]
impl NoteRepository for MockNoteStore {
    async fn insert(&self, note: NewNote) -> Result<Note> {
        let id = note.resolved_id().unwrap_or_else(Uuid::now_v7);
        self.record("insert", Some(id)).await?;
        note.validate()?;

        let mut notes = self.notes();
        if notes.iter().any(|n| n.id == id) {
            return Err(Error::Conflict(format!("duplicate note id {}", id)));
        }
        // Strictly increasing timestamps keep newest-first ordering deterministic.
        let now = notes
            .iter()
            .map(|n| n.created_at + Duration::microseconds(1))
            .max()
            .map_or_else(Utc::now, |next| next.max(Utc::now()));
        let stored = Note {
            id,
            user_id: note.user_id,
            title: note.title,
            content: note.content,
            chunk_content: note.chunk_content,
            embedding: note.embedding,
            metadata: note.metadata,
            created_at: note.created_at.unwrap_or(now),
            updated_at: note.updated_at.unwrap_or(now),
        };
        notes.push(stored.clone());
        Ok(stored)
    }

    async fn fetch(&self, id: Uuid) -> Result<Note> {
        self.record("fetch", Some(id)).await?;
        self.notes()
            .iter()
            .find(|n| n.id == id)
            .cloned()
            .ok_or(Error::NoteNotFound(id))
    }

    async fn list(&self, page: Page) -> Result<Vec<Note>> {
        self.record("list", None).await?;
        let mut notes: Vec<Note> = self
            .notes()
            .iter()
            .map(|n| Note {
                embedding: None,
                ..n.clone()
            })
            .collect();
        notes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notes
            .into_iter()
            .skip(page.offset.max(0) as usize)
            .take(page.limit.max(0) as usize)
            .collect())
    }

    async fn search_by_similarity(
        &self,
        query_embedding: &[f32],
        limit: i64,
    ) -> Result<Vec<SearchResult>> {
        self.record("search", None).await?;
        if query_embedding.is_empty() {
            return Err(Error::InvalidInput(
                "query embedding must not be empty".to_string(),
            ));
        }
        if limit < 1 {
            return Err(Error::InvalidInput("limit must be >= 1".to_string()));
        }
        let mut results: Vec<SearchResult> = self
            .notes()
            .iter()
            .filter_map(|n| {
                let embedding = n.embedding.as_ref()?;
                Some(SearchResult {
                    similarity_score: cosine_distance(embedding, query_embedding),
                    note: Note {
                        embedding: None,
                        ..n.clone()
                    },
                })
            })
            .collect();
        results.sort_by(|a, b| a.similarity_score.total_cmp(&b.similarity_score));
        results.truncate(limit as usize);
        Ok(results)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.record("delete", Some(id)).await?;
        let mut notes = self.notes();
        let before = notes.len();
        notes.retain(|n| n.id != id);
        if notes.len() == before {
            return Err(Error::NoteNotFound(id));
        }
        Ok(())
    }
}

#[async_trait]
impl HealthProbe for MockNoteStore {
    async fn ping(&self) -> Result<()> {
        if self.unhealthy.load(Ordering::SeqCst) {
            return Err(Error::Internal("mock store unreachable".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_generates_id_for_nil() {
        let store = MockNoteStore::new();
        let note = store
            .insert(NewNote::new("t", "c").with_id(Uuid::nil()))
            .await
            .unwrap();
        assert!(!note.id.is_nil());
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let store = MockNoteStore::new();
        let first = store.insert(NewNote::new("1", "c")).await.unwrap();
        let second = store.insert(NewNote::new("2", "c")).await.unwrap();
        let listed = store.list(Page::default()).await.unwrap();
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);
    }

    #[tokio::test]
    async fn test_search_orders_by_distance() {
        let store = MockNoteStore::new();
        store
            .insert(NewNote::new("far", "c").with_embedding(vec![0.0, 1.0]))
            .await
            .unwrap();
        store
            .insert(NewNote::new("near", "c").with_embedding(vec![1.0, 0.1]))
            .await
            .unwrap();
        store.insert(NewNote::new("none", "c")).await.unwrap();

        let results = store.search_by_similarity(&[1.0, 0.0], 5).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].note.title, "near");
        assert!(results[0].similarity_score <= results[1].similarity_score);
    }

    #[tokio::test]
    async fn test_call_log_and_failure_injection() {
        let store = MockNoteStore::new();
        store.set_failing(true);
        assert!(store.list(Page::default()).await.is_err());
        assert_eq!(
            store.calls(),
            vec![MockCall {
                operation: "list",
                note_id: None
            }]
        );
    }

    #[tokio::test]
    async fn test_duplicate_id_is_conflict() {
        let store = MockNoteStore::new();
        let id = Uuid::new_v4();
        store.insert(NewNote::new("a", "b").with_id(id)).await.unwrap();
        let err = store
            .insert(NewNote::new("c", "d").with_id(id))
            .await
            .unwrap_err();
        assert!(err.is_unique_violation(), "unexpected error: {}", err);
    }

    #[tokio::test]
    async fn test_fail_with_custom_error() {
        let store = MockNoteStore::new();
        store.fail_with(|op| Error::Timeout(op.to_string()));
        let err = store.fetch(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, Error::Timeout(ref op) if op == "fetch"));

        store.set_failing(false);
        assert!(store.list(Page::default()).await.is_ok());
    }

    #[test]
    fn test_cosine_distance_bounds() {
        assert!(cosine_distance(&[1.0, 0.0], &[1.0, 0.0]).abs() < 1e-6);
        assert!((cosine_distance(&[1.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < 1e-6);
        assert!((cosine_distance(&[1.0, 0.0], &[-1.0, 0.0]) - 2.0).abs() < 1e-6);
    }
}
