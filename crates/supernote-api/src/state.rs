use std::sync::Arc;

use supernote_core::{HealthProbe, NoteRepository};
use supernote_db::Database;

/// Shared handler state. Handlers only see the gateway traits.
#[derive(Clone)]
pub struct AppState {
    pub notes: Arc<dyn NoteRepository>,
    pub health: Arc<dyn HealthProbe>,
}

impl AppState {
    pub fn new(notes: Arc<dyn NoteRepository>, health: Arc<dyn HealthProbe>) -> Self {
        Self { notes, health }
    }

    /// Wire handlers to the PostgreSQL gateway.
    pub fn from_database(db: Database) -> Self {
        let notes = Arc::new(db.notes.clone());
        Self {
            notes,
            health: Arc::new(db),
        }
    }
}
