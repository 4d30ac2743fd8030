//! Note entity and related request/response shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use uuid::Uuid;

/// Free-form note metadata: string keys, arbitrary JSON values.
pub type Metadata = Map<String, JsonValue>;

/// A stored note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub chunk_content: String,
    /// Stored as a native vector column; never sent to clients.
    #[serde(skip)]
    pub embedding: Option<Vec<f32>>,
    #[serde(default)]
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for inserting a note.
///
/// `id` and the timestamps are optional; the gateway generates an id when it
/// is absent or nil and the store fills in timestamps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewNote {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub user_id: Option<Uuid>,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub chunk_content: String,
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl NewNote {
    /// Start a note with the two required fields.
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_user_id(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_chunk_content(mut self, chunk: impl Into<String>) -> Self {
        self.chunk_content = chunk.into();
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// The id to write: the caller's, unless absent or nil.
    pub fn resolved_id(&self) -> Option<Uuid> {
        self.id.filter(|id| !id.is_nil())
    }

    /// Check the required fields.
    pub fn validate(&self) -> crate::Result<()> {
        if self.title.trim().is_empty() {
            return Err(crate::Error::InvalidInput("title is required".to_string()));
        }
        if self.content.trim().is_empty() {
            return Err(crate::Error::InvalidInput(
                "content is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// A note paired with its distance to a query embedding.
///
/// Lower scores are more similar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub note: Note,
    pub similarity_score: f32,
}

/// Pagination bounds for listing notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: crate::defaults::PAGE_LIMIT,
            offset: crate::defaults::PAGE_OFFSET,
        }
    }
}

impl Page {
    /// Build a page from raw query values.
    ///
    /// Missing, unparsable or non-positive `limit` falls back to the default
    /// page size; missing, unparsable or negative `offset` falls back to 0.
    pub fn from_raw(limit: Option<&str>, offset: Option<&str>) -> Self {
        let limit = limit
            .and_then(|s| s.trim().parse::<i64>().ok())
            .filter(|l| *l > 0)
            .unwrap_or(crate::defaults::PAGE_LIMIT);
        let offset = offset
            .and_then(|s| s.trim().parse::<i64>().ok())
            .filter(|o| *o >= 0)
            .unwrap_or(crate::defaults::PAGE_OFFSET);
        Self { limit, offset }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_note() -> Note {
        let mut metadata = Metadata::new();
        metadata.insert("source".into(), json!("supernote"));
        metadata.insert("page".into(), json!(3));
        Note {
            id: Uuid::new_v4(),
            user_id: None,
            title: "Title".into(),
            content: "Body".into(),
            chunk_content: String::new(),
            embedding: Some(vec![0.1, 0.2]),
            metadata,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_embedding_never_serialized() {
        let value = serde_json::to_value(sample_note()).unwrap();
        assert!(value.get("embedding").is_none());
        assert_eq!(value["title"], "Title");
    }

    #[test]
    fn test_absent_user_id_is_omitted() {
        let value = serde_json::to_value(sample_note()).unwrap();
        assert!(value.get("user_id").is_none());
    }

    #[test]
    fn test_metadata_round_trip_preserves_keys_and_types() {
        let mut metadata = Metadata::new();
        metadata.insert("z".into(), json!(null));
        metadata.insert("tags".into(), json!(["a", "b"]));
        metadata.insert("nested".into(), json!({"depth": 2, "ok": true}));
        metadata.insert("ratio".into(), json!(0.5));
        metadata.insert("name".into(), json!("x"));

        let text = serde_json::to_string(&metadata).unwrap();
        let back: Metadata = serde_json::from_str(&text).unwrap();

        assert_eq!(back.len(), metadata.len());
        for (k, v) in &metadata {
            assert_eq!(back.get(k), Some(v), "key {k} changed");
        }
    }

    #[test]
    fn test_new_note_requires_title_and_content() {
        assert!(NewNote::new("t", "c").validate().is_ok());
        assert!(NewNote::new("  ", "c").validate().is_err());
        assert!(NewNote::new("t", "").validate().is_err());
    }

    #[test]
    fn test_resolved_id_ignores_nil() {
        assert_eq!(NewNote::new("t", "c").with_id(Uuid::nil()).resolved_id(), None);
        let id = Uuid::new_v4();
        assert_eq!(NewNote::new("t", "c").with_id(id).resolved_id(), Some(id));
    }

    #[test]
    fn test_new_note_deserializes_minimal_body() {
        let note: NewNote =
            serde_json::from_value(json!({"title": "t", "content": "c"})).unwrap();
        assert!(note.id.is_none());
        assert!(note.metadata.is_empty());
        assert_eq!(note.chunk_content, "");
    }

    #[test]
    fn test_page_defaults() {
        assert_eq!(Page::from_raw(None, None), Page::default());
    }

    #[test]
    fn test_page_invalid_limit_falls_back() {
        for raw in ["0", "-5", "abc", ""] {
            assert_eq!(Page::from_raw(Some(raw), None).limit, 20, "limit {raw:?}");
        }
        assert_eq!(Page::from_raw(Some("2"), None).limit, 2);
    }

    #[test]
    fn test_page_invalid_offset_falls_back() {
        for raw in ["-1", "x"] {
            assert_eq!(Page::from_raw(None, Some(raw)).offset, 0, "offset {raw:?}");
        }
        assert_eq!(Page::from_raw(None, Some("0")).offset, 0);
        assert_eq!(Page::from_raw(None, Some("40")).offset, 40);
    }
}
