//! Search and chat endpoints. Neither has an embedding provider behind it yet.

use crate::error::ApiError;

/// `POST /api/search`
pub async fn search_notes() -> ApiError {
    ApiError::NotImplemented("Search not implemented yet - needs Gemini embeddings".to_string())
}

/// `POST /api/chat`
pub async fn chat() -> ApiError {
    ApiError::NotImplemented("Chat endpoint not implemented yet".to_string())
}
