//! # supernote-api
//!
//! HTTP surface for the supernote notes service: list, create, fetch and
//! delete notes over JSON, plus a health probe. The binary in `main.rs`
//! wires [`routes::router`] to PostgreSQL; tests wire it to the in-memory
//! store.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{router, HttpLimits, ENDPOINTS};
pub use state::AppState;
