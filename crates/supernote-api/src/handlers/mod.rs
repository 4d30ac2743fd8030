//! Request handlers.
//!
//! Handlers parse and validate the request, call the gateway at most once,
//! and shape the JSON response. Status selection lives in [`crate::error`].

pub mod assist;
pub mod health;
pub mod notes;

use uuid::Uuid;

use crate::error::ApiError;

/// Parse a `:id` path segment, rejecting anything that is not a UUID.
pub(crate) fn parse_note_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::invalid_note_id())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_note_id() {
        let id = Uuid::new_v4();
        assert_eq!(parse_note_id(&id.to_string()).unwrap(), id);
        assert!(parse_note_id("not-a-uuid").is_err());
        assert!(parse_note_id("").is_err());
    }
}
