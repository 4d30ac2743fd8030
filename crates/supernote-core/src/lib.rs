//! # supernote-core
//!
//! Core types, traits, and configuration for the supernote notes service.
//!
//! This crate provides the note entity, the error taxonomy shared by the
//! persistence and HTTP layers, and the repository traits the HTTP layer is
//! written against.

pub mod config;
pub mod defaults;
pub mod error;
#[cfg(feature = "mock")]
pub mod mock;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use config::{Config, ConfigError, Environment, PoolSettings, ProviderKeys};
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;
