//! Shared domain types, errors, and configuration for the Palaver client.
//!
//! Palaver is a client for a conversational assistant: it coordinates
//! streamed replies, voice capture, speech playback, and attachment state
//! against a single busy flag and one active conversation identity.

pub mod config;
pub mod error;
pub mod types;

pub use config::{ClientConfig, GeneralConfig, ModelsConfig, RuntimeSettings};
pub use error::{PalaverError, Result};
pub use types::*;
