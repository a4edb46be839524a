//! # pathwise-shared
//!
//! Identifiers, domain enums and tuning constants shared by the store, the
//! discovery engine and the HTTP server.

pub mod constants;
pub mod error;
pub mod types;

pub use error::ParseError;
pub use types::*;
