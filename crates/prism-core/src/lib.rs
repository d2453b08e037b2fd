//! Shared vocabulary for the PRISM fingerprint sensor engine.
//!
//! Holds the wire-level constants spoken by the sensor firmware, the small
//! value types every other crate exchanges, and the workspace error type.

pub mod constants;
pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
