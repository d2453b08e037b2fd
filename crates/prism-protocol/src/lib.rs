//! Line protocol spoken by the fingerprint sensor firmware.
//!
//! - [`LineParser`] splits the raw serial byte stream into trimmed lines.
//! - [`ResponseClassifier`] maps each line to a typed [`DeviceEvent`] for the
//!   operation in progress.

pub mod classifier;
pub mod event;
pub mod line_parser;

pub use classifier::{ResponseClassifier, classify};
pub use event::DeviceEvent;
pub use line_parser::LineParser;
