//! Mock device implementations for testing and development.
//!
//! This module provides a simulated sensor that can be controlled
//! programmatically without requiring physical hardware.

pub mod link;

// Re-export commonly used types
pub use link::{LinkActivity, MockConnector, MockDevice, MockDeviceHandle, MockLink, ScriptedLine};
