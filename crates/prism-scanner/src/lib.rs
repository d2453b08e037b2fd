//! Enroll and search operations for the Prism fingerprint sensor.
//!
//! This crate ties the serial link, the response classifier and the
//! operation state machines together. [`ScannerDriver`] is the entry point:
//! [`search`](ScannerDriver::search) resolves to a single [`Outcome`] and
//! [`enroll`](ScannerDriver::enroll) returns a live [`EnrollStream`] of
//! [`ProgressEvent`]s ending in one outcome.

pub mod config;
pub mod driver;
pub mod outcome;
pub mod state_machine;

pub use config::ScannerConfig;
pub use driver::{EnrollStream, ScannerDriver};
pub use outcome::{
    EnrollStep, FailureReason, Outcome, ProgressEvent, ProgressMessage, ProgressStatus,
    SearchResponse,
};
pub use state_machine::{
    EnrollMachine, EnrollState, OperationMachine, Reaction, SearchMachine, SearchState,
    StateTransition,
};
