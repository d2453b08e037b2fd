//! Operation state machines.
//!
//! Each operation kind has its own machine that consumes [`DeviceEvent`]s and
//! decides when the operation is over. The machines do no I/O; the driver
//! feeds them classified lines and acts on the returned [`Reaction`].
//!
//! # Enrollment
//!
//! ```text
//! WaitingForFirstPlacement --RemoveFinger--> WaitingForRemoval
//! WaitingForRemoval --PlaceSameFingerAgain--> WaitingForSecondPlacement
//! WaitingForFirstPlacement --PlaceSameFingerAgain--> WaitingForSecondPlacement
//! any waiting state --EnrollSucceeded / SensorFailure--> Terminal
//! ```
//!
//! A success is only accepted after the removal step has been observed. The
//! sensor captures the finger twice, so a success reported before the first
//! capture was confirmed terminates as a sensor error instead.
//!
//! # Search
//!
//! ```text
//! WaitingForDevice --SearchFound / SearchNotFound / SensorFailure--> Terminal
//! ```
//!
//! # Examples
//!
//! ```
//! use prism_protocol::DeviceEvent;
//! use prism_scanner::{EnrollMachine, EnrollState, EnrollStep, OperationMachine, Reaction};
//!
//! let mut machine = EnrollMachine::new();
//!
//! let reaction = machine.handle(&DeviceEvent::RemoveFinger);
//! assert_eq!(reaction, Some(Reaction::Progress(EnrollStep::RemoveFinger)));
//! assert_eq!(machine.current_state(), &EnrollState::WaitingForRemoval);
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

use prism_core::{OperationKind, constants::*};
use prism_protocol::DeviceEvent;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::outcome::{EnrollStep, FailureReason, Outcome};

/// Maximum number of state transitions to keep in history.
///
/// A complete enrollment takes three transitions. Repeated prompts from
/// chatty firmware are recorded too, so the cap only bounds pathological
/// sessions.
const MAX_HISTORY_SIZE: usize = 100;

/// What the driver should do after an event was consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reaction {
    /// Report an intermediate step to the caller.
    Progress(EnrollStep),

    /// The operation is over.
    Terminal(Outcome),
}

/// Record of one state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTransition<S> {
    /// State before the event.
    pub from: S,

    /// State after the event.
    pub to: S,

    /// Event that triggered the change.
    pub event: DeviceEvent,

    /// When the transition happened.
    pub timestamp: Instant,
}

impl<S> StateTransition<S> {
    /// Create a transition record stamped with the current time.
    pub fn new(from: S, to: S, event: DeviceEvent) -> Self {
        Self {
            from,
            to,
            event,
            timestamp: Instant::now(),
        }
    }

    /// Get time elapsed since this transition.
    pub fn elapsed(&self) -> Duration {
        self.timestamp.elapsed()
    }
}

/// Bounded transition history shared by both machines.
#[derive(Debug, Clone)]
struct History<S> {
    transitions: VecDeque<StateTransition<S>>,
}

impl<S> History<S> {
    fn new() -> Self {
        Self {
            transitions: VecDeque::new(),
        }
    }

    fn push(&mut self, transition: StateTransition<S>) {
        self.transitions.push_back(transition);
        if self.transitions.len() > MAX_HISTORY_SIZE {
            self.transitions.pop_front();
        }
    }
}

/// Common interface the driver uses to run either operation.
pub trait OperationMachine: Send + 'static {
    /// Operation this machine drives.
    const KIND: OperationKind;

    /// Consume one event.
    ///
    /// Returns `None` when the event does not change what the caller sees,
    /// including every event after the machine reached its terminal state.
    fn handle(&mut self, event: &DeviceEvent) -> Option<Reaction>;

    /// Returns `true` once a terminal outcome was decided.
    fn is_terminal(&self) -> bool;

    /// Number of unrecognized lines ignored so far.
    fn unrecognized_count(&self) -> u64;
}

// ============================================================================
// Enrollment
// ============================================================================

/// States of the two-capture enrollment ceremony.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollState {
    /// Waiting for the first finger placement.
    WaitingForFirstPlacement,

    /// First capture done, waiting for the finger to be lifted.
    WaitingForRemoval,

    /// Waiting for the same finger a second time.
    WaitingForSecondPlacement,

    /// Operation finished with the contained outcome.
    Terminal(Outcome),
}

impl EnrollState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal(_))
    }
}

impl fmt::Display for EnrollState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WaitingForFirstPlacement => f.write_str("WaitingForFirstPlacement"),
            Self::WaitingForRemoval => f.write_str("WaitingForRemoval"),
            Self::WaitingForSecondPlacement => f.write_str("WaitingForSecondPlacement"),
            Self::Terminal(outcome) => write!(f, "Terminal({outcome})"),
        }
    }
}

/// State machine for one enrollment.
#[derive(Debug, Clone)]
pub struct EnrollMachine {
    state: EnrollState,
    removal_seen: bool,
    unrecognized: u64,
    history: History<EnrollState>,
}

impl EnrollMachine {
    /// Create a machine waiting for the first placement.
    pub fn new() -> Self {
        Self {
            state: EnrollState::WaitingForFirstPlacement,
            removal_seen: false,
            unrecognized: 0,
            history: History::new(),
        }
    }

    /// Get the current state.
    pub fn current_state(&self) -> &EnrollState {
        &self.state
    }

    /// Get the transition history, oldest first.
    pub fn history(&self) -> &VecDeque<StateTransition<EnrollState>> {
        &self.history.transitions
    }

    /// Returns `true` if the history passes through `state`.
    pub fn visited(&self, state: &EnrollState) -> bool {
        self.history.transitions.iter().any(|t| &t.to == state)
    }

    /// Terminal outcome, once decided.
    pub fn outcome(&self) -> Option<&Outcome> {
        match &self.state {
            EnrollState::Terminal(outcome) => Some(outcome),
            _ => None,
        }
    }

    fn transition_to(&mut self, to: EnrollState, event: &DeviceEvent) {
        let from = std::mem::replace(&mut self.state, to.clone());
        debug!(from = %from, to = %to, event = %event, "Enroll state transition");
        self.history
            .push(StateTransition::new(from, to, event.clone()));
    }

    fn terminate(&mut self, outcome: Outcome, event: &DeviceEvent) -> Option<Reaction> {
        self.transition_to(EnrollState::Terminal(outcome.clone()), event);
        Some(Reaction::Terminal(outcome))
    }
}

impl Default for EnrollMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl OperationMachine for EnrollMachine {
    const KIND: OperationKind = OperationKind::Enroll;

    fn handle(&mut self, event: &DeviceEvent) -> Option<Reaction> {
        if self.state.is_terminal() {
            return None;
        }

        match event {
            DeviceEvent::ReadyForFinger => {
                if self.state == EnrollState::WaitingForFirstPlacement {
                    Some(Reaction::Progress(EnrollStep::PlaceFinger))
                } else {
                    warn!(state = %self.state, "Sensor repeated ready prompt mid-enrollment");
                    None
                }
            }
            DeviceEvent::RemoveFinger => {
                // The first removal prompt always passes through WaitingForRemoval,
                // even when the second placement was announced early.
                if !self.removal_seen {
                    self.transition_to(EnrollState::WaitingForRemoval, event);
                }
                self.removal_seen = true;
                Some(Reaction::Progress(EnrollStep::RemoveFinger))
            }
            DeviceEvent::PlaceSameFingerAgain => {
                match self.state {
                    EnrollState::WaitingForFirstPlacement => {
                        warn!("Second placement requested before a removal prompt");
                        self.transition_to(EnrollState::WaitingForSecondPlacement, event);
                    }
                    EnrollState::WaitingForRemoval => {
                        self.transition_to(EnrollState::WaitingForSecondPlacement, event);
                    }
                    _ => {}
                }
                Some(Reaction::Progress(EnrollStep::PlaceSameFingerAgain))
            }
            DeviceEvent::EnrollSucceeded { id } => {
                if self.removal_seen {
                    self.terminate(Outcome::success(*id), event)
                } else {
                    let raw = format!("{MARKER_SUCCESS_ENROLL}{ID_SEPARATOR}{id}");
                    warn!(raw = %raw, "Enrollment reported before the first capture finished");
                    self.terminate(
                        Outcome::failure(FailureReason::SensorError(raw)),
                        event,
                    )
                }
            }
            DeviceEvent::SensorFailure { raw } => self.terminate(
                Outcome::failure(FailureReason::SensorError(raw.clone())),
                event,
            ),
            DeviceEvent::Unrecognized { .. } => {
                self.unrecognized += 1;
                None
            }
            DeviceEvent::SearchFound { .. } | DeviceEvent::SearchNotFound => {
                warn!(event = %event, "Search event during enrollment");
                None
            }
        }
    }

    fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    fn unrecognized_count(&self) -> u64 {
        self.unrecognized
    }
}

// ============================================================================
// Search
// ============================================================================

/// States of a one-to-many search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchState {
    /// Waiting for the sensor to report a result.
    WaitingForDevice,

    /// Operation finished with the contained outcome.
    Terminal(Outcome),
}

impl SearchState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal(_))
    }
}

impl fmt::Display for SearchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WaitingForDevice => f.write_str("WaitingForDevice"),
            Self::Terminal(outcome) => write!(f, "Terminal({outcome})"),
        }
    }
}

/// State machine for one search.
#[derive(Debug, Clone)]
pub struct SearchMachine {
    state: SearchState,
    unrecognized: u64,
    history: History<SearchState>,
}

impl SearchMachine {
    /// Create a machine waiting for the sensor.
    pub fn new() -> Self {
        Self {
            state: SearchState::WaitingForDevice,
            unrecognized: 0,
            history: History::new(),
        }
    }

    pub fn current_state(&self) -> &SearchState {
        &self.state
    }

    pub fn history(&self) -> &VecDeque<StateTransition<SearchState>> {
        &self.history.transitions
    }

    /// Terminal outcome, once decided.
    pub fn outcome(&self) -> Option<&Outcome> {
        match &self.state {
            SearchState::Terminal(outcome) => Some(outcome),
            SearchState::WaitingForDevice => None,
        }
    }

    fn terminate(&mut self, outcome: Outcome, event: &DeviceEvent) -> Option<Reaction> {
        let to = SearchState::Terminal(outcome.clone());
        let from = std::mem::replace(&mut self.state, to.clone());
        debug!(from = %from, to = %to, event = %event, "Search state transition");
        self.history
            .push(StateTransition::new(from, to, event.clone()));
        Some(Reaction::Terminal(outcome))
    }
}

impl Default for SearchMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl OperationMachine for SearchMachine {
    const KIND: OperationKind = OperationKind::Search;

    fn handle(&mut self, event: &DeviceEvent) -> Option<Reaction> {
        if self.state.is_terminal() {
            return None;
        }

        match event {
            DeviceEvent::SearchFound { id } => self.terminate(Outcome::success(*id), event),
            DeviceEvent::SearchNotFound => {
                self.terminate(Outcome::failure(FailureReason::NotMatched), event)
            }
            DeviceEvent::SensorFailure { raw } => self.terminate(
                Outcome::failure(FailureReason::SensorError(raw.clone())),
                event,
            ),
            DeviceEvent::Unrecognized { .. } => {
                self.unrecognized += 1;
                None
            }
            _ => {
                warn!(event = %event, "Enrollment event during search");
                None
            }
        }
    }

    fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    fn unrecognized_count(&self) -> u64 {
        self.unrecognized
    }
}
