//! Scan driver.
//!
//! The driver runs one operation at a time against the sensor. Each
//! operation is a spawned task that:
//!
//! 1. acquires the driver lock (held until the task ends),
//! 2. opens a fresh link, lets the board settle and clears stale input,
//! 3. writes the command byte,
//! 4. polls for lines, classifies them and feeds the state machine until it
//!    reaches a terminal outcome or the overall deadline passes,
//! 5. closes the link, then releases the lock.
//!
//! ```text
//! caller ──search()──► task ──lock──► open ─► settle ─► clear ─► write '2'
//!                                               │
//!                     Outcome ◄── machine ◄── classify ◄── read_line (poll)
//! ```
//!
//! Because the work runs on its own task, a caller that drops a search
//! future or an [`EnrollStream`] does not cut the exchange short. The task
//! still drains the operation to its outcome before the next one may start.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use prism_hardware::{LinkConnector, SerialLink};
use prism_protocol::classify;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::ScannerConfig;
use crate::outcome::{FailureReason, Outcome, ProgressEvent};
use crate::state_machine::{EnrollMachine, OperationMachine, Reaction, SearchMachine};

/// Progress events buffered between the operation task and its consumer.
///
/// The last slot is reserved for the terminal event.
const PROGRESS_CHANNEL_CAPACITY: usize = 16;

/// Runs enroll and search operations against one sensor.
///
/// Cloning the driver is cheap; clones share the connector and the lock, so
/// operations started from any clone are serialized.
///
/// # Examples
///
/// ```
/// use prism_hardware::mock::MockDevice;
/// use prism_scanner::{Outcome, ScannerConfig, ScannerDriver};
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() -> prism_core::Result<()> {
///     let (connector, device) = MockDevice::pair();
///     device.respond_to(b'2', ["FOUND_ID:17"]);
///
///     let config = ScannerConfig::new("mock").with_settle_delay(Duration::ZERO);
///     let driver = ScannerDriver::new(connector, config)?;
///
///     assert_eq!(driver.search().await, Outcome::success(17));
///     Ok(())
/// }
/// ```
pub struct ScannerDriver<C> {
    connector: Arc<C>,
    config: Arc<ScannerConfig>,
    lock: Arc<Mutex<()>>,
}

impl<C> Clone for ScannerDriver<C> {
    fn clone(&self) -> Self {
        Self {
            connector: Arc::clone(&self.connector),
            config: Arc::clone(&self.config),
            lock: Arc::clone(&self.lock),
        }
    }
}

impl<C: LinkConnector> ScannerDriver<C> {
    /// Create a driver.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration does not validate.
    pub fn new(connector: C, config: ScannerConfig) -> prism_core::Result<Self> {
        config.validate()?;
        Ok(Self {
            connector: Arc::new(connector),
            config: Arc::new(config),
            lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Identify the finger on the sensor.
    ///
    /// Waits for any operation already running to finish first. Dropping
    /// the returned future does not abort the exchange with the sensor.
    pub async fn search(&self) -> Outcome {
        let task = self.spawn(SearchMachine::new(), None);

        match task.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => {
                error!(error = %e, "Search task cancelled");
                Outcome::failure(FailureReason::DeviceUnreachable)
            }
        }
    }

    /// Start enrolling a new finger.
    ///
    /// The returned stream yields [`ProgressEvent::Starting`] once the sensor
    /// is acquired, then one event per step, and ends right after the single
    /// [`ProgressEvent::Finished`]. The operation keeps running to its outcome
    /// even if the stream is dropped early. A consumer that stops polling
    /// misses the steps that no longer fit in the buffer, but the terminal
    /// event is always delivered.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn enroll(&self) -> EnrollStream {
        let (tx, rx) = mpsc::channel(PROGRESS_CHANNEL_CAPACITY);
        // Detached: completion is observed through the stream.
        let _task = self.spawn(EnrollMachine::new(), Some(tx));

        EnrollStream {
            rx,
            finished: false,
        }
    }

    fn spawn<M: OperationMachine>(
        &self,
        machine: M,
        progress: Option<mpsc::Sender<ProgressEvent>>,
    ) -> JoinHandle<Outcome> {
        let lock = Arc::clone(&self.lock);
        let operation = Operation {
            connector: Arc::clone(&self.connector),
            config: Arc::clone(&self.config),
            progress,
        };

        tokio::spawn(async move {
            // Dropped after the operation, and with it the link, is finished.
            let _permit = lock.lock_owned().await;
            operation.run(machine).await
        })
    }
}

/// State of one running operation.
struct Operation<C> {
    connector: Arc<C>,
    config: Arc<ScannerConfig>,
    progress: Option<mpsc::Sender<ProgressEvent>>,
}

impl<C: LinkConnector> Operation<C> {
    async fn run<M: OperationMachine>(mut self, mut machine: M) -> Outcome {
        let kind = M::KIND;
        let started = Instant::now();
        info!(operation = %kind, port = %self.config.port, "Operation started");
        self.report(ProgressEvent::Starting);

        let mut lines_received = 0u64;
        let outcome = match self.connector.open(&self.config.link_settings()).await {
            Ok(link) => {
                let mut link = LinkGuard(link);
                self.exchange(&mut link.0, &mut machine, &mut lines_received)
                    .await
            }
            Err(e) => {
                warn!(port = %self.config.port, error = %e, "Could not open sensor port");
                Outcome::failure(FailureReason::DeviceUnreachable)
            }
        };

        info!(
            operation = %kind,
            outcome = %outcome,
            lines_received,
            unrecognized = machine.unrecognized_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Operation finished"
        );
        self.report(ProgressEvent::Finished(outcome.clone()));
        outcome
    }

    async fn exchange<L: SerialLink, M: OperationMachine>(
        &mut self,
        link: &mut L,
        machine: &mut M,
        lines_received: &mut u64,
    ) -> Outcome {
        link.settle(self.config.settle_delay).await;

        if let Err(e) = link.clear_input_buffer().await {
            warn!(error = %e, "Could not clear sensor input");
            return Outcome::failure(FailureReason::DeviceUnreachable);
        }
        if let Err(e) = link.write_command(M::KIND.command_byte()).await {
            warn!(error = %e, "Could not send command to sensor");
            return Outcome::failure(FailureReason::DeviceUnreachable);
        }

        let deadline = Instant::now() + self.config.overall_timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                info!(
                    timeout_ms = self.config.overall_timeout.as_millis() as u64,
                    "No terminal response before deadline"
                );
                return Outcome::failure(FailureReason::Timeout);
            }

            let line = match link.read_line(self.config.read_timeout.min(remaining)).await {
                Ok(Some(line)) => line,
                Ok(None) => continue,
                Err(e) => {
                    warn!(error = %e, "Serial link failed mid-operation");
                    return Outcome::failure(FailureReason::DeviceUnreachable);
                }
            };

            *lines_received += 1;
            let event = classify(&line, M::KIND);
            if event.is_unrecognized() {
                debug!(line = %line, "Ignoring unrecognized sensor output");
            } else {
                debug!(line = %line, event = %event, "Sensor event");
            }

            match machine.handle(&event) {
                Some(Reaction::Progress(step)) => self.report(ProgressEvent::Step(step)),
                Some(Reaction::Terminal(outcome)) => return outcome,
                None => {}
            }
        }
    }

    /// Forward a progress event to the consumer, if one is still listening.
    ///
    /// Never waits. One slot is kept free for the terminal event, so a
    /// consumer that stops polling loses intermediate steps but still gets
    /// the outcome, and the operation keeps its deadline.
    fn report(&mut self, event: ProgressEvent) {
        let Some(tx) = &self.progress else {
            return;
        };

        if !event.is_terminal() && !tx.is_closed() && tx.capacity() <= 1 {
            warn!(event = %event, "Progress consumer stalled, dropping step");
            return;
        }

        match tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Closed(_)) => {
                debug!("Progress consumer gone, draining operation");
                self.progress = None;
            }
            Err(TrySendError::Full(event)) => {
                warn!(event = %event, "Progress channel full, dropping event");
            }
        }
    }
}

/// Closes the link on every exit path.
struct LinkGuard<L: SerialLink>(L);

impl<L: SerialLink> Drop for LinkGuard<L> {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// Live progress of one enrollment.
///
/// Implements [`Stream`]; [`recv`](EnrollStream::recv) is available for
/// callers that do not use `futures` combinators.
#[derive(Debug)]
pub struct EnrollStream {
    rx: mpsc::Receiver<ProgressEvent>,
    finished: bool,
}

impl EnrollStream {
    /// Receive the next progress event.
    ///
    /// Returns `None` after the terminal event has been delivered.
    pub async fn recv(&mut self) -> Option<ProgressEvent> {
        if self.finished {
            return None;
        }
        let event = self.rx.recv().await;
        self.observe(event.as_ref());
        event
    }

    /// Skip the remaining steps and wait for the outcome.
    ///
    /// Returns `None` if the terminal event was already consumed.
    pub async fn outcome(mut self) -> Option<Outcome> {
        while let Some(event) = self.recv().await {
            if let ProgressEvent::Finished(outcome) = event {
                return Some(outcome);
            }
        }
        None
    }

    /// Returns `true` once the terminal event has been delivered.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn observe(&mut self, event: Option<&ProgressEvent>) {
        match event {
            Some(event) if event.is_terminal() => {
                self.finished = true;
                self.rx.close();
            }
            Some(_) => {}
            None => self.finished = true,
        }
    }
}

impl Stream for EnrollStream {
    type Item = ProgressEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }

        let event = std::task::ready!(this.rx.poll_recv(cx));
        this.observe(event.as_ref());
        Poll::Ready(event)
    }
}
