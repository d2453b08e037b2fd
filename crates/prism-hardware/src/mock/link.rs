//! Scripted sensor link for testing and development.
//!
//! This module provides a simulated sensor that answers command bytes with
//! pre-recorded response lines, so the scan driver can be exercised without
//! physical hardware.
//!
//! Timing uses `tokio::time`, so tests running with a paused clock see
//! scripted delays and read timeouts elapse instantly.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;

use crate::{
    HardwareError, Result,
    traits::{LinkConnector, SerialLink},
    types::{ConnectionInfo, LinkSettings},
};

/// Interval at which an idle mock link checks for injected lines.
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// One line of a scripted response, released `delay` after the previous one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedLine {
    /// Delay relative to the previous line (or to the command write).
    pub delay: Duration,

    /// Line text as printed by the sensor, without the newline.
    pub text: String,
}

impl ScriptedLine {
    /// A line released immediately.
    pub fn now(text: impl Into<String>) -> Self {
        Self::after(Duration::ZERO, text)
    }

    /// A line released `delay` after the previous one.
    pub fn after(delay: Duration, text: impl Into<String>) -> Self {
        Self {
            delay,
            text: text.into(),
        }
    }
}

/// Activity recorded by the mock device, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkActivity {
    /// A session was opened on the port.
    Opened,
    /// The session waited for the device to settle.
    Settled,
    /// Stale input was discarded.
    Cleared,
    /// A command byte was written.
    Wrote(u8),
    /// A line was delivered to the reader.
    Delivered(String),
    /// The session was closed.
    Closed,
}

/// Shared state between the connector, its links and the handle.
#[derive(Debug, Default)]
struct MockState {
    /// When `true`, every open attempt fails.
    unreachable: bool,

    /// Responses per command byte, one script consumed per write.
    scripts: HashMap<u8, VecDeque<Vec<ScriptedLine>>>,

    /// Lines already waiting in the device's output before a session opens.
    stale_input: VecDeque<String>,

    /// Lines injected while a session is running.
    injected: VecDeque<String>,

    /// Failure to raise on the next read, for fault injection.
    fail_next_read: Option<String>,

    /// Ordered activity log.
    activity: Vec<LinkActivity>,

    /// Number of sessions currently open.
    open_sessions: usize,

    /// Highest number of sessions observed open at once.
    max_open_sessions: usize,

    /// Total number of successful opens.
    opens: usize,

    /// Total number of closes.
    closes: usize,
}

type SharedState = Arc<Mutex<MockState>>;

fn lock(state: &SharedState) -> MutexGuard<'_, MockState> {
    // A panicking test thread must not hide the recorded activity.
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Mock sensor device.
///
/// # Examples
///
/// ```
/// use prism_hardware::mock::MockDevice;
/// use prism_hardware::traits::{LinkConnector, SerialLink};
/// use prism_hardware::types::LinkSettings;
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() -> prism_hardware::Result<()> {
///     let (connector, handle) = MockDevice::pair();
///     handle.respond_to(b'2', ["FOUND_ID:17"]);
///
///     let mut link = connector.open(&LinkSettings::new("mock")).await?;
///     link.write_command(b'2').await?;
///
///     let line = link.read_line(Duration::from_secs(1)).await?;
///     assert_eq!(line.as_deref(), Some("FOUND_ID:17"));
///
///     link.close();
///     assert_eq!(handle.close_count(), 1);
///     Ok(())
/// }
/// ```
pub struct MockDevice;

impl MockDevice {
    /// Create a mock device as a connected pair.
    ///
    /// Returns a connector to hand to the scan driver and a handle to script
    /// responses and inspect recorded activity.
    pub fn pair() -> (MockConnector, MockDeviceHandle) {
        let state = SharedState::default();
        (
            MockConnector {
                state: Arc::clone(&state),
            },
            MockDeviceHandle { state },
        )
    }
}

/// Connector opening [`MockLink`] sessions on a [`MockDevice`].
#[derive(Debug, Clone)]
pub struct MockConnector {
    state: SharedState,
}

impl LinkConnector for MockConnector {
    type Link = MockLink;

    async fn open(&self, settings: &LinkSettings) -> Result<MockLink> {
        settings.validate()?;

        let pending = {
            let mut state = lock(&self.state);
            if state.unreachable {
                return Err(HardwareError::port_unavailable(
                    &settings.port,
                    "mock device unreachable",
                ));
            }
            state.opens += 1;
            state.open_sessions += 1;
            state.max_open_sessions = state.max_open_sessions.max(state.open_sessions);
            state.activity.push(LinkActivity::Opened);

            let now = Instant::now();
            state
                .stale_input
                .drain(..)
                .map(|text| (now, text))
                .collect::<VecDeque<_>>()
        };

        Ok(MockLink {
            state: Arc::clone(&self.state),
            info: ConnectionInfo::opened(settings),
            pending,
            open: true,
        })
    }
}

/// Open session on a [`MockDevice`].
#[derive(Debug)]
pub struct MockLink {
    state: SharedState,
    info: ConnectionInfo,

    /// Lines scheduled for delivery with their release time.
    pending: VecDeque<(Instant, String)>,

    open: bool,
}

impl MockLink {
    fn ensure_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(HardwareError::disconnected(&self.info.port))
        }
    }

    /// Move injected lines into the delivery queue.
    fn collect_injected(&mut self) {
        let mut state = lock(&self.state);
        let now = Instant::now();
        self.pending
            .extend(state.injected.drain(..).map(|text| (now, text)));
    }

    fn take_read_failure(&self) -> Option<String> {
        lock(&self.state).fail_next_read.take()
    }
}

impl SerialLink for MockLink {
    fn info(&self) -> &ConnectionInfo {
        &self.info
    }

    fn is_open(&self) -> bool {
        self.open
    }

    async fn settle(&mut self, delay: Duration) {
        tokio::time::sleep(delay).await;
        lock(&self.state).activity.push(LinkActivity::Settled);
    }

    async fn clear_input_buffer(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.pending.clear();

        let mut state = lock(&self.state);
        state.injected.clear();
        state.activity.push(LinkActivity::Cleared);
        Ok(())
    }

    async fn write_command(&mut self, command: u8) -> Result<()> {
        self.ensure_open()?;

        let script = {
            let mut state = lock(&self.state);
            state.activity.push(LinkActivity::Wrote(command));
            state
                .scripts
                .get_mut(&command)
                .and_then(VecDeque::pop_front)
                .unwrap_or_default()
        };

        let mut release_at = Instant::now();
        for line in script {
            release_at += line.delay;
            self.pending.push_back((release_at, line.text));
        }
        Ok(())
    }

    async fn read_line(&mut self, timeout: Duration) -> Result<Option<String>> {
        self.ensure_open()?;
        if let Some(message) = self.take_read_failure() {
            return Err(HardwareError::communication(message));
        }

        let deadline = Instant::now() + timeout;

        loop {
            self.collect_injected();

            let now = Instant::now();
            let next_release = self.pending.front().map(|(release_at, _)| *release_at);

            if next_release.is_some_and(|release_at| release_at <= now) {
                if let Some((_, text)) = self.pending.pop_front() {
                    lock(&self.state)
                        .activity
                        .push(LinkActivity::Delivered(text.clone()));
                    return Ok(Some(text));
                }
            }
            if now >= deadline {
                return Ok(None);
            }

            let mut wake = deadline.min(now + IDLE_POLL_INTERVAL);
            if let Some(release_at) = next_release {
                wake = wake.min(release_at);
            }
            tokio::time::sleep_until(wake).await;
        }
    }

    fn close(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;

        let mut state = lock(&self.state);
        state.open_sessions = state.open_sessions.saturating_sub(1);
        state.closes += 1;
        state.activity.push(LinkActivity::Closed);
    }
}

impl Drop for MockLink {
    fn drop(&mut self) {
        self.close();
    }
}

/// Handle for scripting and inspecting a [`MockDevice`].
#[derive(Debug, Clone)]
pub struct MockDeviceHandle {
    state: SharedState,
}

impl MockDeviceHandle {
    /// Queue an immediate response to the next write of `command`.
    ///
    /// Each call queues one response; successive operations consume them in
    /// order.
    pub fn respond_to<I, S>(&self, command: u8, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.respond_with(command, lines.into_iter().map(ScriptedLine::now).collect());
    }

    /// Queue a timed response to the next write of `command`.
    pub fn respond_with(&self, command: u8, script: Vec<ScriptedLine>) {
        lock(&self.state)
            .scripts
            .entry(command)
            .or_default()
            .push_back(script);
    }

    /// Leave a line in the device's output before the next session opens.
    ///
    /// A session that clears its input buffer never reads it.
    pub fn leave_stale_line(&self, text: impl Into<String>) {
        lock(&self.state).stale_input.push_back(text.into());
    }

    /// Deliver a line to the currently open session as soon as it reads.
    pub fn inject_line(&self, text: impl Into<String>) {
        lock(&self.state).injected.push_back(text.into());
    }

    /// Make the next read on an open session fail with a communication error.
    pub fn fail_next_read(&self, message: impl Into<String>) {
        lock(&self.state).fail_next_read = Some(message.into());
    }

    /// Make every open attempt fail (or succeed again).
    pub fn set_unreachable(&self, unreachable: bool) {
        lock(&self.state).unreachable = unreachable;
    }

    /// Snapshot of the ordered activity log.
    pub fn activity(&self) -> Vec<LinkActivity> {
        lock(&self.state).activity.clone()
    }

    /// Command bytes written so far, in order.
    pub fn written_commands(&self) -> Vec<u8> {
        lock(&self.state)
            .activity
            .iter()
            .filter_map(|activity| match activity {
                LinkActivity::Wrote(command) => Some(*command),
                _ => None,
            })
            .collect()
    }

    /// Number of successful opens.
    pub fn open_count(&self) -> usize {
        lock(&self.state).opens
    }

    /// Number of closes.
    pub fn close_count(&self) -> usize {
        lock(&self.state).closes
    }

    /// Number of sessions open right now.
    pub fn open_sessions(&self) -> usize {
        lock(&self.state).open_sessions
    }

    /// Highest number of sessions ever open at the same time.
    pub fn max_open_sessions(&self) -> usize {
        lock(&self.state).max_open_sessions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> LinkSettings {
        LinkSettings::new("mock")
    }

    #[tokio::test(start_paused = true)]
    async fn test_scripted_response() {
        let (connector, handle) = MockDevice::pair();
        handle.respond_to(b'2', ["FOUND_ID:17"]);

        let mut link = connector.open(&settings()).await.unwrap();
        link.write_command(b'2').await.unwrap();

        let line = link.read_line(Duration::from_secs(1)).await.unwrap();
        assert_eq!(line.as_deref(), Some("FOUND_ID:17"));
        assert_eq!(handle.written_commands(), vec![b'2']);
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_times_out_without_failing() {
        let (connector, _handle) = MockDevice::pair();
        let mut link = connector.open(&settings()).await.unwrap();

        let start = Instant::now();
        let line = link.read_line(Duration::from_secs(1)).await.unwrap();

        assert!(line.is_none());
        assert!(start.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_line_waits_for_release() {
        let (connector, handle) = MockDevice::pair();
        handle.respond_with(
            b'1',
            vec![ScriptedLine::after(Duration::from_millis(2500), "READY_TO_ENROLL")],
        );

        let mut link = connector.open(&settings()).await.unwrap();
        link.write_command(b'1').await.unwrap();

        assert!(link.read_line(Duration::from_secs(1)).await.unwrap().is_none());
        assert!(link.read_line(Duration::from_secs(1)).await.unwrap().is_none());
        assert_eq!(
            link.read_line(Duration::from_secs(1)).await.unwrap().as_deref(),
            Some("READY_TO_ENROLL")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_discards_stale_lines() {
        let (connector, handle) = MockDevice::pair();
        handle.leave_stale_line("FOUND_ID:99");
        handle.respond_to(b'2', ["NOT_FOUND"]);

        let mut link = connector.open(&settings()).await.unwrap();
        link.clear_input_buffer().await.unwrap();
        link.write_command(b'2').await.unwrap();

        let line = link.read_line(Duration::from_secs(1)).await.unwrap();
        assert_eq!(line.as_deref(), Some("NOT_FOUND"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_lines_visible_without_clear() {
        let (connector, handle) = MockDevice::pair();
        handle.leave_stale_line("FOUND_ID:99");

        let mut link = connector.open(&settings()).await.unwrap();
        let line = link.read_line(Duration::from_secs(1)).await.unwrap();
        assert_eq!(line.as_deref(), Some("FOUND_ID:99"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_injected_line_delivered() {
        let (connector, handle) = MockDevice::pair();
        let mut link = connector.open(&settings()).await.unwrap();

        let injector = handle.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            injector.inject_line("REMOVE_FINGER");
        });

        let line = link.read_line(Duration::from_secs(1)).await.unwrap();
        assert_eq!(line.as_deref(), Some("REMOVE_FINGER"));
    }

    #[tokio::test]
    async fn test_unreachable_open_fails() {
        let (connector, handle) = MockDevice::pair();
        handle.set_unreachable(true);

        let error = connector.open(&settings()).await.unwrap_err();
        assert!(error.is_open_failure());
        assert_eq!(handle.open_count(), 0);
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_drop_closes() {
        let (connector, handle) = MockDevice::pair();

        let mut link = connector.open(&settings()).await.unwrap();
        link.close();
        link.close();
        assert!(!link.is_open());
        drop(link);
        assert_eq!(handle.close_count(), 1);

        let link = connector.open(&settings()).await.unwrap();
        assert_eq!(handle.open_sessions(), 1);
        drop(link);
        assert_eq!(handle.close_count(), 2);
        assert_eq!(handle.open_sessions(), 0);
    }

    #[tokio::test]
    async fn test_closed_link_rejects_io() {
        let (connector, _handle) = MockDevice::pair();
        let mut link = connector.open(&settings()).await.unwrap();
        link.close();

        assert!(link.write_command(b'1').await.is_err());
        assert!(link.read_line(Duration::from_millis(10)).await.is_err());
    }

    #[tokio::test]
    async fn test_fail_next_read() {
        let (connector, handle) = MockDevice::pair();
        let mut link = connector.open(&settings()).await.unwrap();
        handle.fail_next_read("cable pulled");

        let error = link.read_line(Duration::from_millis(10)).await.unwrap_err();
        assert!(matches!(error, HardwareError::CommunicationError { .. }));
    }

    #[tokio::test]
    async fn test_activity_log_order() {
        let (connector, handle) = MockDevice::pair();
        handle.respond_to(b'2', ["NOT_FOUND"]);

        let mut link = connector.open(&settings()).await.unwrap();
        link.settle(Duration::from_millis(1)).await;
        link.clear_input_buffer().await.unwrap();
        link.write_command(b'2').await.unwrap();
        link.read_line(Duration::from_millis(100)).await.unwrap();
        link.close();

        assert_eq!(
            handle.activity(),
            vec![
                LinkActivity::Opened,
                LinkActivity::Settled,
                LinkActivity::Cleared,
                LinkActivity::Wrote(b'2'),
                LinkActivity::Delivered("NOT_FOUND".to_string()),
                LinkActivity::Closed,
            ]
        );
    }
}
