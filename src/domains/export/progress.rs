use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Receiver of run progress. Implementations may be called from a different
/// task than the one that owns them.
pub trait ProgressSink: Send + Sync {
    fn start(&self, total: u64);
    fn update_progress(&self, current: u64);
    fn update_status(&self, text: &str);
    fn complete(&self);
    fn error(&self, message: &str);
    fn reset(&self);
}

/// Event form of the sink calls, for consumers on another task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Started { total: u64 },
    Progress { current: u64 },
    Status(String),
    Completed,
    Failed(String),
    Reset,
}

/// Slots held back in a [`ChannelProgressSink`] channel for `Completed` and
/// `Failed`.
const TERMINAL_SLOTS: usize = 1;

/// Forwards events over a bounded channel without ever making the writer
/// wait. Non-terminal events are dropped once only the reserved slot is
/// left. A terminal event that still finds the channel full is handed to a
/// spawned task that waits for room.
#[derive(Clone)]
pub struct ChannelProgressSink {
    tx: mpsc::Sender<ProgressEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: mpsc::Sender<ProgressEvent>) -> Self {
        Self { tx }
    }

    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ProgressEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1) + TERMINAL_SLOTS);
        (Self::new(tx), rx)
    }

    fn send(&self, event: ProgressEvent) {
        if self.tx.capacity() <= TERMINAL_SLOTS {
            log::debug!("progress event dropped: channel full");
            return;
        }
        if let Err(e) = self.tx.try_send(event) {
            log::debug!("progress event dropped: {}", e);
        }
    }

    fn send_terminal(&self, event: ProgressEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    let tx = self.tx.clone();
                    handle.spawn(async move {
                        if tx.send(event).await.is_err() {
                            log::debug!("progress receiver closed before the run outcome arrived");
                        }
                    });
                }
                Err(_) => log::warn!("run outcome dropped: progress channel full outside a runtime"),
            },
            Err(TrySendError::Closed(_)) => log::debug!("progress receiver closed"),
        }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn start(&self, total: u64) {
        self.send(ProgressEvent::Started { total });
    }

    fn update_progress(&self, current: u64) {
        self.send(ProgressEvent::Progress { current });
    }

    fn update_status(&self, text: &str) {
        self.send(ProgressEvent::Status(text.to_string()));
    }

    fn complete(&self) {
        self.send_terminal(ProgressEvent::Completed);
    }

    fn error(&self, message: &str) {
        self.send_terminal(ProgressEvent::Failed(message.to_string()));
    }

    fn reset(&self) {
        self.send(ProgressEvent::Reset);
    }
}

/// Sink that discards everything.
pub struct NoopProgressSink;

impl ProgressSink for NoopProgressSink {
    fn start(&self, _total: u64) {}
    fn update_progress(&self, _current: u64) {}
    fn update_status(&self, _text: &str) {}
    fn complete(&self) {}
    fn error(&self, _message: &str) {}
    fn reset(&self) {}
}

/// `mm:ss`, or `h:mm:ss` from one hour up.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{:02}:{:02}", m, s)
    }
}

/// Status line for `current` of `total` after `elapsed`. The remaining time
/// is extrapolated from the rate so far.
pub fn progress_text(current: u64, total: u64, elapsed: Duration) -> String {
    let current = current.min(total);
    let percent = if total == 0 { 0 } else { current * 100 / total };
    let remaining = if current == 0 {
        Duration::ZERO
    } else {
        let per_record = elapsed.as_secs_f64() / current as f64;
        Duration::from_secs_f64(per_record * (total - current) as f64)
    };
    format!(
        "Processing {} of {} ({}%) Elapsed: {}, Remaining: {}",
        current,
        total,
        percent,
        format_duration(elapsed),
        format_duration(remaining)
    )
}

/// Progress of the operation currently shown to the user.
#[derive(Debug, Default)]
pub struct ProgressState {
    total: u64,
    current: u64,
    started_at: Option<Instant>,
    in_progress: bool,
    status: String,
}

impl ProgressState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, total: u64) {
        self.total = total;
        self.current = 0;
        self.started_at = Some(Instant::now());
        self.in_progress = true;
        self.status = progress_text(0, total, Duration::ZERO);
    }

    /// Returns the new status text, or `None` when no operation is running.
    pub fn update(&mut self, current: u64) -> Option<&str> {
        if !self.in_progress {
            return None;
        }
        self.current = current.min(self.total);
        let elapsed = self.started_at.map(|t| t.elapsed()).unwrap_or_default();
        self.status = progress_text(self.current, self.total, elapsed);
        Some(&self.status)
    }

    pub fn set_status(&mut self, text: &str) {
        self.status = text.to_string();
    }

    pub fn complete(&mut self) {
        self.current = self.total;
        self.in_progress = false;
        self.status = "Operation completed successfully".to_string();
    }

    pub fn fail(&mut self, message: &str) {
        self.in_progress = false;
        self.status = format!("Error: {}", message);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn current(&self) -> u64 {
        self.current
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn is_in_progress(&self) -> bool {
        self.in_progress
    }

    pub fn status(&self) -> &str {
        &self.status
    }
}

/// Sink that keeps a [`ProgressState`] and logs each status line.
#[derive(Default)]
pub struct LogProgressSink {
    state: Mutex<ProgressState>,
}

impl LogProgressSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut ProgressState) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        f(&mut state)
    }

    pub fn status(&self) -> String {
        self.with_state(|s| s.status().to_string())
    }

    pub fn current(&self) -> u64 {
        self.with_state(|s| s.current())
    }
}

impl ProgressSink for LogProgressSink {
    fn start(&self, total: u64) {
        self.with_state(|s| s.start(total));
        log::info!("Starting export of {} records", total);
    }

    fn update_progress(&self, current: u64) {
        self.with_state(|s| {
            if let Some(text) = s.update(current) {
                log::info!("{}", text);
            }
        });
    }

    fn update_status(&self, text: &str) {
        self.with_state(|s| s.set_status(text));
        log::info!("{}", text);
    }

    fn complete(&self) {
        self.with_state(|s| s.complete());
        log::info!("Operation completed successfully");
    }

    fn error(&self, message: &str) {
        self.with_state(|s| s.fail(message));
        log::error!("Error: {}", message);
    }

    fn reset(&self) {
        self.with_state(|s| s.reset());
    }
}

/// Wraps a caller's sink so a panicking sink cannot take the run down.
#[derive(Clone)]
pub struct GuardedProgressSink {
    inner: Arc<dyn ProgressSink>,
}

impl GuardedProgressSink {
    pub fn new(inner: Arc<dyn ProgressSink>) -> Self {
        Self { inner }
    }

    fn guard(&self, call: &str, f: impl FnOnce(&dyn ProgressSink)) {
        let inner = self.inner.as_ref();
        if catch_unwind(AssertUnwindSafe(|| f(inner))).is_err() {
            log::warn!("progress sink panicked in {}", call);
        }
    }
}

impl ProgressSink for GuardedProgressSink {
    fn start(&self, total: u64) {
        self.guard("start", |s| s.start(total));
    }

    fn update_progress(&self, current: u64) {
        self.guard("update_progress", |s| s.update_progress(current));
    }

    fn update_status(&self, text: &str) {
        self.guard("update_status", |s| s.update_status(text));
    }

    fn complete(&self) {
        self.guard("complete", |s| s.complete());
    }

    fn error(&self, message: &str) {
        self.guard("error", |s| s.error(message));
    }

    fn reset(&self) {
        self.guard("reset", |s| s.reset());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_minutes_and_hours() {
        assert_eq!(format_duration(Duration::from_secs(65)), "01:05");
        assert_eq!(format_duration(Duration::from_secs(3_725)), "1:02:05");
        assert_eq!(
            progress_text(50, 200, Duration::from_secs(10)),
            "Processing 50 of 200 (25%) Elapsed: 00:10, Remaining: 00:30"
        );
    }

    #[test]
    fn progress_is_clamped_and_ignored_when_idle() {
        let mut state = ProgressState::new();
        assert!(state.update(5).is_none());

        state.start(10);
        state.update(25);
        assert_eq!(state.current(), 10);
        assert!(state.status().starts_with("Processing 10 of 10 (100%)"));

        state.fail("disk full");
        assert_eq!(state.status(), "Error: disk full");
        assert!(state.update(3).is_none());
        assert_eq!(state.current(), 10);

        state.reset();
        assert_eq!(state.total(), 0);
        assert!(!state.is_in_progress());
    }

    #[test]
    fn log_sink_tracks_state() {
        let sink = LogProgressSink::new();
        sink.start(4);
        sink.update_progress(2);
        assert_eq!(sink.current(), 2);
        sink.complete();
        assert_eq!(sink.status(), "Operation completed successfully");
    }

    #[tokio::test]
    async fn channel_sink_drops_ticks_but_keeps_the_outcome() {
        let (sink, mut rx) = ChannelProgressSink::channel(2);
        sink.start(3);
        sink.update_progress(1);
        sink.update_progress(2);
        sink.update_progress(3);
        sink.complete();
        assert_eq!(rx.recv().await, Some(ProgressEvent::Started { total: 3 }));
        assert_eq!(rx.recv().await, Some(ProgressEvent::Progress { current: 1 }));
        assert_eq!(rx.recv().await, Some(ProgressEvent::Completed));
        assert!(rx.try_recv().is_err());

        drop(rx);
        sink.update_status("nobody listening");
    }

    #[tokio::test]
    async fn outcome_waits_for_room_when_reserved_slot_is_taken() {
        let (sink, mut rx) = ChannelProgressSink::channel(1);
        sink.start(1);
        sink.update_progress(1);
        sink.complete();
        sink.error("second outcome");
        assert_eq!(rx.recv().await, Some(ProgressEvent::Started { total: 1 }));
        assert_eq!(rx.recv().await, Some(ProgressEvent::Completed));
        assert_eq!(rx.recv().await, Some(ProgressEvent::Failed("second outcome".to_string())));
    }

    struct PanickingSink;

    impl ProgressSink for PanickingSink {
        fn start(&self, _total: u64) {
            panic!("sink exploded");
        }
        fn update_progress(&self, _current: u64) {
            panic!("sink exploded");
        }
        fn update_status(&self, _text: &str) {}
        fn complete(&self) {}
        fn error(&self, _message: &str) {}
        fn reset(&self) {}
    }

    #[test]
    fn guarded_sink_swallows_panics() {
        let sink = GuardedProgressSink::new(Arc::new(PanickingSink));
        sink.start(1);
        sink.update_progress(1);
        sink.complete();
    }
}
