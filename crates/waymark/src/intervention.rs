//! Time-boxed manual intervention.
//!
//! When a flow hits something automation cannot get past (a visual
//! challenge), the gate suspends the flow until an operator signals or a
//! bound elapses:
//!
//! ```text
//! Idle ──request──▶ Waiting ──signal──▶ Signaled   (returns true)
//!                      └────timeout───▶ TimedOut   (returns false)
//! ```
//!
//! Each request runs one listener task on a private current-thread tokio
//! runtime and races it against `tokio::time::timeout`. On expiry the task
//! is aborted and joined before the request returns. Signals queued before
//! the request are discarded. A disabled gate answers `false` at once.
//!
//! [`ConsoleSignal`] is the exception to "nothing outlives a request": stdin
//! cannot be read without blocking, so one process-wide `waymark-stdin`
//! thread reads lines for the life of the process and feeds them into a
//! shared channel. Requests only ever listen on that channel; lines typed
//! while no request is waiting are drained as stale.

use crate::config::InteractionConfig;
use crate::result::{WaymarkError, WaymarkResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::BufRead;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};

// =============================================================================
// SIGNALS
// =============================================================================

/// Source of the operator's "continue" signal
#[async_trait]
pub trait OperatorSignal: Send + Sync + fmt::Debug {
    /// Discard signals that arrived before the current request
    fn drain(&self);

    /// Wait for the next signal; `false` when the source is closed
    async fn wait(&self) -> bool;
}

/// Programmatic signal, backed by an unbounded channel
#[derive(Debug)]
pub struct ChannelSignal {
    rx: Mutex<mpsc::UnboundedReceiver<()>>,
}

/// Sending half of a [`ChannelSignal`]
#[derive(Debug, Clone)]
pub struct SignalSender {
    tx: mpsc::UnboundedSender<()>,
}

impl SignalSender {
    /// Signal the operator is done; `false` if the gate is gone
    pub fn signal(&self) -> bool {
        self.tx.send(()).is_ok()
    }
}

impl ChannelSignal {
    /// Create a signal and its sender
    #[must_use]
    pub fn channel() -> (Self, SignalSender) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                rx: Mutex::new(rx),
            },
            SignalSender { tx },
        )
    }
}

#[async_trait]
impl OperatorSignal for ChannelSignal {
    fn drain(&self) {
        if let Ok(mut rx) = self.rx.try_lock() {
            let mut stale = 0;
            while rx.try_recv().is_ok() {
                stale += 1;
            }
            if stale > 0 {
                info!(stale, "discarded operator signals queued before the request");
            }
        }
    }

    async fn wait(&self) -> bool {
        self.rx.lock().await.recv().await.is_some()
    }
}

/// Operator presses Enter on the controlling terminal.
///
/// One process-wide reader thread forwards stdin lines into a channel, so
/// repeated requests share a single reader and a line typed between
/// requests is drained like any other stale signal.
#[derive(Debug)]
pub struct ConsoleSignal {
    inner: &'static ChannelSignal,
}

static CONSOLE: OnceLock<ChannelSignal> = OnceLock::new();

impl ConsoleSignal {
    /// Attach to stdin, starting the reader thread on first use
    #[must_use]
    pub fn new() -> Self {
        let inner = CONSOLE.get_or_init(|| {
            let (signal, sender) = ChannelSignal::channel();
            let spawned = std::thread::Builder::new()
                .name("waymark-stdin".to_string())
                .spawn(move || {
                    let stdin = std::io::stdin();
                    for line in stdin.lock().lines() {
                        if line.is_err() || !sender.signal() {
                            break;
                        }
                    }
                });
            if let Err(err) = spawned {
                warn!(error = %err, "could not start stdin reader; console signals disabled");
            }
            signal
        });
        Self { inner }
    }
}

impl Default for ConsoleSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OperatorSignal for ConsoleSignal {
    fn drain(&self) {
        self.inner.drain();
    }

    async fn wait(&self) -> bool {
        self.inner.wait().await
    }
}

// =============================================================================
// GATE
// =============================================================================

/// Gate lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateState {
    /// No request yet
    Idle,
    /// Waiting for the operator
    Waiting,
    /// Last request was signalled
    Signaled,
    /// Last request timed out
    TimedOut,
}

/// Result of one request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterventionOutcome {
    /// Operator signalled in time
    Signaled,
    /// Bound elapsed first
    TimedOut,
    /// Signal source closed before any signal
    SourceClosed,
    /// Gate disabled; nobody was asked
    Disabled,
}

impl InterventionOutcome {
    /// Whether the flow may resume
    #[must_use]
    pub const fn is_signaled(&self) -> bool {
        matches!(self, Self::Signaled)
    }

    /// Convert to an error for callers that cannot continue without the
    /// operator
    pub fn into_result(self, request: &InterventionRequest) -> WaymarkResult<()> {
        match self {
            Self::Signaled => Ok(()),
            Self::TimedOut => Err(WaymarkError::InterventionTimeout {
                description: request.description.clone(),
                seconds: request.max_wait.as_secs(),
            }),
            Self::SourceClosed => Err(WaymarkError::Intervention {
                message: format!("signal source closed while waiting for '{}'", request.description),
            }),
            Self::Disabled => Err(WaymarkError::Intervention {
                message: format!("manual intervention disabled; cannot resolve '{}'", request.description),
            }),
        }
    }
}

/// One obstacle awaiting an operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterventionRequest {
    /// What the operator must do
    pub description: String,
    /// Bound on the wait
    pub max_wait: Duration,
}

impl InterventionRequest {
    /// Create a request
    #[must_use]
    pub fn new(description: impl Into<String>, max_wait: Duration) -> Self {
        Self {
            description: description.into(),
            max_wait,
        }
    }
}

/// The manual intervention gate
#[derive(Debug)]
pub struct InterventionGate {
    enabled: bool,
    default_wait: Duration,
    signal: Arc<dyn OperatorSignal>,
    state: GateState,
}

impl InterventionGate {
    /// Gate using `signal`, enabled per `config`
    #[must_use]
    pub fn new(config: &InteractionConfig, signal: Arc<dyn OperatorSignal>) -> Self {
        Self {
            enabled: config.allow_manual_intervention,
            default_wait: config.intervention_timeout(),
            signal,
            state: GateState::Idle,
        }
    }

    /// Gate listening on stdin; stdin is left alone while disabled
    #[must_use]
    pub fn console(config: &InteractionConfig) -> Self {
        if config.allow_manual_intervention {
            Self::new(config, Arc::new(ConsoleSignal::new()))
        } else {
            Self::new(config, Arc::new(ChannelSignal::channel().0))
        }
    }

    /// Whether requests actually wait
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> GateState {
        self.state
    }

    /// Configured default bound
    #[must_use]
    pub const fn default_wait(&self) -> Duration {
        self.default_wait
    }

    /// Suspend until signalled or `max_wait` elapses; `true` means resume
    pub fn request_intervention(&mut self, description: &str, max_wait: Duration) -> bool {
        let request = InterventionRequest::new(description, max_wait);
        match self.outcome(&request) {
            Ok(outcome) => outcome.is_signaled(),
            Err(err) => {
                warn!(error = %err, "intervention gate failed");
                false
            }
        }
    }

    /// Run a request and report exactly how it ended
    ///
    /// # Errors
    ///
    /// [`WaymarkError::Intervention`] when the listener runtime cannot start.
    pub fn outcome(&mut self, request: &InterventionRequest) -> WaymarkResult<InterventionOutcome> {
        if !self.enabled {
            info!(
                obstacle = %request.description,
                "manual intervention disabled, not waiting"
            );
            return Ok(InterventionOutcome::Disabled);
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|err| WaymarkError::Intervention {
                message: format!("listener runtime: {err}"),
            })?;

        self.signal.drain();
        self.state = GateState::Waiting;
        warn!(
            obstacle = %request.description,
            max_wait_secs = request.max_wait.as_secs(),
            "MANUAL INTERVENTION REQUIRED: resolve the obstacle in the browser, then press Enter"
        );

        let started = Instant::now();
        let signal = Arc::clone(&self.signal);
        let max_wait = request.max_wait;
        let outcome = runtime.block_on(async move {
            let mut listener = tokio::spawn(async move { signal.wait().await });
            match tokio::time::timeout(max_wait, &mut listener).await {
                Ok(Ok(true)) => InterventionOutcome::Signaled,
                Ok(Ok(false)) | Ok(Err(_)) => InterventionOutcome::SourceClosed,
                Err(_) => {
                    listener.abort();
                    let _ = listener.await;
                    InterventionOutcome::TimedOut
                }
            }
        });
        runtime.shutdown_background();

        self.state = match outcome {
            InterventionOutcome::Signaled => GateState::Signaled,
            _ => GateState::TimedOut,
        };
        let waited_ms = started.elapsed().as_millis() as u64;
        match outcome {
            InterventionOutcome::Signaled => {
                info!(obstacle = %request.description, waited_ms, "operator signalled, resuming");
            }
            _ => {
                warn!(obstacle = %request.description, waited_ms, ?outcome, "no operator signal, giving up");
            }
        }
        Ok(outcome)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn enabled() -> InteractionConfig {
        InteractionConfig::fast().with_manual_intervention(true)
    }

    /// Never signals; counts listener futures dropped
    #[derive(Debug, Default)]
    struct SilentSignal {
        started: AtomicUsize,
        dropped: Arc<AtomicUsize>,
    }

    struct DropGuard(Arc<AtomicUsize>);

    impl Drop for DropGuard {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl OperatorSignal for SilentSignal {
        fn drain(&self) {}

        async fn wait(&self) -> bool {
            self.started.fetch_add(1, Ordering::SeqCst);
            let _guard = DropGuard(Arc::clone(&self.dropped));
            std::future::pending::<()>().await;
            true
        }
    }

    mod gate_tests {
        use super::*;

        #[test]
        fn test_disabled_gate_returns_immediately() {
            let (signal, sender) = ChannelSignal::channel();
            sender.signal();
            let mut gate = InterventionGate::new(&InteractionConfig::default(), Arc::new(signal));
            let start = Instant::now();
            assert!(!gate.request_intervention("captcha", Duration::from_secs(60)));
            assert!(start.elapsed() < Duration::from_millis(50));
            assert_eq!(gate.state(), GateState::Idle);
            assert!(!gate.is_enabled());
        }

        #[test]
        fn test_timeout_aborts_listener() {
            let signal = Arc::new(SilentSignal::default());
            let dropped = Arc::clone(&signal.dropped);
            let mut gate = InterventionGate::new(&enabled(), signal.clone());

            let start = Instant::now();
            let signaled = gate.request_intervention("captcha", Duration::from_secs(2));
            let elapsed = start.elapsed();

            assert!(!signaled);
            assert_eq!(gate.state(), GateState::TimedOut);
            assert!(elapsed >= Duration::from_secs(2));
            assert!(elapsed < Duration::from_millis(2_500));
            assert_eq!(signal.started.load(Ordering::SeqCst), 1);
            assert_eq!(dropped.load(Ordering::SeqCst), 1, "listener must not outlive the request");
        }

        #[test]
        fn test_signal_resumes_early() {
            let (signal, sender) = ChannelSignal::channel();
            let mut gate = InterventionGate::new(&enabled(), Arc::new(signal));
            let operator = std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(150));
                sender.signal()
            });

            let start = Instant::now();
            let signaled = gate.request_intervention("captcha", Duration::from_secs(60));
            assert!(signaled);
            assert!(start.elapsed() < Duration::from_secs(2));
            assert_eq!(gate.state(), GateState::Signaled);
            assert!(operator.join().unwrap());
        }

        #[test]
        fn test_stale_signal_is_drained() {
            let (signal, sender) = ChannelSignal::channel();
            sender.signal();
            sender.signal();
            let mut gate = InterventionGate::new(&enabled(), Arc::new(signal));
            assert!(!gate.request_intervention("captcha", Duration::from_millis(100)));
        }

        #[test]
        fn test_gate_is_reusable() {
            let (signal, sender) = ChannelSignal::channel();
            let mut gate = InterventionGate::new(&enabled(), Arc::new(signal));

            assert!(!gate.request_intervention("first", Duration::from_millis(50)));
            assert_eq!(gate.state(), GateState::TimedOut);

            let helper = sender.clone();
            let operator = std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(50));
                helper.signal()
            });
            assert!(gate.request_intervention("second", Duration::from_secs(5)));
            assert_eq!(gate.state(), GateState::Signaled);
            operator.join().unwrap();
        }

        #[test]
        fn test_closed_source() {
            let (signal, sender) = ChannelSignal::channel();
            drop(sender);
            let mut gate = InterventionGate::new(&enabled(), Arc::new(signal));
            let request = InterventionRequest::new("captcha", Duration::from_secs(5));
            let start = Instant::now();
            let outcome = gate.outcome(&request).unwrap();
            assert_eq!(outcome, InterventionOutcome::SourceClosed);
            assert!(start.elapsed() < Duration::from_secs(1));
        }
    }

    mod console_tests {
        use super::*;

        #[test]
        fn test_console_signals_share_one_reader() {
            let first = ConsoleSignal::new();
            let second = ConsoleSignal::default();
            assert!(std::ptr::eq(first.inner, second.inner));
        }
    }

    mod outcome_tests {
        use super::*;

        #[test]
        fn test_into_result() {
            let request = InterventionRequest::new("captcha", Duration::from_secs(60));
            assert!(InterventionOutcome::Signaled.into_result(&request).is_ok());
            let err = InterventionOutcome::TimedOut.into_result(&request).unwrap_err();
            assert!(matches!(err, WaymarkError::InterventionTimeout { seconds: 60, .. }));
            assert!(err.is_timeout());
            assert!(InterventionOutcome::Disabled.into_result(&request).is_err());
        }

        #[test]
        fn test_default_wait_from_config() {
            let gate = InterventionGate::new(&InteractionConfig::default(), Arc::new(ChannelSignal::channel().0));
            assert_eq!(gate.default_wait(), Duration::from_secs(60));
        }
    }
}
