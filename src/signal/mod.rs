//! Signal handling for the poll loop (SIGINT/SIGTERM)
//!
//! On the first signal the CLI stops polling after the current request and
//! reports the job as it stands; the remote job keeps running and can be
//! picked up again with `wps-client watch <status-url>`.
//!
//! A second signal exits immediately.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::summary::ExitCode;

/// Granularity of interruptible sleeps
const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// Signal handler state
#[derive(Debug, Default)]
pub struct SignalState {
    /// First signal received (stop polling)
    stop_requested: AtomicBool,
    /// Second signal received (immediate exit requested)
    immediate_exit: AtomicBool,
    /// Signal count (for tracking double-SIGINT)
    signal_count: AtomicU8,
}

impl SignalState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if the poll loop should stop
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    /// Check if immediate exit has been requested (double-SIGINT)
    pub fn is_immediate_exit(&self) -> bool {
        self.immediate_exit.load(Ordering::SeqCst)
    }

    /// Get the number of signals received
    pub fn signal_count(&self) -> u8 {
        self.signal_count.load(Ordering::SeqCst)
    }

    /// Handle a signal (SIGINT/SIGTERM)
    ///
    /// Returns the appropriate action to take
    pub fn handle_signal(&self) -> SignalAction {
        let count = self.signal_count.fetch_add(1, Ordering::SeqCst);

        match count {
            0 => {
                self.stop_requested.store(true, Ordering::SeqCst);
                SignalAction::StopPolling
            }
            1 => {
                self.immediate_exit.store(true, Ordering::SeqCst);
                SignalAction::ImmediateExit
            }
            _ => SignalAction::Ignore,
        }
    }

    /// Sleep for `delay`, waking early when a stop is requested.
    ///
    /// Returns `true` if the full delay elapsed.
    pub fn sleep(&self, delay: Duration) -> bool {
        let start = Instant::now();
        while !self.is_stop_requested() {
            let elapsed = start.elapsed();
            if elapsed >= delay {
                return true;
            }
            std::thread::sleep(SLEEP_SLICE.min(delay - elapsed));
        }
        false
    }
}

/// Action to take after receiving a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    /// First signal: finish the current request, then stop
    StopPolling,
    /// Second signal: exit now
    ImmediateExit,
    /// Third+ signal: ignore
    Ignore,
}

/// Signal handler that manages the signal state
pub struct SignalHandler {
    state: Arc<SignalState>,
}

impl SignalHandler {
    pub fn new() -> Self {
        Self {
            state: Arc::new(SignalState::new()),
        }
    }

    /// Get a reference to the signal state
    pub fn state(&self) -> Arc<SignalState> {
        Arc::clone(&self.state)
    }

    /// Install the signal handlers
    ///
    /// Must be called once at program startup.
    pub fn install(&self) -> Result<(), ctrlc::Error> {
        let state = Arc::clone(&self.state);
        ctrlc::set_handler(move || match state.handle_signal() {
            SignalAction::StopPolling => {
                eprintln!("\nReceived interrupt signal, stopping after the current request...");
            }
            SignalAction::ImmediateExit => {
                eprintln!("\nReceived second interrupt, exiting immediately...");
                std::process::exit(ExitCode::Cancelled.as_i32());
            }
            SignalAction::Ignore => {}
        })
    }
}

impl Default for SignalHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_state_initial() {
        let state = SignalState::new();
        assert!(!state.is_stop_requested());
        assert!(!state.is_immediate_exit());
        assert_eq!(state.signal_count(), 0);
    }

    #[test]
    fn test_signal_sequence() {
        let state = SignalState::new();

        assert_eq!(state.handle_signal(), SignalAction::StopPolling);
        assert!(state.is_stop_requested());
        assert!(!state.is_immediate_exit());

        assert_eq!(state.handle_signal(), SignalAction::ImmediateExit);
        assert!(state.is_immediate_exit());

        assert_eq!(state.handle_signal(), SignalAction::Ignore);
        assert_eq!(state.signal_count(), 3);
    }

    #[test]
    fn test_sleep_completes_without_signal() {
        let state = SignalState::new();
        assert!(state.sleep(Duration::from_millis(20)));
        assert!(state.sleep(Duration::ZERO));
    }

    #[test]
    fn test_sleep_interrupted_by_signal() {
        let state = Arc::new(SignalState::new());
        let signaller = Arc::clone(&state);
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            signaller.handle_signal();
        });

        let start = Instant::now();
        assert!(!state.sleep(Duration::from_secs(30)));
        assert!(start.elapsed() < Duration::from_secs(5));
        handle.join().unwrap();
    }
}
