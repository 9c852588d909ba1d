use crate::view_model::StatusView;
use crate::Backoff;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopPhase {
    #[default]
    Starting,
    Polling,
    BackingOff,
    Stopped,
}

/// State of the outer reconciliation loop, separate from the range baseline.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoopState {
    phase: LoopPhase,
    backoff: Backoff,
    consecutive_failures: u32,
    cycles_completed: u64,
    notifications_sent: u64,
    last_error: Option<String>,
}

impl LoopState {
    pub fn new(backoff: Backoff) -> Self {
        Self {
            backoff,
            ..Self::default()
        }
    }

    pub fn phase(&self) -> LoopPhase {
        self.phase
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn view(&self) -> StatusView {
        StatusView {
            phase: self.phase,
            cycles_completed: self.cycles_completed,
            notifications_sent: self.notifications_sent,
            consecutive_failures: self.consecutive_failures,
            last_error: self.last_error.clone(),
        }
    }

    pub(crate) fn record_success(&mut self, notified: usize) {
        self.phase = LoopPhase::Polling;
        self.consecutive_failures = 0;
        self.cycles_completed += 1;
        self.notifications_sent += notified as u64;
    }

    /// Counts the failure and returns how long to back off.
    pub(crate) fn record_failure(&mut self, message: String) -> std::time::Duration {
        self.phase = LoopPhase::BackingOff;
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.last_error = Some(message);
        self.backoff.delay(self.consecutive_failures)
    }

    pub(crate) fn stop(&mut self) {
        self.phase = LoopPhase::Stopped;
    }
}
