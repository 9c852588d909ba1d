use std::fmt;

use crate::LoopPhase;

/// Snapshot of the loop for the control surface.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusView {
    pub phase: LoopPhase,
    pub cycles_completed: u64,
    pub notifications_sent: u64,
    pub consecutive_failures: u32,
    pub last_error: Option<String>,
}

impl fmt::Display for StatusView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "phase: {:?}\ncycles: {}\nnotifications: {}\nconsecutive failures: {}",
            self.phase, self.cycles_completed, self.notifications_sent, self.consecutive_failures
        )?;
        if let Some(err) = &self.last_error {
            write!(f, "\nlast error: {err}")?;
        }
        Ok(())
    }
}
