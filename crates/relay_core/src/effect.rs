use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Wait the short jittered poll interval, then run the next cycle.
    PollSoon,
    /// Wait the given delay before retrying.
    BackOff(Duration),
    /// Drop the current session; the next cycle logs in again.
    DiscardSession,
    /// Leave the loop.
    Stop,
}
