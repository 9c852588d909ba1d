/// Which part of the error taxonomy ended a cycle.
///
/// Snapshot store failures never end a cycle; they are logged where they happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    Authentication,
    Transport,
    Parse,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// A cycle ran to completion.
    CycleSucceeded {
        /// Notifications handed to the sink during the cycle.
        notified: usize,
    },
    /// A cycle aborted.
    CycleFailed { class: FailureClass, message: String },
    /// Shutdown was requested from outside.
    ShutdownRequested,
}
