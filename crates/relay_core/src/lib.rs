//! Relay core: pure domain model, change detection and the supervisor state machine.
mod backoff;
mod diff;
mod effect;
mod model;
mod msg;
mod plan;
mod session;
mod state;
mod update;
mod view_model;

pub use backoff::{Backoff, PollInterval};
pub use diff::{count_regressions, diff, CountRegression, RangeDelta};
pub use effect::Effect;
pub use model::{Message, MessageDetail, Number, Range, NO_MESSAGE_BODY};
pub use msg::{FailureClass, Msg};
pub use plan::numbers_to_fetch;
pub use session::{ReauthGate, SessionLifecycle, SessionPhase, SessionPolicy};
pub use state::{LoopPhase, LoopState};
pub use update::update;
pub use view_model::StatusView;
