//! Relay engine: portal session, reconciliation loop and notification delivery.
mod control;
mod decode;
mod engine;
mod http;
mod notify;
mod parse;
mod portal;
mod reconcile;
mod session;
mod store;
mod types;

pub use control::{ControlChannel, ControlSettings};
pub use decode::{decode_body, CharsetSource, DecodedBody};
pub use engine::{run_engine, EngineSettings};
pub use http::PortalSettings;
pub use notify::{
    escape_markdown, format_message, Delivery, Notifier, NotifyError, Outbox, TelegramNotifier,
};
pub use parse::{
    extract_csrf_meta, extract_login_token, parse_message, parse_numbers, parse_range_summaries,
    ParseError,
};
pub use portal::{Portal, ReportWindow};
pub use reconcile::{CycleReport, PartialRange, ReconcileState, Reconciler};
pub use session::{Credentials, Session, SessionManager};
pub use store::{SnapshotStore, StoreError};
pub use types::{FailureKind, RelayError, TransportError};
