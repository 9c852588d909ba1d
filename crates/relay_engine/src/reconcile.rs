//! The polling loop: fetch aggregates, diff against the baseline, fetch only
//! the new messages, notify, persist.

use std::time::Duration;

use chrono::Local;
use relay_core::{
    count_regressions, diff, numbers_to_fetch, update, Backoff, Effect, LoopState, Message, Msg,
    Number, PollInterval, Range, RangeDelta, StatusView,
};
use relay_logging::{relay_debug, relay_error, relay_info, relay_warn};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::{Delivery, Notifier, Outbox, Portal, RelayError, ReportWindow, SessionManager, SnapshotStore};

/// Baseline carried from one cycle into the next.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReconcileState {
    /// Ranges as last observed, in portal order.
    pub snapshot: Vec<Range>,
    /// False on a cold start: the first fetch becomes the baseline without
    /// notifying anything.
    pub baseline_ready: bool,
    /// Numbers already emitted for a range whose cycle aborted part-way.
    /// Kept in memory only.
    pub partial: Option<PartialRange>,
}

/// Progress through one range that has not been committed yet.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PartialRange {
    pub range_name: String,
    pub emitted: Vec<Number>,
}

impl ReconcileState {
    /// State restored at startup. An empty snapshot is a cold start unless
    /// `replay_backlog` asks for every message already present to be sent.
    pub fn restored(snapshot: Vec<Range>, replay_backlog: bool) -> Self {
        let baseline_ready = replay_backlog || !snapshot.is_empty();
        Self {
            snapshot,
            baseline_ready,
            partial: None,
        }
    }

    /// State whose snapshot is already a trusted baseline.
    pub fn with_baseline(snapshot: Vec<Range>) -> Self {
        Self {
            snapshot,
            baseline_ready: true,
            partial: None,
        }
    }

    fn already_emitted(&self, range_name: &str, number: &Number) -> bool {
        self.partial.as_ref().is_some_and(|partial| {
            partial.range_name == range_name && partial.emitted.contains(number)
        })
    }

    fn record_emitted(&mut self, range_name: &str, number: Number) {
        if let Some(partial) = self
            .partial
            .as_mut()
            .filter(|partial| partial.range_name == range_name)
        {
            partial.emitted.push(number);
            return;
        }
        self.partial = Some(PartialRange {
            range_name: range_name.to_string(),
            emitted: vec![number],
        });
    }

    /// Records a range as fully handled ahead of the end-of-cycle replace.
    fn commit(&mut self, range: &Range) {
        if self
            .partial
            .as_ref()
            .is_some_and(|partial| partial.range_name == range.range_name)
        {
            self.partial = None;
        }
        match self
            .snapshot
            .iter_mut()
            .find(|known| known.range_name == range.range_name)
        {
            Some(known) => *known = range.clone(),
            None => self.snapshot.push(range.clone()),
        }
    }
}

/// What one cycle did.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CycleReport {
    pub ranges_seen: usize,
    pub deltas: Vec<RangeDelta>,
    /// Messages the sink accepted.
    pub notified: usize,
    /// Messages the sink failed to take.
    pub dropped: usize,
    /// Ranges fully handled before the cycle ended.
    pub ranges_committed: usize,
    /// The cycle only recorded a cold-start baseline.
    pub seeded: bool,
}

pub struct Reconciler<N> {
    portal: Portal,
    sessions: SessionManager,
    store: SnapshotStore,
    outbox: Outbox<N>,
    poll: PollInterval,
    backoff: Backoff,
}

impl<N: Notifier> Reconciler<N> {
    pub fn new(
        portal: Portal,
        sessions: SessionManager,
        store: SnapshotStore,
        outbox: Outbox<N>,
    ) -> Self {
        Self {
            portal,
            sessions,
            store,
            outbox,
            poll: PollInterval::default(),
            backoff: Backoff::default(),
        }
    }

    pub fn with_timing(mut self, poll: PollInterval, backoff: Backoff) -> Self {
        self.poll = poll;
        self.backoff = backoff;
        self
    }

    pub fn sessions(&mut self) -> &mut SessionManager {
        &mut self.sessions
    }

    pub fn outbox(&self) -> &Outbox<N> {
        &self.outbox
    }

    /// Loads the persisted baseline. An unreadable store is a cold start.
    pub fn restore_state(&self, replay_backlog: bool) -> ReconcileState {
        let snapshot = match self.store.load() {
            Ok(snapshot) => {
                relay_info!(
                    "Loaded {} ranges from {:?}",
                    snapshot.len(),
                    self.store.path()
                );
                snapshot
            }
            Err(err) => {
                relay_error!("Snapshot unreadable, starting from an empty baseline: {}", err);
                Vec::new()
            }
        };
        ReconcileState::restored(snapshot, replay_backlog)
    }

    /// Runs one cycle against `window` and hands back the next baseline.
    ///
    /// On failure the baseline keeps every range that was fully notified
    /// before the error, and `partial` remembers the numbers already emitted
    /// for the range that was interrupted, so the next cycle repeats neither.
    pub async fn run_cycle(
        &mut self,
        mut state: ReconcileState,
        window: ReportWindow,
    ) -> (ReconcileState, Result<CycleReport, RelayError>) {
        let mut report = CycleReport::default();
        let outcome = self.reconcile(&mut state, &window, &mut report).await;
        if outcome.is_err() && report.ranges_committed > 0 {
            self.persist(&state.snapshot);
        }
        (state, outcome.map(|()| report))
    }

    async fn reconcile(
        &mut self,
        state: &mut ReconcileState,
        window: &ReportWindow,
        report: &mut CycleReport,
    ) -> Result<(), RelayError> {
        let session = self.sessions.ensure().await?;
        let current = self.portal.fetch_range_summaries(session, window).await?;
        report.ranges_seen = current.len();

        if !state.baseline_ready {
            relay_info!("Recording {} ranges as the initial baseline", current.len());
            state.snapshot = current;
            state.baseline_ready = true;
            report.seeded = true;
            self.persist(&state.snapshot);
            return Ok(());
        }

        for regression in count_regressions(&state.snapshot, &current) {
            relay_warn!(
                "Count for {} dropped from {} to {}; treating as upstream reset",
                regression.range_name,
                regression.previous,
                regression.current
            );
        }

        report.deltas = diff(&state.snapshot, &current);
        for delta in &report.deltas {
            let range = delta.range();
            match delta {
                RangeDelta::New(_) => relay_info!("New range detected: {}", range.range_name),
                RangeDelta::Increased { delta: added, .. } => relay_info!(
                    "Count increased for {}: {} -> {} (+{})",
                    range.range_name,
                    range.count - added,
                    range.count,
                    added
                ),
            }

            let numbers = self
                .portal
                .fetch_numbers(session, window, &range.range_name)
                .await?;
            for number in numbers_to_fetch(delta, &numbers) {
                if state.already_emitted(&range.range_name, &number) {
                    relay_debug!("Skipping +{}, emitted before the last abort", number.number);
                    continue;
                }
                relay_info!("Fetching message for number: {}", number.number);
                let detail = self
                    .portal
                    .fetch_message(session, window, &number, &range.range_name)
                    .await?;
                let message =
                    Message::new(&number, &range.range_name, detail, Local::now().naive_local());
                relay_info!(
                    "New SMS in {} from +{}: {} chars",
                    message.range_name,
                    message.number,
                    message.body.chars().count()
                );
                match self.outbox.emit(&message).await {
                    Delivery::Delivered => report.notified += 1,
                    Delivery::Dropped => report.dropped += 1,
                }
                state.record_emitted(&range.range_name, number);
            }

            state.commit(range);
            report.ranges_committed += 1;
        }

        state.snapshot = current;
        state.partial = None;
        self.persist(&state.snapshot);
        Ok(())
    }

    fn persist(&self, snapshot: &[Range]) {
        match self.store.save(snapshot) {
            Ok(()) => relay_debug!("Saved {} ranges", snapshot.len()),
            Err(err) => relay_error!("Failed to save snapshot: {}", err),
        }
    }

    /// Runs cycles until `shutdown` fires, publishing loop status after each one.
    pub async fn run(
        mut self,
        mut state: ReconcileState,
        shutdown: CancellationToken,
        status: watch::Sender<StatusView>,
    ) -> ReconcileState {
        let mut supervisor = LoopState::new(self.backoff);
        loop {
            let msg = if shutdown.is_cancelled() {
                Msg::ShutdownRequested
            } else {
                let (next, outcome) = self.run_cycle(state, ReportWindow::today()).await;
                state = next;
                match outcome {
                    Ok(report) => {
                        if !report.deltas.is_empty() || report.seeded {
                            relay_info!(
                                "Cycle done: {} ranges, {} changed, {} sent, {} dropped",
                                report.ranges_seen,
                                report.deltas.len(),
                                report.notified,
                                report.dropped
                            );
                        }
                        Msg::CycleSucceeded {
                            notified: report.notified,
                        }
                    }
                    Err(err) => {
                        relay_error!("Error in reconciliation cycle: {}", err);
                        Msg::CycleFailed {
                            class: err.class(),
                            message: err.to_string(),
                        }
                    }
                }
            };

            let (next, effects) = update(supervisor, msg);
            supervisor = next;
            status.send_replace(supervisor.view());

            for effect in effects {
                match effect {
                    Effect::PollSoon => {
                        let delay = self.poll.with_fraction(rand::random::<f64>());
                        sleep_or_cancel(delay, &shutdown).await;
                    }
                    Effect::BackOff(delay) => {
                        relay_info!("Retrying in {} seconds...", delay.as_secs());
                        sleep_or_cancel(delay, &shutdown).await;
                    }
                    Effect::DiscardSession => self.sessions.discard(),
                    Effect::Stop => {
                        relay_info!("Reconciliation loop stopped");
                        return state;
                    }
                }
            }
        }
    }
}

/// Sleeps for `delay` unless `shutdown` fires first.
async fn sleep_or_cancel(delay: Duration, shutdown: &CancellationToken) {
    tokio::select! {
        _ = tokio::time::sleep(delay) => {}
        _ = shutdown.cancelled() => {}
    }
}
