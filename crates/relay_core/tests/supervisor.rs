use std::time::Duration;

use relay_core::{
    update, Backoff, Effect, FailureClass, LoopPhase, LoopState, Msg, PollInterval,
};

fn init_logging() {
    relay_logging::initialize_for_tests();
}

fn failed(class: FailureClass) -> Msg {
    Msg::CycleFailed {
        class,
        message: format!("{class:?} failure"),
    }
}

#[test]
fn success_polls_again_and_counts_notifications() {
    init_logging();
    let (state, effects) = update(LoopState::default(), Msg::CycleSucceeded { notified: 3 });
    assert_eq!(effects, vec![Effect::PollSoon]);

    let (state, _) = update(state, Msg::CycleSucceeded { notified: 1 });
    let view = state.view();
    assert_eq!(view.phase, LoopPhase::Polling);
    assert_eq!(view.cycles_completed, 2);
    assert_eq!(view.notifications_sent, 4);
    assert_eq!(view.consecutive_failures, 0);
}

#[test]
fn backoff_grows_with_consecutive_failures_and_caps() {
    init_logging();
    let mut state = LoopState::new(Backoff::default());
    let mut delays = Vec::new();
    for _ in 0..6 {
        let (next, effects) = update(state, failed(FailureClass::Transport));
        state = next;
        match effects.as_slice() {
            [Effect::BackOff(delay)] => delays.push(delay.as_secs()),
            other => panic!("unexpected effects {other:?}"),
        }
    }
    assert_eq!(delays, vec![30, 60, 120, 240, 300, 300]);
    assert_eq!(state.phase(), LoopPhase::BackingOff);
    assert_eq!(state.view().last_error.as_deref(), Some("Transport failure"));
}

#[test]
fn success_resets_backoff() {
    init_logging();
    let (state, _) = update(LoopState::default(), failed(FailureClass::Parse));
    let (state, _) = update(state, failed(FailureClass::Parse));
    assert_eq!(state.consecutive_failures(), 2);

    let (state, _) = update(state, Msg::CycleSucceeded { notified: 0 });
    let (_, effects) = update(state, failed(FailureClass::Parse));
    assert_eq!(effects, vec![Effect::BackOff(Duration::from_secs(30))]);
}

#[test]
fn authentication_failure_discards_session_before_backoff() {
    init_logging();
    let (_, effects) = update(LoopState::default(), failed(FailureClass::Authentication));
    assert_eq!(
        effects,
        vec![
            Effect::DiscardSession,
            Effect::BackOff(Duration::from_secs(30))
        ]
    );
}

#[test]
fn shutdown_stops_and_ignores_later_messages() {
    init_logging();
    let (state, effects) = update(LoopState::default(), Msg::ShutdownRequested);
    assert_eq!(effects, vec![Effect::Stop]);
    assert_eq!(state.phase(), LoopPhase::Stopped);

    let (state, effects) = update(state, Msg::CycleSucceeded { notified: 5 });
    assert!(effects.is_empty());
    assert_eq!(state.view().notifications_sent, 0);
}

#[test]
fn poll_interval_stays_within_jitter_span() {
    init_logging();
    let interval = PollInterval::default();
    assert_eq!(interval.with_fraction(0.0), Duration::from_secs(2));
    assert_eq!(interval.with_fraction(1.0), Duration::from_secs(3));
    assert_eq!(interval.with_fraction(7.5), Duration::from_secs(3));
    assert_eq!(interval.with_fraction(0.5), Duration::from_millis(2500));
}

#[test]
fn status_view_renders_last_error() {
    init_logging();
    let (state, _) = update(LoopState::default(), failed(FailureClass::Parse));
    let text = state.view().to_string();
    assert!(text.contains("consecutive failures: 1"));
    assert!(text.contains("last error: Parse failure"));
}
