use crate::{Effect, FailureClass, LoopPhase, LoopState, Msg};

/// Pure update function: applies a cycle outcome to the loop state and returns
/// the effects the engine must carry out, in order.
pub fn update(mut state: LoopState, msg: Msg) -> (LoopState, Vec<Effect>) {
    if state.phase() == LoopPhase::Stopped {
        return (state, Vec::new());
    }

    let effects = match msg {
        Msg::CycleSucceeded { notified } => {
            state.record_success(notified);
            vec![Effect::PollSoon]
        }
        Msg::CycleFailed { class, message } => {
            let delay = state.record_failure(message);
            let mut effects = Vec::with_capacity(2);
            if class == FailureClass::Authentication {
                effects.push(Effect::DiscardSession);
            }
            effects.push(Effect::BackOff(delay));
            effects
        }
        Msg::ShutdownRequested => {
            state.stop();
            vec![Effect::Stop]
        }
    };

    (state, effects)
}
