use crate::{Number, RangeDelta};

/// Picks the numbers whose messages must be fetched for `delta`, oldest first.
///
/// The portal lists numbers newest-first, so the selection is reversed before
/// it is returned. A new range has no baseline and yields every number. An
/// increase of `d` yields the last `d` entries of the list as it arrived; a
/// list shorter than `d` yields all of it.
pub fn numbers_to_fetch(delta: &RangeDelta, numbers: &[Number]) -> Vec<Number> {
    let selected = match delta {
        RangeDelta::New(_) => numbers,
        RangeDelta::Increased { delta, .. } => {
            let take = usize::try_from(*delta).unwrap_or(usize::MAX).min(numbers.len());
            &numbers[numbers.len() - take..]
        }
    };
    selected.iter().rev().cloned().collect()
}
