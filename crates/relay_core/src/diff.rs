use std::collections::HashMap;

use crate::Range;

/// A change between two observations of the same range that needs fetching.
#[derive(Debug, Clone, PartialEq)]
pub enum RangeDelta {
    /// Range seen for the first time; every number it lists is new.
    New(Range),
    /// Range whose count grew by `delta` since the previous observation.
    Increased { range: Range, delta: u64 },
}

impl RangeDelta {
    pub fn range(&self) -> &Range {
        match self {
            RangeDelta::New(range) => range,
            RangeDelta::Increased { range, .. } => range,
        }
    }
}

/// A range whose count went down between observations.
///
/// Counts only grow under normal portal behaviour, so this signals an
/// upstream reset. It is reported, never turned into a delta.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountRegression {
    pub range_name: String,
    pub previous: u64,
    pub current: u64,
}

/// Classifies every range in `current` against `previous`, keyed by `range_name`.
///
/// Deltas come out in `current` order. Unchanged and decreased ranges produce
/// nothing.
pub fn diff(previous: &[Range], current: &[Range]) -> Vec<RangeDelta> {
    let known = index_by_name(previous);
    current
        .iter()
        .filter_map(|range| match known.get(range.range_name.as_str()) {
            None => Some(RangeDelta::New(range.clone())),
            Some(before) if range.count > before.count => Some(RangeDelta::Increased {
                range: range.clone(),
                delta: range.count - before.count,
            }),
            Some(_) => None,
        })
        .collect()
}

/// Ranges present in both observations whose count decreased.
pub fn count_regressions(previous: &[Range], current: &[Range]) -> Vec<CountRegression> {
    let known = index_by_name(previous);
    current
        .iter()
        .filter_map(|range| {
            let before = known.get(range.range_name.as_str())?;
            (range.count < before.count).then(|| CountRegression {
                range_name: range.range_name.clone(),
                previous: before.count,
                current: range.count,
            })
        })
        .collect()
}

fn index_by_name(ranges: &[Range]) -> HashMap<&str, &Range> {
    ranges
        .iter()
        .map(|range| (range.range_name.as_str(), range))
        .collect()
}
