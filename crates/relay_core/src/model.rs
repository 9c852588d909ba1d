use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Body reported when a message detail page carries no message block.
pub const NO_MESSAGE_BODY: &str = "No message found";

/// Aggregate counters for one range as reported by the portal.
///
/// `range_name` is the identity used when comparing observations; `range_id` is
/// only needed to talk to the portal. This is also the persisted snapshot schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub range_name: String,
    pub range_id: String,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub paid: u64,
    #[serde(default)]
    pub unpaid: u64,
    /// As displayed by the portal. Only shown and stored, never summed, so
    /// binary floating point is exact enough.
    #[serde(default)]
    pub revenue: f64,
}

impl Range {
    /// Range with only a name and a count; the id falls back to the name.
    pub fn with_count(range_name: impl Into<String>, count: u64) -> Self {
        let range_name = range_name.into();
        Self {
            range_id: range_name.clone(),
            range_name,
            count,
            paid: 0,
            unpaid: 0,
            revenue: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Number {
    pub number: String,
    pub number_id: String,
}

impl Number {
    pub fn new(number: impl Into<String>, number_id: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            number_id: number_id.into(),
        }
    }
}

/// Content of a single message detail page.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageDetail {
    pub body: String,
    pub revenue: f64,
}

/// A newly discovered SMS, ready for the notification sink.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub number: String,
    pub range_name: String,
    /// When the relay captured the message, not when it was sent.
    pub timestamp: NaiveDateTime,
    pub body: String,
    pub revenue: f64,
}

impl Message {
    pub fn new(
        number: &Number,
        range_name: &str,
        detail: MessageDetail,
        timestamp: NaiveDateTime,
    ) -> Self {
        Self {
            number: number.number.clone(),
            range_name: range_name.to_string(),
            timestamp,
            body: detail.body,
            revenue: detail.revenue,
        }
    }
}
