//! Equity samples, the rolling series and anchored reads.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::bounded_history::BoundedHistory;
use crate::domain::shared::Timestamp;

/// One equity observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquitySample {
    /// Sample time.
    pub timestamp: Timestamp,
    /// Account equity in USD.
    pub equity: Decimal,
}

/// Optional start point for equity reads; earlier samples are hidden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquityAnchor {
    /// Anchor time.
    pub timestamp: Timestamp,
    /// Equity at the anchor.
    pub value: Decimal,
}

/// Outcome of appending to a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// Added as the newest sample.
    Appended,
    /// Same timestamp as the newest sample; value replaced.
    Replaced,
    /// Older than the newest sample; dropped.
    RejectedStale,
}

/// Append keeping timestamps non-decreasing.
pub fn append_sample(
    series: &mut BoundedHistory<EquitySample>,
    sample: EquitySample,
) -> AppendOutcome {
    if let Some(last) = series.last_mut() {
        if sample.timestamp < last.timestamp {
            return AppendOutcome::RejectedStale;
        }
        if sample.timestamp == last.timestamp {
            last.equity = sample.equity;
            return AppendOutcome::Replaced;
        }
    }
    series.push(sample);
    AppendOutcome::Appended
}

/// UTC days from `from` to `to`, inclusive. Empty when `from > to`.
#[must_use]
pub fn days_between(from: NaiveDate, to: NaiveDate) -> Vec<NaiveDate> {
    from.iter_days().take_while(|d| *d <= to).collect()
}

/// Union of archive partitions and the rolling buffer.
///
/// Deduplicated by timestamp (later sources win), sorted, and filtered to
/// samples at or after the anchor when one is given.
#[must_use]
pub fn merge_series(
    partitions: impl IntoIterator<Item = Vec<EquitySample>>,
    rolling: &[EquitySample],
    anchor: Option<&EquityAnchor>,
) -> Vec<EquitySample> {
    let mut by_time: BTreeMap<Timestamp, Decimal> = BTreeMap::new();
    for sample in partitions.into_iter().flatten().chain(rolling.iter().copied()) {
        by_time.insert(sample.timestamp, sample.equity);
    }
    by_time
        .into_iter()
        .filter(|(ts, _)| anchor.is_none_or(|a| *ts >= a.timestamp))
        .map(|(timestamp, equity)| EquitySample { timestamp, equity })
        .collect()
}
