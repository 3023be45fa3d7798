//! Peak-to-peak artifact rejection and per-condition statistics.

use crate::epochs::{Epoch, EpochCollection};
use crate::error::{ErpError, Result};
use crate::types::{Condition, ExpectedCounts};
use serde::Serialize;

/// Max minus min of a sample sequence (0 for an empty one)
pub fn peak_to_peak(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let (min, max) = samples
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    max - min
}

/// Largest per-channel peak-to-peak of an epoch, with the channel index
pub fn epoch_peak_to_peak(epoch: &Epoch) -> (f64, usize) {
    epoch
        .data
        .iter()
        .enumerate()
        .map(|(i, channel)| (peak_to_peak(channel), i))
        .fold((0.0, 0), |best, cur| if cur.0 > best.0 { cur } else { best })
}

/// Drop epochs whose peak-to-peak exceeds `threshold` on any channel
///
/// An epoch exactly at the threshold is kept. Survivors keep their order.
/// Returns the number of epochs dropped by this call.
pub fn reject_artifacts(collection: &mut EpochCollection, threshold: f64) -> usize {
    let before = collection.len();
    let condition = collection.condition;
    let ch_names = collection.ch_names.clone();

    collection.retain(|epoch| {
        let (ptp, channel) = epoch_peak_to_peak(epoch);
        let keep = ptp <= threshold;
        if !keep {
            log::debug!(
                "Rejecting {} epoch at sample {}: {:.1} µV peak-to-peak on {}",
                condition,
                epoch.event.sample_index,
                ptp,
                ch_names.get(channel).map(String::as_str).unwrap_or("?")
            );
        }
        keep
    });

    let dropped = before - collection.len();
    log::info!(
        "Rejected {} of {} {} epochs above {} µV",
        dropped,
        before,
        condition,
        threshold
    );
    dropped
}

/// Rejection outcome for one condition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConditionStats {
    pub condition: Condition,
    /// Count the protocol shows, when known
    pub expected: Option<usize>,
    pub found: usize,
    pub rejected: usize,
    pub surviving: usize,
    pub percent_rejected: f64,
    /// `percent_rejected` rounded to two decimals, e.g. `14.29%`
    pub percent: String,
}

impl ConditionStats {
    /// Derive statistics from a collection after rejection
    ///
    /// `found` comes from the collection's extraction snapshot, so epochs
    /// that did not fit in the recording count as rejected.
    pub fn from_collection(collection: &EpochCollection, expected: Option<usize>) -> Result<Self> {
        let found = collection.found();
        if found == 0 {
            return Err(ErpError::EmptyCondition(collection.condition));
        }
        let surviving = collection.len();
        let rejected = found.saturating_sub(surviving);
        let percent_rejected = 100.0 * rejected as f64 / found as f64;
        Ok(Self {
            condition: collection.condition,
            expected,
            found,
            rejected,
            surviving,
            percent_rejected,
            percent: format!("{:.2}%", percent_rejected),
        })
    }

    pub fn percent_display(&self) -> String {
        self.percent.clone()
    }
}

/// Statistics for both conditions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectionStatistics {
    pub up: ConditionStats,
    pub down: ConditionStats,
}

impl RejectionStatistics {
    pub fn get(&self, condition: Condition) -> &ConditionStats {
        match condition {
            Condition::Up => &self.up,
            Condition::Down => &self.down,
        }
    }

    /// Table rows: condition, expected, found, rejected, percent
    pub fn rows(&self) -> Vec<[String; 5]> {
        Condition::ALL
            .iter()
            .map(|&c| {
                let stats = self.get(c);
                [
                    c.to_string(),
                    stats
                        .expected
                        .map(|e| e.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    stats.found.to_string(),
                    stats.rejected.to_string(),
                    stats.percent_display(),
                ]
            })
            .collect()
    }

    pub fn status_message(&self) -> String {
        self.rows()
            .iter()
            .map(|[condition, expected, found, rejected, percent]| {
                format!(
                    "{}: {} found (expected {}), {} rejected ({})",
                    condition, found, expected, rejected, percent
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub fn rejection_statistics(
    up: &EpochCollection,
    down: &EpochCollection,
    expected: Option<ExpectedCounts>,
) -> Result<RejectionStatistics> {
    Ok(RejectionStatistics {
        up: ConditionStats::from_collection(up, expected.map(|e| e.get(Condition::Up)))?,
        down: ConditionStats::from_collection(down, expected.map(|e| e.get(Condition::Down)))?,
    })
}
