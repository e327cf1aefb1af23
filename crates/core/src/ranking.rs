//! Ranking and threshold filtering over normalized contracts.
//!
//! Both operations are pure and total: an empty slice yields an empty
//! result, and contracts without a delta are dropped rather than treated as
//! errors. Delta magnitude is not range-checked.

use serde::{Deserialize, Serialize};

use crate::types::{ContractRecord, ContractType};

/// Target parameters for closest-match ranking.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankTarget {
    /// Target days to expiration.
    pub dte: i64,
    /// Target delta magnitude.
    pub delta: f64,
}

/// Band used by [`filter_by_threshold`]. Bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdFilter {
    pub max_dte: i64,
    pub delta_min: f64,
    pub delta_max: f64,
}

impl ThresholdFilter {
    /// Returns true if the contract falls inside the band. Missing delta
    /// never matches.
    #[must_use]
    pub fn matches(&self, record: &ContractRecord) -> bool {
        let Some(delta) = record.abs_delta() else {
            return false;
        };
        record.days_to_expiration <= self.max_dte
            && self.delta_min <= delta
            && delta <= self.delta_max
    }
}

/// A contract paired with its deviation from a [`RankTarget`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredContract<'a> {
    pub record: &'a ContractRecord,
    pub score: f64,
}

/// Deviation score: `|dte - target.dte| + ||delta| - target.delta|`.
///
/// The two terms are summed in their natural units with no weighting, so a
/// one-day miss counts the same as a 1.0 delta miss. Returns `None` when the
/// contract has no delta.
#[must_use]
pub fn deviation_score(record: &ContractRecord, target: &RankTarget) -> Option<f64> {
    let delta = record.abs_delta()?;
    let dte_miss = record.days_to_expiration.abs_diff(target.dte) as f64;
    Some(dte_miss + (delta - target.delta).abs())
}

/// Scores every contract against `target` and sorts ascending.
///
/// The sort is stable: equal scores keep input order. The full ranked list is
/// returned and callers truncate to what they display.
#[must_use]
pub fn rank_by_target<'a>(
    records: &'a [ContractRecord],
    target: &RankTarget,
) -> Vec<ScoredContract<'a>> {
    let mut scored: Vec<ScoredContract<'a>> = records
        .iter()
        .filter_map(|record| {
            deviation_score(record, target).map(|score| ScoredContract { record, score })
        })
        .collect();

    scored.sort_by(|a, b| a.score.total_cmp(&b.score));

    tracing::debug!(
        input = records.len(),
        ranked = scored.len(),
        target_dte = target.dte,
        target_delta = target.delta,
        "Ranked contracts"
    );

    scored
}

/// Keeps contracts inside the threshold band, preserving input order.
#[must_use]
pub fn filter_by_threshold<'a>(
    records: &'a [ContractRecord],
    filter: &ThresholdFilter,
) -> Vec<&'a ContractRecord> {
    records.iter().filter(|r| filter.matches(r)).collect()
}

/// Keeps only calls or only puts, preserving input order.
#[must_use]
pub fn only_type(records: &[ContractRecord], contract_type: ContractType) -> Vec<ContractRecord> {
    records
        .iter()
        .filter(|r| r.contract_type == contract_type)
        .cloned()
        .collect()
}
