//! # Association reports
//!
//! Every stage of the nightly cycle produces a [`StageReport`]: named counters of the
//! candidate pairs surviving each filter, and optionally an [`AssociationMetrics`] record
//! scoring the accepted pairs against the `ssnamenr` ground truth.
//!
//! [`NightReport`] nests the stage reports under the keys expected by downstream tools;
//! it serializes to JSON with [`NightReport::to_json`].
use std::collections::{BTreeMap, HashMap};

use ahash::RandomState;
use serde::{Deserialize, Serialize};

use crate::{constants::Nid, linkage_errors::LinkError, observations::Observation};

pub(crate) const SEPARATION_COUNTER: &str = "number of separation association";
pub(crate) const MAGNITUDE_COUNTER: &str = "number of association filtered by magnitude";
pub(crate) const TRACKLETS_COUNTER: &str = "number of intra night tracklets";
pub(crate) const INTER_SEPARATION_COUNTER: &str = "number of inter night separation based association";
pub(crate) const INTER_MAGNITUDE_COUNTER: &str = "number of inter night magnitude filtered association";
pub(crate) const DEDUPLICATION_COUNTER: &str = "number of duplicated association";
pub(crate) const ANGLE_COUNTER: &str = "number of inter night angle filtered association";
pub(crate) const ASSOCIATION_COUNTER: &str = "number of associations";
pub(crate) const MERGE_COUNTER: &str = "number of merge candidates";

/// Quality of a set of accepted associations against the known object names.
///
/// `precision` and `recall` are percentages; both are `0` when undefined.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AssociationMetrics {
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub total_real_associations: usize,
    pub precision: f64,
    pub recall: f64,
}

impl AssociationMetrics {
    /// Score accepted pairs.
    ///
    /// Arguments
    /// -----------------
    /// * `accepted`: the `(left, right)` pairs accepted by a stage.
    /// * `total_real_associations`: number of pairs of the candidate population sharing an
    ///   object name, see [`real_pairs_between`] and [`real_pairs_within`].
    pub fn compute<'a>(
        accepted: impl IntoIterator<Item = (&'a Observation, &'a Observation)>,
        total_real_associations: usize,
    ) -> Self {
        let (tp, n) = accepted
            .into_iter()
            .fold((0, 0), |(tp, n), (l, r)| (tp + l.same_object(r) as usize, n + 1));
        let fp = n - tp;
        let fn_ = total_real_associations.saturating_sub(tp);

        let ratio = |num: usize, den: usize| {
            if den == 0 {
                0.0
            } else {
                num as f64 / den as f64 * 100.0
            }
        };

        AssociationMetrics {
            true_positives: tp,
            false_positives: fp,
            false_negatives: fn_,
            total_real_associations,
            precision: ratio(tp, tp + fp),
            recall: ratio(tp, tp + fn_),
        }
    }
}

fn name_counts<'a>(
    observations: impl IntoIterator<Item = &'a Observation>,
) -> HashMap<&'a str, usize, RandomState> {
    let mut counts: HashMap<&str, usize, RandomState> = HashMap::default();
    for obs in observations {
        if let Some(name) = obs.ssnamenr.as_deref().filter(|n| !n.is_empty()) {
            *counts.entry(name).or_default() += 1;
        }
    }
    counts
}

/// Number of `(left, right)` pairs sharing an object name.
pub fn real_pairs_between<'a>(
    left: impl IntoIterator<Item = &'a Observation>,
    right: impl IntoIterator<Item = &'a Observation>,
) -> usize {
    let left = name_counts(left);
    let right = name_counts(right);
    left.iter()
        .map(|(name, n)| n * right.get(name).copied().unwrap_or(0))
        .sum()
}

/// Number of unordered pairs of distinct observations sharing an object name.
pub fn real_pairs_within<'a>(observations: impl IntoIterator<Item = &'a Observation>) -> usize {
    name_counts(observations)
        .values()
        .map(|&n| n * n.saturating_sub(1) / 2)
        .sum()
}

/// Counters of one association stage.
///
/// Counters are kept in a sorted map so that reports serialize deterministically.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StageReport {
    #[serde(flatten)]
    pub counters: BTreeMap<String, usize>,
    #[serde(
        rename = "association metrics",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub metrics: Option<AssociationMetrics>,
}

impl StageReport {
    pub fn set(&mut self, counter: &str, value: usize) {
        self.counters.insert(counter.to_string(), value);
    }

    /// Value of a counter, `0` when absent.
    pub fn get(&self, counter: &str) -> usize {
        self.counters.get(counter).copied().unwrap_or(0)
    }

    /// True for a skipped stage.
    pub fn is_empty(&self) -> bool {
        self.counters.is_empty() && self.metrics.is_none()
    }
}

/// Report of one nightly cycle.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NightReport {
    #[serde(rename = "nid of the next night")]
    pub next_nid: Nid,
    #[serde(rename = "intra night report")]
    pub intra_night: StageReport,
    #[serde(rename = "tracklets associations report")]
    pub tracklets_with_trajectories: StageReport,
    #[serde(rename = "trajectories associations report")]
    pub trajectories_with_new_observations: StageReport,
    #[serde(rename = "track and old obs associations report")]
    pub tracklets_with_old_observations: StageReport,
    #[serde(rename = "old observation and new observation report")]
    pub old_with_new_observations: StageReport,
}

impl NightReport {
    pub fn new(next_nid: Nid) -> Self {
        NightReport {
            next_nid,
            ..Default::default()
        }
    }

    pub fn to_json(&self) -> Result<String, LinkError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
