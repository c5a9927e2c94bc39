//! # Inter-night association stages
//!
//! The four matching stages of the nightly cycle, in execution order:
//!
//! | stage | left (earlier)             | right (later)              | cone search          |
//! |-------|----------------------------|----------------------------|----------------------|
//! | 3     | trajectory last point      | tracklet first point       | trajectory last two  |
//! | 4     | trajectory last point      | new observation            | trajectory last two  |
//! | 5     | old observation            | tracklet first point       | backwards in time    |
//! | 6     | old observation            | new observation            | none                 |
//!
//! Every stage runs the separation match, the magnitude filter and the mirror removal
//! with the inter-night criteria, then the cone search when a chain of two points exists.
//! Each stage reports its counters in a [`StageReport`]. A stage with an empty side
//! returns its inputs untouched with an empty report.
use std::time::Instant;

use tracing::debug;

use crate::{
    associations::{
        candidates::{magnitude_filter, remove_mirrored, separation_association, CandidatePairs},
        cone_search::cone_filter,
        id_management::{
            assign_observation_extensions, assign_trajectory_extensions, ExtensionOutcome,
            ObservationExtension,
        },
        params::AssociationParams,
        report::{
            real_pairs_between, AssociationMetrics, StageReport, ANGLE_COUNTER,
            ASSOCIATION_COUNTER, DEDUPLICATION_COUNTER, INTER_MAGNITUDE_COUNTER,
            INTER_SEPARATION_COUNTER, MERGE_COUNTER,
        },
    },
    constants::TrajectoryId,
    observations::Observation,
    trajectories::{Trajectory, TrajectorySet},
};

/// Separation, magnitude and mirror filters with the inter-night criteria.
fn inter_night_pairs(
    left: &[&Observation],
    right: &[&Observation],
    params: &AssociationParams,
    report: &mut StageReport,
) -> CandidatePairs {
    let pairs = separation_association(left, right, params.sep_criterion);
    report.set(INTER_SEPARATION_COUNTER, pairs.len());

    let pairs = magnitude_filter(
        left,
        right,
        pairs,
        params.mag_criterion_same_fid,
        params.mag_criterion_diff_fid,
    );
    report.set(INTER_MAGNITUDE_COUNTER, pairs.len());

    let before = pairs.len();
    let pairs = remove_mirrored(left, right, pairs);
    report.set(DEDUPLICATION_COUNTER, before - pairs.len());
    pairs
}

fn record_metrics(
    report: &mut StageReport,
    params: &AssociationParams,
    pairs: &CandidatePairs,
    left: &[&Observation],
    right: &[&Observation],
) {
    if params.run_metrics {
        report.metrics = Some(AssociationMetrics::compute(
            pairs.iter().map(|(l, r, _)| (left[l], right[r])),
            real_pairs_between(left.iter().copied(), right.iter().copied()),
        ));
    }
}

/// Row indices ordered by increasing separation, ties by row.
fn closest_first(pairs: &CandidatePairs) -> Vec<usize> {
    let mut rows: Vec<usize> = (0..pairs.len()).collect();
    rows.sort_by(|&a, &b| pairs.separation[a].total_cmp(&pairs.separation[b]));
    rows
}

/// Stage 3: extend trajectories with the tracklets of the new night.
///
/// Arguments
/// -----------------
/// * `trajectories`: the trajectories kept by the time window.
/// * `tracklets`: the new-night tracklets too short for orbit fitting.
///
/// Return
/// ----------
/// * The [`ExtensionOutcome`] of the merge policy and the stage report.
///
/// See also
/// ------------
/// * [`assign_trajectory_extensions`] – the one-to-many merge policy.
pub fn tracklets_with_trajectories(
    trajectories: TrajectorySet,
    tracklets: TrajectorySet,
    params: &AssociationParams,
) -> (ExtensionOutcome, StageReport) {
    let mut report = StageReport::default();
    if trajectories.is_empty() || tracklets.is_empty() {
        let outcome = ExtensionOutcome {
            unmatched: trajectories,
            remaining_tracklets: tracklets,
            ..Default::default()
        };
        return (outcome, report);
    }
    let start = Instant::now();

    let chains: Vec<&Trajectory> = trajectories.iter().filter(|t| t.len() >= 2).collect();
    let heads: Vec<&Trajectory> = tracklets.iter().filter(|t| !t.is_empty()).collect();
    let left: Vec<&Observation> = chains.iter().filter_map(|t| t.last()).collect();
    let right: Vec<&Observation> = heads.iter().filter_map(|t| t.first()).collect();

    let pairs = inter_night_pairs(&left, &right, params, &mut report);
    let pairs = cone_filter(pairs, params.angle_criterion, |l, r| {
        chains[l].last_two().map(|(p1, p2)| (p1, p2, right[r]))
    });
    report.set(ANGLE_COUNTER, pairs.len());
    record_metrics(&mut report, params, &pairs, &left, &right);

    let matches: Vec<(TrajectoryId, TrajectoryId)> = pairs
        .iter()
        .map(|(l, r, _)| (chains[l].id(), heads[r].id()))
        .collect();

    let outcome = assign_trajectory_extensions(trajectories, tracklets, &matches);
    report.set(ASSOCIATION_COUNTER, outcome.extended.len());
    report.set(MERGE_COUNTER, outcome.linked_tracklets.len());

    debug!(
        extended = outcome.extended.len(),
        merges = outcome.linked_tracklets.len(),
        elapsed = ?start.elapsed(),
        "tracklets and trajectories association"
    );
    (outcome, report)
}

/// Stage 4: extend trajectories with single new-night observations.
///
/// Pairs are taken by increasing separation; a trajectory gains one point at most and an
/// observation extends one trajectory at most.
pub fn trajectories_with_new_observations(
    trajectories: TrajectorySet,
    new_observations: Vec<Observation>,
    params: &AssociationParams,
) -> (ObservationExtension, StageReport) {
    let mut report = StageReport::default();
    if trajectories.is_empty() || new_observations.is_empty() {
        let outcome = ObservationExtension {
            unmatched: trajectories,
            remaining: new_observations,
            ..Default::default()
        };
        return (outcome, report);
    }
    let start = Instant::now();

    let chains: Vec<&Trajectory> = trajectories.iter().filter(|t| t.len() >= 2).collect();
    let left: Vec<&Observation> = chains.iter().filter_map(|t| t.last()).collect();
    let right: Vec<&Observation> = new_observations.iter().collect();

    let pairs = inter_night_pairs(&left, &right, params, &mut report);
    let pairs = cone_filter(pairs, params.angle_criterion, |l, r| {
        chains[l].last_two().map(|(p1, p2)| (p1, p2, right[r]))
    });
    report.set(ANGLE_COUNTER, pairs.len());
    record_metrics(&mut report, params, &pairs, &left, &right);

    let matches: Vec<(TrajectoryId, usize)> = closest_first(&pairs)
        .into_iter()
        .map(|k| (chains[pairs.left[k]].id(), pairs.right[k]))
        .collect();

    let outcome = assign_observation_extensions(trajectories, new_observations, &matches);
    report.set(ASSOCIATION_COUNTER, outcome.extended.len());

    debug!(
        extended = outcome.extended.len(),
        elapsed = ?start.elapsed(),
        "trajectories and new observations association"
    );
    (outcome, report)
}

/// Stage 5: extend tracklets backwards with old observations.
///
/// The old observation comes first in time, so the cone search walks the tracklet
/// backwards: second point, first point, then the old observation.
pub fn tracklets_with_old_observations(
    tracklets: TrajectorySet,
    old_observations: Vec<Observation>,
    params: &AssociationParams,
) -> (ObservationExtension, StageReport) {
    let mut report = StageReport::default();
    if tracklets.is_empty() || old_observations.is_empty() {
        let outcome = ObservationExtension {
            unmatched: tracklets,
            remaining: old_observations,
            ..Default::default()
        };
        return (outcome, report);
    }
    let start = Instant::now();

    let heads: Vec<&Trajectory> = tracklets.iter().filter(|t| t.len() >= 2).collect();
    let left: Vec<&Observation> = old_observations.iter().collect();
    let right: Vec<&Observation> = heads.iter().filter_map(|t| t.first()).collect();

    let pairs = inter_night_pairs(&left, &right, params, &mut report);
    let pairs = cone_filter(pairs, params.angle_criterion, |l, r| {
        heads[r].first_two().map(|(first, second)| (second, first, left[l]))
    });
    report.set(ANGLE_COUNTER, pairs.len());
    record_metrics(&mut report, params, &pairs, &left, &right);

    let matches: Vec<(TrajectoryId, usize)> = closest_first(&pairs)
        .into_iter()
        .map(|k| (heads[pairs.right[k]].id(), pairs.left[k]))
        .collect();

    let outcome = assign_observation_extensions(tracklets, old_observations, &matches);
    report.set(ASSOCIATION_COUNTER, outcome.extended.len());

    debug!(
        extended = outcome.extended.len(),
        elapsed = ?start.elapsed(),
        "tracklets and old observations association"
    );
    (outcome, report)
}

/// Result of [`old_with_new_observations`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PairingOutcome {
    /// Two-point trajectories, ids minted from `first_id`.
    pub trajectories: TrajectorySet,
    pub remaining_old: Vec<Observation>,
    pub remaining_new: Vec<Observation>,
}

/// Stage 6: pair leftover old and new observations into new two-point trajectories.
///
/// With only two points no cone search applies. Pairs are taken one to one by
/// increasing separation; new ids are given in that order starting at `first_id`.
pub fn old_with_new_observations(
    old_observations: Vec<Observation>,
    new_observations: Vec<Observation>,
    first_id: TrajectoryId,
    params: &AssociationParams,
) -> (PairingOutcome, StageReport) {
    let mut report = StageReport::default();
    if old_observations.is_empty() || new_observations.is_empty() {
        let outcome = PairingOutcome {
            remaining_old: old_observations,
            remaining_new: new_observations,
            ..Default::default()
        };
        return (outcome, report);
    }
    let start = Instant::now();

    let left: Vec<&Observation> = old_observations.iter().collect();
    let right: Vec<&Observation> = new_observations.iter().collect();

    let pairs = inter_night_pairs(&left, &right, params, &mut report);
    record_metrics(&mut report, params, &pairs, &left, &right);

    let mut old_used = vec![false; old_observations.len()];
    let mut new_used = vec![false; new_observations.len()];
    let mut accepted = Vec::new();
    for k in closest_first(&pairs) {
        let (l, r) = (pairs.left[k], pairs.right[k]);
        if !old_used[l] && !new_used[r] {
            old_used[l] = true;
            new_used[r] = true;
            accepted.push((l, r));
        }
    }

    let mut old_slots: Vec<Option<Observation>> = old_observations.into_iter().map(Some).collect();
    let mut new_slots: Vec<Option<Observation>> = new_observations.into_iter().map(Some).collect();

    let trajectories: TrajectorySet = accepted
        .into_iter()
        .zip(first_id..)
        .filter_map(|((l, r), id)| {
            let points = [old_slots[l].take()?, new_slots[r].take()?];
            Some(Trajectory::new(id, points))
        })
        .collect();
    report.set(ASSOCIATION_COUNTER, trajectories.len());

    debug!(
        new_trajectories = trajectories.len(),
        elapsed = ?start.elapsed(),
        "old and new observations association"
    );

    let outcome = PairingOutcome {
        trajectories,
        remaining_old: old_slots.into_iter().flatten().collect(),
        remaining_new: new_slots.into_iter().flatten().collect(),
    };
    (outcome, report)
}
