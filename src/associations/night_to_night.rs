//! # Night to night association
//!
//! One incremental cycle of the engine: given the trajectories and the unassociated
//! observations gathered so far, fold the observations of a new night into them.
//!
//! Cycle
//! -----------------
//! 1. [`time_window_management`] evicts stale trajectories and observations.
//! 2. [`intra_night_association`] builds the tracklets of the new night; tracklets long
//!    enough for orbit fitting leave the association pool.
//! 3. [`tracklets_with_trajectories`]
//! 4. [`trajectories_with_new_observations`]
//! 5. [`tracklets_with_old_observations`]
//! 6. [`old_with_new_observations`]
//!
//! Each stage consumes the leftovers of the previous ones. When no trajectory and no old
//! observation survive the window, stages 3 to 6 are skipped.
//!
//! The output trajectories are sorted and renumbered to `[0, N)`; the cycle itself
//! cannot fail.
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    associations::{
        id_management::{ExtensionOutcome, ObservationExtension},
        inter_night::{
            old_with_new_observations, trajectories_with_new_observations,
            tracklets_with_old_observations, tracklets_with_trajectories, PairingOutcome,
        },
        intra_night::intra_night_association,
        params::AssociationParams,
        report::{NightReport, StageReport},
        time_window::time_window_management,
    },
    constants::{Nid, TrajectoryId},
    observations::Observation,
    trajectories::TrajectorySet,
};

/// A trajectory recorded as a possible continuation of another during the cycle.
///
/// Both ids refer to the renumbered output set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeLink {
    pub trajectory_id: TrajectoryId,
    pub linked_id: TrajectoryId,
}

/// Result of [`night_to_night_association`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NightOutcome {
    /// Every trajectory, sorted by id, ids in `[0, N)`, none marked as sent.
    pub trajectories: TrajectorySet,
    /// Unassociated observations to carry to the next night: leftover old ones first,
    /// then leftover new ones.
    pub old_observations: Vec<Observation>,
    /// Old observations dropped by the time window.
    pub evicted_observations: Vec<Observation>,
    pub merge_links: Vec<MergeLink>,
    pub report: NightReport,
}

/// Associate the observations of night `next_nid` with the current state.
///
/// Arguments
/// -----------------
/// * `trajectories`: all trajectories known so far.
/// * `old_observations`: unassociated observations of the previous nights.
/// * `new_observations`: the observations of the new night.
/// * `last_nid`: the night processed by the previous cycle.
/// * `next_nid`: the night being processed.
/// * `params`: thresholds, windows and stage toggles.
///
/// Return
/// ----------
/// * A [`NightOutcome`]. Every input observation ends in exactly one of its
///   trajectories, `old_observations` or `evicted_observations`.
///
/// See also
/// ------------
/// * [`crate::orbit_fitting::compute_orbits`] – consumes the trajectories of the outcome.
pub fn night_to_night_association(
    trajectories: TrajectorySet,
    old_observations: Vec<Observation>,
    new_observations: Vec<Observation>,
    last_nid: Nid,
    next_nid: Nid,
    params: &AssociationParams,
) -> NightOutcome {
    let start = Instant::now();
    let mut report = NightReport::new(next_nid);
    let mut next_id = trajectories.next_trajectory_id();

    let window = time_window_management(trajectories, old_observations, next_nid, params);
    debug!(
        last_nid,
        next_nid,
        kept_trajectories = window.kept_trajectories.len(),
        evicted_trajectories = window.evicted_trajectories.len(),
        kept_observations = window.kept_observations.len(),
        "time window"
    );

    let intra = intra_night_association(new_observations, next_id, params);
    next_id += intra.tracklets.len() as TrajectoryId;
    report.intra_night = intra.report;

    let mut output = window.evicted_trajectories;

    if window.kept_trajectories.is_empty() && window.kept_observations.is_empty() {
        output.append(intra.tracklets);
        return finalize(output, intra.remaining, window.evicted_observations, report, params, start);
    }

    let (short_tracklets, orbit_ready) = intra.tracklets.separate_trajectories(params.orbfit_limit);
    output.append(orbit_ready);

    let (stage3, report3) = if params.do_track_and_traj_assoc {
        tracklets_with_trajectories(window.kept_trajectories, short_tracklets, params)
    } else {
        let skipped = ExtensionOutcome {
            unmatched: window.kept_trajectories,
            remaining_tracklets: short_tracklets,
            ..Default::default()
        };
        (skipped, StageReport::default())
    };
    report.tracklets_with_trajectories = report3;
    output.append(stage3.extended);

    let (stage4, report4) = if params.do_traj_and_new_obs_assoc {
        trajectories_with_new_observations(stage3.unmatched, intra.remaining, params)
    } else {
        let skipped = ObservationExtension {
            unmatched: stage3.unmatched,
            remaining: intra.remaining,
            ..Default::default()
        };
        (skipped, StageReport::default())
    };
    report.trajectories_with_new_observations = report4;
    output.append(stage4.extended);
    output.append(stage4.unmatched);
    output.append(stage3.linked_tracklets);

    let (stage5, report5) = if params.do_track_and_old_obs_assoc {
        tracklets_with_old_observations(stage3.remaining_tracklets, window.kept_observations, params)
    } else {
        let skipped = ObservationExtension {
            unmatched: stage3.remaining_tracklets,
            remaining: window.kept_observations,
            ..Default::default()
        };
        (skipped, StageReport::default())
    };
    report.tracklets_with_old_observations = report5;
    output.append(stage5.extended);
    output.append(stage5.unmatched);

    let (stage6, report6) = if params.do_new_obs_and_old_obs_assoc {
        old_with_new_observations(stage5.remaining, stage4.remaining, next_id, params)
    } else {
        let skipped = PairingOutcome {
            remaining_old: stage5.remaining,
            remaining_new: stage4.remaining,
            ..Default::default()
        };
        (skipped, StageReport::default())
    };
    report.old_with_new_observations = report6;
    output.append(stage6.trajectories);

    let mut unassociated = stage6.remaining_old;
    unassociated.extend(stage6.remaining_new);

    finalize(output, unassociated, window.evicted_observations, report, params, start)
}

/// Collapse merge lists, sort, renumber and reset the orbit-fit flags.
fn finalize(
    mut trajectories: TrajectorySet,
    old_observations: Vec<Observation>,
    evicted_observations: Vec<Observation>,
    report: NightReport,
    params: &AssociationParams,
    start: Instant,
) -> NightOutcome {
    let links = trajectories.resolve_merges();
    trajectories.sort_by_id();
    let mapping = trajectories.align_trajectory_id();
    trajectories.mark_not_sent();

    let merge_links = links
        .into_iter()
        .filter_map(|(trajectory_id, linked_id)| {
            Some(MergeLink {
                trajectory_id: *mapping.get(&trajectory_id)?,
                linked_id: *mapping.get(&linked_id)?,
            })
        })
        .collect();

    debug!(
        trajectories = %trajectories
            .stats(params.orbfit_limit)
            .map(|stats| stats.to_string())
            .unwrap_or_default(),
        old_observations = old_observations.len(),
        elapsed = ?start.elapsed(),
        "night to night association"
    );

    NightOutcome {
        trajectories,
        old_observations,
        evicted_observations,
        merge_links,
        report,
    }
}

#[cfg(test)]
mod night_to_night_test {
    use super::*;
    use crate::trajectories::Trajectory;

    const JD0: f64 = 2459000.5;

    fn obs(ra: f64, dec: f64, jd: f64, candid: i64, nid: Nid) -> Observation {
        Observation::new(ra, dec, jd, 1, 18.0, candid, nid)
    }

    #[test]
    fn test_first_night() {
        let night = vec![
            obs(10.0, 5.0, JD0 + 0.1, 1, 1),
            obs(10.01, 5.0, JD0 + 0.12, 2, 1),
            obs(90.0, 5.0, JD0 + 0.1, 3, 1),
        ];
        let out = night_to_night_association(
            TrajectorySet::new(),
            vec![],
            night,
            0,
            1,
            &AssociationParams::default(),
        );
        assert_eq!(out.trajectories.len(), 1);
        assert_eq!(out.trajectories.get(0).unwrap().len(), 2);
        assert_eq!(out.old_observations.len(), 1);
        assert!(out.report.tracklets_with_trajectories.is_empty());
    }

    #[test]
    fn test_merge_link_is_renumbered() {
        // trajectory 4 moving +0.1 deg/night in ra, two tracklets continue it on night 4
        let traj = Trajectory::new(
            4,
            (1..=3).map(|n| obs(10.0 + 0.1 * n as f64, 5.0, JD0 + n as f64, n as i64, n)),
        );
        let night = vec![
            obs(10.4, 5.0, JD0 + 4.0, 10, 4),
            obs(10.401, 5.0, JD0 + 4.01, 11, 4),
            obs(10.4, 5.002, JD0 + 4.0, 12, 4),
            obs(10.401, 5.002, JD0 + 4.01, 13, 4),
        ];
        let params = AssociationParams::builder()
            .intra_night_sep_criterion(crate::associations::params::Separation::Arcsecond(4.0))
            .orbfit_limit(5)
            .build()
            .unwrap();

        let out = night_to_night_association(vec![traj].into_iter().collect(), vec![], night, 3, 4, &params);
        assert_eq!(out.trajectories.len(), 2);
        assert_eq!(out.trajectories.get(0).unwrap().len(), 5);
        assert_eq!(
            out.merge_links,
            vec![MergeLink {
                trajectory_id: 0,
                linked_id: 1
            }]
        );
        assert!(out.trajectories.iter().all(|t| !t.ids.is_merging() && !t.orbfit_sent));
    }
}
