//! # Identifier and merge management
//!
//! Turns the accepted pairs of an association stage into trajectory updates.
//!
//! Policy
//! -----------------
//! * **Tracklet extensions** ([`assign_trajectory_extensions`]): rows are walked in order.
//!   The first tracklet matched by a trajectory extends it and takes its id. Each later
//!   tracklet matched by the same, already extended, trajectory keeps its own id and that
//!   id is appended to the trajectory identifiers (`TrajectoryIds::Merging`), so the
//!   alternative is kept instead of being dropped. A tracklet is used by one trajectory
//!   at most.
//! * **Observation extensions** ([`assign_observation_extensions`]): each target gains at
//!   most one observation and each observation extends at most one target.
use std::collections::HashMap;

use ahash::RandomState;

use crate::{
    constants::TrajectoryId,
    observations::Observation,
    trajectories::{Trajectory, TrajectorySet},
};

/// Result of [`assign_trajectory_extensions`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtensionOutcome {
    /// Trajectories that absorbed a tracklet, possibly carrying merge candidates.
    pub extended: TrajectorySet,
    /// Trajectories matched by no tracklet.
    pub unmatched: TrajectorySet,
    /// Tracklets used by no trajectory.
    pub remaining_tracklets: TrajectorySet,
    /// Tracklets recorded as merge candidates of an extended trajectory.
    pub linked_tracklets: TrajectorySet,
}

/// Apply tracklet → trajectory matches.
///
/// Arguments
/// -----------------
/// * `trajectories`: the candidate trajectories.
/// * `tracklets`: the candidate tracklets.
/// * `matches`: accepted `(trajectory id, tracklet id)` pairs, in row order.
///
/// Return
/// ----------
/// * An [`ExtensionOutcome`]; every input trajectory and tracklet lands in exactly one of
///   its four sets.
pub fn assign_trajectory_extensions(
    trajectories: TrajectorySet,
    tracklets: TrajectorySet,
    matches: &[(TrajectoryId, TrajectoryId)],
) -> ExtensionOutcome {
    // tracklets are addressed by position, looked up once per row
    let mut absorbed: HashMap<TrajectoryId, usize, RandomState> = HashMap::default();
    let mut linked: HashMap<TrajectoryId, Vec<usize>, RandomState> = HashMap::default();
    let mut claimed = vec![false; tracklets.len()];

    for &(traj_id, tracklet_id) in matches {
        let Some(pos) = tracklets.position(tracklet_id) else {
            continue;
        };
        if claimed[pos] || !trajectories.contains(traj_id) {
            continue;
        }
        claimed[pos] = true;
        if absorbed.contains_key(&traj_id) {
            linked.entry(traj_id).or_default().push(pos);
        } else {
            absorbed.insert(traj_id, pos);
        }
    }

    let mut slots: Vec<Option<Trajectory>> = tracklets.into_iter().map(Some).collect();
    let mut outcome = ExtensionOutcome::default();
    for mut traj in trajectories {
        let id = traj.id();
        let Some(tracklet) = absorbed.get(&id).and_then(|&pos| slots[pos].take()) else {
            outcome.unmatched.push(traj);
            continue;
        };

        // a tracklet absorbed by a merged trajectory brings its alternatives along
        for other in tracklet.ids.iter().skip(1) {
            traj.ids.push(other);
        }
        traj.extend(tracklet.into_observations());

        for &pos in linked.get(&id).into_iter().flatten() {
            if let Some(candidate) = slots[pos].take() {
                traj.ids.push(candidate.id());
                outcome.linked_tracklets.push(candidate);
            }
        }
        outcome.extended.push(traj);
    }
    outcome.remaining_tracklets = slots.into_iter().flatten().collect();
    outcome
}

/// Result of [`assign_observation_extensions`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationExtension {
    pub extended: TrajectorySet,
    pub unmatched: TrajectorySet,
    /// Observations used by no target, in input order.
    pub remaining: Vec<Observation>,
}

/// Apply observation → target matches, one to one.
///
/// Arguments
/// -----------------
/// * `targets`: trajectories or tracklets to extend.
/// * `observations`: the candidate observations.
/// * `matches`: accepted `(target id, observation index)` pairs. Rows are taken greedily in
///   order, so the caller orders them by preference.
pub fn assign_observation_extensions(
    targets: TrajectorySet,
    observations: Vec<Observation>,
    matches: &[(TrajectoryId, usize)],
) -> ObservationExtension {
    let mut used = vec![false; observations.len()];
    let mut gained: HashMap<TrajectoryId, usize, RandomState> = HashMap::default();

    for &(target, idx) in matches {
        if idx >= used.len() || used[idx] || gained.contains_key(&target) || !targets.contains(target) {
            continue;
        }
        used[idx] = true;
        gained.insert(target, idx);
    }

    let mut slots: Vec<Option<Observation>> = observations.into_iter().map(Some).collect();
    let mut outcome = ObservationExtension::default();

    for mut traj in targets {
        match gained.get(&traj.id()).and_then(|&idx| slots[idx].take()) {
            Some(obs) => {
                traj.extend(std::iter::once(obs));
                outcome.extended.push(traj);
            }
            None => outcome.unmatched.push(traj),
        }
    }
    outcome.remaining = slots.into_iter().flatten().collect();
    outcome
}

#[cfg(test)]
mod id_management_test {
    use super::*;
    use crate::trajectories::{Trajectory, TrajectoryIds};
    use smallvec::smallvec;

    fn obs(candid: i64, nid: u32) -> Observation {
        Observation::new(0.0, 0.0, 2459000.5 + nid as f64 + candid as f64 * 1e-3, 1, 18.0, candid, nid)
    }

    fn set(items: Vec<(TrajectoryId, Vec<Observation>)>) -> TrajectorySet {
        items.into_iter().map(|(id, o)| Trajectory::new(id, o)).collect()
    }

    #[test]
    fn test_single_extension() {
        let trajectories = set(vec![(0, vec![obs(1, 1), obs(2, 2)]), (1, vec![obs(3, 1), obs(4, 2)])]);
        let tracklets = set(vec![(5, vec![obs(5, 3), obs(6, 3)])]);

        let out = assign_trajectory_extensions(trajectories, tracklets, &[(0, 5)]);
        assert_eq!(out.extended.len(), 1);
        let traj = out.extended.get(0).unwrap();
        assert_eq!(traj.candids().collect::<Vec<_>>(), vec![1, 2, 5, 6]);
        assert_eq!(traj.ids, TrajectoryIds::Single(0));
        assert_eq!(out.unmatched.len(), 1);
        assert!(out.remaining_tracklets.is_empty());
    }

    #[test]
    fn test_one_to_many_keeps_alternatives() {
        let trajectories = set(vec![(0, vec![obs(1, 1), obs(2, 2)]), (1, vec![obs(3, 1), obs(4, 2)])]);
        let tracklets = set(vec![
            (5, vec![obs(5, 3), obs(6, 3)]),
            (6, vec![obs(7, 3), obs(8, 3)]),
            (7, vec![obs(9, 3), obs(10, 3)]),
        ]);

        // trajectory 0 matches 5 then 6; trajectory 1 asks for 6, already taken
        let out = assign_trajectory_extensions(trajectories, tracklets, &[(0, 5), (0, 6), (1, 6)]);

        let traj = out.extended.get(0).unwrap();
        assert_eq!(traj.ids, TrajectoryIds::Merging(smallvec![0, 6]));
        assert_eq!(traj.len(), 4);
        assert_eq!(out.linked_tracklets.iter().map(Trajectory::id).collect::<Vec<_>>(), vec![6]);
        assert_eq!(out.unmatched.iter().map(Trajectory::id).collect::<Vec<_>>(), vec![1]);
        assert_eq!(out.remaining_tracklets.iter().map(Trajectory::id).collect::<Vec<_>>(), vec![7]);
    }

    #[test]
    fn test_large_one_to_one_extension() {
        let n = 20_000;
        let trajectories = set((0..n).map(|i| (i, vec![obs(i as i64, 1), obs(i as i64 + 100_000, 2)])).collect());
        let tracklets = set(
            (0..n)
                .map(|i| (n + i, vec![obs(i as i64 + 200_000, 3), obs(i as i64 + 300_000, 3)]))
                .collect(),
        );
        // trajectory i takes tracklet n + (n - 1 - i), one row each
        let matches: Vec<(TrajectoryId, TrajectoryId)> = (0..n).map(|i| (i, 2 * n - 1 - i)).collect();

        let out = assign_trajectory_extensions(trajectories, tracklets, &matches);
        assert_eq!(out.extended.len(), n as usize);
        assert!(out.unmatched.is_empty());
        assert!(out.remaining_tracklets.is_empty());
        assert!(out.linked_tracklets.is_empty());
        let last = out.extended.get(n - 1).unwrap();
        assert_eq!(last.candids().skip(2).collect::<Vec<_>>(), vec![200_000, 300_000]);
    }

    #[test]
    fn test_observation_one_to_one() {
        let targets = set(vec![(0, vec![obs(1, 1), obs(2, 2)]), (1, vec![obs(3, 1), obs(4, 2)])]);
        let new = vec![obs(10, 3), obs(11, 3), obs(12, 3)];

        let out = assign_observation_extensions(targets, new, &[(0, 1), (0, 0), (1, 1), (1, 2)]);
        assert_eq!(out.extended.get(0).unwrap().candids().last(), Some(11));
        assert_eq!(out.extended.get(1).unwrap().candids().last(), Some(12));
        assert!(out.unmatched.is_empty());
        assert_eq!(out.remaining.iter().map(|o| o.candid).collect::<Vec<_>>(), vec![10]);
    }
}
