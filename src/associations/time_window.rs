//! # Time windows
//!
//! Bounds the working set of the association engine. Trajectories and old observations
//! that have not been extended for too many nights leave the candidate pool.
use crate::{
    associations::params::AssociationParams,
    constants::Nid,
    observations::Observation,
    trajectories::{Trajectory, TrajectorySet},
};

/// Result of [`time_window_management`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowPartition {
    pub kept_trajectories: TrajectorySet,
    pub evicted_trajectories: TrajectorySet,
    pub kept_observations: Vec<Observation>,
    pub evicted_observations: Vec<Observation>,
}

/// Number of nights since `nid`, `0` for a night in the future.
#[inline]
fn night_age(next_nid: Nid, nid: Nid) -> u32 {
    next_nid.saturating_sub(nid)
}

fn keep_trajectory(traj: &Trajectory, next_nid: Nid, params: &AssociationParams) -> bool {
    let window = if traj.len() == 2 {
        params.traj_2_points_time_window
    } else {
        params.traj_time_window
    };
    traj.last_nid()
        .is_some_and(|nid| night_age(next_nid, nid) <= window)
}

/// Split trajectories and old observations on their age relative to `next_nid`.
///
/// * A trajectory is kept when `next_nid - last_nid <= traj_time_window`, or
///   `<= traj_2_points_time_window` for a two-point trajectory.
/// * An observation is kept when `next_nid - nid < obs_time_window`.
///
/// Both partitions preserve the input order.
pub fn time_window_management(
    trajectories: TrajectorySet,
    old_observations: Vec<Observation>,
    next_nid: Nid,
    params: &AssociationParams,
) -> WindowPartition {
    let (kept, evicted): (Vec<_>, Vec<_>) = trajectories
        .into_iter()
        .partition(|t| keep_trajectory(t, next_nid, params));

    let (kept_observations, evicted_observations) = old_observations
        .into_iter()
        .partition(|o| night_age(next_nid, o.nid) < params.obs_time_window);

    WindowPartition {
        kept_trajectories: TrajectorySet::from_trajectories(kept),
        evicted_trajectories: TrajectorySet::from_trajectories(evicted),
        kept_observations,
        evicted_observations,
    }
}
