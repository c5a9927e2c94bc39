//! # Trajectories: grouping, storage and identifier bookkeeping
//!
//! A [`Trajectory`] is a time-ordered chain of [`Observation`]s believed to belong to
//! the same moving object. A [`TrajectorySet`] holds all trajectories alive at a
//! given night, together with an explicit `trajectory id → position` index.
//!
//! Modules
//! -----------------
//! * [`trajectory_stats`](crate::trajectories::trajectory_stats) – Summary statistics on
//!   the number of observations per trajectory.
//!
//! Data Model
//! -----------------
//! * **Identifier:** [`TrajectoryIds`], either `Single(id)` or `Merging(ids)`. A trajectory
//!   only carries several ids while a multi-way match is being resolved inside one
//!   nightly cycle; [`TrajectorySet::resolve_merges`] collapses them back to `Single`.
//! * **Observations:** `SmallVec` sorted by Julian date. Every mutation keeps the order.
//! * **Index:** `HashMap<TrajectoryId, usize, ahash::RandomState>` rebuilt on structural
//!   changes, so id lookups never scan the set.
//!
//! Identifier Lifecycle
//! -----------------
//! New identifiers are minted from [`TrajectorySet::next_trajectory_id`] (`max + 1`, or `0`
//! for an empty set) and grow monotonically during a cycle. At the end of a cycle
//! [`TrajectorySet::align_trajectory_id`] renumbers them to the dense range `[0, N)`.
//!
//! See also
//! ------------
//! * [`crate::associations::night_to_night`] – The nightly cycle producing trajectory sets.
//! * [`crate::orbit_fitting`] – Consumer of the orbit-ready part of a set.
pub mod trajectory_stats;

use std::collections::HashMap;

use ahash::RandomState;
use itertools::Itertools;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use smallvec::{smallvec, SmallVec};

use crate::{
    constants::{Candid, Nid, Observations, TrajectoryId},
    observations::Observation,
    trajectories::trajectory_stats::TrajectoryStats,
};

/// Identifier(s) carried by a trajectory.
///
/// `Merging` keeps the canonical id first; subsequent ids name the other trajectories
/// that matched the same extremity during the current cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrajectoryIds {
    Single(TrajectoryId),
    Merging(SmallVec<[TrajectoryId; 4]>),
}

impl TrajectoryIds {
    /// The id under which the trajectory is indexed.
    #[inline]
    pub fn canonical(&self) -> TrajectoryId {
        match self {
            TrajectoryIds::Single(id) => *id,
            TrajectoryIds::Merging(ids) => ids[0],
        }
    }

    /// Append an id, turning a `Single` into a `Merging` list. Duplicates are ignored.
    pub fn push(&mut self, id: TrajectoryId) {
        match self {
            TrajectoryIds::Single(current) => {
                if *current != id {
                    *self = TrajectoryIds::Merging(smallvec![*current, id]);
                }
            }
            TrajectoryIds::Merging(ids) => {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = TrajectoryId> + '_ {
        let slice: &[TrajectoryId] = match self {
            TrajectoryIds::Single(id) => std::slice::from_ref(id),
            TrajectoryIds::Merging(ids) => ids.as_slice(),
        };
        slice.iter().copied()
    }

    pub fn is_merging(&self) -> bool {
        matches!(self, TrajectoryIds::Merging(_))
    }

    /// Collapse to `Single(canonical)` and return the ids that were linked to it.
    pub fn resolve(&mut self) -> SmallVec<[TrajectoryId; 4]> {
        let canonical = self.canonical();
        match std::mem::replace(self, TrajectoryIds::Single(canonical)) {
            TrajectoryIds::Single(_) => SmallVec::new(),
            TrajectoryIds::Merging(ids) => ids.into_iter().skip(1).collect(),
        }
    }

    fn map(&self, f: impl Fn(TrajectoryId) -> TrajectoryId) -> TrajectoryIds {
        match self {
            TrajectoryIds::Single(id) => TrajectoryIds::Single(f(*id)),
            TrajectoryIds::Merging(ids) => TrajectoryIds::Merging(ids.iter().map(|&i| f(i)).collect()),
        }
    }
}

/// Time-ordered chain of observations of one candidate object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub ids: TrajectoryIds,
    observations: Observations,
    /// Set once the trajectory has been submitted to orbit fitting.
    pub orbfit_sent: bool,
}

impl Trajectory {
    /// Build a trajectory, sorting the observations by Julian date.
    pub fn new(id: TrajectoryId, observations: impl IntoIterator<Item = Observation>) -> Self {
        let mut observations: Observations = observations.into_iter().collect();
        sort_by_jd(&mut observations);
        Trajectory {
            ids: TrajectoryIds::Single(id),
            observations,
            orbfit_sent: false,
        }
    }

    #[inline]
    pub fn id(&self) -> TrajectoryId {
        self.ids.canonical()
    }

    #[inline]
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn into_observations(self) -> Observations {
        self.observations
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Earliest observation.
    pub fn first(&self) -> Option<&Observation> {
        self.observations.first()
    }

    /// Latest observation.
    pub fn last(&self) -> Option<&Observation> {
        self.observations.last()
    }

    /// The two earliest observations, in time order.
    pub fn first_two(&self) -> Option<(&Observation, &Observation)> {
        match self.observations.as_slice() {
            [a, b, ..] => Some((a, b)),
            _ => None,
        }
    }

    /// The two latest observations, in time order.
    pub fn last_two(&self) -> Option<(&Observation, &Observation)> {
        match self.observations.as_slice() {
            [.., a, b] => Some((a, b)),
            _ => None,
        }
    }

    /// Night id of the latest observation.
    pub fn last_nid(&self) -> Option<Nid> {
        self.last().map(|o| o.nid)
    }

    /// Merge observations into the trajectory, keeping the time order.
    pub fn extend(&mut self, observations: impl IntoIterator<Item = Observation>) {
        self.observations.extend(observations);
        sort_by_jd(&mut self.observations);
    }

    pub fn candids(&self) -> impl Iterator<Item = Candid> + '_ {
        self.observations.iter().map(|o| o.candid)
    }
}

fn sort_by_jd(observations: &mut Observations) {
    observations.sort_by_key(|o| OrderedFloat(o.jd));
}

/// Ordered collection of trajectories with an id → position index.
///
/// Invariants
/// -----------------
/// * Canonical ids are unique within the set.
/// * `index[id] == position` of the trajectory whose canonical id is `id`.
#[derive(Debug, Clone, Default)]
pub struct TrajectorySet {
    trajectories: Vec<Trajectory>,
    index: HashMap<TrajectoryId, usize, RandomState>,
}

impl PartialEq for TrajectorySet {
    fn eq(&self, other: &Self) -> bool {
        self.trajectories == other.trajectories
    }
}

impl FromIterator<Trajectory> for TrajectorySet {
    fn from_iter<I: IntoIterator<Item = Trajectory>>(iter: I) -> Self {
        TrajectorySet::from_trajectories(iter.into_iter().collect())
    }
}

impl IntoIterator for TrajectorySet {
    type Item = Trajectory;
    type IntoIter = std::vec::IntoIter<Trajectory>;

    fn into_iter(self) -> Self::IntoIter {
        self.trajectories.into_iter()
    }
}

impl TrajectorySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from trajectories, indexing them by canonical id.
    pub fn from_trajectories(trajectories: Vec<Trajectory>) -> Self {
        let mut set = TrajectorySet {
            trajectories,
            index: HashMap::default(),
        };
        set.rebuild_index();
        set
    }

    /// Group observations by a trajectory id column.
    ///
    /// Trajectories are created in order of first appearance of their id.
    pub fn from_labelled(
        labelled: impl IntoIterator<Item = (TrajectoryId, Observation)>,
    ) -> Self {
        let mut set = TrajectorySet::new();
        for (id, obs) in labelled {
            match set.get_mut(id) {
                Some(traj) => traj.extend(std::iter::once(obs)),
                None => set.push(Trajectory::new(id, std::iter::once(obs))),
            }
        }
        set
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .trajectories
            .iter()
            .enumerate()
            .map(|(pos, t)| (t.id(), pos))
            .collect();
    }

    /// Append a trajectory. A trajectory sharing the canonical id of an existing one
    /// is merged into it.
    pub fn push(&mut self, trajectory: Trajectory) {
        let id = trajectory.id();
        match self.index.get(&id) {
            Some(&pos) => {
                let existing = &mut self.trajectories[pos];
                for other in trajectory.ids.iter().skip(1) {
                    existing.ids.push(other);
                }
                existing.extend(trajectory.into_observations());
            }
            None => {
                self.index.insert(id, self.trajectories.len());
                self.trajectories.push(trajectory);
            }
        }
    }

    pub fn append(&mut self, other: TrajectorySet) {
        for traj in other {
            self.push(traj);
        }
    }

    pub fn get(&self, id: TrajectoryId) -> Option<&Trajectory> {
        self.index.get(&id).map(|&pos| &self.trajectories[pos])
    }

    pub fn get_mut(&mut self, id: TrajectoryId) -> Option<&mut Trajectory> {
        self.index
            .get(&id)
            .copied()
            .map(move |pos| &mut self.trajectories[pos])
    }

    pub fn contains(&self, id: TrajectoryId) -> bool {
        self.index.contains_key(&id)
    }

    /// Position of the trajectory with canonical id `id`.
    pub fn position(&self, id: TrajectoryId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Trajectory> {
        self.trajectories.iter()
    }

    pub fn as_slice(&self) -> &[Trajectory] {
        &self.trajectories
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.trajectories.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.trajectories.is_empty()
    }

    /// Largest canonical id in the set.
    pub fn max_trajectory_id(&self) -> Option<TrajectoryId> {
        self.trajectories.iter().flat_map(|t| t.ids.iter()).max()
    }

    /// First id available for a new trajectory: `max + 1`, or `0` for an empty set.
    pub fn next_trajectory_id(&self) -> TrajectoryId {
        self.max_trajectory_id().map_or(0, |m| m + 1)
    }

    /// Sum of the observations of all trajectories.
    pub fn total_observations(&self) -> usize {
        self.trajectories.iter().map(Trajectory::len).sum()
    }

    pub fn candids(&self) -> impl Iterator<Item = Candid> + '_ {
        self.trajectories.iter().flat_map(Trajectory::candids)
    }

    /// Partition the set on the number of observations.
    ///
    /// Arguments
    /// -----------------
    /// * `orbfit_limit`: minimum number of points for orbit fitting.
    ///
    /// Return
    /// ----------
    /// * `(too_short, orbit_ready)`: trajectories with `len < orbfit_limit`, and the others.
    ///   Relative order is preserved in both parts.
    pub fn separate_trajectories(self, orbfit_limit: usize) -> (TrajectorySet, TrajectorySet) {
        let (short, ready): (Vec<_>, Vec<_>) = self
            .trajectories
            .into_iter()
            .partition(|t| t.len() < orbfit_limit);
        (
            TrajectorySet::from_trajectories(short),
            TrajectorySet::from_trajectories(ready),
        )
    }

    /// Collapse every `Merging` identifier to its canonical id.
    ///
    /// Return
    /// ----------
    /// * The `(canonical, linked)` pairs that were recorded, in set order.
    pub fn resolve_merges(&mut self) -> Vec<(TrajectoryId, TrajectoryId)> {
        let mut links = Vec::new();
        for traj in self.trajectories.iter_mut() {
            let canonical = traj.id();
            links.extend(traj.ids.resolve().into_iter().map(|l| (canonical, l)));
        }
        links
    }

    /// Sort the trajectories by canonical id.
    pub fn sort_by_id(&mut self) {
        self.trajectories.sort_by_key(Trajectory::id);
        self.rebuild_index();
    }

    /// Renumber every identifier to the dense range `[0, N)`.
    ///
    /// Ids are numbered in order of first appearance while walking the set (and each
    /// identifier list) front to back, so the relative order of trajectories is kept.
    /// Applying the renumbering twice gives the same result as applying it once.
    ///
    /// Return
    /// ----------
    /// * The `old id → new id` mapping, one entry per distinct identifier.
    pub fn align_trajectory_id(&mut self) -> HashMap<TrajectoryId, TrajectoryId, RandomState> {
        let mapping: HashMap<TrajectoryId, TrajectoryId, RandomState> = self
            .trajectories
            .iter()
            .flat_map(|t| t.ids.iter())
            .unique()
            .enumerate()
            .map(|(new, old)| (old, new as TrajectoryId))
            .collect();

        for traj in self.trajectories.iter_mut() {
            traj.ids = traj.ids.map(|id| mapping[&id]);
        }
        self.rebuild_index();
        mapping
    }

    /// Clear the orbit-fit flag of every trajectory.
    pub fn mark_not_sent(&mut self) {
        for traj in self.trajectories.iter_mut() {
            traj.orbfit_sent = false;
        }
    }

    /// Length and night-span summary of the set.
    ///
    /// Arguments
    /// -----------------
    /// * `orbfit_limit`: length from which a trajectory counts as orbit ready.
    ///
    /// Return
    /// ----------
    /// * `None` for an empty set.
    pub fn stats(&self, orbfit_limit: usize) -> Option<TrajectoryStats> {
        TrajectoryStats::from_trajectories(&self.trajectories, orbfit_limit)
    }
}
