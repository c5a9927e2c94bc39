//! # Intra-night tracklets
//!
//! Builds tracklets from the observations of a single night. The night is matched
//! against itself, so every close pair appears twice (once per orientation) along with
//! the trivial self pairs; both are removed before chaining.
//!
//! Pairs sharing an observation are chained by connected components, so a tracklet may
//! hold more than two points.
use std::time::Instant;

use tracing::debug;

use crate::{
    associations::{
        candidates::{magnitude_filter, remove_mirrored, separation_association},
        params::AssociationParams,
        report::{
            real_pairs_within, AssociationMetrics, StageReport, MAGNITUDE_COUNTER,
            SEPARATION_COUNTER, TRACKLETS_COUNTER,
        },
    },
    constants::TrajectoryId,
    observations::Observation,
    trajectories::{Trajectory, TrajectorySet},
};

/// Result of [`intra_night_association`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntraNightOutcome {
    /// Tracklets, with ids `first_id, first_id + 1, ...`.
    pub tracklets: TrajectorySet,
    /// Observations in no accepted pair, in input order.
    pub remaining: Vec<Observation>,
    pub report: StageReport,
}

/// Disjoint sets over `0..n`, the root of a set being its smallest element.
struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        UnionFind {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra < rb {
            self.parent[rb] = ra;
        } else if rb < ra {
            self.parent[ra] = rb;
        }
    }
}

/// Build the tracklets of one night.
///
/// Arguments
/// -----------------
/// * `observations`: the observations of the night.
/// * `first_id`: the id given to the first tracklet.
/// * `params`: uses the intra-night separation and magnitude criteria and `run_metrics`.
///
/// Return
/// ----------
/// * An [`IntraNightOutcome`]. Tracklet ids follow the position of the earliest
///   observation of each tracklet in `observations`.
pub fn intra_night_association(
    observations: Vec<Observation>,
    first_id: TrajectoryId,
    params: &AssociationParams,
) -> IntraNightOutcome {
    let start = Instant::now();
    let mut report = StageReport::default();

    let pairs = separation_association(&observations, &observations, params.intra_night_sep_criterion)
        .retain(|_, l, r| l != r);
    report.set(SEPARATION_COUNTER, pairs.len());

    let pairs = magnitude_filter(
        &observations,
        &observations,
        pairs,
        params.intra_night_mag_criterion_same_fid,
        params.intra_night_mag_criterion_diff_fid,
    );
    report.set(MAGNITUDE_COUNTER, pairs.len());

    let pairs = remove_mirrored(&observations, &observations, pairs);

    if params.run_metrics {
        report.metrics = Some(AssociationMetrics::compute(
            pairs.iter().map(|(l, r, _)| (&observations[l], &observations[r])),
            real_pairs_within(&observations),
        ));
    }

    let mut components = UnionFind::new(observations.len());
    let mut linked = vec![false; observations.len()];
    for (l, r, _) in pairs.iter() {
        components.union(l, r);
        linked[l] = true;
        linked[r] = true;
    }

    // roots are the smallest member, so walking the rows in order numbers tracklets by
    // their earliest observation
    let mut tracklet_of_root = vec![None; observations.len()];
    let mut grouped: Vec<Vec<Observation>> = Vec::new();
    let mut remaining = Vec::new();

    for (idx, obs) in observations.into_iter().enumerate() {
        if !linked[idx] {
            remaining.push(obs);
            continue;
        }
        let root = components.find(idx);
        let slot = *tracklet_of_root[root].get_or_insert_with(|| {
            grouped.push(Vec::new());
            grouped.len() - 1
        });
        grouped[slot].push(obs);
    }

    let tracklets: TrajectorySet = grouped
        .into_iter()
        .enumerate()
        .map(|(k, obs)| Trajectory::new(first_id + k as TrajectoryId, obs))
        .collect();
    report.set(TRACKLETS_COUNTER, tracklets.len());

    debug!(
        tracklets = tracklets.len(),
        remaining = remaining.len(),
        elapsed = ?start.elapsed(),
        "intra night association"
    );

    IntraNightOutcome {
        tracklets,
        remaining,
        report,
    }
}

#[cfg(test)]
mod intra_night_test {
    use super::*;

    fn obs(ra: f64, dec: f64, mag: f64, candid: i64) -> Observation {
        Observation::new(ra, dec, 2459000.6 + candid as f64 * 0.001, 1, mag, candid, 1)
    }

    #[test]
    fn test_empty_night() {
        let out = intra_night_association(vec![], 5, &AssociationParams::default());
        assert!(out.tracklets.is_empty());
        assert!(out.remaining.is_empty());
        assert_eq!(out.report.get(TRACKLETS_COUNTER), 0);
    }

    #[test]
    fn test_chained_tracklet() {
        // 0-1 and 1-2 are within 145", 0-2 is not: one tracklet of three points
        let night = vec![
            obs(10.0, 0.0, 18.0, 1),
            obs(10.03, 0.0, 18.1, 2),
            obs(10.06, 0.0, 18.2, 3),
            obs(50.0, 0.0, 18.0, 4),
        ];
        let out = intra_night_association(night, 7, &AssociationParams::default());

        assert_eq!(out.tracklets.len(), 1);
        let tracklet = out.tracklets.get(7).unwrap();
        assert_eq!(tracklet.candids().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(out.remaining.len(), 1);
        assert_eq!(out.remaining[0].candid, 4);
        assert_eq!(out.report.get(SEPARATION_COUNTER), 4);
    }

    #[test]
    fn test_magnitude_rejects() {
        let night = vec![obs(10.0, 0.0, 18.0, 1), obs(10.01, 0.0, 21.0, 2)];
        let out = intra_night_association(night, 0, &AssociationParams::default());
        assert!(out.tracklets.is_empty());
        assert_eq!(out.remaining.len(), 2);
        assert_eq!(out.report.get(MAGNITUDE_COUNTER), 0);
    }

    #[test]
    fn test_ids_follow_earliest_row() {
        let night = vec![
            obs(80.0, 0.0, 18.0, 1),
            obs(10.0, 0.0, 18.0, 2),
            obs(80.01, 0.0, 18.0, 3),
            obs(10.01, 0.0, 18.0, 4),
        ];
        let out = intra_night_association(night, 3, &AssociationParams::default());
        assert_eq!(out.tracklets.get(3).unwrap().candids().collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(out.tracklets.get(4).unwrap().candids().collect::<Vec<_>>(), vec![2, 4]);
    }

    #[test]
    fn test_metrics() {
        let night = vec![
            obs(10.0, 0.0, 18.0, 1).with_ssnamenr("a"),
            obs(10.01, 0.0, 18.0, 2).with_ssnamenr("a"),
            obs(40.0, 0.0, 18.0, 3).with_ssnamenr("b"),
            obs(60.0, 0.0, 18.0, 4).with_ssnamenr("b"),
        ];
        let params = AssociationParams::builder().run_metrics(true).build().unwrap();
        let out = intra_night_association(night, 0, &params);
        let metrics = out.report.metrics.unwrap();
        assert_eq!(metrics.true_positives, 1);
        assert_eq!(metrics.false_negatives, 1);
        assert_eq!(metrics.precision, 100.0);
        assert_eq!(metrics.recall, 50.0);
    }
}
