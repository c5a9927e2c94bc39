mod common;

use std::collections::HashSet;

use approx::assert_relative_eq;
use rand::{rngs::StdRng, SeedableRng};

use common::random_night;
use nightlink::associations::candidates::{magnitude_filter, separation_association};
use nightlink::conversion::angular_separation;
use nightlink::{night_to_night_association, AssociationParams, Observation, Separation, TrajectorySet};

#[test]
fn test_observations_are_conserved_over_nights() {
    let mut rng = StdRng::seed_from_u64(42);
    let params = AssociationParams::default();

    let mut trajectories = TrajectorySet::new();
    let mut old: Vec<Observation> = Vec::new();
    let mut evicted = 0;
    let mut injected = 0;

    for nid in 1..=5 {
        let night = random_night(&mut rng, nid, 60, 1000 * nid as i64);
        injected += night.len();

        let out = night_to_night_association(trajectories, old, night, nid - 1, nid, &params);
        evicted += out.evicted_observations.len();
        trajectories = out.trajectories;
        old = out.old_observations;

        assert_eq!(trajectories.total_observations() + old.len() + evicted, injected);

        let mut seen = HashSet::new();
        for candid in trajectories.candids().chain(old.iter().map(|o| o.candid)) {
            assert!(seen.insert(candid), "candid {candid} appears twice");
        }

        let ids: Vec<u32> = trajectories.iter().map(|t| t.id()).collect();
        assert_eq!(ids, (0..trajectories.len() as u32).collect::<Vec<_>>());
        assert!(trajectories.iter().all(|t| !t.ids.is_merging() && !t.orbfit_sent));
    }
}

#[test]
fn test_separation_matches_brute_force() {
    let mut rng = StdRng::seed_from_u64(7);
    let left = random_night(&mut rng, 1, 80, 0);
    let right = random_night(&mut rng, 2, 80, 100);
    let threshold = Separation::Arcminute(3.0);

    let pairs = separation_association(&left, &right, threshold);

    let mut expected = HashSet::new();
    for (i, l) in left.iter().enumerate() {
        for (j, r) in right.iter().enumerate() {
            if angular_separation(l.ra, l.dec, r.ra, r.dec) <= threshold.degrees() {
                expected.insert((i, j));
            }
        }
    }
    let found: HashSet<(usize, usize)> = pairs.iter().map(|(l, r, _)| (l, r)).collect();
    assert_eq!(found, expected);

    for (l, r, sep) in pairs.iter() {
        assert!(sep <= threshold.degrees());
        assert_relative_eq!(
            sep,
            angular_separation(left[l].ra, left[l].dec, right[r].ra, right[r].dec),
            epsilon = 1e-9
        );
    }
}

#[test]
fn test_magnitude_filter_bound() {
    let mut rng = StdRng::seed_from_u64(3);
    let left = random_night(&mut rng, 1, 80, 0);
    let right = random_night(&mut rng, 4, 80, 100);
    let (same, diff) = (0.18, 0.7);

    let pairs = separation_association(&left, &right, Separation::Degree(0.3));
    let kept = magnitude_filter(&left, &right, pairs.clone(), same, diff);
    assert!(kept.len() <= pairs.len());

    for (l, r, _) in kept.iter() {
        let (l, r) = (&left[l], &right[r]);
        let gap = (r.jd - l.jd).max(1.0);
        let criterion = if l.fid == r.fid { same } else { diff };
        assert!((l.magpsf - r.magpsf).abs() / gap <= criterion + 1e-12);
    }
}

#[test]
fn test_renumbering_is_idempotent() {
    let mut rng = StdRng::seed_from_u64(11);
    let night = random_night(&mut rng, 1, 60, 0);
    let out = night_to_night_association(
        TrajectorySet::new(),
        vec![],
        night,
        0,
        1,
        &AssociationParams::default(),
    );

    let mut trajectories = out.trajectories;
    let before = trajectories.clone();
    let mapping = trajectories.align_trajectory_id();
    assert!(mapping.iter().all(|(old, new)| old == new));
    assert_eq!(trajectories, before);
}
