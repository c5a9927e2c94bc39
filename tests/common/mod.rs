#![allow(dead_code)]

use approx::assert_relative_eq;
use rand::{rngs::StdRng, Rng};

use nightlink::constants::{Candid, Nid, JD};
use nightlink::orbit_fitting::orbital_elements::OrbitalElements;
use nightlink::{Observation, Trajectory, TrajectorySet};

pub const JD0: JD = 2459000.5;

pub fn obs(ra: f64, dec: f64, jd: JD, candid: Candid, nid: Nid) -> Observation {
    Observation::new(ra, dec, jd, 1, 18.0, candid, nid)
}

/// A slow mover observed once per night, `rate` degrees per night along ra.
pub fn linear_mover(
    id: u32,
    ra0: f64,
    dec: f64,
    rate: f64,
    nights: impl IntoIterator<Item = Nid>,
    first_candid: Candid,
) -> Trajectory {
    let observations = nights.into_iter().enumerate().map(|(k, nid)| {
        obs(
            ra0 + rate * nid as f64,
            dec,
            JD0 + nid as f64,
            first_candid + k as Candid,
            nid,
        )
    });
    Trajectory::new(id, observations)
}

/// Random alerts of one night spread over a small patch of sky, so that some pairs
/// fall under the association thresholds.
pub fn random_night(rng: &mut StdRng, nid: Nid, n: usize, first_candid: Candid) -> Vec<Observation> {
    (0..n)
        .map(|k| {
            let ra = 120.0 + rng.random::<f64>() * 0.5;
            let dec = -10.0 + rng.random::<f64>() * 0.5;
            let jd = JD0 + nid as f64 + rng.random::<f64>() * 0.2;
            let fid = if rng.random::<bool>() { 1 } else { 2 };
            let mag = 17.0 + rng.random::<f64>() * 2.0;
            Observation::new(ra, dec, jd, fid, mag, first_candid + k as Candid, nid)
        })
        .collect()
}

pub fn candids_of(trajectories: &TrajectorySet) -> Vec<Candid> {
    trajectories.candids().collect()
}

pub fn assert_orbit_close(actual: &OrbitalElements, expected: &OrbitalElements, epsilon: f64) {
    assert_relative_eq!(actual.ref_epoch, expected.ref_epoch, epsilon = epsilon);
    assert_relative_eq!(actual.a, expected.a, epsilon = epsilon);
    assert_relative_eq!(actual.e, expected.e, epsilon = epsilon);
    assert_relative_eq!(actual.i, expected.i, epsilon = epsilon);
    assert_relative_eq!(actual.long_node, expected.long_node, epsilon = epsilon);
    assert_relative_eq!(actual.arg_peric, expected.arg_peric, epsilon = epsilon);
    assert_relative_eq!(actual.mean_anomaly, expected.mean_anomaly, epsilon = epsilon);
}
