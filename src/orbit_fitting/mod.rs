//! # Orbit fitting
//!
//! The engine never computes orbits itself: trajectories long enough are handed to an
//! [`OrbitFitter`], by default [`OrbFitProcess`](orbfit_process::OrbFitProcess) which
//! drives the external OrbFit program.
//!
//! Modules
//! -----------------
//! * [`designation`] – provisional designation naming each submitted trajectory.
//! * [`orbfit_files`] – OrbFit input and output files.
//! * [`orbfit_process`] – the OrbFit process wrapper and its configuration.
//! * [`orbital_elements`] – the fit result.
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    constants::TrajectoryId,
    linkage_errors::LinkError,
    observations::Observation,
    trajectories::TrajectorySet,
};

pub mod designation;
pub mod orbfit_files;
pub mod orbfit_process;
pub mod orbital_elements;

use designation::make_designation;
use orbital_elements::OrbitalElements;

/// Something able to fit an orbit on a set of observations.
pub trait OrbitFitter {
    /// Fit the observations of one trajectory.
    ///
    /// Arguments
    /// -----------------
    /// * `designation`: name of the run, see [`make_designation`].
    /// * `observations`: the trajectory, sorted by Julian date.
    ///
    /// Return
    /// ----------
    /// * The orbital elements, [`OrbitalElements::sentinel`] when no orbit was found, or an
    ///   error when the fit could not run.
    fn fit(&self, designation: &str, observations: &[Observation]) -> Result<OrbitalElements, LinkError>;
}

/// Orbit of one trajectory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrbitResult {
    pub trajectory_id: TrajectoryId,
    pub designation: String,
    pub elements: OrbitalElements,
}

/// Fit every trajectory of at least `orbfit_limit` points not yet submitted.
///
/// Fits run in parallel. A failing fit is logged and reported with the sentinel
/// elements; submitted trajectories are flagged `orbfit_sent`.
///
/// Return
/// ----------
/// * One [`OrbitResult`] per submitted trajectory, in set order.
pub fn compute_orbits<F>(fitter: &F, trajectories: &mut TrajectorySet, orbfit_limit: usize) -> Vec<OrbitResult>
where
    F: OrbitFitter + Sync,
{
    let results: Vec<OrbitResult> = trajectories
        .as_slice()
        .par_iter()
        .filter(|t| !t.orbfit_sent && t.len() >= orbfit_limit)
        .map(|traj| {
            let trajectory_id = traj.id();
            let first_jd = traj.first().map_or(f64::NAN, |o| o.jd);

            let (designation, elements) = match make_designation(first_jd, trajectory_id) {
                Ok(designation) => {
                    let elements = fitter
                        .fit(&designation, traj.observations())
                        .unwrap_or_else(|e| {
                            warn!(trajectory_id, %designation, error = %e, "orbit fitting failed");
                            OrbitalElements::sentinel()
                        });
                    (designation, elements)
                }
                Err(e) => {
                    warn!(trajectory_id, error = %e, "no designation for trajectory");
                    (String::new(), OrbitalElements::sentinel())
                }
            };
            OrbitResult {
                trajectory_id,
                designation,
                elements,
            }
        })
        .collect();

    for result in &results {
        if let Some(traj) = trajectories.get_mut(result.trajectory_id) {
            traj.orbfit_sent = true;
        }
    }
    debug!(
        submitted = results.len(),
        found = results.iter().filter(|r| !r.elements.is_sentinel()).count(),
        "orbit fitting"
    );
    results
}

#[cfg(test)]
mod orbit_fitting_test {
    use super::*;
    use crate::trajectories::Trajectory;

    struct FixedFitter;

    impl OrbitFitter for FixedFitter {
        fn fit(&self, designation: &str, observations: &[Observation]) -> Result<OrbitalElements, LinkError> {
            if designation.ends_with('B') {
                return Err(LinkError::OrbFitProcess {
                    designation: designation.to_string(),
                    reason: "test".into(),
                });
            }
            let mut elements = OrbitalElements::sentinel();
            elements.ref_epoch = observations[0].jd;
            elements.a = observations.len() as f64;
            Ok(elements)
        }
    }

    fn traj(id: TrajectoryId, n: usize) -> Trajectory {
        Trajectory::new(
            id,
            (0..n).map(|k| Observation::new(10.0, 0.0, 2459356.75 + k as f64, 1, 18.0, (id * 100) as i64 + k as i64, k as u32)),
        )
    }

    #[test]
    fn test_compute_orbits() {
        let mut set: TrajectorySet = vec![traj(0, 3), traj(1, 4), traj(2, 2)].into_iter().collect();

        let results = compute_orbits(&FixedFitter, &mut set, 3);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].designation, "K21K00A");
        assert_eq!(results[0].elements.a, 3.0);
        // K21K00B fails and falls back to the sentinel
        assert_eq!(results[1].trajectory_id, 1);
        assert_eq!(results[1].designation, "K21K00B");
        assert!(results[1].elements.is_sentinel());

        assert!(set.get(0).unwrap().orbfit_sent);
        assert!(!set.get(2).unwrap().orbfit_sent);

        // already submitted
        assert!(compute_orbits(&FixedFitter, &mut set, 3).is_empty());
    }
}
