//! # nightlink
//!
//! Night after night, link the alerts of a survey into trajectories of moving
//! solar-system objects and hand the longer ones to an orbit determination program.
//!
//! The entry point is [`night_to_night_association`]; its state (trajectories and
//! unassociated observations) is threaded through arguments and return values, so a run
//! is a fold over the nights:
//!
//! ```rust
//! use nightlink::{night_to_night_association, AssociationParams, Observation, TrajectorySet};
//!
//! let params = AssociationParams::default();
//! let night_1 = vec![
//!     Observation::new(10.0, 5.0, 2459000.60, 1, 18.0, 1, 1),
//!     Observation::new(10.01, 5.0, 2459000.62, 1, 18.1, 2, 1),
//! ];
//! let out = night_to_night_association(TrajectorySet::new(), vec![], night_1, 0, 1, &params);
//! assert_eq!(out.trajectories.len(), 1);
//! assert!(out.old_observations.is_empty());
//! ```
pub mod associations;
pub mod constants;
pub mod conversion;
pub mod linkage_errors;
pub mod observations;
pub mod orbit_fitting;
pub mod streaming;
pub mod time;
pub mod trajectories;

pub use associations::night_to_night::{night_to_night_association, MergeLink, NightOutcome};
pub use associations::params::{AssociationParams, Separation};
pub use associations::report::NightReport;
pub use linkage_errors::LinkError;
pub use observations::Observation;
pub use orbit_fitting::{compute_orbits, OrbitFitter};
pub use trajectories::{Trajectory, TrajectoryIds, TrajectorySet};
