//! # Association parameters
//!
//! This module defines [`AssociationParams`], the single configuration record of the
//! nightly association cycle, and its validating builder [`AssociationParamsBuilder`].
//!
//! Every threshold used by the engine lives here; nothing is read from global state.
//!
//! Defaults
//! -----------------
//! The defaults are the thresholds tuned on ZTF alerts:
//!
//! * intra-night separation: 145″, magnitude 2.21 (same band) / 1.75 (different band)
//! * inter-night separation: 0.24°, magnitude rate 0.18 / 0.7 per day
//! * cone-search angle: 8.8°
//! * orbit fitting limit: 3 points
//! * time windows: 30 nights for trajectories, observations and two-point trajectories
//! * every association stage enabled, metrics disabled
//!
//! Example
//! -----------------
//! ```rust
//! use nightlink::associations::params::{AssociationParams, Separation};
//!
//! let params = AssociationParams::builder()
//!     .sep_criterion(Separation::Degree(0.3))
//!     .angle_criterion(10.0)
//!     .run_metrics(true)
//!     .build()
//!     .unwrap();
//! assert_eq!(params.orbfit_limit, 3);
//! ```
use std::cmp::Ordering::{Equal, Greater};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    constants::{
        Degree, Radian, DEFAULT_ANGLE_CRITERION, DEFAULT_INTRA_NIGHT_MAG_DIFF_FID,
        DEFAULT_INTRA_NIGHT_MAG_SAME_FID, DEFAULT_INTRA_NIGHT_SEP, DEFAULT_MAG_DIFF_FID,
        DEFAULT_MAG_SAME_FID, DEFAULT_ORBFIT_LIMIT, DEFAULT_SEP_CRITERION, DEFAULT_TIME_WINDOW,
        RADEG, RADMIN, RADSEC,
    },
    linkage_errors::LinkError,
};

/// An angular separation threshold with its unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Separation {
    Arcsecond(f64),
    Arcminute(f64),
    Degree(f64),
}

impl Separation {
    /// The threshold in radians.
    pub fn radians(&self) -> Radian {
        match *self {
            Separation::Arcsecond(v) => v * RADSEC,
            Separation::Arcminute(v) => v * RADMIN,
            Separation::Degree(v) => v * RADEG,
        }
    }

    /// The threshold in degrees.
    pub fn degrees(&self) -> Degree {
        match *self {
            Separation::Arcsecond(v) => v / 3600.0,
            Separation::Arcminute(v) => v / 60.0,
            Separation::Degree(v) => v,
        }
    }

    fn value(&self) -> f64 {
        match *self {
            Separation::Arcsecond(v) | Separation::Arcminute(v) | Separation::Degree(v) => v,
        }
    }
}

impl fmt::Display for Separation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Separation::Arcsecond(v) => write!(f, "{v}\""),
            Separation::Arcminute(v) => write!(f, "{v}'"),
            Separation::Degree(v) => write!(f, "{v}°"),
        }
    }
}

/// Configuration of the nightly association cycle.
///
/// Fields
/// -----------------
/// * `intra_night_sep_criterion` – separation between two alerts of the same night.
/// * `intra_night_mag_criterion_same_fid` / `intra_night_mag_criterion_diff_fid` – magnitude
///   difference between two alerts of the same night.
/// * `sep_criterion` – separation between a trajectory extremity and a candidate.
/// * `mag_criterion_same_fid` / `mag_criterion_diff_fid` – magnitude rate (per day) between
///   two nights.
/// * `angle_criterion` – cone-search angle in degrees (per day beyond one day of gap).
/// * `orbfit_limit` – minimum number of points to be sent to orbit fitting. Tracklets
///   already reaching this size skip the inter-night stages.
/// * `traj_time_window`, `obs_time_window`, `traj_2_points_time_window` – retention windows
///   in nights.
/// * `do_*` – toggles of the four inter-night stages.
/// * `run_metrics` – score every stage against the `ssnamenr` ground truth.
///
/// See also
/// -----------------
/// * [`AssociationParamsBuilder`] – validating builder.
/// * [`night_to_night_association`](crate::associations::night_to_night::night_to_night_association) – consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociationParams {
    // --- Intra-night ---
    pub intra_night_sep_criterion: Separation,
    pub intra_night_mag_criterion_same_fid: f64,
    pub intra_night_mag_criterion_diff_fid: f64,

    // --- Inter-night ---
    pub sep_criterion: Separation,
    pub mag_criterion_same_fid: f64,
    pub mag_criterion_diff_fid: f64,
    pub angle_criterion: Degree,
    pub orbfit_limit: usize,

    // --- Time windows (nights) ---
    pub traj_time_window: u32,
    pub obs_time_window: u32,
    pub traj_2_points_time_window: u32,

    // --- Stage toggles ---
    pub do_track_and_traj_assoc: bool,
    pub do_traj_and_new_obs_assoc: bool,
    pub do_track_and_old_obs_assoc: bool,
    pub do_new_obs_and_old_obs_assoc: bool,

    pub run_metrics: bool,
}

impl AssociationParams {
    /// Construct a new [`AssociationParams`] with the default thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> AssociationParamsBuilder {
        AssociationParamsBuilder::new()
    }
}

impl Default for AssociationParams {
    fn default() -> Self {
        AssociationParams {
            intra_night_sep_criterion: Separation::Arcsecond(DEFAULT_INTRA_NIGHT_SEP),
            intra_night_mag_criterion_same_fid: DEFAULT_INTRA_NIGHT_MAG_SAME_FID,
            intra_night_mag_criterion_diff_fid: DEFAULT_INTRA_NIGHT_MAG_DIFF_FID,
            sep_criterion: Separation::Degree(DEFAULT_SEP_CRITERION),
            mag_criterion_same_fid: DEFAULT_MAG_SAME_FID,
            mag_criterion_diff_fid: DEFAULT_MAG_DIFF_FID,
            angle_criterion: DEFAULT_ANGLE_CRITERION,
            orbfit_limit: DEFAULT_ORBFIT_LIMIT,
            traj_time_window: DEFAULT_TIME_WINDOW,
            obs_time_window: DEFAULT_TIME_WINDOW,
            traj_2_points_time_window: DEFAULT_TIME_WINDOW,
            do_track_and_traj_assoc: true,
            do_traj_and_new_obs_assoc: true,
            do_track_and_old_obs_assoc: true,
            do_new_obs_and_old_obs_assoc: true,
            run_metrics: false,
        }
    }
}

/// Builder for [`AssociationParams`], with validation.
#[derive(Debug, Clone)]
pub struct AssociationParamsBuilder {
    params: AssociationParams,
}

impl Default for AssociationParamsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AssociationParamsBuilder {
    pub fn new() -> Self {
        Self {
            params: AssociationParams::default(),
        }
    }

    // --- Intra-night ---
    pub fn intra_night_sep_criterion(mut self, v: Separation) -> Self {
        self.params.intra_night_sep_criterion = v;
        self
    }
    pub fn intra_night_mag_criterion_same_fid(mut self, v: f64) -> Self {
        self.params.intra_night_mag_criterion_same_fid = v;
        self
    }
    pub fn intra_night_mag_criterion_diff_fid(mut self, v: f64) -> Self {
        self.params.intra_night_mag_criterion_diff_fid = v;
        self
    }

    // --- Inter-night ---
    pub fn sep_criterion(mut self, v: Separation) -> Self {
        self.params.sep_criterion = v;
        self
    }
    pub fn mag_criterion_same_fid(mut self, v: f64) -> Self {
        self.params.mag_criterion_same_fid = v;
        self
    }
    pub fn mag_criterion_diff_fid(mut self, v: f64) -> Self {
        self.params.mag_criterion_diff_fid = v;
        self
    }
    pub fn angle_criterion(mut self, v: Degree) -> Self {
        self.params.angle_criterion = v;
        self
    }
    pub fn orbfit_limit(mut self, v: usize) -> Self {
        self.params.orbfit_limit = v;
        self
    }

    // --- Windows ---
    pub fn traj_time_window(mut self, v: u32) -> Self {
        self.params.traj_time_window = v;
        self
    }
    pub fn obs_time_window(mut self, v: u32) -> Self {
        self.params.obs_time_window = v;
        self
    }
    pub fn traj_2_points_time_window(mut self, v: u32) -> Self {
        self.params.traj_2_points_time_window = v;
        self
    }

    // --- Toggles ---
    pub fn do_track_and_traj_assoc(mut self, v: bool) -> Self {
        self.params.do_track_and_traj_assoc = v;
        self
    }
    pub fn do_traj_and_new_obs_assoc(mut self, v: bool) -> Self {
        self.params.do_traj_and_new_obs_assoc = v;
        self
    }
    pub fn do_track_and_old_obs_assoc(mut self, v: bool) -> Self {
        self.params.do_track_and_old_obs_assoc = v;
        self
    }
    pub fn do_new_obs_and_old_obs_assoc(mut self, v: bool) -> Self {
        self.params.do_new_obs_and_old_obs_assoc = v;
        self
    }
    pub fn run_metrics(mut self, v: bool) -> Self {
        self.params.run_metrics = v;
        self
    }

    /// Return true iff x > 0.0 and comparable (i.e., not NaN).
    #[inline]
    fn gt0(x: f64) -> bool {
        x.partial_cmp(&0.0) == Some(Greater) && x.is_finite()
    }

    /// Return true iff x >= 0.0 and comparable (i.e., not NaN).
    #[inline]
    fn ge0(x: f64) -> bool {
        matches!(x.partial_cmp(&0.0), Some(Greater) | Some(Equal)) && x.is_finite()
    }

    /// Finalize the builder.
    ///
    /// Validation rules
    /// -----------------
    /// * Separations are strictly positive and at most 180°.
    /// * Magnitude criteria are non-negative.
    /// * `0 < angle_criterion <= 180`.
    /// * `orbfit_limit >= 2`.
    ///
    /// Return
    /// ----------
    /// * `Ok(AssociationParams)` if all values are valid.
    /// * `Err(LinkError::InvalidAssociationParameter)` naming the first invalid field.
    pub fn build(self) -> Result<AssociationParams, LinkError> {
        let p = &self.params;

        for (name, sep) in [
            ("intra_night_sep_criterion", p.intra_night_sep_criterion),
            ("sep_criterion", p.sep_criterion),
        ] {
            if !Self::gt0(sep.value()) || sep.degrees() > 180.0 {
                return Err(LinkError::InvalidAssociationParameter(format!(
                    "{name} must be in (0, 180°], got {sep}"
                )));
            }
        }

        for (name, v) in [
            (
                "intra_night_mag_criterion_same_fid",
                p.intra_night_mag_criterion_same_fid,
            ),
            (
                "intra_night_mag_criterion_diff_fid",
                p.intra_night_mag_criterion_diff_fid,
            ),
            ("mag_criterion_same_fid", p.mag_criterion_same_fid),
            ("mag_criterion_diff_fid", p.mag_criterion_diff_fid),
        ] {
            if !Self::ge0(v) {
                return Err(LinkError::InvalidAssociationParameter(format!(
                    "{name} must be non-negative, got {v}"
                )));
            }
        }

        if !Self::gt0(p.angle_criterion) || p.angle_criterion > 180.0 {
            return Err(LinkError::InvalidAssociationParameter(
                "angle_criterion must be in (0, 180]".into(),
            ));
        }

        if p.orbfit_limit < 2 {
            return Err(LinkError::InvalidAssociationParameter(
                "orbfit_limit must be >= 2".into(),
            ));
        }

        Ok(self.params)
    }
}

impl fmt::Display for AssociationParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            writeln!(f, "Association parameters")?;
            writeln!(f, "----------------------")?;
            writeln!(
                f,
                "intra night : sep={}, mag same/diff fid={}/{}",
                self.intra_night_sep_criterion,
                self.intra_night_mag_criterion_same_fid,
                self.intra_night_mag_criterion_diff_fid
            )?;
            writeln!(
                f,
                "inter night : sep={}, mag same/diff fid={}/{}, angle={}°",
                self.sep_criterion,
                self.mag_criterion_same_fid,
                self.mag_criterion_diff_fid,
                self.angle_criterion
            )?;
            writeln!(
                f,
                "windows     : traj={}, obs={}, 2-points traj={} nights",
                self.traj_time_window, self.obs_time_window, self.traj_2_points_time_window
            )?;
            write!(
                f,
                "stages      : track/traj={}, traj/new obs={}, track/old obs={}, old/new obs={}, metrics={}",
                self.do_track_and_traj_assoc,
                self.do_traj_and_new_obs_assoc,
                self.do_track_and_old_obs_assoc,
                self.do_new_obs_and_old_obs_assoc,
                self.run_metrics
            )
        } else {
            write!(
                f,
                "AssociationParams(intra_sep={}, sep={}, mag={}/{}, angle={}°, orbfit_limit={}, windows={}/{}/{})",
                self.intra_night_sep_criterion,
                self.sep_criterion,
                self.mag_criterion_same_fid,
                self.mag_criterion_diff_fid,
                self.angle_criterion,
                self.orbfit_limit,
                self.traj_time_window,
                self.obs_time_window,
                self.traj_2_points_time_window
            )
        }
    }
}
