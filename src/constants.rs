//! # Constants and type definitions for nightlink
//!
//! This module centralizes the **unit conversions**, **default association thresholds**
//! and **common type definitions** used throughout the crate.
//!
//! ## Overview
//!
//! - Unit conversions (degrees ↔ radians, arcseconds ↔ degrees, JD ↔ MJD)
//! - Core type aliases (angles, dates, identifiers)
//! - Container type for the observations of a single trajectory
//!
//! The default thresholds are the values tuned on ZTF alert streams and are used by
//! [`AssociationParams::default`](crate::associations::params::AssociationParams).

use crate::observations::Observation;
use smallvec::SmallVec;

// -------------------------------------------------------------------------------------------------
// Unit conversions
// -------------------------------------------------------------------------------------------------

/// Conversion factor between Julian Date and Modified Julian Date
pub const JDTOMJD: f64 = 2400000.5;

/// Degrees → radians
pub const RADEG: f64 = std::f64::consts::PI / 180.0;

/// Arcseconds → radians
pub const RADSEC: f64 = std::f64::consts::PI / 648000.0;

/// Arcminutes → radians
pub const RADMIN: f64 = std::f64::consts::PI / 10800.0;

// -------------------------------------------------------------------------------------------------
// Default association thresholds
// -------------------------------------------------------------------------------------------------

/// Intra-night separation criterion (arcseconds)
pub const DEFAULT_INTRA_NIGHT_SEP: ArcSec = 145.0;

/// Intra-night magnitude criterion, same filter band
pub const DEFAULT_INTRA_NIGHT_MAG_SAME_FID: f64 = 2.21;

/// Intra-night magnitude criterion, different filter band
pub const DEFAULT_INTRA_NIGHT_MAG_DIFF_FID: f64 = 1.75;

/// Inter-night separation criterion (degrees)
pub const DEFAULT_SEP_CRITERION: Degree = 0.24;

/// Inter-night magnitude rate criterion, same filter band
pub const DEFAULT_MAG_SAME_FID: f64 = 0.18;

/// Inter-night magnitude rate criterion, different filter band
pub const DEFAULT_MAG_DIFF_FID: f64 = 0.7;

/// Cone-search angle criterion (degrees)
pub const DEFAULT_ANGLE_CRITERION: Degree = 8.8;

/// Minimum number of points for a trajectory to be sent to orbit fitting
pub const DEFAULT_ORBFIT_LIMIT: usize = 3;

/// Default retention window (in nights) for trajectories, observations and two-point trajectories
pub const DEFAULT_TIME_WINDOW: u32 = 30;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Angle in degrees
pub type Degree = f64;
/// Angle in arcseconds
pub type ArcSec = f64;
/// Angle in radians
pub type Radian = f64;
/// Julian Date (days)
pub type JD = f64;
/// Modified Julian Date (days)
pub type MJD = f64;

/// Unique identifier of an alert
pub type Candid = i64;
/// Integer key of an observing night
pub type Nid = u32;
/// Identifier of a trajectory
pub type TrajectoryId = u32;

/// A small, inline-optimized container for the observations of a single trajectory.
pub type Observations = SmallVec<[Observation; 6]>;
