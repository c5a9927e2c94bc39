//! # Streaming orbit association
//!
//! Once orbits are known, later alerts are attached to them directly, without waiting
//! for the nightly cycle: each alert is compared with the predicted positions of the
//! known orbits at the alert epochs.
//!
//! The ephemerides are computed outside of this crate and handed over as a lookup table
//! of [`EphemerisPoint`]s.
//!
//! Alerts classified upstream carry a solar system flag ([`RoidFlag`]);
//! [`flagged_orbit_association`] only looks at the flagged alerts and marks the ones it
//! attaches to an orbit.
//!
//! Example
//! -----------------
//! ```rust
//! use nightlink::observations::Observation;
//! use nightlink::streaming::{orbit_association, EphemerisPoint, OrbitSummary, StreamingParams};
//!
//! let alerts = vec![Observation::new(54.700455, 21.481771, 2460160.58, 1, 16.2, 100, 0)];
//! let ephemerides = vec![EphemerisPoint {
//!     sso_cand_id: "FF20230802aaaaaaa".into(),
//!     ra: 54.70047,
//!     dec: 21.48179,
//!     epoch_jd: 2460160.58,
//! }];
//! let orbits = vec![OrbitSummary {
//!     sso_cand_id: "FF20230802aaaaaaa".into(),
//!     last_mag: 16.5,
//!     last_jd: 2460158.87,
//!     last_fid: 1,
//!     ref_epoch: 2460158.87,
//! }];
//!
//! let matches = orbit_association(&alerts, &ephemerides, &orbits, &StreamingParams::default());
//! assert_eq!(matches.len(), 1);
//! assert_eq!(matches[0].candid, 100);
//! ```
use std::collections::HashMap;

use ahash::RandomState;
use itertools::{Itertools, MinMaxResult};
use serde::{Deserialize, Serialize};

use crate::{
    associations::{candidates::{separation_association, SkyPosition}, params::Separation},
    constants::{ArcSec, Candid, Degree, JD},
    linkage_errors::LinkError,
    observations::Observation,
};

/// Solar system flags of the upstream alert classifier.
pub struct RoidFlag;

impl RoidFlag {
    /// Candidate solar system object, first kind.
    pub const CANDIDATE: u8 = 1;
    /// Candidate solar system object, second kind.
    pub const CANDIDATE_SECOND: u8 = 2;
    /// Confirmed known solar system object.
    pub const CONFIRMED: u8 = 3;
    /// Attached to an orbit computed from earlier alerts.
    pub const ORBIT_MATCH: u8 = 5;

    /// Whether an alert flagged `flag` takes part in the association.
    pub fn is_eligible(flag: u8, confirmed_sso: bool) -> bool {
        if confirmed_sso {
            flag == Self::CONFIRMED
        } else {
            flag == Self::CANDIDATE || flag == Self::CANDIDATE_SECOND
        }
    }
}

/// Predicted position of an orbit at one epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EphemerisPoint {
    pub sso_cand_id: String,
    pub ra: Degree,
    pub dec: Degree,
    pub epoch_jd: JD,
}

impl SkyPosition for EphemerisPoint {
    fn ra(&self) -> Degree {
        self.ra
    }
    fn dec(&self) -> Degree {
        self.dec
    }
}

/// The part of a known orbit needed to vet an alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrbitSummary {
    pub sso_cand_id: String,
    /// Magnitude of the last observation used by the fit.
    pub last_mag: f64,
    pub last_jd: JD,
    pub last_fid: u8,
    pub ref_epoch: JD,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StreamingParams {
    /// Search radius around each predicted position.
    pub orbit_error: ArcSec,
    pub mag_criterion_same_fid: f64,
    pub mag_criterion_diff_fid: f64,
    /// Nights before the alerts for which an orbit is still used.
    pub orbit_time_window: u32,
}

impl Default for StreamingParams {
    fn default() -> Self {
        StreamingParams {
            orbit_error: 15.0,
            mag_criterion_same_fid: 2.0,
            mag_criterion_diff_fid: 2.0,
            orbit_time_window: 20,
        }
    }
}

/// An alert attached to a known orbit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrbitAssociation {
    pub candid: Candid,
    pub sso_cand_id: String,
    /// Distance to the predicted position, in degrees.
    pub separation: Degree,
}

fn jd_range(alerts: &[Observation]) -> Option<(JD, JD)> {
    match alerts.iter().map(|a| a.jd).minmax_by(f64::total_cmp) {
        MinMaxResult::NoElements => None,
        MinMaxResult::OneElement(jd) => Some((jd, jd)),
        MinMaxResult::MinMax(min, max) => Some((min, max)),
    }
}

/// Ephemerides within the Julian date range of the alerts, bounds included.
pub fn ephem_window<'a>(ephemerides: &'a [EphemerisPoint], alerts: &[Observation]) -> Vec<&'a EphemerisPoint> {
    let Some((min, max)) = jd_range(alerts) else {
        return Vec::new();
    };
    ephemerides
        .iter()
        .filter(|e| e.epoch_jd >= min && e.epoch_jd <= max)
        .collect()
}

/// Orbits whose reference epoch lies between `time_window` nights before the first
/// alert night and the end of the last alert night.
pub fn orbit_window<'a>(
    orbits: &'a [OrbitSummary],
    alerts: &[Observation],
    time_window: u32,
) -> Vec<&'a OrbitSummary> {
    let Some((min, max)) = jd_range(alerts) else {
        return Vec::new();
    };
    let lower = min.trunc() - time_window as f64;
    let upper = max.trunc() + 0.99999999;
    orbits
        .iter()
        .filter(|o| o.ref_epoch >= lower && o.ref_epoch <= upper)
        .collect()
}

/// Attach alerts to the orbits predicted close to them.
///
/// Arguments
/// -----------------
/// * `alerts`: the alerts of the batch.
/// * `ephemerides`: predicted positions of the known orbits.
/// * `orbits`: the known orbits, keyed by `sso_cand_id`.
///
/// Return
/// ----------
/// * At most one association per alert, the closest accepted ephemeris, in alert order.
///   A candidate is accepted when its magnitude rate against the last magnitude of the
///   orbit (divided by the time gap when it reaches one day) is strictly below the
///   criterion of the filter combination.
pub fn orbit_association(
    alerts: &[Observation],
    ephemerides: &[EphemerisPoint],
    orbits: &[OrbitSummary],
    params: &StreamingParams,
) -> Vec<OrbitAssociation> {
    closest_orbits(alerts, ephemerides, orbits, params)
        .into_iter()
        .map(|(_, association)| association)
        .collect()
}

/// Result of [`flagged_orbit_association`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlaggedAssociation {
    /// Flags of the alerts, [`RoidFlag::ORBIT_MATCH`] for the attached ones.
    pub flags: Vec<u8>,
    pub associations: Vec<OrbitAssociation>,
}

/// [`orbit_association`] restricted to the alerts carrying a solar system flag.
///
/// Arguments
/// -----------------
/// * `flags`: one flag per alert.
/// * `confirmed_sso`: use the confirmed objects ([`RoidFlag::CONFIRMED`]) instead of the
///   candidates ([`RoidFlag::CANDIDATE`], [`RoidFlag::CANDIDATE_SECOND`]).
///
/// Return
/// ----------
/// * The updated flags and the associations, or an error when `flags` and `alerts` do not
///   have the same length.
///
/// See also
/// ------------
/// * [`orbit_association`]
pub fn flagged_orbit_association(
    alerts: &[Observation],
    flags: &[u8],
    confirmed_sso: bool,
    ephemerides: &[EphemerisPoint],
    orbits: &[OrbitSummary],
    params: &StreamingParams,
) -> Result<FlaggedAssociation, LinkError> {
    if flags.len() != alerts.len() {
        return Err(LinkError::BatchLengthMismatch {
            expected: alerts.len(),
            got: flags.len(),
        });
    }

    let (positions, eligible): (Vec<usize>, Vec<Observation>) = alerts
        .iter()
        .zip(flags)
        .enumerate()
        .filter(|(_, (_, flag))| RoidFlag::is_eligible(**flag, confirmed_sso))
        .map(|(k, (alert, _))| (k, alert.clone()))
        .unzip();

    let mut flags = flags.to_vec();
    let associations = closest_orbits(&eligible, ephemerides, orbits, params)
        .into_iter()
        .map(|(k, association)| {
            flags[positions[k]] = RoidFlag::ORBIT_MATCH;
            association
        })
        .collect();

    Ok(FlaggedAssociation { flags, associations })
}

/// Closest accepted orbit of each alert, with the alert position.
fn closest_orbits(
    alerts: &[Observation],
    ephemerides: &[EphemerisPoint],
    orbits: &[OrbitSummary],
    params: &StreamingParams,
) -> Vec<(usize, OrbitAssociation)> {
    let ephemerides = ephem_window(ephemerides, alerts);
    if ephemerides.is_empty() {
        return Vec::new();
    }

    let by_id: HashMap<&str, &OrbitSummary, RandomState> =
        orbits.iter().map(|o| (o.sso_cand_id.as_str(), o)).collect();

    let pairs = separation_association(alerts, &ephemerides, Separation::Arcsecond(params.orbit_error));

    let mut best: Vec<Option<(usize, Degree)>> = vec![None; alerts.len()];
    for (a, e, sep) in pairs.iter() {
        let alert = &alerts[a];
        let Some(orbit) = by_id.get(ephemerides[e].sso_cand_id.as_str()) else {
            continue;
        };

        let diff_jd = alert.jd - orbit.last_jd;
        let rate = (alert.magpsf - orbit.last_mag).abs() / if diff_jd >= 1.0 { diff_jd } else { 1.0 };
        let criterion = if alert.fid == orbit.last_fid {
            params.mag_criterion_same_fid
        } else {
            params.mag_criterion_diff_fid
        };

        if rate < criterion && best[a].map_or(true, |(_, kept)| sep < kept) {
            best[a] = Some((e, sep));
        }
    }

    best.into_iter()
        .enumerate()
        .filter_map(|(a, hit)| {
            hit.map(|(e, separation)| {
                let association = OrbitAssociation {
                    candid: alerts[a].candid,
                    sso_cand_id: ephemerides[e].sso_cand_id.clone(),
                    separation,
                };
                (a, association)
            })
        })
        .collect()
}
