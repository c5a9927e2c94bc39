//! # Observations: single alert detections
//!
//! The atomic input of the association engine is an [`Observation`]: one detection of a
//! moving-object candidate, as emitted by a survey alert stream.
//!
//! Units & Conventions
//! -----------------
//! * Right ascension and declination are stored in **degrees**.
//! * Epochs are **Julian Dates** (UTC).
//! * `fid` is the survey filter band identifier (ZTF: 1 = g, 2 = r, 3 = i).
//! * `candid` is unique across the whole alert stream and is the identity used by
//!   every deduplication step.
//!
//! Observations are immutable once ingested: the engine moves and regroups them,
//! it never edits their content.
//!
//! See also
//! ------------
//! * [`batch_reader::ObservationBatch`] – column-oriented ingestion.
//! * [`crate::trajectories::Trajectory`] – time-ordered group of observations.
pub mod batch_reader;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::{
    constants::{Candid, Degree, Nid, JD},
    conversion::radec_to_unit_vector,
};

/// A single alert detection.
///
/// # Fields
///
/// * `ra` - Right ascension in degrees
/// * `dec` - Declination in degrees
/// * `jd` - Exposure time (Julian Date)
/// * `fid` - Filter band identifier
/// * `magpsf` - PSF-fit magnitude
/// * `candid` - Unique alert identifier
/// * `nid` - Night identifier
/// * `ssnamenr` - Known solar-system object name, if any. Only used to score associations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub ra: Degree,
    pub dec: Degree,
    pub jd: JD,
    pub fid: u8,
    pub magpsf: f64,
    pub candid: Candid,
    pub nid: Nid,
    #[serde(default)]
    pub ssnamenr: Option<String>,
}

impl Observation {
    /// Create a new observation without ground truth
    ///
    /// Arguments
    /// ---------
    /// * `ra`, `dec`: equatorial coordinates in degrees
    /// * `jd`: exposure time
    /// * `fid`: filter band
    /// * `magpsf`: magnitude
    /// * `candid`: unique alert identifier
    /// * `nid`: night identifier
    pub fn new(
        ra: Degree,
        dec: Degree,
        jd: JD,
        fid: u8,
        magpsf: f64,
        candid: Candid,
        nid: Nid,
    ) -> Self {
        Observation {
            ra,
            dec,
            jd,
            fid,
            magpsf,
            candid,
            nid,
            ssnamenr: None,
        }
    }

    /// Attach the known object name used by association metrics.
    pub fn with_ssnamenr(mut self, name: impl Into<String>) -> Self {
        self.ssnamenr = Some(name.into());
        self
    }

    /// Unit vector pointing to the observation on the celestial sphere.
    #[inline]
    pub fn unit_vector(&self) -> Vector3<f64> {
        radec_to_unit_vector(self.ra, self.dec)
    }

    /// True when both observations carry the same non-empty object name.
    pub(crate) fn same_object(&self, other: &Observation) -> bool {
        match (&self.ssnamenr, &other.ssnamenr) {
            (Some(a), Some(b)) => !a.is_empty() && a == b,
            _ => false,
        }
    }
}

#[cfg(test)]
mod observation_test {
    use super::*;

    #[test]
    fn test_same_object() {
        let a = Observation::new(10.0, 5.0, 2459000.5, 1, 18.0, 1, 0).with_ssnamenr("1234");
        let b = Observation::new(10.1, 5.0, 2459000.6, 2, 18.2, 2, 0).with_ssnamenr("1234");
        let c = Observation::new(10.1, 5.0, 2459000.6, 2, 18.2, 3, 0);
        let d = Observation::new(10.1, 5.0, 2459000.6, 2, 18.2, 4, 0).with_ssnamenr("");
        let e = Observation::new(10.1, 5.0, 2459000.6, 2, 18.2, 5, 0).with_ssnamenr("");

        assert!(a.same_object(&b));
        assert!(!a.same_object(&c));
        assert!(!c.same_object(&c));
        assert!(!d.same_object(&e));
    }
}
