use serde::{Deserialize, Serialize};

use crate::constants::JD;

/// Keplerian orbital elements returned by the orbit-fit collaborator.
///
/// Units:
/// * `ref_epoch`: JD (Julian Date)
/// * `a`: AU (Astronomical Units)
/// * `e`: unitless
/// * `i`: degrees
/// * `long_node`: degrees
/// * `arg_peric`: degrees
/// * `mean_anomaly`: degrees
/// * `rms`: uncertainty of the six elements, in the same order, `-1` when unknown
///
/// A failed fit is represented by [`OrbitalElements::sentinel`], every value set to `-1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrbitalElements {
    pub ref_epoch: JD,
    pub a: f64,
    pub e: f64,
    pub i: f64,
    pub long_node: f64,
    pub arg_peric: f64,
    pub mean_anomaly: f64,
    pub rms: [f64; 6],
}

impl OrbitalElements {
    /// The "no orbit" marker.
    pub fn sentinel() -> Self {
        OrbitalElements {
            ref_epoch: -1.0,
            a: -1.0,
            e: -1.0,
            i: -1.0,
            long_node: -1.0,
            arg_peric: -1.0,
            mean_anomaly: -1.0,
            rms: [-1.0; 6],
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.ref_epoch == -1.0 && self.a == -1.0 && self.e == -1.0
    }

    /// Build from the 13 values of an `.oel` file: epoch, six elements, six rms.
    pub(crate) fn from_values(values: [f64; 13]) -> Self {
        let mut rms = [0.0; 6];
        rms.copy_from_slice(&values[7..13]);
        OrbitalElements {
            ref_epoch: values[0],
            a: values[1],
            e: values[2],
            i: values[3],
            long_node: values[4],
            arg_peric: values[5],
            mean_anomaly: values[6],
            rms,
        }
    }
}
