//! # Cone search
//!
//! Three-point direction consistency check. An object in unaccelerated apparent motion
//! keeps a nearly constant direction between consecutive detections; a sharp turn at
//! the middle point flags an unrelated detection.
use nalgebra::Vector2;

use crate::{
    associations::candidates::CandidatePairs,
    constants::Degree,
    conversion::wrap_degree_difference,
    observations::Observation,
};

/// Displacement between two observations in (ra, dec) space, RA wrapped across 0°/360°.
fn displacement(from: &Observation, to: &Observation) -> Vector2<f64> {
    Vector2::new(wrap_degree_difference(to.ra - from.ra), to.dec - from.dec)
}

/// Angle at `p2` between `p1 → p2` and `p2 → p3`, in degrees.
///
/// When `p2` and `p3` are more than one day apart the angle is divided by the gap, so
/// the value reads as a turn rate per day.
///
/// Arguments
/// -----------------
/// * `p1`, `p2`: consecutive points of the existing chain, in the direction of travel.
/// * `p3`: the candidate point.
///
/// Return
/// ----------
/// * `None` when one of the two displacements has zero length.
pub fn cone_angle(p1: &Observation, p2: &Observation, p3: &Observation) -> Option<Degree> {
    let v1 = displacement(p1, p2);
    let v2 = displacement(p2, p3);

    let norm = v1.norm() * v2.norm();
    if norm == 0.0 || !norm.is_finite() {
        return None;
    }

    let angle = (v1.dot(&v2) / norm).clamp(-1.0, 1.0).acos().to_degrees();
    let gap = (p3.jd - p2.jd).abs();
    Some(if gap > 1.0 { angle / gap } else { angle })
}

/// True when the candidate keeps the direction of the chain.
#[inline]
pub fn cone_accepts(p1: &Observation, p2: &Observation, p3: &Observation, angle_criterion: Degree) -> bool {
    cone_angle(p1, p2, p3).is_some_and(|angle| angle <= angle_criterion)
}

/// Keep the pairs whose three points pass the cone search.
///
/// `points(left, right)` gives `(p1, p2, p3)` for a pair, or `None` when the chain has
/// fewer than two points, in which case the pair is rejected.
pub(crate) fn cone_filter<'a>(
    pairs: CandidatePairs,
    angle_criterion: Degree,
    points: impl Fn(usize, usize) -> Option<(&'a Observation, &'a Observation, &'a Observation)>,
) -> CandidatePairs {
    pairs.retain(|_, l, r| {
        points(l, r).is_some_and(|(p1, p2, p3)| cone_accepts(p1, p2, p3, angle_criterion))
    })
}
