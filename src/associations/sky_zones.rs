//! # Declination-zone index
//!
//! The sphere is cut into declination bands of constant height and, inside a band,
//! points are kept sorted by right ascension. A cone query visits the bands crossing
//! `dec ± θ` and, in each one, binary-searches the right ascension interval covering the
//! cone. The interval is the exact extent of a small circle, `sin Δα = sin θ / cos δ`,
//! and the whole band is taken when the cone reaches a pole.
//!
//! Repeated coordinates are plain entries of a sorted slice, so any amount of
//! duplication is indexed.
use std::collections::HashMap;

use ahash::RandomState;
use smallvec::{smallvec, SmallVec};

use crate::constants::Degree;

/// Smallest band height, a zero radius still indexes a bounded number of bands.
const MIN_ZONE_HEIGHT: Degree = 1.0 / 3600.0;

type RaInterval = (Degree, Degree);

#[inline]
fn zone_of(dec: Degree, height: Degree) -> i64 {
    ((dec.clamp(-90.0, 90.0) + 90.0) / height).floor() as i64
}

/// Half width in right ascension of the cone, `None` when it covers every right ascension.
fn ra_half_width(dec: Degree, radius: Degree) -> Option<Degree> {
    if radius >= 90.0 || dec.abs() + radius >= 90.0 {
        return None;
    }
    let ratio = radius.to_radians().sin() / dec.to_radians().cos();
    if ratio >= 1.0 {
        return None;
    }
    let width = ratio.asin().to_degrees() * (1.0 + 1e-9) + 1e-9;
    (width < 180.0).then_some(width)
}

/// Inclusive right ascension intervals of `[ra - width, ra + width]`, split at 0°/360°.
fn ra_intervals(ra: Degree, width: Degree) -> SmallVec<[RaInterval; 2]> {
    let (lo, hi) = (ra - width, ra + width);
    if lo < 0.0 {
        smallvec![(lo + 360.0, 360.0), (0.0, hi)]
    } else if hi >= 360.0 {
        smallvec![(lo, 360.0), (0.0, hi - 360.0)]
    } else {
        smallvec![(lo, hi)]
    }
}

/// Index of a set of sky positions for fixed-radius cone queries.
#[derive(Debug, Clone)]
pub(crate) struct ZoneIndex {
    height: Degree,
    /// zone number → `(ra in [0, 360), position)`, sorted.
    zones: HashMap<i64, Vec<(Degree, usize)>, RandomState>,
}

impl ZoneIndex {
    /// Index `positions` (`(ra, dec)` in degrees) for queries of radius `radius` degrees.
    pub(crate) fn new(positions: impl IntoIterator<Item = (Degree, Degree)>, radius: Degree) -> Self {
        let height = radius.clamp(MIN_ZONE_HEIGHT, 180.0);
        let mut zones: HashMap<i64, Vec<(Degree, usize)>, RandomState> = HashMap::default();
        for (k, (ra, dec)) in positions.into_iter().enumerate() {
            zones
                .entry(zone_of(dec, height))
                .or_default()
                .push((ra.rem_euclid(360.0), k));
        }
        for zone in zones.values_mut() {
            zone.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        }
        ZoneIndex { height, zones }
    }

    /// Positions of the indexed points that may lie within `radius` degrees of `(ra, dec)`.
    ///
    /// Every point within the radius is returned; a few points slightly outside may be
    /// returned too, so callers check the exact distance.
    pub(crate) fn candidates(&self, ra: Degree, dec: Degree, radius: Degree) -> Vec<usize> {
        let radius = radius * (1.0 + 1e-9) + 1e-12;
        let ra = ra.rem_euclid(360.0);
        let width = ra_half_width(dec, radius);

        let mut found = Vec::new();
        for z in zone_of(dec - radius, self.height)..=zone_of(dec + radius, self.height) {
            let Some(zone) = self.zones.get(&z) else {
                continue;
            };
            match width {
                None => found.extend(zone.iter().map(|&(_, k)| k)),
                Some(width) => {
                    for (lo, hi) in ra_intervals(ra, width) {
                        let start = zone.partition_point(|&(r, _)| r < lo);
                        let end = zone.partition_point(|&(r, _)| r <= hi);
                        if start < end {
                            found.extend(zone[start..end].iter().map(|&(_, k)| k));
                        }
                    }
                }
            }
        }
        found
    }
}
