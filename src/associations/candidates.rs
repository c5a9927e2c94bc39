//! # Candidate pairs: geometric matching, photometric filter and deduplication
//!
//! The three building blocks shared by every association stage:
//!
//! * [`separation_association`] – all-against-all range join on the celestial sphere.
//! * [`magnitude_filter`] – rejects pairs whose magnitude change is too large.
//! * [`remove_mirrored`] – drops self pairs and pairs duplicated under swapped roles.
//!
//! Candidates are carried as a [`CandidatePairs`] value: three index-aligned columns
//! `left`, `right` and `separation`, where `left[k]`/`right[k]` are positions in the two
//! input slices. Every filter returns an order-preserving subsequence of its input.
//!
//! Geometric matching
//! -----------------
//! The right-hand set is indexed by declination zones (`associations::sky_zones`),
//! which accepts any number of repeated coordinates. Each candidate of a zone query is
//! then checked with the great-circle distance between unit vectors, so that no accepted
//! pair exceeds the threshold. Queries run in parallel over the left points with `rayon`.
use std::borrow::Borrow;
use std::collections::HashMap;

use ahash::RandomState;
use nalgebra::Vector3;
use rayon::prelude::*;

use crate::{
    associations::{params::Separation, sky_zones::ZoneIndex},
    constants::{Candid, Degree, RADEG},
    conversion::{angular_distance, radec_to_unit_vector},
    observations::Observation,
};

/// Anything with an equatorial position, in degrees.
pub trait SkyPosition {
    fn ra(&self) -> Degree;
    fn dec(&self) -> Degree;

    fn unit_vector(&self) -> Vector3<f64> {
        radec_to_unit_vector(self.ra(), self.dec())
    }
}

impl SkyPosition for Observation {
    fn ra(&self) -> Degree {
        self.ra
    }
    fn dec(&self) -> Degree {
        self.dec
    }
}

impl<T: SkyPosition + ?Sized> SkyPosition for &T {
    fn ra(&self) -> Degree {
        (**self).ra()
    }
    fn dec(&self) -> Degree {
        (**self).dec()
    }
}

/// Index-aligned candidate pairs.
///
/// Invariant: `left.len() == right.len() == separation.len()`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidatePairs {
    pub left: Vec<usize>,
    pub right: Vec<usize>,
    /// Great-circle separation in degrees.
    pub separation: Vec<Degree>,
}

impl CandidatePairs {
    #[inline]
    pub fn len(&self) -> usize {
        self.left.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    pub fn push(&mut self, left: usize, right: usize, separation: Degree) {
        self.left.push(left);
        self.right.push(right);
        self.separation.push(separation);
    }

    /// Iterate over `(left, right, separation)` rows.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, Degree)> + '_ {
        self.left
            .iter()
            .zip(&self.right)
            .zip(&self.separation)
            .map(|((&l, &r), &s)| (l, r, s))
    }

    /// Keep the rows for which `keep(row_index, left, right)` holds, preserving order.
    pub fn retain(mut self, mut keep: impl FnMut(usize, usize, usize) -> bool) -> Self {
        let mask: Vec<bool> = self
            .iter()
            .enumerate()
            .map(|(k, (l, r, _))| keep(k, l, r))
            .collect();

        let mut it = mask.iter();
        self.left.retain(|_| *it.next().unwrap_or(&false));
        let mut it = mask.iter();
        self.right.retain(|_| *it.next().unwrap_or(&false));
        let mut it = mask.iter();
        self.separation.retain(|_| *it.next().unwrap_or(&false));
        self
    }
}

/// Find every pair `(l, r)` closer than `threshold` on the sky.
///
/// Arguments
/// -----------------
/// * `left`, `right`: the two point sets.
/// * `threshold`: maximal great-circle separation (inclusive).
///
/// Return
/// ----------
/// * The matches ordered left-major; for one left point, by increasing separation then
///   right position. One-to-many matches are all kept. Empty inputs give empty pairs.
///
/// See also
/// ------------
/// * [`magnitude_filter`] – next filter of every stage.
pub fn separation_association<L, R>(left: &[L], right: &[R], threshold: Separation) -> CandidatePairs
where
    L: SkyPosition + Sync,
    R: SkyPosition + Sync,
{
    if left.is_empty() || right.is_empty() {
        return CandidatePairs::default();
    }

    let radius = threshold.radians();
    let radius_deg = threshold.degrees();

    let right_vec: Vec<Vector3<f64>> = right.iter().map(SkyPosition::unit_vector).collect();
    let index = ZoneIndex::new(right.iter().map(|p| (p.ra(), p.dec())), radius_deg);

    let per_left: Vec<Vec<(usize, f64)>> = left
        .par_iter()
        .map(|l| {
            let q = l.unit_vector();
            let mut hits: Vec<(usize, f64)> = index
                .candidates(l.ra(), l.dec(), radius_deg)
                .into_iter()
                .filter_map(|j| {
                    let sep = angular_distance(&q, &right_vec[j]);
                    (sep <= radius).then_some((j, sep))
                })
                .collect();
            hits.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
            hits
        })
        .collect();

    let mut pairs = CandidatePairs::default();
    for (i, hits) in per_left.into_iter().enumerate() {
        for (j, sep) in hits {
            pairs.push(i, j, sep / RADEG);
        }
    }
    pairs
}

/// Magnitude change of a pair, as a rate per day beyond one day of gap.
#[inline]
pub(crate) fn magnitude_rate(left: &Observation, right: &Observation) -> f64 {
    let diff_mag = (left.magpsf - right.magpsf).abs();
    let diff_jd = right.jd - left.jd;
    if diff_jd > 1.0 {
        diff_mag / diff_jd
    } else {
        diff_mag
    }
}

/// Drop pairs whose magnitude change exceeds the criterion of their filter combination.
///
/// Arguments
/// -----------------
/// * `same_fid`: criterion when both observations share the filter band.
/// * `diff_fid`: criterion otherwise.
///
/// Return
/// ----------
/// * The pairs with `rate <= criterion`, in input order.
pub fn magnitude_filter<L, R>(
    left: &[L],
    right: &[R],
    pairs: CandidatePairs,
    same_fid: f64,
    diff_fid: f64,
) -> CandidatePairs
where
    L: Borrow<Observation>,
    R: Borrow<Observation>,
{
    pairs.retain(|_, l, r| {
        let (l, r) = (left[l].borrow(), right[r].borrow());
        let criterion = if l.fid == r.fid { same_fid } else { diff_fid };
        magnitude_rate(l, r) <= criterion
    })
}

/// Remove self pairs and pairs duplicated under swapped left/right roles.
///
/// Two rows are duplicates when they link the same unordered pair of `candid`. Of each
/// duplicate group the row with the smallest separation is kept; exact ties keep the
/// earliest row.
pub fn remove_mirrored<L, R>(left: &[L], right: &[R], pairs: CandidatePairs) -> CandidatePairs
where
    L: Borrow<Observation>,
    R: Borrow<Observation>,
{
    let key = |l: usize, r: usize| -> (Candid, Candid) {
        let (a, b) = (left[l].borrow().candid, right[r].borrow().candid);
        (a.min(b), a.max(b))
    };

    let mut best: HashMap<(Candid, Candid), usize, RandomState> = HashMap::default();
    for (k, (l, r, sep)) in pairs.iter().enumerate() {
        let (a, b) = key(l, r);
        if a == b {
            continue;
        }
        best.entry((a, b))
            .and_modify(|kept| {
                if sep < pairs.separation[*kept] {
                    *kept = k;
                }
            })
            .or_insert(k);
    }

    pairs.retain(|k, l, r| best.get(&key(l, r)) == Some(&k))
}

#[cfg(test)]
mod candidates_test {
    use super::*;
    use approx::assert_relative_eq;

    fn obs(ra: f64, dec: f64, jd: f64, fid: u8, mag: f64, candid: Candid) -> Observation {
        Observation::new(ra, dec, jd, fid, mag, candid, 0)
    }

    #[test]
    fn test_empty_inputs() {
        let some = vec![obs(1.0, 1.0, 1.0, 1, 18.0, 1)];
        let none: Vec<Observation> = vec![];
        assert!(separation_association(&some, &none, Separation::Degree(1.0)).is_empty());
        assert!(separation_association(&none, &some, Separation::Degree(1.0)).is_empty());
    }

    #[test]
    fn test_separation_order_and_duplicates() {
        let left = vec![obs(10.0, 0.0, 1.0, 1, 18.0, 1), obs(50.0, 0.0, 1.0, 1, 18.0, 2)];
        let right = vec![
            obs(10.2, 0.0, 2.0, 1, 18.0, 3),
            obs(10.1, 0.0, 2.0, 1, 18.0, 4),
            obs(50.0, 0.05, 2.0, 1, 18.0, 5),
            obs(30.0, 0.0, 2.0, 1, 18.0, 6),
        ];

        let pairs = separation_association(&left, &right, Separation::Degree(0.24));
        assert_eq!(pairs.left, vec![0, 0, 1]);
        assert_eq!(pairs.right, vec![1, 0, 2]);
        assert_relative_eq!(pairs.separation[0], 0.1, epsilon = 1e-9);
        assert_relative_eq!(pairs.separation[1], 0.2, epsilon = 1e-9);
        assert_relative_eq!(pairs.separation[2], 0.05, epsilon = 1e-9);
    }

    #[test]
    fn test_separation_across_ra_origin() {
        let left = vec![obs(359.95, 10.0, 1.0, 1, 18.0, 1)];
        let right = vec![obs(0.05, 10.0, 2.0, 1, 18.0, 2)];
        let pairs = separation_association(&left, &right, Separation::Arcminute(10.0));
        assert_eq!(pairs.len(), 1);
    }

    #[test]
    fn test_threshold_is_inclusive_and_never_exceeded() {
        let left = vec![obs(0.0, 0.0, 1.0, 1, 18.0, 1)];
        let right: Vec<Observation> = (0..50)
            .map(|i| obs(i as f64 * 0.01, 0.0, 2.0, 1, 18.0, 10 + i))
            .collect();
        let threshold = Separation::Degree(0.2);
        let pairs = separation_association(&left, &right, threshold);
        assert!(pairs.separation.iter().all(|&s| s <= threshold.degrees()));
        assert!(pairs.len() >= 20);
    }

    fn brute_force(left: &[Observation], right: &[Observation], threshold: Separation) -> usize {
        left.iter()
            .map(|l| {
                right
                    .iter()
                    .filter(|r| angular_distance(&l.unit_vector(), &r.unit_vector()) <= threshold.radians())
                    .count()
            })
            .sum()
    }

    #[test]
    fn test_separation_identical_positions() {
        let night: Vec<Observation> = (0..100).map(|i| obs(123.4, -20.0, 1.0, 1, 18.0, i)).collect();
        let pairs = separation_association(&night, &night, Separation::Arcsecond(1.0));
        assert_eq!(pairs.len(), 100 * 100);
        assert!(pairs.separation.iter().all(|&s| s < 1e-9));
    }

    #[test]
    fn test_separation_on_ra_origin_column() {
        let column: Vec<Observation> = (0..100)
            .map(|i| obs(0.0, -10.0 + i as f64 * 1e-4, 1.0, 1, 18.0, i))
            .collect();
        let threshold = Separation::Arcsecond(1.0);
        let pairs = separation_association(&column, &column, threshold);
        assert_eq!(pairs.len(), brute_force(&column, &column, threshold));
        assert!(pairs.len() >= 100);
    }

    #[test]
    fn test_separation_on_constant_declination_row() {
        let row: Vec<Observation> = (0..1000)
            .map(|i| obs(100.0 + i as f64 * 2e-4, 5.0, 1.0, 1, 18.0, i))
            .collect();
        let threshold = Separation::Arcsecond(1.0);
        let pairs = separation_association(&row, &row, threshold);
        assert_eq!(pairs.len(), brute_force(&row, &row, threshold));
        // each point sees itself and its two neighbours, 0.72 arcsec away
        assert_eq!(pairs.len(), 1000 + 2 * 999);
    }

    #[test]
    fn test_separation_around_the_pole() {
        let left = vec![obs(0.0, 89.99, 1.0, 1, 18.0, 1)];
        let right = vec![obs(180.0, 89.99, 2.0, 1, 18.0, 2), obs(90.0, 89.995, 2.0, 1, 18.0, 3)];
        let threshold = Separation::Arcminute(2.0);
        let pairs = separation_association(&left, &right, threshold);
        assert_eq!(pairs.len(), brute_force(&left, &right, threshold));
        assert_eq!(pairs.len(), 2);
    }

    #[test]
    fn test_magnitude_filter() {
        let left = vec![obs(0.0, 0.0, 1.0, 1, 18.0, 1)];
        let right = vec![
            // same fid, no gap division: 0.5 <= 0.6
            obs(0.0, 0.0, 1.5, 1, 18.5, 2),
            // diff fid: 0.5 > 0.4
            obs(0.0, 0.0, 1.5, 2, 18.5, 3),
            // same fid, 4 days gap: 2.0 / 4.0 = 0.5 <= 0.6
            obs(0.0, 0.0, 5.0, 1, 20.0, 4),
            // same fid, 1 day gap exactly: no division, 0.7 > 0.6
            obs(0.0, 0.0, 2.0, 1, 18.7, 5),
        ];
        let pairs = CandidatePairs {
            left: vec![0, 0, 0, 0],
            right: vec![0, 1, 2, 3],
            separation: vec![0.0; 4],
        };
        let kept = magnitude_filter(&left, &right, pairs, 0.6, 0.4);
        assert_eq!(kept.right, vec![0, 2]);
    }

    #[test]
    fn test_remove_mirrored() {
        let night = vec![
            obs(0.0, 0.0, 1.0, 1, 18.0, 10),
            obs(0.0005, 0.0, 1.0, 1, 18.0, 11),
            obs(0.001, 0.0, 1.0, 1, 18.0, 12),
        ];
        let pairs = separation_association(&night, &night, Separation::Arcsecond(5.0));
        // 3 self pairs, 3 unordered pairs seen twice
        assert_eq!(pairs.len(), 9);

        let kept = remove_mirrored(&night, &night, pairs);
        assert_eq!(kept.len(), 3);
        assert!(kept.iter().all(|(l, r, _)| l < r));
    }

    #[test]
    fn test_remove_mirrored_keeps_smallest_separation() {
        let a = vec![obs(0.0, 0.0, 1.0, 1, 18.0, 1), obs(0.0, 0.0, 1.0, 1, 18.0, 2)];
        let pairs = CandidatePairs {
            left: vec![0, 1, 0],
            right: vec![1, 0, 1],
            separation: vec![0.3, 0.1, 0.1],
        };
        let kept = remove_mirrored(&a, &a, pairs);
        assert_eq!(kept.left, vec![1]);
        assert_eq!(kept.separation, vec![0.1]);
    }
}
