//! # Column-oriented alert ingestion
//!
//! Alert brokers deliver nightly batches as columns (one array per field). The
//! [`ObservationBatch`] type wraps such columns, borrowed or owned, and expands them
//! into row-oriented [`Observation`]s ready for the association engine.
//!
//! ## Invariants
//! -----------------
//! - Every column has the same length; checked by [`ObservationBatch::to_observations`].
//! - Angles are in **degrees**, epochs in **JD**.
//!
//! ## Example
//! -----------------
//! ```rust
//! use nightlink::observations::batch_reader::ObservationBatch;
//!
//! let ra = [10.0, 10.001];
//! let dec = [5.0, 5.001];
//! let jd = [2459000.70, 2459000.72];
//! let fid = [1, 1];
//! let mag = [18.1, 18.2];
//! let candid = [11, 12];
//! let nid = [1, 1];
//!
//! let batch = ObservationBatch::from_columns_borrowed(&ra, &dec, &jd, &fid, &mag, &candid, &nid);
//! let observations = batch.to_observations().unwrap();
//! assert_eq!(observations.len(), 2);
//! ```
use std::{borrow::Cow, collections::BTreeMap};

use crate::{
    constants::{Candid, Degree, Nid, JD},
    linkage_errors::LinkError,
    observations::Observation,
};

/// Batch of alerts stored column-wise.
///
/// See also
/// ------------
/// * [`ObservationBatch::from_columns_borrowed`] – zero-copy construction.
/// * [`ObservationBatch::with_ssnamenr`] – attach the ground-truth names.
#[derive(Debug, Clone)]
pub struct ObservationBatch<'a> {
    pub ra: Cow<'a, [Degree]>,
    pub dec: Cow<'a, [Degree]>,
    pub jd: Cow<'a, [JD]>,
    pub fid: Cow<'a, [u8]>,
    pub magpsf: Cow<'a, [f64]>,
    pub candid: Cow<'a, [Candid]>,
    pub nid: Cow<'a, [Nid]>,
    pub ssnamenr: Option<Cow<'a, [String]>>,
}

impl<'a> ObservationBatch<'a> {
    /// Construct a batch by **borrowing** the provided columns.
    ///
    /// No allocation and no validation happen here; column lengths are checked when
    /// the batch is expanded.
    ///
    /// See also
    /// ------------
    /// * [`ObservationBatch::to_observations`] – validated expansion.
    pub fn from_columns_borrowed(
        ra: &'a [Degree],
        dec: &'a [Degree],
        jd: &'a [JD],
        fid: &'a [u8],
        magpsf: &'a [f64],
        candid: &'a [Candid],
        nid: &'a [Nid],
    ) -> Self {
        Self {
            ra: Cow::Borrowed(ra),
            dec: Cow::Borrowed(dec),
            jd: Cow::Borrowed(jd),
            fid: Cow::Borrowed(fid),
            magpsf: Cow::Borrowed(magpsf),
            candid: Cow::Borrowed(candid),
            nid: Cow::Borrowed(nid),
            ssnamenr: None,
        }
    }

    /// Attach the known object names (one per row).
    pub fn with_ssnamenr(mut self, ssnamenr: Vec<String>) -> Self {
        self.ssnamenr = Some(Cow::Owned(ssnamenr));
        self
    }

    /// Number of rows, taken from the right ascension column.
    pub fn len(&self) -> usize {
        self.ra.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ra.is_empty()
    }

    /// Expand the batch into row-oriented observations.
    ///
    /// Return
    /// ----------
    /// * `Ok(Vec<Observation>)` in row order.
    /// * `Err(LinkError::BatchLengthMismatch)` when a column length differs from `ra`.
    pub fn to_observations(&self) -> Result<Vec<Observation>, LinkError> {
        let expected = self.ra.len();
        let lengths = [
            self.dec.len(),
            self.jd.len(),
            self.fid.len(),
            self.magpsf.len(),
            self.candid.len(),
            self.nid.len(),
            self.ssnamenr.as_ref().map_or(expected, |s| s.len()),
        ];
        if let Some(&got) = lengths.iter().find(|&&l| l != expected) {
            return Err(LinkError::BatchLengthMismatch { expected, got });
        }

        Ok((0..expected)
            .map(|i| Observation {
                ra: self.ra[i],
                dec: self.dec[i],
                jd: self.jd[i],
                fid: self.fid[i],
                magpsf: self.magpsf[i],
                candid: self.candid[i],
                nid: self.nid[i],
                ssnamenr: self.ssnamenr.as_ref().map(|s| s[i].clone()),
            })
            .collect())
    }

    /// Expand the batch and split it per observing night, in increasing night order.
    ///
    /// This is the natural input shape for a multi-night replay: feed each night
    /// to [`night_to_night_association`](crate::associations::night_to_night::night_to_night_association)
    /// in order.
    pub fn split_by_night(&self) -> Result<BTreeMap<Nid, Vec<Observation>>, LinkError> {
        let mut nights: BTreeMap<Nid, Vec<Observation>> = BTreeMap::new();
        for obs in self.to_observations()? {
            nights.entry(obs.nid).or_default().push(obs);
        }
        Ok(nights)
    }
}

#[cfg(test)]
mod batch_reader_test {
    use super::*;

    #[test]
    fn test_length_mismatch() {
        let ra = [1.0, 2.0];
        let dec = [1.0];
        let jd = [2459000.5, 2459000.6];
        let fid = [1, 2];
        let mag = [18.0, 18.5];
        let candid = [1, 2];
        let nid = [0, 0];

        let batch = ObservationBatch::from_columns_borrowed(&ra, &dec, &jd, &fid, &mag, &candid, &nid);
        assert_eq!(
            batch.to_observations(),
            Err(LinkError::BatchLengthMismatch {
                expected: 2,
                got: 1
            })
        );
    }

    #[test]
    fn test_split_by_night() {
        let ra = [1.0, 2.0, 3.0];
        let dec = [1.0, 2.0, 3.0];
        let jd = [2459002.5, 2459000.6, 2459000.7];
        let fid = [1, 2, 1];
        let mag = [18.0, 18.5, 19.0];
        let candid = [1, 2, 3];
        let nid = [2, 0, 0];

        let batch = ObservationBatch::from_columns_borrowed(&ra, &dec, &jd, &fid, &mag, &candid, &nid)
            .with_ssnamenr(vec!["a".into(), "b".into(), "b".into()]);
        let nights = batch.split_by_night().unwrap();

        assert_eq!(nights.keys().copied().collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(nights[&0].len(), 2);
        assert_eq!(nights[&0][1].ssnamenr.as_deref(), Some("b"));
        assert_eq!(nights[&2][0].candid, 1);
    }
}
