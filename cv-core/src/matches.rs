use crate::{Error, Result};
use derive_more::{AsMut, AsRef, Deref, DerefMut, From, Into};
use float_ord::FloatOrd;
use nalgebra::DMatrix;

/// The correspondences found by a matcher.
///
/// Row `i` belongs to point `i` of the reading cloud. Each of the `k` columns holds one
/// candidate in the reference cloud: its index in `ids` and its Euclidean distance in `dists`.
/// `ids` and `dists` always have the same `(num_reading, k)` shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Matches {
    ids: DMatrix<usize>,
    dists: DMatrix<f64>,
}

impl Matches {
    pub fn new(ids: DMatrix<usize>, dists: DMatrix<f64>) -> Result<Self> {
        if ids.shape() != dists.shape() {
            return Err(Error::ShapeMismatch {
                expected: ids.shape(),
                actual: dists.shape(),
            });
        }
        Ok(Self { ids, dists })
    }

    /// Builds a `(n, 1)` correspondence set from one `(reference_id, distance)` per reading point.
    pub fn from_closest(closest: impl IntoIterator<Item = (usize, f64)>) -> Self {
        let (ids, dists): (Vec<usize>, Vec<f64>) = closest.into_iter().unzip();
        Self {
            ids: DMatrix::from_column_slice(ids.len(), 1, &ids),
            dists: DMatrix::from_column_slice(dists.len(), 1, &dists),
        }
    }

    pub fn ids(&self) -> &DMatrix<usize> {
        &self.ids
    }

    pub fn dists(&self) -> &DMatrix<f64> {
        &self.dists
    }

    /// `(num_reading, k)`
    pub fn shape(&self) -> (usize, usize) {
        self.ids.shape()
    }

    pub fn num_reading(&self) -> usize {
        self.ids.nrows()
    }

    /// Number of candidates per reading point.
    pub fn knn(&self) -> usize {
        self.ids.ncols()
    }

    /// The distance below which a `quantile` fraction of all finite distances fall.
    ///
    /// `quantile` must lie in `[0, 1]`. A quantile of `1` returns the largest distance.
    pub fn dists_quantile(&self, quantile: f64) -> Result<f64> {
        if !(0.0..=1.0).contains(&quantile) {
            return Err(Error::InvalidParameter(format!(
                "quantile must be in [0, 1], got {}",
                quantile
            )));
        }
        let mut values: Vec<FloatOrd<f64>> = self
            .dists
            .iter()
            .copied()
            .filter(|d| d.is_finite())
            .map(FloatOrd)
            .collect();
        if values.is_empty() {
            return Err(Error::NoValidMatches);
        }
        let index = ((values.len() as f64 * quantile) as usize).min(values.len() - 1);
        let (_, &mut FloatOrd(value), _) = values.select_nth_unstable(index);
        Ok(value)
    }
}

/// One weight per correspondence, with the same shape as the [`Matches`] it weights.
///
/// A weight of zero removes a correspondence from the minimization. Weights are not required
/// to be normalized.
#[derive(Debug, Clone, PartialEq, AsRef, AsMut, Deref, DerefMut, From, Into)]
pub struct OutlierWeights(pub DMatrix<f64>);

impl OutlierWeights {
    /// Every correspondence gets weight `1`.
    pub fn ones(matches: &Matches) -> Self {
        let (rows, cols) = matches.shape();
        Self(DMatrix::from_element(rows, cols, 1.0))
    }

    /// Fails with [`Error::ShapeMismatch`] unless the weights line up with `matches`.
    pub fn check_shape(&self, matches: &Matches) -> Result<()> {
        if self.0.shape() == matches.shape() {
            Ok(())
        } else {
            Err(Error::ShapeMismatch {
                expected: matches.shape(),
                actual: self.0.shape(),
            })
        }
    }
}
