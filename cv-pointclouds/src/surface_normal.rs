use crate::DataPointsFilter;
use cv_core::nalgebra::{Matrix3, Point3, Vector3};
use cv_core::{Error, Point, PointCloud, Result};
use float_ord::FloatOrd;
use log::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_pcg::Pcg64;

/// Bins larger than this split into halves of at least three points.
const MIN_KNN: usize = 5;

/// Estimates a surface normal for every region of the cloud and keeps a fraction of the points
/// of each region.
///
/// The cloud is split recursively at the median of its widest axis until every bin holds at
/// most `knn` points. The normal of a bin is the eigenvector belonging to the smallest eigenvalue
/// of the bin's covariance, i.e. the direction in which the bin is flattest. A `ratio` fraction
/// of each bin (at least one point) is kept, and every kept point receives the normal of its bin.
///
/// Bins with fewer than three points do not define a plane and are dropped. With `knn` of at
/// least 5 this only happens to clouds of one or two points.
///
/// Because the bins adapt to the local point density, this also evens out dense and sparse
/// regions, which keeps dense regions from dominating the minimization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingSurfaceNormalDataPointsFilter {
    knn: usize,
    ratio: f64,
    seed: u64,
}

impl SamplingSurfaceNormalDataPointsFilter {
    /// Creates a `SamplingSurfaceNormalDataPointsFilter` with default values.
    ///
    /// Same as calling [`Default::default`].
    pub fn new() -> Self {
        Default::default()
    }

    /// Set the maximum number of points in a bin.
    ///
    /// Must be at least `5`, so that halving a bin never leaves fewer than 3 points. Default is
    /// `7`.
    #[must_use]
    pub fn knn(self, knn: usize) -> Self {
        Self { knn, ..self }
    }

    /// Set the fraction of each bin that is kept.
    ///
    /// Must be in `(0, 1]`. Default is `0.5`.
    #[must_use]
    pub fn ratio(self, ratio: f64) -> Self {
        Self { ratio, ..self }
    }

    /// Set the seed used to pick which points of a bin are kept.
    ///
    /// Default is `0`.
    #[must_use]
    pub fn seed(self, seed: u64) -> Self {
        Self { seed, ..self }
    }

    fn split(
        &self,
        positions: &[Point3<f64>],
        indices: &mut [usize],
        rng: &mut Pcg64,
        out: &mut Vec<Point>,
    ) {
        if indices.len() <= self.knn {
            self.sample_bin(positions, indices, rng, out);
            return;
        }

        let mut min = Vector3::repeat(f64::INFINITY);
        let mut max = Vector3::repeat(f64::NEG_INFINITY);
        for &ix in indices.iter() {
            min = min.inf(&positions[ix].coords);
            max = max.sup(&positions[ix].coords);
        }
        let axis = (max - min).imax();

        let mid = indices.len() / 2;
        indices.select_nth_unstable_by_key(mid, |&ix| FloatOrd(positions[ix][axis]));
        let (left, right) = indices.split_at_mut(mid);
        self.split(positions, left, rng, out);
        self.split(positions, right, rng, out);
    }

    fn sample_bin(
        &self,
        positions: &[Point3<f64>],
        indices: &mut [usize],
        rng: &mut Pcg64,
        out: &mut Vec<Point>,
    ) {
        if indices.len() < 3 {
            trace!(
                "dropping bin of {} points, too small for a normal",
                indices.len()
            );
            return;
        }

        let count = indices.len() as f64;
        let mean = indices
            .iter()
            .map(|&ix| positions[ix].coords)
            .sum::<Vector3<f64>>()
            / count;
        let covariance = indices
            .iter()
            .map(|&ix| {
                let d = positions[ix].coords - mean;
                d * d.transpose()
            })
            .sum::<Matrix3<f64>>()
            / count;

        let eigen = covariance.symmetric_eigen();
        let smallest = eigen.eigenvalues.imin();
        let normal = eigen.eigenvectors.column(smallest).normalize();

        let keep = ((count * self.ratio).ceil() as usize).clamp(1, indices.len());
        indices.shuffle(rng);
        out.extend(
            indices[..keep]
                .iter()
                .map(|&ix| Point::with_normal(positions[ix], normal)),
        );
    }
}

impl Default for SamplingSurfaceNormalDataPointsFilter {
    fn default() -> Self {
        Self {
            knn: 7,
            ratio: 0.5,
            seed: 0,
        }
    }
}

impl DataPointsFilter for SamplingSurfaceNormalDataPointsFilter {
    fn filter(&self, cloud: &PointCloud) -> Result<PointCloud> {
        if self.knn < MIN_KNN {
            return Err(Error::InvalidParameter(format!(
                "surface normal bins need a knn of at least 5, got knn = {}",
                self.knn
            )));
        }
        if !(self.ratio > 0.0 && self.ratio <= 1.0) {
            return Err(Error::InvalidParameter(format!(
                "sampling ratio must be in (0, 1], got {}",
                self.ratio
            )));
        }

        let positions: Vec<Point3<f64>> = cloud.positions().collect();
        let mut indices: Vec<usize> = (0..positions.len()).collect();
        let mut rng = Pcg64::seed_from_u64(self.seed);
        let mut out = Vec::with_capacity(positions.len());
        self.split(&positions, &mut indices, &mut rng, &mut out);
        debug!(
            "surface normal sampling kept {} of {} points",
            out.len(),
            cloud.len()
        );
        Ok(PointCloud::new(out))
    }
}
