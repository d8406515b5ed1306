use cv_core::nalgebra::{DMatrix, Point3};
use cv_core::{Error, Matches, PointCloud, Result};
use log::*;
use rstar::primitives::GeomWithData;
use rstar::RTree;
use std::sync::Arc;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Finds, for every point of a reading cloud, its closest points in the reference cloud the
/// matcher was built from.
pub trait Matcher: Send + Sync {
    fn find_closests(&self, reading: &PointCloud) -> Result<Matches>;
}

/// Builds a [`Matcher`] for one reference cloud.
///
/// Registration calls this once per registration, after the reference cloud has been filtered
/// and recentered. The matcher is then queried once per iteration.
pub trait MatcherFactory: Send + Sync {
    fn construct(&self, reference: &PointCloud) -> Result<Box<dyn Matcher>>;
}

impl<F: MatcherFactory + ?Sized> MatcherFactory for Box<F> {
    fn construct(&self, reference: &PointCloud) -> Result<Box<dyn Matcher>> {
        (**self).construct(reference)
    }
}

impl<F: MatcherFactory + ?Sized> MatcherFactory for Arc<F> {
    fn construct(&self, reference: &PointCloud) -> Result<Box<dyn Matcher>> {
        (**self).construct(reference)
    }
}

/// Creates a [`KdTreeMatcher`] for every reference cloud.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdTreeMatcherFactory {
    knn: usize,
}

impl KdTreeMatcherFactory {
    /// Creates a `KdTreeMatcherFactory` with default values.
    ///
    /// Same as calling [`Default::default`].
    pub fn new() -> Self {
        Default::default()
    }

    /// Set the number of neighbors found for every reading point.
    ///
    /// Default is `1`.
    #[must_use]
    pub fn knn(self, knn: usize) -> Self {
        Self { knn }
    }
}

impl Default for KdTreeMatcherFactory {
    fn default() -> Self {
        Self { knn: 1 }
    }
}

impl MatcherFactory for KdTreeMatcherFactory {
    fn construct(&self, reference: &PointCloud) -> Result<Box<dyn Matcher>> {
        Ok(Box::new(KdTreeMatcher::new(reference, self.knn)?))
    }
}

type IndexedPoint = GeomWithData<[f64; 3], usize>;

/// Exact `knn` nearest neighbor search in a spatial tree over the reference positions.
///
/// Distances in the resulting [`Matches`] are Euclidean, sorted from closest to farthest
/// along each row.
pub struct KdTreeMatcher {
    tree: RTree<IndexedPoint>,
    knn: usize,
}

impl KdTreeMatcher {
    pub fn new(reference: &PointCloud, knn: usize) -> Result<Self> {
        if reference.is_empty() {
            return Err(Error::EmptyPointCloud("reference"));
        }
        if !reference.is_finite() {
            return Err(Error::NonFinitePoint("reference"));
        }
        if knn == 0 || knn > reference.len() {
            return Err(Error::InvalidParameter(format!(
                "knn must be in [1, {}], got {}",
                reference.len(),
                knn
            )));
        }
        let points = reference
            .positions()
            .enumerate()
            .map(|(ix, p)| IndexedPoint::new(p.coords.into(), ix))
            .collect();
        trace!("building spatial tree over {} points", reference.len());
        Ok(Self {
            tree: RTree::bulk_load(points),
            knn,
        })
    }

    fn nearest(&self, position: &Point3<f64>) -> Vec<(usize, f64)> {
        let query: [f64; 3] = position.coords.into();
        self.tree
            .nearest_neighbor_iter_with_distance_2(&query)
            .take(self.knn)
            .map(|(neighbor, distance_2)| (neighbor.data, distance_2.sqrt()))
            .collect()
    }
}

impl Matcher for KdTreeMatcher {
    fn find_closests(&self, reading: &PointCloud) -> Result<Matches> {
        #[cfg(feature = "rayon")]
        let neighbors: Vec<Vec<(usize, f64)>> = reading
            .points()
            .par_iter()
            .map(|p| self.nearest(&p.position))
            .collect();
        #[cfg(not(feature = "rayon"))]
        let neighbors: Vec<Vec<(usize, f64)>> = reading
            .points()
            .iter()
            .map(|p| self.nearest(&p.position))
            .collect();

        let rows = neighbors.len();
        let ids = DMatrix::from_fn(rows, self.knn, |r, c| neighbors[r][c].0);
        let dists = DMatrix::from_fn(rows, self.knn, |r, c| neighbors[r][c].1);
        Matches::new(ids, dists)
    }
}
