//! Rust CV Point Clouds
//!
//! Preprocessing filters applied to point clouds before registration.
//!
//! Every filter implements [`DataPointsFilter`], which takes a cloud by reference and returns a
//! new cloud. Filters never modify their input. Filters can be chained with
//! [`DataPointsFilters`], which applies them in order.
//!
//! * [`IdentityDataPointsFilter`] - returns a copy of the input
//! * [`RandomSamplingDataPointsFilter`] - keeps each point with a fixed probability
//! * [`MaxDistDataPointsFilter`] - drops points far from the origin
//! * [`SamplingSurfaceNormalDataPointsFilter`] - estimates surface normals and subsamples

mod max_distance;
mod random_sampling;
mod surface_normal;

pub use max_distance::*;
pub use random_sampling::*;
pub use surface_normal::*;

use cv_core::{PointCloud, Result};
use std::sync::Arc;

/// A preprocessing step that turns one point cloud into another.
pub trait DataPointsFilter: Send + Sync {
    fn filter(&self, cloud: &PointCloud) -> Result<PointCloud>;
}

impl<F: DataPointsFilter + ?Sized> DataPointsFilter for Box<F> {
    fn filter(&self, cloud: &PointCloud) -> Result<PointCloud> {
        (**self).filter(cloud)
    }
}

impl<F: DataPointsFilter + ?Sized> DataPointsFilter for Arc<F> {
    fn filter(&self, cloud: &PointCloud) -> Result<PointCloud> {
        (**self).filter(cloud)
    }
}

/// Passes the cloud through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IdentityDataPointsFilter;

impl DataPointsFilter for IdentityDataPointsFilter {
    fn filter(&self, cloud: &PointCloud) -> Result<PointCloud> {
        Ok(cloud.clone())
    }
}

/// Applies a sequence of filters, feeding each one the output of the previous.
///
/// An empty chain behaves like [`IdentityDataPointsFilter`].
#[derive(Default)]
pub struct DataPointsFilters {
    filters: Vec<Box<dyn DataPointsFilter>>,
}

impl DataPointsFilters {
    pub fn new() -> Self {
        Default::default()
    }

    /// Appends a filter to the end of the chain.
    #[must_use]
    pub fn push(mut self, filter: impl DataPointsFilter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl DataPointsFilter for DataPointsFilters {
    fn filter(&self, cloud: &PointCloud) -> Result<PointCloud> {
        let mut filters = self.filters.iter();
        let mut current = match filters.next() {
            Some(first) => first.filter(cloud)?,
            None => return Ok(cloud.clone()),
        };
        for filter in filters {
            current = filter.filter(&current)?;
        }
        Ok(current)
    }
}
