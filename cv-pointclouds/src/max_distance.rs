use crate::DataPointsFilter;
use cv_core::{Error, PointCloud, Result};
use log::*;

/// Keeps only the points within `max_dist` of the origin of the cloud's frame.
///
/// Useful to crop away far, sparse returns from range sensors before registration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaxDistDataPointsFilter {
    max_dist: f64,
}

impl MaxDistDataPointsFilter {
    pub fn new(max_dist: f64) -> Self {
        Self { max_dist }
    }

    pub fn max_dist(&self) -> f64 {
        self.max_dist
    }
}

impl DataPointsFilter for MaxDistDataPointsFilter {
    fn filter(&self, cloud: &PointCloud) -> Result<PointCloud> {
        if !(self.max_dist >= 0.0) {
            return Err(Error::InvalidParameter(format!(
                "max_dist must be non-negative, got {}",
                self.max_dist
            )));
        }
        let filtered: PointCloud = cloud
            .points()
            .iter()
            .filter(|p| p.position.coords.norm() <= self.max_dist)
            .copied()
            .collect();
        trace!(
            "max distance filter kept {} of {} points",
            filtered.len(),
            cloud.len()
        );
        Ok(filtered)
    }
}
