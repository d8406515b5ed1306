use cv_core::{Error, Matches, OutlierWeights, PointCloud, Result};
use log::*;
use std::sync::Arc;

/// Assigns a weight to every correspondence, down-weighting the ones believed to be spurious.
///
/// The returned weights must have exactly the shape of `matches`. Registration aborts with
/// [`Error::ShapeMismatch`] otherwise.
pub trait OutlierFilter: Send + Sync {
    fn compute(
        &self,
        reading: &PointCloud,
        reference: &PointCloud,
        matches: &Matches,
    ) -> Result<OutlierWeights>;
}

impl<F: OutlierFilter + ?Sized> OutlierFilter for Box<F> {
    fn compute(
        &self,
        reading: &PointCloud,
        reference: &PointCloud,
        matches: &Matches,
    ) -> Result<OutlierWeights> {
        (**self).compute(reading, reference, matches)
    }
}

impl<F: OutlierFilter + ?Sized> OutlierFilter for Arc<F> {
    fn compute(
        &self,
        reading: &PointCloud,
        reference: &PointCloud,
        matches: &Matches,
    ) -> Result<OutlierWeights> {
        (**self).compute(reading, reference, matches)
    }
}

/// Gives every correspondence a weight of `1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NullOutlierFilter;

impl OutlierFilter for NullOutlierFilter {
    fn compute(
        &self,
        _reading: &PointCloud,
        _reference: &PointCloud,
        matches: &Matches,
    ) -> Result<OutlierWeights> {
        Ok(OutlierWeights::ones(matches))
    }
}

/// Keeps the `ratio` fraction of correspondences with the smallest distances.
///
/// Kept correspondences get weight `1`, the rest `0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimmedDistOutlierFilter {
    ratio: f64,
}

impl TrimmedDistOutlierFilter {
    /// Creates a `TrimmedDistOutlierFilter` with default values.
    ///
    /// Same as calling [`Default::default`].
    pub fn new() -> Self {
        Default::default()
    }

    /// Set the fraction of correspondences that is kept.
    ///
    /// Must be in `(0, 1]`. Default is `0.85`.
    #[must_use]
    pub fn ratio(self, ratio: f64) -> Self {
        Self { ratio }
    }
}

impl Default for TrimmedDistOutlierFilter {
    fn default() -> Self {
        Self { ratio: 0.85 }
    }
}

impl OutlierFilter for TrimmedDistOutlierFilter {
    fn compute(
        &self,
        _reading: &PointCloud,
        _reference: &PointCloud,
        matches: &Matches,
    ) -> Result<OutlierWeights> {
        if !(self.ratio > 0.0 && self.ratio <= 1.0) {
            return Err(Error::InvalidParameter(format!(
                "trimmed ratio must be in (0, 1], got {}",
                self.ratio
            )));
        }
        let limit = matches.dists_quantile(self.ratio)?;
        trace!("trimming matches farther than {}", limit);
        Ok(OutlierWeights(
            matches.dists().map(|d| if d <= limit { 1.0 } else { 0.0 }),
        ))
    }
}

/// Rejects correspondences farther apart than `max_dist`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaxDistOutlierFilter {
    max_dist: f64,
}

impl MaxDistOutlierFilter {
    pub fn new(max_dist: f64) -> Self {
        Self { max_dist }
    }
}

impl OutlierFilter for MaxDistOutlierFilter {
    fn compute(
        &self,
        _reading: &PointCloud,
        _reference: &PointCloud,
        matches: &Matches,
    ) -> Result<OutlierWeights> {
        if !(self.max_dist >= 0.0) {
            return Err(Error::InvalidParameter(format!(
                "max_dist must be non-negative, got {}",
                self.max_dist
            )));
        }
        Ok(OutlierWeights(matches.dists().map(|d| {
            if d <= self.max_dist {
                1.0
            } else {
                0.0
            }
        })))
    }
}

/// Multiplies the weights of several outlier filters together.
///
/// An empty chain behaves like [`NullOutlierFilter`].
#[derive(Default)]
pub struct OutlierFilters {
    filters: Vec<Box<dyn OutlierFilter>>,
}

impl OutlierFilters {
    pub fn new() -> Self {
        Default::default()
    }

    #[must_use]
    pub fn push(mut self, filter: impl OutlierFilter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }
}

impl OutlierFilter for OutlierFilters {
    fn compute(
        &self,
        reading: &PointCloud,
        reference: &PointCloud,
        matches: &Matches,
    ) -> Result<OutlierWeights> {
        let mut weights = OutlierWeights::ones(matches);
        for filter in &self.filters {
            let next = filter.compute(reading, reference, matches)?;
            next.check_shape(matches)?;
            weights.0.component_mul_assign(&next.0);
        }
        Ok(weights)
    }
}
