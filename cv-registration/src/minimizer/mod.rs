//! Error minimizers compute the rigid transform that best moves a reading cloud onto its
//! weighted correspondences in the reference cloud.

mod point_to_plane;
mod point_to_point;

pub use point_to_plane::*;
pub use point_to_point::*;

use cv_core::nalgebra::{Point3, Vector3};
use cv_core::{Error, Matches, OutlierWeights, PointCloud, Result, RigidTransform};
use std::sync::Arc;

/// Computes the increment that aligns `reading` with its matches in `reference`.
///
/// Both clouds are expressed in the same frame. The returned transform moves reading points
/// towards the reference: `reference ≈ T(reading)`.
pub trait ErrorMinimizer: Send + Sync {
    fn compute(
        &self,
        reading: &PointCloud,
        reference: &PointCloud,
        weights: &OutlierWeights,
        matches: &Matches,
    ) -> Result<RigidTransform>;
}

impl<M: ErrorMinimizer + ?Sized> ErrorMinimizer for Box<M> {
    fn compute(
        &self,
        reading: &PointCloud,
        reference: &PointCloud,
        weights: &OutlierWeights,
        matches: &Matches,
    ) -> Result<RigidTransform> {
        (**self).compute(reading, reference, weights, matches)
    }
}

impl<M: ErrorMinimizer + ?Sized> ErrorMinimizer for Arc<M> {
    fn compute(
        &self,
        reading: &PointCloud,
        reference: &PointCloud,
        weights: &OutlierWeights,
        matches: &Matches,
    ) -> Result<RigidTransform> {
        (**self).compute(reading, reference, weights, matches)
    }
}

/// The correspondences that take part in a minimization, flattened into parallel arrays.
///
/// Only correspondences with a strictly positive weight are kept. Entry `i` of every array
/// belongs to the same correspondence.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorElements {
    pub reading: Vec<Point3<f64>>,
    pub reference: Vec<Point3<f64>>,
    /// Normals of the matched reference points, if the reference has normals.
    pub normals: Option<Vec<Vector3<f64>>>,
    pub weights: Vec<f64>,
}

impl ErrorElements {
    pub fn new(
        reading: &PointCloud,
        reference: &PointCloud,
        weights: &OutlierWeights,
        matches: &Matches,
    ) -> Result<Self> {
        weights.check_shape(matches)?;
        if matches.num_reading() != reading.len() {
            return Err(Error::ShapeMismatch {
                expected: (reading.len(), matches.knn()),
                actual: matches.shape(),
            });
        }

        let mut elements = Self {
            reading: vec![],
            reference: vec![],
            normals: reference.has_normals().then(Vec::new),
            weights: vec![],
        };
        for (row, point) in reading.points().iter().enumerate() {
            for col in 0..matches.knn() {
                let weight = weights.0[(row, col)];
                // Also skips NaN.
                if !(weight > 0.0) {
                    continue;
                }
                let id = matches.ids()[(row, col)];
                let target = reference.points().get(id).ok_or_else(|| {
                    Error::InvalidParameter(format!(
                        "match refers to point {} of a reference with {} points",
                        id,
                        reference.len()
                    ))
                })?;
                elements.reading.push(point.position);
                elements.reference.push(target.position);
                if let (Some(normals), Some(normal)) = (&mut elements.normals, target.normal) {
                    normals.push(normal);
                }
                elements.weights.push(weight);
            }
        }

        if elements.weights.is_empty() {
            return Err(Error::NoValidMatches);
        }
        Ok(elements)
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn total_weight(&self) -> f64 {
        self.weights.iter().sum()
    }
}
