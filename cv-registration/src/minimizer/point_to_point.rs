use super::{ErrorElements, ErrorMinimizer};
use cv_core::nalgebra::{Matrix3, Point3, Rotation3, UnitQuaternion, Vector3};
use cv_core::{Error, Matches, OutlierWeights, PointCloud, Result, RigidTransform};

/// Minimizes the weighted sum of squared distances between matched points.
///
/// This has a closed form solution (Kabsch): the rotation comes from the SVD of the weighted
/// cross-covariance of the two centered point sets, and the translation moves the rotated
/// reading centroid onto the reference centroid. Reflections are corrected so the result is
/// always a proper rotation.
///
/// Converges in a single step when the correspondences are exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PointToPointErrorMinimizer;

impl PointToPointErrorMinimizer {
    pub fn new() -> Self {
        Self
    }

    pub fn solve(elements: &ErrorElements) -> Result<RigidTransform> {
        let total = elements.total_weight();
        if !(total > 0.0) {
            return Err(Error::NoValidMatches);
        }

        let reading_mean = weighted_mean(&elements.reading, &elements.weights) / total;
        let reference_mean = weighted_mean(&elements.reference, &elements.weights) / total;

        let covariance: Matrix3<f64> = elements
            .reading
            .iter()
            .zip(&elements.reference)
            .zip(&elements.weights)
            .map(|((p, q), &w)| {
                (p.coords - reading_mean) * (q.coords - reference_mean).transpose() * w
            })
            .sum();

        let svd = covariance.svd(true, true);
        let u = svd.u.ok_or(Error::SingularSystem)?;
        let mut v = svd.v_t.ok_or(Error::SingularSystem)?.transpose();
        if (v * u.transpose()).determinant() < 0.0 {
            // Flip the axis of least variance to turn the reflection into a rotation.
            let smallest = svd.singular_values.imin();
            v.column_mut(smallest).neg_mut();
        }
        let rotation = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(
            v * u.transpose(),
        ));
        let translation = reference_mean - rotation * reading_mean;
        Ok(RigidTransform::from_parts(translation, rotation))
    }
}

fn weighted_mean(points: &[Point3<f64>], weights: &[f64]) -> Vector3<f64> {
    points
        .iter()
        .zip(weights)
        .map(|(p, &w)| p.coords * w)
        .sum()
}

impl ErrorMinimizer for PointToPointErrorMinimizer {
    fn compute(
        &self,
        reading: &PointCloud,
        reference: &PointCloud,
        weights: &OutlierWeights,
        matches: &Matches,
    ) -> Result<RigidTransform> {
        let elements = ErrorElements::new(reading, reference, weights, matches)?;
        Self::solve(&elements)
    }
}
