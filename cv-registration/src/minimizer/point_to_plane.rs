use super::{ErrorElements, ErrorMinimizer};
use cv_core::nalgebra::{Matrix6, UnitQuaternion, Vector3, Vector6};
use cv_core::{Error, Matches, OutlierWeights, PointCloud, Result, RigidTransform};
use log::*;

/// Minimizes the weighted sum of squared distances between reading points and the tangent
/// planes of their matched reference points.
///
/// The rotation is linearized around identity (`R ≈ I + [ω]×`), which turns the problem into a
/// 6x6 linear least squares system in `(ω, t)` that is solved through its normal equations.
/// The reference cloud must carry normals.
///
/// Because sliding along the surface costs nothing, this converges much faster than
/// [`PointToPointErrorMinimizer`](super::PointToPointErrorMinimizer) on smooth surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PointToPlaneErrorMinimizer;

impl PointToPlaneErrorMinimizer {
    pub fn new() -> Self {
        Self
    }

    pub fn solve(elements: &ErrorElements) -> Result<RigidTransform> {
        let normals = elements
            .normals
            .as_ref()
            .ok_or(Error::MissingNormals("reference"))?;

        let mut ata = Matrix6::<f64>::zeros();
        let mut atb = Vector6::<f64>::zeros();
        for (((p, q), n), &w) in elements
            .reading
            .iter()
            .zip(&elements.reference)
            .zip(normals)
            .zip(&elements.weights)
        {
            let c = p.coords.cross(n);
            let a = Vector6::new(c.x, c.y, c.z, n.x, n.y, n.z);
            let b = (q - p).dot(n);
            ata += a * a.transpose() * w;
            atb += a * (b * w);
        }

        let x = ata.cholesky().ok_or(Error::SingularSystem)?.solve(&atb);
        if !x.iter().all(|v| v.is_finite()) {
            return Err(Error::SingularSystem);
        }
        trace!("point to plane solution {}", x.transpose());

        let rotation = UnitQuaternion::from_scaled_axis(Vector3::new(x[0], x[1], x[2]));
        let translation = Vector3::new(x[3], x[4], x[5]);
        Ok(RigidTransform::from_parts(translation, rotation))
    }
}

impl ErrorMinimizer for PointToPlaneErrorMinimizer {
    fn compute(
        &self,
        reading: &PointCloud,
        reference: &PointCloud,
        weights: &OutlierWeights,
        matches: &Matches,
    ) -> Result<RigidTransform> {
        if !reference.has_normals() {
            return Err(Error::MissingNormals("reference"));
        }
        let elements = ErrorElements::new(reading, reference, weights, matches)?;
        Self::solve(&elements)
    }
}
