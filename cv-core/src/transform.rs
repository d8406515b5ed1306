use core::ops::Mul;
use derive_more::{AsMut, AsRef, From, Into};
use nalgebra::{Isometry3, Point3, Translation3, UnitQuaternion, Vector3};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// A rigid (distance preserving) transformation: a rotation followed by a translation.
///
/// `T(x) = R * x + t`
///
/// The rotation is stored as a unit quaternion. Every operation in this type that produces
/// a new rotation renormalizes it, so the quaternion stays unit length even after thousands of
/// compositions.
///
/// Transforms are plain values. Operations never mutate `self`; they return a new transform.
#[derive(Debug, Clone, Copy, PartialEq, AsMut, AsRef, From, Into)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct RigidTransform(pub Isometry3<f64>);

impl RigidTransform {
    /// Creates a transform with no rotation and no translation.
    pub fn identity() -> Self {
        Self(Isometry3::identity())
    }

    /// Create the transform from translation and rotation.
    pub fn from_parts(translation: Vector3<f64>, rotation: UnitQuaternion<f64>) -> Self {
        Self(Isometry3::from_parts(
            Translation3::from(translation),
            rotation,
        ))
    }

    /// A pure translation.
    pub fn from_translation(translation: Vector3<f64>) -> Self {
        Self::from_parts(translation, UnitQuaternion::identity())
    }

    /// A pure rotation about the origin.
    pub fn from_rotation(rotation: UnitQuaternion<f64>) -> Self {
        Self::from_parts(Vector3::zeros(), rotation)
    }

    /// Retrieve the isometry.
    pub fn isometry(self) -> Isometry3<f64> {
        self.0
    }

    pub fn translation(&self) -> Vector3<f64> {
        self.0.translation.vector
    }

    pub fn rotation(&self) -> UnitQuaternion<f64> {
        self.0.rotation
    }

    /// The rotation angle in radians, in `[0, pi]`.
    pub fn angle(&self) -> f64 {
        self.0.rotation.angle()
    }

    /// Transforms a position: `R * x + t`.
    #[inline(always)]
    pub fn apply(&self, point: &Point3<f64>) -> Point3<f64> {
        self.0.rotation * point + self.0.translation.vector
    }

    /// Transforms a direction such as a surface normal: `R * n`.
    ///
    /// The translation does not affect directions.
    #[inline(always)]
    pub fn apply_to_direction(&self, direction: &Vector3<f64>) -> Vector3<f64> {
        self.0.rotation * direction
    }

    /// Returns the transform `x -> self(rhs(x))`.
    ///
    /// The rotation is `R1 * R2` and the translation is `R1 * t2 + t1`.
    /// Composition is associative but not commutative.
    #[must_use]
    pub fn compose(self, rhs: Self) -> Self {
        let rotation = self.0.rotation.into_inner() * rhs.0.rotation.into_inner();
        let translation = self.0.rotation * rhs.0.translation.vector + self.0.translation.vector;
        Self::from_parts(translation, UnitQuaternion::new_normalize(rotation))
    }

    /// Takes the inverse of the transform: `(R^-1, -R^-1 * t)`.
    #[must_use]
    pub fn inverse(self) -> Self {
        let rotation = self.0.rotation.inverse();
        Self::from_parts(-(rotation * self.0.translation.vector), rotation)
    }

    /// Rebuilds the rotation from its normalized quaternion.
    ///
    /// Only needed for transforms assembled from raw quaternions with
    /// [`UnitQuaternion::new_unchecked`].
    #[must_use]
    pub fn renormalize(self) -> Self {
        Self::from_parts(
            self.translation(),
            UnitQuaternion::new_normalize(self.0.rotation.into_inner()),
        )
    }

    /// Checks that every rotation and translation component is finite.
    pub fn is_finite(&self) -> bool {
        self.0.translation.vector.iter().all(|n| n.is_finite())
            && self.0.rotation.coords.iter().all(|n| n.is_finite())
    }
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::identity()
    }
}

/// `a * b` is [`RigidTransform::compose`]: apply `b` first, then `a`.
impl Mul for RigidTransform {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        self.compose(rhs)
    }
}
