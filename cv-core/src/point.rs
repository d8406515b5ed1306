use crate::RigidTransform;
use nalgebra::{Point3, Vector3};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// A sample of a surface: its position and, if known, the surface normal at that position.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Point {
    pub position: Point3<f64>,
    pub normal: Option<Vector3<f64>>,
}

impl Point {
    pub fn new(position: Point3<f64>) -> Self {
        Self {
            position,
            normal: None,
        }
    }

    pub fn with_normal(position: Point3<f64>, normal: Vector3<f64>) -> Self {
        Self {
            position,
            normal: Some(normal),
        }
    }

    /// Checks that the position and the normal, if any, have only finite components.
    pub fn is_finite(&self) -> bool {
        self.position.iter().all(|n| n.is_finite())
            && self
                .normal
                .map_or(true, |normal| normal.iter().all(|n| n.is_finite()))
    }

    /// Applies `transform` to the position and rotates the normal.
    #[must_use]
    pub fn transformed(&self, transform: &RigidTransform) -> Self {
        Self {
            position: transform.apply(&self.position),
            normal: self.normal.map(|n| transform.apply_to_direction(&n)),
        }
    }
}

/// An ordered collection of [`Point`].
///
/// The index of a point is its identity in [`Matches`](crate::Matches) and
/// [`OutlierWeights`](crate::OutlierWeights). Apart from that, the order carries no meaning.
///
/// The cloud tracks whether it carries normals: [`PointCloud::has_normals`] is `true` only when
/// the cloud is non-empty and every point has a normal. Fields are private so that the flag can't
/// drift from the points.
///
/// All operations return new clouds. Nothing in the registration pipeline modifies a cloud
/// it was handed.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct PointCloud {
    points: Vec<Point>,
    has_normals: bool,
}

impl PointCloud {
    pub fn new(points: Vec<Point>) -> Self {
        let has_normals = !points.is_empty() && points.iter().all(|p| p.normal.is_some());
        Self {
            points,
            has_normals,
        }
    }

    /// Creates a cloud without normals.
    pub fn from_positions(positions: impl IntoIterator<Item = Point3<f64>>) -> Self {
        positions.into_iter().map(Point::new).collect()
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn into_points(self) -> Vec<Point> {
        self.points
    }

    pub fn positions(&self) -> impl Iterator<Item = Point3<f64>> + '_ {
        self.points.iter().map(|p| p.position)
    }

    pub fn has_normals(&self) -> bool {
        self.has_normals
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Checks that every point is finite. See [`Point::is_finite`].
    pub fn is_finite(&self) -> bool {
        self.points.iter().all(Point::is_finite)
    }

    /// The centroid of all positions, or `None` for an empty cloud.
    pub fn mean(&self) -> Option<Point3<f64>> {
        if self.points.is_empty() {
            return None;
        }
        let sum: Vector3<f64> = self.points.iter().map(|p| p.position.coords).sum();
        Some(Point3::from(sum / self.points.len() as f64))
    }

    /// Applies `transform` to every position and rotates every normal.
    #[must_use]
    pub fn transformed(&self, transform: &RigidTransform) -> Self {
        Self {
            points: self.points.iter().map(|p| p.transformed(transform)).collect(),
            has_normals: self.has_normals,
        }
    }

    /// Shifts every position by `offset`. Normals are left untouched.
    #[must_use]
    pub fn translated(&self, offset: &Vector3<f64>) -> Self {
        Self {
            points: self
                .points
                .iter()
                .map(|p| Point {
                    position: p.position + offset,
                    normal: p.normal,
                })
                .collect(),
            has_normals: self.has_normals,
        }
    }
}

impl FromIterator<Point> for PointCloud {
    fn from_iter<I: IntoIterator<Item = Point>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl From<Vec<Point>> for PointCloud {
    fn from(points: Vec<Point>) -> Self {
        Self::new(points)
    }
}
