//! # Rust CV Core
//!
//! This library provides the common types used by the point cloud registration crates in this
//! workspace. Every crate that filters, matches or aligns point clouds depends on this crate, so
//! that filters, matchers, outlier filters and error minimizers written independently can be
//! plugged into the same registration pipeline.
//!
//! The crate is deliberately small. It contains:
//!
//! * [`RigidTransform`] - a rotation (unit quaternion) followed by a translation, together with
//!   the composition and inversion rules that every registration component relies on
//! * [`Point`] and [`PointCloud`] - positions with optional surface normals
//! * [`Matches`] and [`OutlierWeights`] - the correspondence set produced by a matcher and the
//!   weight table produced by an outlier filter, which always share a shape
//! * [`Error`] - the error type shared by all registration components
//!
//! ## Frames
//!
//! A [`RigidTransform`] named `T_a_b` maps coordinates expressed in frame `b` into frame `a`.
//! Composition reads right to left, exactly like function application:
//!
//! ```
//! use cv_core::nalgebra::{Point3, UnitQuaternion, Vector3};
//! use cv_core::RigidTransform;
//!
//! let t_world_robot = RigidTransform::from_translation(Vector3::new(1.0, 0.0, 0.0));
//! let t_robot_sensor = RigidTransform::from_rotation(UnitQuaternion::from_euler_angles(0.0, 0.0, 0.5));
//! let t_world_sensor = t_world_robot * t_robot_sensor;
//!
//! let p = Point3::new(0.2, 0.3, 0.4);
//! let expected = t_world_robot.apply(&t_robot_sensor.apply(&p));
//! assert!((t_world_sensor.apply(&p) - expected).norm() < 1e-12);
//! ```

mod error;
mod matches;
mod point;
mod transform;

pub use error::*;
pub use matches::*;
pub use nalgebra;
pub use point::*;
pub use transform::*;
