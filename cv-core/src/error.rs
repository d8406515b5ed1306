use thiserror::Error;

/// Errors produced while filtering, matching or registering point clouds.
///
/// The first group are precondition violations: registration cannot produce a meaningful
/// transform and aborts immediately. The second group are failures reported by a collaborator
/// (matcher, outlier filter, minimizer, filter). These are handed back to the caller untouched.
#[derive(Debug, Error)]
pub enum Error {
    /// A point cloud had no points where at least one is required.
    #[error("point cloud `{0}` is empty")]
    EmptyPointCloud(&'static str),
    /// The outlier weights do not have the same shape as the matches they weight.
    #[error("expected a table of shape {expected:?} but got shape {actual:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },
    /// A point cloud contained a NaN or infinite position or normal.
    #[error("point cloud `{0}` contains non-finite coordinates")]
    NonFinitePoint(&'static str),
    /// A transform contained a NaN or infinite component.
    #[error("transform contains non-finite values")]
    NonFiniteTransform,
    /// An operation needed surface normals that the point cloud does not carry.
    #[error("point cloud `{0}` has no surface normals")]
    MissingNormals(&'static str),
    /// A configuration value is out of its valid range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// No correspondence carried a positive weight, so there is nothing to minimize.
    #[error("no match carries a positive weight")]
    NoValidMatches,
    /// The least squares system of an error minimizer could not be solved.
    #[error("least squares system is singular")]
    SingularSystem,
    /// An error raised by a user supplied collaborator.
    #[error(transparent)]
    Collaborator(#[from] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T> = core::result::Result<T, Error>;
