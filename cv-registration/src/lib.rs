//! # Rust CV Registration
//!
//! Rigid registration of 3d point clouds with the iterative closest point (ICP) algorithm.
//!
//! Given a *reading* cloud, a *reference* cloud and an initial guess of the transform that maps
//! reading coordinates into reference coordinates, [`Icp`] refines the guess by repeatedly:
//!
//! 1. matching every reading point to its closest reference points ([`Matcher`])
//! 2. weighting the matches to suppress outliers ([`OutlierFilter`])
//! 3. solving for the rigid increment that best aligns the weighted matches ([`ErrorMinimizer`])
//!
//! until a [`TransformationChecker`] decides to stop. Before iterating, both clouds are
//! preprocessed with a [`DataPointsFilter`] and moved into a frame centered on the reference
//! centroid, which keeps the minimization well conditioned far from the origin.
//!
//! Every stage is a trait object that can be replaced. The defaults are built from
//! [`IcpSettings`].
//!
//! ```
//! use cv_core::nalgebra::{Point3, Vector3};
//! use cv_core::{PointCloud, RigidTransform};
//! use cv_pointclouds::IdentityDataPointsFilter;
//! use cv_registration::{Icp, NullOutlierFilter, PointToPointErrorMinimizer};
//!
//! let reading = PointCloud::from_positions(
//!     (0..8).map(|i| Point3::new((i & 1) as f64, ((i >> 1) & 1) as f64, (i >> 2) as f64)),
//! );
//! let reference = reading.translated(&Vector3::new(0.1, 0.0, 0.0));
//!
//! let icp = Icp::new()
//!     .reading_filter(IdentityDataPointsFilter)
//!     .reference_filter(IdentityDataPointsFilter)
//!     .outlier_filter(NullOutlierFilter)
//!     .error_minimizer(PointToPointErrorMinimizer);
//! let transform = icp
//!     .register(&reading, &reference, RigidTransform::identity())
//!     .unwrap();
//! assert!((transform.translation() - Vector3::new(0.1, 0.0, 0.0)).norm() < 1e-9);
//! ```

mod checker;
mod inspector;
mod matcher;
mod minimizer;
mod outlier;
mod settings;

pub use checker::*;
pub use inspector::*;
pub use matcher::*;
pub use minimizer::*;
pub use outlier::*;
pub use settings::*;

pub use cv_pointclouds::DataPointsFilter;

use cv_core::{Error, PointCloud, Result, RigidTransform};
use cv_pointclouds::{RandomSamplingDataPointsFilter, SamplingSurfaceNormalDataPointsFilter};
use log::*;

/// The outcome of a successful registration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IcpResult {
    /// Maps reading coordinates into reference coordinates.
    pub transform: RigidTransform,
    /// The number of match/minimize passes that ran. Always at least `1`.
    pub iterations: usize,
    /// Why iterating stopped, if the checker reports it.
    pub termination: Option<Termination>,
}

/// An iterative closest point registration pipeline.
///
/// `Icp` only holds configuration. Registering takes `&self`, so one pipeline can run any number
/// of independent registrations, including concurrently from several threads.
pub struct Icp {
    reading_filter: Box<dyn DataPointsFilter>,
    reference_filter: Box<dyn DataPointsFilter>,
    matcher_factory: Box<dyn MatcherFactory>,
    outlier_filter: Box<dyn OutlierFilter>,
    error_minimizer: Box<dyn ErrorMinimizer>,
    checker_factory: Box<dyn TransformationCheckerFactory>,
    inspector: Box<dyn Inspector>,
}

impl Icp {
    /// Creates an `Icp` with the default pipeline.
    ///
    /// Same as calling [`Default::default`].
    pub fn new() -> Self {
        Default::default()
    }

    /// Creates the default pipeline, parameterized by `settings`.
    ///
    /// * reading: [`RandomSamplingDataPointsFilter`]
    /// * reference: [`SamplingSurfaceNormalDataPointsFilter`]
    /// * [`KdTreeMatcherFactory`]
    /// * [`TrimmedDistOutlierFilter`]
    /// * [`PointToPlaneErrorMinimizer`]
    /// * [`DefaultTransformationChecker`]
    /// * [`NoOpInspector`]
    pub fn from_settings(settings: &IcpSettings) -> Self {
        Self {
            reading_filter: Box::new(
                RandomSamplingDataPointsFilter::new()
                    .prob(settings.reading_sampling_prob)
                    .seed(settings.seed),
            ),
            reference_filter: Box::new(
                SamplingSurfaceNormalDataPointsFilter::new()
                    .knn(settings.reference_normal_knn)
                    .ratio(settings.reference_sampling_ratio)
                    .seed(settings.seed),
            ),
            matcher_factory: Box::new(KdTreeMatcherFactory::new().knn(settings.knn)),
            outlier_filter: Box::new(TrimmedDistOutlierFilter::new().ratio(settings.trimmed_ratio)),
            error_minimizer: Box::new(PointToPlaneErrorMinimizer),
            checker_factory: Box::new(
                DefaultTransformationChecker::new()
                    .max_iterations(settings.max_iterations)
                    .min_diff_rot_err(settings.min_diff_rot_err)
                    .min_diff_trans_err(settings.min_diff_trans_err)
                    .smooth_length(settings.smooth_length),
            ),
            inspector: Box::new(NoOpInspector),
        }
    }

    /// Set the filter applied to the reading cloud before registering.
    #[must_use]
    pub fn reading_filter(self, filter: impl DataPointsFilter + 'static) -> Self {
        Self {
            reading_filter: Box::new(filter),
            ..self
        }
    }

    /// Set the filter applied to the reference cloud before registering.
    ///
    /// If the error minimizer needs normals, this filter must produce them.
    #[must_use]
    pub fn reference_filter(self, filter: impl DataPointsFilter + 'static) -> Self {
        Self {
            reference_filter: Box::new(filter),
            ..self
        }
    }

    #[must_use]
    pub fn matcher_factory(self, matcher_factory: impl MatcherFactory + 'static) -> Self {
        Self {
            matcher_factory: Box::new(matcher_factory),
            ..self
        }
    }

    #[must_use]
    pub fn outlier_filter(self, outlier_filter: impl OutlierFilter + 'static) -> Self {
        Self {
            outlier_filter: Box::new(outlier_filter),
            ..self
        }
    }

    #[must_use]
    pub fn error_minimizer(self, error_minimizer: impl ErrorMinimizer + 'static) -> Self {
        Self {
            error_minimizer: Box::new(error_minimizer),
            ..self
        }
    }

    /// Set the factory of the checker that decides when to stop.
    ///
    /// Any cloneable [`TransformationChecker`] can be passed directly.
    #[must_use]
    pub fn checker_factory(
        self,
        checker_factory: impl TransformationCheckerFactory + 'static,
    ) -> Self {
        Self {
            checker_factory: Box::new(checker_factory),
            ..self
        }
    }

    #[must_use]
    pub fn inspector(self, inspector: impl Inspector + 'static) -> Self {
        Self {
            inspector: Box::new(inspector),
            ..self
        }
    }

    /// Computes the transform that maps `reading` coordinates into `reference` coordinates.
    ///
    /// See [`Icp::compute`] for the details.
    pub fn register(
        &self,
        reading: &PointCloud,
        reference: &PointCloud,
        initial_guess: RigidTransform,
    ) -> Result<RigidTransform> {
        self.compute(reading, reference, initial_guess)
            .map(|result| result.transform)
    }

    /// Registers `reading` against `reference`, starting from `initial_guess`, and reports how
    /// the registration ended.
    ///
    /// Neither cloud is modified. Fails if the guess or any point is not finite, if either cloud
    /// is empty before or after preprocessing, or if any stage of the pipeline fails, in which
    /// case the stage's error is returned as is.
    pub fn compute(
        &self,
        reading: &PointCloud,
        reference: &PointCloud,
        initial_guess: RigidTransform,
    ) -> Result<IcpResult> {
        if !initial_guess.is_finite() {
            return Err(Error::NonFiniteTransform);
        }
        if reading.is_empty() {
            return Err(Error::EmptyPointCloud("reading"));
        }
        if reference.is_empty() {
            return Err(Error::EmptyPointCloud("reference"));
        }
        if !reading.is_finite() {
            return Err(Error::NonFinitePoint("reading"));
        }
        if !reference.is_finite() {
            return Err(Error::NonFinitePoint("reference"));
        }

        let reference = self.reference_filter.filter(reference)?;
        let centroid = reference
            .mean()
            .ok_or(Error::EmptyPointCloud("filtered reference"))?;
        let t_ref_to_mean = RigidTransform::from_translation(centroid.coords);
        let reference = reference.translated(&-centroid.coords);
        debug!(
            "reference filtered to {} points, centroid {}",
            reference.len(),
            centroid
        );

        let matcher = self.matcher_factory.construct(&reference)?;
        self.iterate(
            reading,
            &reference,
            matcher.as_ref(),
            t_ref_to_mean,
            initial_guess,
        )
    }

    /// Runs the match/weight/minimize loop in the frame centered on the reference centroid.
    fn iterate(
        &self,
        reading: &PointCloud,
        reference: &PointCloud,
        matcher: &dyn Matcher,
        t_ref_to_mean: RigidTransform,
        initial_guess: RigidTransform,
    ) -> Result<IcpResult> {
        let reading = self.reading_filter.filter(reading)?;
        if reading.is_empty() {
            return Err(Error::EmptyPointCloud("filtered reading"));
        }
        debug!("reading filtered to {} points", reading.len());

        let t_mean_to_reading = t_ref_to_mean.inverse() * initial_guess;
        let reading = reading.transformed(&t_mean_to_reading);
        self.inspector.inspect(reference, "reference");

        let mut transform = RigidTransform::identity();
        let mut iterations = 0;
        let mut checker = self.checker_factory.create();
        loop {
            let step = reading.transformed(&transform);
            self.inspector.inspect(&step, &format!("i{}", iterations));

            let matches = matcher.find_closests(&step)?;
            let weights = self.outlier_filter.compute(&step, reference, &matches)?;
            weights.check_shape(&matches)?;
            let delta = self
                .error_minimizer
                .compute(&step, reference, &weights, &matches)?;
            if !delta.is_finite() {
                return Err(Error::NonFiniteTransform);
            }

            transform = delta * transform;
            let keep_going = checker.should_continue(&transform);
            iterations += 1;
            debug!(
                "iteration {}: {} weighted matches, step of {:.6} rad and {:.6}",
                iterations,
                weights.iter().filter(|&&w| w > 0.0).count(),
                delta.angle(),
                delta.translation().norm()
            );
            if !keep_going {
                break;
            }
        }

        let transform = t_ref_to_mean * transform * t_mean_to_reading;
        let termination = checker.termination();
        info!(
            "registration finished after {} iterations ({:?}): angle {:.6} rad, translation {}",
            iterations,
            termination,
            transform.angle(),
            transform.translation().transpose()
        );
        Ok(IcpResult {
            transform,
            iterations,
            termination,
        })
    }
}

impl Default for Icp {
    fn default() -> Self {
        Self::from_settings(&IcpSettings::default())
    }
}

impl From<IcpSettings> for Icp {
    fn from(settings: IcpSettings) -> Self {
        Self::from_settings(&settings)
    }
}

/// Registers `reading` against `reference` with the pipeline `icp`.
///
/// Same as calling [`Icp::register`].
pub fn register(
    reading: &PointCloud,
    reference: &PointCloud,
    initial_guess: RigidTransform,
    icp: &Icp,
) -> Result<RigidTransform> {
    icp.register(reading, reference, initial_guess)
}
