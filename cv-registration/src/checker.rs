use cv_core::RigidTransform;
use log::*;
use std::collections::VecDeque;

/// Why registration stopped iterating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Termination {
    /// The transform stopped changing.
    Converged,
    /// The iteration budget ran out.
    MaxIterationsReached,
}

/// Decides after every iteration whether registration keeps going.
///
/// A checker carries state across the iterations of a single registration and is never shared
/// between registrations. It receives the accumulated transform of the recentered reading after
/// every iteration, starting with the first one. At least one iteration always runs.
pub trait TransformationChecker: Send {
    fn should_continue(&mut self, transform: &RigidTransform) -> bool;

    /// The reason the last call to [`TransformationChecker::should_continue`] returned `false`,
    /// if the checker tracks one.
    fn termination(&self) -> Option<Termination> {
        None
    }
}

impl<C: TransformationChecker + ?Sized> TransformationChecker for Box<C> {
    fn should_continue(&mut self, transform: &RigidTransform) -> bool {
        (**self).should_continue(transform)
    }

    fn termination(&self) -> Option<Termination> {
        (**self).termination()
    }
}

/// Produces a fresh [`TransformationChecker`] for every registration.
///
/// Any checker that can be cloned is its own factory: every registration starts from a clone of
/// the configured checker.
pub trait TransformationCheckerFactory: Send + Sync {
    fn create(&self) -> Box<dyn TransformationChecker>;
}

impl<C> TransformationCheckerFactory for C
where
    C: TransformationChecker + Clone + Sync + 'static,
{
    fn create(&self) -> Box<dyn TransformationChecker> {
        Box::new(self.clone())
    }
}

/// Stops after a fixed number of iterations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterTransformationChecker {
    max_iterations: usize,
    iterations: usize,
}

impl CounterTransformationChecker {
    /// Creates a `CounterTransformationChecker` with default values.
    ///
    /// Same as calling [`Default::default`].
    pub fn new() -> Self {
        Default::default()
    }

    /// Set the maximum number of iterations.
    ///
    /// Default is `40`.
    #[must_use]
    pub fn max_iterations(self, max_iterations: usize) -> Self {
        Self {
            max_iterations,
            ..self
        }
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }
}

impl Default for CounterTransformationChecker {
    fn default() -> Self {
        Self {
            max_iterations: 40,
            iterations: 0,
        }
    }
}

impl TransformationChecker for CounterTransformationChecker {
    fn should_continue(&mut self, _: &RigidTransform) -> bool {
        self.iterations += 1;
        self.iterations < self.max_iterations
    }

    fn termination(&self) -> Option<Termination> {
        (self.iterations >= self.max_iterations).then(|| Termination::MaxIterationsReached)
    }
}

/// Stops once the transform stops changing.
///
/// After every iteration the rotation angle and translation distance between the current and the
/// previous transform are recorded. Once `smooth_length` differences have been recorded and the
/// means of the last `smooth_length` of them both fall below their thresholds, the registration
/// is considered converged.
#[derive(Debug, Clone, PartialEq)]
pub struct DifferentialTransformationChecker {
    min_diff_rot_err: f64,
    min_diff_trans_err: f64,
    smooth_length: usize,
    previous: RigidTransform,
    rotation_diffs: VecDeque<f64>,
    translation_diffs: VecDeque<f64>,
    converged: bool,
}

impl DifferentialTransformationChecker {
    /// Creates a `DifferentialTransformationChecker` with default values.
    ///
    /// Same as calling [`Default::default`].
    pub fn new() -> Self {
        Default::default()
    }

    /// Set the rotation change (in radians) below which the rotation counts as settled.
    ///
    /// Default is `0.001`.
    #[must_use]
    pub fn min_diff_rot_err(self, min_diff_rot_err: f64) -> Self {
        Self {
            min_diff_rot_err,
            ..self
        }
    }

    /// Set the translation change below which the translation counts as settled.
    ///
    /// Default is `0.001`.
    #[must_use]
    pub fn min_diff_trans_err(self, min_diff_trans_err: f64) -> Self {
        Self {
            min_diff_trans_err,
            ..self
        }
    }

    /// Set how many successive differences are averaged.
    ///
    /// Values below `1` are treated as `1`. Default is `3`.
    #[must_use]
    pub fn smooth_length(self, smooth_length: usize) -> Self {
        Self {
            smooth_length,
            ..self
        }
    }

    fn window(&self) -> usize {
        self.smooth_length.max(1)
    }
}

impl Default for DifferentialTransformationChecker {
    fn default() -> Self {
        Self {
            min_diff_rot_err: 0.001,
            min_diff_trans_err: 0.001,
            smooth_length: 3,
            previous: RigidTransform::identity(),
            rotation_diffs: VecDeque::new(),
            translation_diffs: VecDeque::new(),
            converged: false,
        }
    }
}

fn mean(values: &VecDeque<f64>) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

impl TransformationChecker for DifferentialTransformationChecker {
    fn should_continue(&mut self, transform: &RigidTransform) -> bool {
        let rotation_diff = transform.rotation().angle_to(&self.previous.rotation());
        let translation_diff = (transform.translation() - self.previous.translation()).norm();
        self.previous = *transform;

        let window = self.window();
        self.rotation_diffs.push_back(rotation_diff);
        self.translation_diffs.push_back(translation_diff);
        while self.rotation_diffs.len() > window {
            self.rotation_diffs.pop_front();
            self.translation_diffs.pop_front();
        }
        if self.rotation_diffs.len() < window {
            return true;
        }

        let rotation_mean = mean(&self.rotation_diffs);
        let translation_mean = mean(&self.translation_diffs);
        trace!(
            "mean rotation change {}, mean translation change {}",
            rotation_mean,
            translation_mean
        );
        self.converged =
            rotation_mean < self.min_diff_rot_err && translation_mean < self.min_diff_trans_err;
        !self.converged
    }

    fn termination(&self) -> Option<Termination> {
        self.converged.then(|| Termination::Converged)
    }
}

/// Stops when the transform has converged or the iteration budget runs out, whichever comes
/// first.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DefaultTransformationChecker {
    counter: CounterTransformationChecker,
    differential: DifferentialTransformationChecker,
}

impl DefaultTransformationChecker {
    /// Creates a `DefaultTransformationChecker` with default values.
    ///
    /// Same as calling [`Default::default`].
    pub fn new() -> Self {
        Default::default()
    }

    /// See [`CounterTransformationChecker::max_iterations`].
    #[must_use]
    pub fn max_iterations(self, max_iterations: usize) -> Self {
        Self {
            counter: self.counter.max_iterations(max_iterations),
            ..self
        }
    }

    /// See [`DifferentialTransformationChecker::min_diff_rot_err`].
    #[must_use]
    pub fn min_diff_rot_err(self, min_diff_rot_err: f64) -> Self {
        Self {
            differential: self.differential.min_diff_rot_err(min_diff_rot_err),
            ..self
        }
    }

    /// See [`DifferentialTransformationChecker::min_diff_trans_err`].
    #[must_use]
    pub fn min_diff_trans_err(self, min_diff_trans_err: f64) -> Self {
        Self {
            differential: self.differential.min_diff_trans_err(min_diff_trans_err),
            ..self
        }
    }

    /// See [`DifferentialTransformationChecker::smooth_length`].
    #[must_use]
    pub fn smooth_length(self, smooth_length: usize) -> Self {
        Self {
            differential: self.differential.smooth_length(smooth_length),
            ..self
        }
    }
}

impl TransformationChecker for DefaultTransformationChecker {
    fn should_continue(&mut self, transform: &RigidTransform) -> bool {
        // Both checkers must see every transform to keep their state current.
        let counter = self.counter.should_continue(transform);
        let differential = self.differential.should_continue(transform);
        counter && differential
    }

    fn termination(&self) -> Option<Termination> {
        self.differential
            .termination()
            .or_else(|| self.counter.termination())
    }
}
