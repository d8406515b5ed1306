use approx::assert_relative_eq;
use cv_core::nalgebra::{Point3, UnitQuaternion, Vector3};
use cv_core::{Error, Matches, OutlierWeights, PointCloud, Result, RigidTransform};
use cv_pointclouds::{IdentityDataPointsFilter, SamplingSurfaceNormalDataPointsFilter};
use cv_registration::*;
use std::f64::consts::PI;
use std::sync::Arc;

fn init_logging() {
    let _ = pretty_env_logger::try_init_timed();
}

/// Registration without preprocessing or outlier rejection, solved in closed form.
fn point_to_point() -> Icp {
    init_logging();
    Icp::new()
        .reading_filter(IdentityDataPointsFilter)
        .reference_filter(IdentityDataPointsFilter)
        .outlier_filter(NullOutlierFilter)
        .error_minimizer(PointToPointErrorMinimizer)
}

fn unit_cube() -> PointCloud {
    PointCloud::from_positions((0..8).map(|i| {
        Point3::new((i & 1) as f64, ((i >> 1) & 1) as f64, (i >> 2) as f64)
    }))
}

/// A 4x3x2 grid with a spacing of 3, so that shifts of up to 1 never change the closest point.
fn spread_grid() -> Vec<Point3<f64>> {
    let mut points = vec![];
    for x in 0..4 {
        for y in 0..3 {
            for z in 0..2 {
                points.push(Point3::new(3.0 * x as f64, 3.0 * y as f64, 3.0 * z as f64));
            }
        }
    }
    points
}

fn assert_identity(transform: RigidTransform) {
    assert!(transform.translation().norm() < 1e-6, "{:?}", transform);
    assert!(transform.angle() < 1e-6, "{:?}", transform);
}

#[test]
fn cube_against_itself() {
    let cube = unit_cube();
    let result = point_to_point()
        .compute(&cube, &cube, RigidTransform::identity())
        .unwrap();
    assert_identity(result.transform);
    // The default checker waits for a full window of 3 differences before converging.
    assert!(result.iterations <= 4);
}

#[test]
fn fixed_point_stops_immediately() {
    let cube = unit_cube();
    let icp =
        point_to_point().checker_factory(DefaultTransformationChecker::new().smooth_length(1));
    let result = icp
        .compute(&cube, &cube, RigidTransform::identity())
        .unwrap();
    assert_identity(result.transform);
    assert!(result.iterations <= 2);
    assert_eq!(result.termination, Some(Termination::Converged));
}

#[test]
fn pure_translation() {
    let reading = PointCloud::from_positions(spread_grid());
    let reference = reading.translated(&Vector3::new(1.0, 0.0, 0.0));
    let result = point_to_point()
        .compute(&reading, &reference, RigidTransform::identity())
        .unwrap();
    // The result maps reading coordinates into reference coordinates.
    assert_relative_eq!(
        result.transform.translation(),
        Vector3::new(1.0, 0.0, 0.0),
        epsilon = 1e-9
    );
    assert!(result.transform.angle() < 1e-9);
    assert_eq!(result.termination, Some(Termination::Converged));
}

#[test]
fn rotation_about_reading_centroid() {
    // Every point sits alone on its own z level, so a rotation about z never changes matches.
    let reading = PointCloud::from_positions((0..10).map(|k| {
        let angle = 2.4 * k as f64;
        let radius = 0.5 + 0.05 * k as f64;
        Point3::new(radius * angle.cos(), radius * angle.sin(), 2.0 * k as f64)
    }));
    let centroid = reading.mean().unwrap().coords;
    let rotation = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), PI / 6.0);
    let expected = RigidTransform::from_translation(centroid)
        * RigidTransform::from_rotation(rotation)
        * RigidTransform::from_translation(-centroid);
    let reference = reading.transformed(&expected);

    let transform = point_to_point()
        .register(&reading, &reference, RigidTransform::identity())
        .unwrap();
    assert!(transform.rotation().angle_to(&rotation) < 1e-9);
    assert_relative_eq!(transform.angle(), PI / 6.0, epsilon = 1e-9);
    assert_relative_eq!(
        transform.translation(),
        expected.translation(),
        epsilon = 1e-9
    );
}

#[test]
fn initial_guess_is_refined() {
    let reading = PointCloud::from_positions(spread_grid());
    let expected = RigidTransform::from_parts(
        Vector3::new(0.4, -0.3, 0.2),
        UnitQuaternion::from_euler_angles(0.02, 0.01, -0.03),
    );
    let reference = reading.transformed(&expected);
    let guess = RigidTransform::from_translation(Vector3::new(0.3, -0.2, 0.1));
    let transform = point_to_point()
        .register(&reading, &reference, guess)
        .unwrap();
    assert_relative_eq!(transform.translation(), expected.translation(), epsilon = 1e-9);
    assert!(transform.rotation().angle_to(&expected.rotation()) < 1e-9);
}

/// Gives the last reading point a weight of zero.
struct IgnoreLastReadingPoint;

impl OutlierFilter for IgnoreLastReadingPoint {
    fn compute(
        &self,
        _reading: &PointCloud,
        _reference: &PointCloud,
        matches: &Matches,
    ) -> Result<OutlierWeights> {
        let mut weights = OutlierWeights::ones(matches);
        let last = matches.num_reading() - 1;
        weights.row_mut(last).fill(0.0);
        Ok(weights)
    }
}

#[test]
fn zero_weight_equals_removed_point() {
    let truth = RigidTransform::from_parts(
        Vector3::new(0.2, -0.1, 0.3),
        UnitQuaternion::from_euler_angles(0.0, 0.0, 2f64.to_radians()),
    );
    let reading: Vec<Point3<f64>> = spread_grid();
    // Deterministic noise keeps the optimum from being exact.
    let reference: Vec<Point3<f64>> = reading
        .iter()
        .enumerate()
        .map(|(k, p)| {
            let k = k as f64;
            truth.apply(p) + 0.05 * Vector3::new(k.sin(), (1.7 * k).cos(), (2.3 * k).sin())
        })
        .collect();

    let bad_reading = Point3::new(10.2, 10.0, 10.0);
    let bad_reference = Point3::new(10.0, 10.0, 10.0);
    let with_outlier = |points: &[Point3<f64>], extra| {
        PointCloud::from_positions(points.iter().copied().chain(std::iter::once(extra)))
    };

    let checker = CounterTransformationChecker::new().max_iterations(10);
    let weighted = point_to_point()
        .outlier_filter(IgnoreLastReadingPoint)
        .checker_factory(checker)
        .register(
            &with_outlier(&reading, bad_reading),
            &with_outlier(&reference, bad_reference),
            RigidTransform::identity(),
        )
        .unwrap();
    let removed = point_to_point()
        .checker_factory(checker)
        .register(
            &PointCloud::from_positions(reading.iter().copied()),
            &PointCloud::from_positions(reference.iter().copied()),
            RigidTransform::identity(),
        )
        .unwrap();

    assert_relative_eq!(weighted.translation(), removed.translation(), epsilon = 1e-9);
    assert!(weighted.rotation().angle_to(&removed.rotation()) < 1e-9);
    assert!((weighted.translation() - truth.translation()).norm() < 0.1);
}

#[test]
fn single_iteration_budget() {
    let reading = PointCloud::from_positions(spread_grid());
    let reference = reading.transformed(&RigidTransform::from_parts(
        Vector3::new(0.5, 0.2, -0.4),
        UnitQuaternion::from_euler_angles(0.05, 0.0, 0.1),
    ));
    let guess = RigidTransform::from_translation(Vector3::new(0.2, 0.0, 0.0));

    let inspector = Arc::new(RecordingInspector::new());
    let result = point_to_point()
        .checker_factory(CounterTransformationChecker::new().max_iterations(1))
        .inspector(inspector.clone())
        .compute(&reading, &reference, guess)
        .unwrap();
    assert_eq!(result.iterations, 1);
    assert_eq!(result.termination, Some(Termination::MaxIterationsReached));
    assert_eq!(inspector.labels(), ["reference", "i0"]);

    // Replay the single pass by hand.
    let centroid = reference.mean().unwrap().coords;
    let t_ref_to_mean = RigidTransform::from_translation(centroid);
    let t_mean_to_reading = t_ref_to_mean.inverse() * guess;
    let recentered = reference.translated(&-centroid);
    let step = reading.transformed(&t_mean_to_reading);
    let matches = KdTreeMatcher::new(&recentered, 1)
        .unwrap()
        .find_closests(&step)
        .unwrap();
    let weights = OutlierWeights::ones(&matches);
    let delta = PointToPointErrorMinimizer
        .compute(&step, &recentered, &weights, &matches)
        .unwrap();
    let expected = t_ref_to_mean * delta * t_mean_to_reading;

    assert_relative_eq!(
        result.transform.translation(),
        expected.translation(),
        epsilon = 1e-12
    );
    assert!(result.transform.rotation().angle_to(&expected.rotation()) < 1e-12);
}

#[test]
fn reference_is_recentered() {
    let reading = PointCloud::from_positions(spread_grid());
    let reference = reading.translated(&Vector3::new(100.0, -50.0, 20.0));
    let inspector = Arc::new(RecordingInspector::new());
    point_to_point()
        .inspector(inspector.clone())
        .register(
            &reading,
            &reference,
            RigidTransform::from_translation(Vector3::new(100.0, -50.0, 20.0)),
        )
        .unwrap();
    let recentered = inspector.cloud("reference").unwrap();
    assert!(recentered.mean().unwrap().coords.norm() < 1e-9);
    // The first reading seen by the matcher is already in the recentered frame.
    let first = inspector.cloud("i0").unwrap();
    assert!(first.mean().unwrap().coords.norm() < 1e-9);
}

#[test]
fn caller_clouds_are_untouched() {
    let reading = PointCloud::from_positions(spread_grid());
    let reference = reading.translated(&Vector3::new(0.5, 0.5, 0.0));
    let reading_before = reading.clone();
    let reference_before = reference.clone();
    point_to_point()
        .register(&reading, &reference, RigidTransform::identity())
        .unwrap();
    assert_eq!(reading, reading_before);
    assert_eq!(reference, reference_before);
}

/// Returns weights with the wrong shape.
struct WrongShape;

impl OutlierFilter for WrongShape {
    fn compute(
        &self,
        _reading: &PointCloud,
        _reference: &PointCloud,
        _matches: &Matches,
    ) -> Result<OutlierWeights> {
        Ok(OutlierWeights(cv_core::nalgebra::DMatrix::from_element(1, 1, 1.0)))
    }
}

#[test]
fn mismatched_weights_are_rejected() {
    let cube = unit_cube();
    let result = point_to_point()
        .outlier_filter(WrongShape)
        .register(&cube, &cube, RigidTransform::identity());
    assert!(matches!(
        result,
        Err(Error::ShapeMismatch {
            expected: (8, 1),
            actual: (1, 1)
        })
    ));
}

struct FailingMinimizer;

impl ErrorMinimizer for FailingMinimizer {
    fn compute(
        &self,
        _reading: &PointCloud,
        _reference: &PointCloud,
        _weights: &OutlierWeights,
        _matches: &Matches,
    ) -> Result<RigidTransform> {
        Err(Error::Collaborator("solver exploded".into()))
    }
}

#[test]
fn collaborator_errors_propagate() {
    let cube = unit_cube();
    let err = point_to_point()
        .error_minimizer(FailingMinimizer)
        .register(&cube, &cube, RigidTransform::identity())
        .unwrap_err();
    assert_eq!(err.to_string(), "solver exploded");
}

struct NanMinimizer;

impl ErrorMinimizer for NanMinimizer {
    fn compute(
        &self,
        _reading: &PointCloud,
        _reference: &PointCloud,
        _weights: &OutlierWeights,
        _matches: &Matches,
    ) -> Result<RigidTransform> {
        Ok(RigidTransform::from_translation(Vector3::new(f64::NAN, 0.0, 0.0)))
    }
}

#[test]
fn non_finite_increments_are_rejected() {
    let cube = unit_cube();
    let result = point_to_point()
        .error_minimizer(NanMinimizer)
        .register(&cube, &cube, RigidTransform::identity());
    assert!(matches!(result, Err(Error::NonFiniteTransform)));
}

#[test]
fn point_to_plane_needs_normals() {
    let cube = unit_cube();
    let result = point_to_point()
        .error_minimizer(PointToPlaneErrorMinimizer)
        .register(&cube, &cube, RigidTransform::identity());
    assert!(matches!(result, Err(Error::MissingNormals(_))));
}

#[test]
fn bad_inputs_are_rejected() {
    let cube = unit_cube();
    let empty = PointCloud::default();
    let icp = point_to_point();
    assert!(matches!(
        icp.register(&empty, &cube, RigidTransform::identity()),
        Err(Error::EmptyPointCloud("reading"))
    ));
    assert!(matches!(
        icp.register(&cube, &empty, RigidTransform::identity()),
        Err(Error::EmptyPointCloud("reference"))
    ));
    let nan = RigidTransform::from_translation(Vector3::new(0.0, f64::INFINITY, 0.0));
    assert!(matches!(
        icp.register(&cube, &cube, nan),
        Err(Error::NonFiniteTransform)
    ));

    // Two points are too few to estimate a normal, so nothing survives preprocessing.
    let pair = PointCloud::from_positions([Point3::origin(), Point3::new(1.0, 0.0, 0.0)]);
    let icp = point_to_point().reference_filter(SamplingSurfaceNormalDataPointsFilter::new());
    assert!(matches!(
        icp.register(&cube, &pair, RigidTransform::identity()),
        Err(Error::EmptyPointCloud("filtered reference"))
    ));
}

#[test]
fn non_finite_points_are_rejected() {
    let grid = PointCloud::from_positions(spread_grid());
    let with_nan = PointCloud::from_positions(
        spread_grid()
            .into_iter()
            .chain(std::iter::once(Point3::new(f64::NAN, 0.0, 0.0))),
    );
    let icp = point_to_point();
    assert!(matches!(
        icp.register(&grid, &with_nan, RigidTransform::identity()),
        Err(Error::NonFinitePoint("reference"))
    ));
    assert!(matches!(
        icp.register(&with_nan, &grid, RigidTransform::identity()),
        Err(Error::NonFinitePoint("reading"))
    ));
}

#[test]
fn free_function_matches_method() {
    let reading = PointCloud::from_positions(spread_grid());
    let reference = reading.translated(&Vector3::new(0.3, 0.0, -0.2));
    let icp = point_to_point();
    let a = register(&reading, &reference, RigidTransform::identity(), &icp).unwrap();
    let b = icp
        .register(&reading, &reference, RigidTransform::identity())
        .unwrap();
    assert_eq!(a, b);
}

#[test]
fn shared_between_threads() {
    let reading = PointCloud::from_positions(spread_grid());
    let icp = point_to_point();
    let offsets: Vec<Vector3<f64>> = (0..4)
        .map(|k| Vector3::new(0.1 * k as f64, -0.05 * k as f64, 0.2))
        .collect();
    std::thread::scope(|scope| {
        let handles: Vec<_> = offsets
            .iter()
            .map(|offset| {
                let icp = &icp;
                let reading = &reading;
                scope.spawn(move || {
                    let reference = reading.translated(offset);
                    icp.register(reading, &reference, RigidTransform::identity())
                        .unwrap()
                })
            })
            .collect();
        for (handle, offset) in handles.into_iter().zip(&offsets) {
            let transform = handle.join().unwrap();
            assert_relative_eq!(transform.translation(), *offset, epsilon = 1e-9);
        }
    });
}

/// A smooth, curved surface, sampled with a low-discrepancy sequence so that no normal
/// estimation bin is collinear.
fn wavy_surface() -> PointCloud {
    PointCloud::from_positions((0..1600).map(|k| {
        let k = k as f64;
        let x = 6.0 * (0.5 + k * 0.754_877_666_2).fract() - 3.0;
        let y = 6.0 * (0.5 + k * 0.569_840_291_0).fract() - 3.0;
        Point3::new(x, y, 0.3 * x.sin() * y.cos())
    }))
}

#[test]
fn default_pipeline_on_curved_surface() {
    init_logging();
    let reference = wavy_surface();
    let truth = RigidTransform::from_parts(
        Vector3::new(0.05, -0.04, 0.03),
        UnitQuaternion::from_euler_angles(0.01, -0.01, 0.02),
    );
    let reading = reference.transformed(&truth.inverse());

    let result = Icp::new()
        .compute(&reading, &reference, RigidTransform::identity())
        .unwrap();
    assert!(result.iterations >= 1);
    let error = truth.inverse() * result.transform;
    assert!(error.translation().norm() < 0.03, "{:?}", result);
    assert!(error.angle() < 0.02, "{:?}", result);
}

#[test]
fn settings_build_the_pipeline() {
    let reference = wavy_surface();
    let reading = reference.translated(&Vector3::new(0.0, 0.0, -0.05));
    let settings = IcpSettings {
        max_iterations: 2,
        ..Default::default()
    };
    let result = Icp::from(settings)
        .compute(&reading, &reference, RigidTransform::identity())
        .unwrap();
    assert!(result.iterations <= 2);
    assert!((result.transform.translation().z - 0.05).abs() < 0.02);
}
