use arm_ik::{Anchor, ChainError, ChainPose, LawOfCosinesSolver, SegmentLengths, SolverConfig, Triangle};
use bevy::math::{Quat, Vec3};
use bevy::transform::components::Transform;
use pretty_assertions::assert_eq;


const EPSILON: f32 = 1e-4;

/// Pivot at the origin facing +Z, segments of 1, 2, 2 and 1.
fn rest_pose() -> ChainPose {
	ChainPose::from_world_positions(Transform::identity(), [
		Vec3::new(0.0, 0.0, 0.0),
		Vec3::new(0.0, 0.0, 1.0),
		Vec3::new(0.0, 0.0, 3.0),
		Vec3::new(0.0, 0.0, 5.0),
		Vec3::new(0.0, 0.0, 6.0),
	])
}

fn solver() -> LawOfCosinesSolver {
	LawOfCosinesSolver::new(&rest_pose(), SolverConfig::default()).unwrap()
}

fn assert_close(actual: Vec3, expected: Vec3) {
	assert!(actual.distance(expected) < EPSILON, "{} is not within {} of {}", actual, EPSILON, expected);
}

fn assert_same_rotation(actual: Quat, expected: Quat) {
	for axis in [Vec3::X, Vec3::Y, Vec3::Z] {
		assert_close(actual * axis, expected * axis);
	}
}

#[test]
fn lengths_match_rest_pose() {
	let lengths = *solver().lengths();
	assert_eq!(lengths, SegmentLengths { pivot: 1.0, upper: 2.0, lower: 2.0, effector: 1.0 });
}

#[test]
fn coincident_anchors_fail_construction() {
	let rest = ChainPose::from_world_positions(Transform::identity(), [
		Vec3::new(0.0, 0.0, 0.0),
		Vec3::new(0.0, 0.0, 1.0),
		Vec3::new(0.0, 0.0, 1.0),
		Vec3::new(0.0, 0.0, 3.0),
		Vec3::new(0.0, 0.0, 4.0),
	]);

	match LawOfCosinesSolver::new(&rest, SolverConfig::default()) {
		Err(ChainError::DegenerateChain { from: Anchor::Upper, to: Anchor::Lower, .. }) => {},
		other => panic!("expected a degenerate chain error, got {:?}", other),
	}
}

#[test]
fn reference_scenario() {
	let solver = solver();
	let pose = rest_pose();
	let target = Vec3::new(0.0, 0.0, 4.0);

	let solution = solver.solve(&pose, target, Vec3::Y);

	assert_close(solution.effector_target, Vec3::new(0.0, 1.0, 4.0));
	assert_close(solution.tip_target, target);
	assert_close(solution.pivot_rotation() * Vec3::Z, Vec3::new(0.0, 1.0, 4.0).normalize());

	let (angle_b, angle_c) = match solution.triangle {
		Triangle::Solved { angle_b, angle_c } => (angle_b, angle_c),
		other => panic!("expected a solved triangle, got {:?}", other),
	};
	assert!(angle_b.is_finite() && angle_c.is_finite());

	// Upper sits one unit along the pivot's aim, so c = |(0, 1, 4)| - 1
	let c = 17.0f32.sqrt() - 1.0;
	let expected_c = ((8.0 - c * c) / 8.0).acos().to_degrees();
	assert!((angle_c - expected_c).abs() < 1e-2);

	let mut solved = pose;
	solved.apply(&solution);
	assert_close(solved.world_position(Anchor::Effector), solution.effector_target);
	assert_close(solution.effector_rotation() * Vec3::Z, -Vec3::Y);
	assert!(solved.tip_distance(target) < 1e-3);
}

#[test]
fn fully_extended_arm_is_straight() {
	let solver = solver();
	let pose = rest_pose();

	// Upper is at z = 1, so the effector target lands exactly upper + lower ahead of it
	let solution = solver.solve(&pose, Vec3::new(0.0, 0.0, 6.0), -Vec3::Z);
	assert_close(solution.effector_target, Vec3::new(0.0, 0.0, 5.0));

	match solution.triangle {
		Triangle::Solved { angle_b, angle_c } => {
			assert!(angle_b.abs() < 1e-2, "angle_b = {}", angle_b);
			assert!((angle_c - 180.0).abs() < 1e-2, "angle_c = {}", angle_c);
		},
		other => panic!("expected a solved triangle, got {:?}", other),
	}

	assert_same_rotation(solution.upper_local_rotation(), Quat::IDENTITY);
	assert_same_rotation(solution.lower_local_rotation(), Quat::IDENTITY);
	assert_same_rotation(solution.pivot_rotation(), Quat::IDENTITY);
}

#[test]
fn unreachable_target_freezes_the_elbow() {
	let solver = solver();
	let mut pose = rest_pose();

	let reachable = solver.solve(&pose, Vec3::new(1.0, 1.0, 3.0), Vec3::Y);
	assert!(reachable.is_reachable());
	pose.apply(&reachable);

	let far = Vec3::new(0.0, 3.0, 40.0);
	let frozen = solver.solve(&pose, far, Vec3::Y);

	assert!(matches!(frozen.triangle, Triangle::Unreachable { .. }));
	assert_eq!(frozen.upper_local_rotation(), reachable.upper_local_rotation());
	assert_eq!(frozen.lower_local_rotation(), reachable.lower_local_rotation());

	assert_close(frozen.pivot_rotation() * Vec3::Z, frozen.effector_target.normalize());

	pose.apply(&frozen);
	let effector = pose.world_position(Anchor::Effector);
	assert_close(frozen.effector_rotation() * Vec3::Z, (far - effector).normalize());
}

#[test]
fn target_on_top_of_upper_is_unreachable() {
	let solver = solver();
	let pose = rest_pose();

	// effector target coincides with where Upper ends up, so c = 0
	let solution = solver.solve(&pose, Vec3::new(0.0, 0.0, 0.0), Vec3::Z);
	assert!(!solution.is_reachable());
	assert_eq!(solution.upper_local_rotation(), Quat::IDENTITY);
	assert_eq!(solution.lower_local_rotation(), Quat::IDENTITY);
}

#[test]
fn first_degenerate_tick_keeps_rest_pose() {
	let solver = solver();
	let pose = rest_pose();

	let solution = solver.solve(&pose, Vec3::new(0.0, 0.0, 100.0), Vec3::Y);

	assert!(!solution.is_reachable());
	assert_eq!(solution.upper_local_rotation(), pose.local(Anchor::Upper).rotation);
	assert_eq!(solution.lower_local_rotation(), pose.local(Anchor::Lower).rotation);
}

#[test]
fn solve_is_idempotent() {
	let solver = solver();
	let mut pose = rest_pose();
	let target = Vec3::new(-1.0, 2.0, 2.5);
	let normal = Vec3::new(0.0, 0.6, 0.8);

	let first = solver.solve(&pose, target, normal);
	pose.apply(&first);
	let second = solver.solve(&pose, target, normal);
	pose.apply(&second);
	let third = solver.solve(&pose, target, normal);

	for (a, b) in first.updates.iter().zip(&second.updates) {
		assert_same_rotation(a.local, b.local);
		assert_same_rotation(a.world, b.world);
	}
	assert_eq!(second, third);
}

#[test]
fn reachable_targets_round_trip_through_forward_kinematics() {
	let solver = solver();
	let (min_reach, max_reach) = solver.lengths().elbow_reach();
	let targets = [
		(Vec3::new(0.0, 2.0, 2.0), Vec3::Y),
		(Vec3::new(2.0, 1.0, 1.0), Vec3::new(0.0, 0.0, -1.0)),
		(Vec3::new(-1.5, 0.5, 3.0), Vec3::new(1.0, 1.0, 0.0).normalize()),
		(Vec3::new(0.5, -1.0, 2.0), Vec3::X),
		(Vec3::new(0.0, 0.0, 3.0), Vec3::Y),
	];

	for (target, normal) in targets {
		let pose = rest_pose();
		let solution = solver.solve(&pose, target, normal);

		let mut aimed = pose;
		aimed.set_world_rotation(Anchor::Pivot, solution.pivot_rotation());
		let c = aimed.world_position(Anchor::Upper).distance(solution.effector_target);
		assert!(c >= min_reach && c <= max_reach, "target {} gives c = {}", target, c);

		let mut solved = pose;
		solved.apply(&solution);
		assert!(solution.is_reachable());
		assert!(
			solved.world_position(Anchor::Effector).distance(solution.effector_target) < 1e-3,
			"effector missed {} for target {}", solution.effector_target, target
		);
		assert!(solved.tip_distance(target) < 1e-3);
	}
}

#[test]
fn zero_normal_does_not_crash() {
	let solver = solver();
	let pose = rest_pose();
	let target = Vec3::new(0.0, 1.0, 3.0);

	let solution = solver.solve(&pose, target, Vec3::ZERO);

	assert_eq!(solution.effector_target, target);
	assert!(solution.is_reachable());
	for update in &solution.updates {
		assert!(update.local.is_finite() && update.world.is_finite(), "{:?}", update);
	}
}

#[test]
fn updates_come_in_pipeline_order() {
	let solution = solver().solve(&rest_pose(), Vec3::new(0.0, 1.0, 3.0), Vec3::Y);
	let order: Vec<Anchor> = solution.updates.iter().map(|update| update.anchor).collect();

	assert_eq!(order, vec![Anchor::Pivot, Anchor::Upper, Anchor::Lower, Anchor::Effector]);
	assert_eq!(solution.update(Anchor::Tip), None);
	assert_eq!(solution.update(Anchor::Lower).map(|update| update.local), Some(solution.lower_local_rotation()));
}

#[test]
fn rotated_root_is_respected() {
	let root = Transform {
		translation: Vec3::new(3.0, 2.0, -1.0),
		rotation: Quat::from_rotation_y(0.7),
		..Transform::identity()
	};
	let rest = rest_pose();
	let pose = ChainPose::new(root, rest.locals);
	let solver = LawOfCosinesSolver::new(&pose, SolverConfig::default()).unwrap();

	let target = root * Vec3::new(0.5, 1.0, 3.0);
	let solution = solver.solve(&pose, target, Vec3::Y);

	let mut solved = pose;
	solved.apply(&solution);
	assert!(solved.world_position(Anchor::Effector).distance(solution.effector_target) < 1e-3);
	assert!(solved.tip_distance(target) < 1e-3);
}
