use std::f32::consts::PI;
use bevy::{core::FixedTimestep, prelude::*};
use itertools::zip;
use rand::Rng;
use crate::chain::{Anchor, Axis, ChainPose};
use crate::config::{ArmConfig, SolverConfig, TargetDriver};
use crate::error::{ChainError, Result};
use crate::law_of_cosines::LawOfCosinesSolver;


const TIMESTEP: f64 = 1.0 / 60.0;
const TARGET_SPEED: f32 = 3.0;

#[derive(Component, Clone, Copy, Debug, PartialEq, Eq)]
pub struct IsAnchor(pub Anchor);

#[derive(Component)]
pub struct IsTargetMarker;

#[derive(Debug)]
pub enum RigState {
	Uninitialized,
	Ready(LawOfCosinesSolver),
	Rejected(ChainError),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SolveReport {
	pub effector_target: Vec3,
	pub tip_distance: f32,
	pub reachable: bool,
}

/// Entities standing in for the five anchors of one arm.
///
/// The solver is built from the anchors' transforms on the first tick. A rig whose anchors
/// are missing or coincide is rejected and never driven.
#[derive(Component, Debug)]
pub struct ArmRig {
	pub anchors: [Option<Entity>; 5],
	pub config: SolverConfig,
	pub state: RigState,
	pub report: Option<SolveReport>,
}

impl ArmRig {
	pub fn new(config: SolverConfig) -> Self {
		ArmRig {
			anchors: [None; 5],
			config,
			state: RigState::Uninitialized,
			report: None,
		}
	}

	pub fn assign(&mut self, anchor: Anchor, entity: Entity) {
		self.anchors[anchor.index()] = Some(entity);
	}

	pub fn missing_anchors(&self) -> Vec<Anchor> {
		zip(Anchor::ALL, &self.anchors)
			.filter(|(_, entity)| entity.is_none())
			.map(|(anchor, _)| anchor)
			.collect()
	}

	pub fn is_complete(&self) -> bool {
		self.anchors.iter().all(Option::is_some)
	}

	pub fn anchor_entities(&self) -> Result<[Entity; 5]> {
		let mut entities = [Entity::from_raw(0); 5];
		for ((slot, anchor), entity) in zip(zip(&mut entities, Anchor::ALL), &self.anchors) {
			*slot = entity.ok_or(ChainError::UnassignedAnchor(anchor))?;
		}
		Ok(entities)
	}

	pub fn solver(&self) -> Option<&LawOfCosinesSolver> {
		match &self.state {
			RigState::Ready(solver) => Some(solver),
			_ => None,
		}
	}
}

#[derive(Component, Clone, Copy, Debug, PartialEq)]
pub struct ArmTarget {
	pub target: Vec3,
	pub normal: Vec3,
}

impl Default for ArmTarget {
	fn default() -> Self {
		ArmTarget { target: Vec3::Z, normal: Vec3::Y }
	}
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TargetMotion {
	Seeking {
		start: Vec3,
		goal: Vec3,
		current_frame: u32,
	},
	Waiting {
		wait_frames: u32,
	},
	Done,
}

impl Default for TargetMotion {
	fn default() -> Self { TargetMotion::Done }
}

#[derive(Component, Clone, Copy, Debug, PartialEq)]
pub struct TargetWander {
	pub state: TargetMotion,
	pub seek_frames: u32,
	pub wait_frames: u32,
	pub radius: f32,
}

impl TargetWander {
	pub fn from_config(config: &ArmConfig) -> Self {
		TargetWander {
			state: TargetMotion::default(),
			seek_frames: config.seek_frames.max(1),
			wait_frames: config.wait_frames,
			radius: config.wander_radius,
		}
	}

	/// Advances one frame and returns where the target should be now.
	pub fn step(&mut self, current: Vec3, mut pick_goal: impl FnMut() -> Vec3) -> Vec3 {
		let seek_frames = self.seek_frames;
		let wait_frames = self.wait_frames;

		match &mut self.state {
			TargetMotion::Done => {
				self.state = TargetMotion::Seeking { start: current, goal: pick_goal(), current_frame: 0 };
				current
			},
			TargetMotion::Seeking { start, goal, current_frame } => {
				*current_frame += 1;

				let t = (*current_frame as f32 / seek_frames as f32).min(1.0);
				let position = start.lerp(*goal, t);

				if *current_frame >= seek_frames {
					self.state = TargetMotion::Waiting { wait_frames };
				}
				position
			},
			TargetMotion::Waiting { wait_frames } => {
				if *wait_frames == 0 {
					self.state = TargetMotion::Done;
				} else {
					*wait_frames -= 1;
				}
				current
			},
		}
	}
}

/// Last reachability seen, so only changes are reported loudly, and the marker showing the target.
#[derive(Component, Default)]
pub struct ArmDiagnostics {
	pub was_reachable: Option<bool>,
	pub marker: Option<Entity>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, SystemLabel)]
pub enum ArmIkSystem {
	DriveTarget,
	Solve,
	Diagnostics,
}

pub struct ArmIkPlugin;

impl Plugin for ArmIkPlugin {
	fn build(&self, app: &mut App) {
		app
			.init_resource::<ArmConfig>()
			.add_startup_system(setup_arm)
			.add_system_set(SystemSet::new()
				.with_run_criteria(FixedTimestep::step(TIMESTEP))
				.with_system(wander_target_system.label(ArmIkSystem::DriveTarget))
				.with_system(keyboard_target_system.label(ArmIkSystem::DriveTarget))
				.with_system(solve_arm_system.label(ArmIkSystem::Solve).after(ArmIkSystem::DriveTarget))
				.with_system(arm_diagnostics_system.label(ArmIkSystem::Diagnostics).after(ArmIkSystem::Solve)));
	}
}

// right handed
// azimuth from z to x
// elevation from y
fn to_view_direction(azimuth: f32, elevation: f32) -> Vec3 {
	Vec3::new(
		azimuth.sin() * elevation.sin(),
		elevation.cos(),
		azimuth.cos() * elevation.sin(),
	)
}

pub fn dome_point(rng: &mut impl Rng, radius: f32) -> Vec3 {
	let unit = to_view_direction(
		rng.gen_range(0.0..PI),
		rng.gen_range(-PI * 0.5..PI * 0.5)
	);
	unit * rng.gen_range(radius * 0.3..radius * 0.8)
}

pub fn wander_target_system(
	config: Res<ArmConfig>,
	mut q_rig: Query<(&Transform, &mut ArmTarget, &mut TargetWander)>,
) {
	if config.driver != TargetDriver::Wander { return }

	let mut rng = rand::thread_rng();

	for (&root, mut arm_target, mut wander) in q_rig.iter_mut() {
		let radius = wander.radius;
		let current = arm_target.target;

		arm_target.target = wander.step(current, || root * dome_point(&mut rng, radius));
	}
}

pub fn keyboard_target_system(
	config: Res<ArmConfig>,
	input: Res<Input<KeyCode>>,
	mut q_target: Query<&mut ArmTarget>,
) {
	if config.driver != TargetDriver::Keyboard { return }

	let mut direction = Vec3::ZERO;
	if input.pressed(KeyCode::Left)     { direction.x -= 1.0 }
	if input.pressed(KeyCode::Right)    { direction.x += 1.0 }
	if input.pressed(KeyCode::Up)       { direction.z -= 1.0 }
	if input.pressed(KeyCode::Down)     { direction.z += 1.0 }
	if input.pressed(KeyCode::PageUp)   { direction.y += 1.0 }
	if input.pressed(KeyCode::PageDown) { direction.y -= 1.0 }

	if direction == Vec3::ZERO { return }

	let step = direction.normalize() * TARGET_SPEED * TIMESTEP as f32;
	for mut arm_target in q_target.iter_mut() {
		arm_target.target += step;
	}
}

fn read_pose(
	root: Transform,
	entities: &[Entity; 5],
	q_anchors: &Query<&mut Transform, With<IsAnchor>>,
) -> Result<ChainPose> {
	let mut locals = [Transform::identity(); 5];

	for ((local, &entity), anchor) in zip(zip(&mut locals, entities), Anchor::ALL) {
		*local = *q_anchors.get(entity).map_err(|_| ChainError::UnassignedAnchor(anchor))?;
	}
	Ok(ChainPose::new(root, locals))
}

pub fn solve_arm_system(
	mut q_rig: Query<(&mut ArmRig, &Transform, &ArmTarget), Without<IsAnchor>>,
	mut q_anchors: Query<&mut Transform, With<IsAnchor>>,
) {
	for (mut rig, &root, arm_target) in q_rig.iter_mut() {
		if let RigState::Rejected(_) = rig.state { continue }

		let pose = rig.anchor_entities()
			.and_then(|entities| read_pose(root, &entities, &q_anchors).map(|pose| (entities, pose)));

		let (entities, mut pose) = match pose {
			Ok(found) => found,
			Err(err) => {
				error!("arm rig cannot be solved: {}", err);
				rig.state = RigState::Rejected(err);
				continue;
			},
		};

		if let RigState::Uninitialized = rig.state {
			rig.state = match LawOfCosinesSolver::new(&pose, rig.config) {
				Ok(solver) => {
					info!("arm rig ready with segments {:?}", solver.lengths());
					RigState::Ready(solver)
				},
				Err(err) => {
					error!("refusing to drive arm rig: {}", err);
					RigState::Rejected(err)
				},
			};
		}

		let solver = match rig.solver() {
			Some(solver) => *solver,
			None => continue,
		};

		let solution = solver.solve(&pose, arm_target.target, arm_target.normal);

		for update in &solution.updates {
			if let Ok(mut transform) = q_anchors.get_mut(entities[update.anchor.index()]) {
				transform.rotation = update.local;
			}
		}
		pose.apply(&solution);

		rig.report = Some(SolveReport {
			effector_target: solution.effector_target,
			tip_distance: pose.tip_distance(solution.tip_target),
			reachable: solution.is_reachable(),
		});
	}
}

pub fn arm_diagnostics_system(
	mut q_rig: Query<(&ArmRig, &ArmTarget, &mut ArmDiagnostics)>,
	mut q_marker: Query<&mut Transform, With<IsTargetMarker>>,
) {
	for (rig, arm_target, mut diagnostics) in q_rig.iter_mut() {
		if let Some(entity) = diagnostics.marker {
			if let Ok(mut marker) = q_marker.get_mut(entity) {
				marker.translation = arm_target.target;
			}
		}

		let report = match rig.report {
			Some(report) => report,
			None => continue,
		};

		if diagnostics.was_reachable != Some(report.reachable) {
			if report.reachable {
				info!("target {} reachable, tip {:.3} away", arm_target.target, report.tip_distance);
			} else {
				info!("target {} out of reach, holding elbow", arm_target.target);
			}
			diagnostics.was_reachable = Some(report.reachable);
		} else {
			debug!("tip {:.4} from target, effector aiming at {}", report.tip_distance, report.effector_target);
		}
	}
}

fn segment_box(forward: Axis, length: f32, width: f32) -> shape::Box {
	let half = width / 2.0;
	let (x, y, z) = match forward {
		Axis::X => ((0.0, length), (-half, half), (-half, half)),
		Axis::Y => ((-half, half), (0.0, length), (-half, half)),
		Axis::Z => ((-half, half), (-half, half), (0.0, length)),
	};
	shape::Box {
		min_x: x.0, max_x: x.1,
		min_y: y.0, max_y: y.1,
		min_z: z.0, max_z: z.1,
	}
}

pub fn setup_arm(
	mut commands: Commands,
	mut meshes: ResMut<Assets<Mesh>>,
	mut materials: ResMut<Assets<StandardMaterial>>,
	config: Res<ArmConfig>,
) {
	const ARM_COLOR: Color = Color::rgb(0.8, 0.7, 0.6);
	const TARGET_COLOR: Color = Color::rgb(0.9, 0.2, 0.2);
	const WIDTH: f32 = 0.4;
	const PEDESTAL_SIZE: f32 = 2.0;
	const SEGMENTS: [f32; 4] = [1.0, 3.0, 3.0, 1.0];

	let forward = config.solver.forward_axis;

	commands.spawn_bundle(PbrBundle {
		mesh: meshes.add(Mesh::from(shape::Cube::new(PEDESTAL_SIZE))),
		transform: Transform::from_xyz(0.0, PEDESTAL_SIZE / 2.0, 0.0),
		material: materials.add(ARM_COLOR.into()),
		..Default::default()
	});

	let root = Transform::from_xyz(0.0, PEDESTAL_SIZE, 0.0);
	let mut rig = ArmRig::new(config.solver);

	let rig_id = commands
		.spawn()
		.insert(root)
		.insert(GlobalTransform::default())
		.id();

	let mut parent = rig_id;
	let mut offset = 0.0;
	for (index, anchor) in Anchor::ALL.into_iter().enumerate() {
		let mesh = match SEGMENTS.get(index) {
			Some(&length) => Mesh::from(segment_box(forward, length, WIDTH)),
			None          => Mesh::from(shape::Cube::new(WIDTH)),
		};

		let anchor_id = commands
			.spawn_bundle(PbrBundle {
				mesh: meshes.add(mesh),
				material: materials.add(ARM_COLOR.into()),
				transform: Transform::from_translation(forward.to_vec3() * offset),
				..Default::default()
			})
			.insert(IsAnchor(anchor))
			.id();

		commands.entity(parent).push_children(&[anchor_id]);
		rig.assign(anchor, anchor_id);

		parent = anchor_id;
		offset = SEGMENTS.get(index).copied().unwrap_or(0.0);
	}

	if !rig.is_complete() {
		warn!("arm rig spawned without {:?}", rig.missing_anchors());
	}

	let target = root * config.target;

	let marker_id = commands
		.spawn_bundle(PbrBundle {
			mesh: meshes.add(Mesh::from(shape::Cube::new(0.3))),
			material: materials.add(TARGET_COLOR.into()),
			transform: Transform::from_translation(target),
			..Default::default()
		})
		.insert(IsTargetMarker)
		.id();

	commands.entity(rig_id)
		.insert(rig)
		.insert(ArmTarget { target, normal: config.normal })
		.insert(TargetWander::from_config(&config))
		.insert(ArmDiagnostics { was_reachable: None, marker: Some(marker_id) });
}
