use bevy::log::{debug, warn};
use bevy::math::{Mat3, Quat, Vec3};
use itertools::zip;
use crate::chain::{deg, rad, Anchor, ChainPose, SegmentLengths, MIN_SEGMENT_LENGTH};
use crate::config::SolverConfig;
use crate::error::{ChainError, Result};


/// Slack allowed on the triangle inequality before a target counts as unreachable.
pub const REACH_EPSILON: f32 = 1e-4;

const PARALLEL_THRESHOLD: f32 = 1e-8;

/// The elbow triangle formed by Upper, Lower and the effector target.
///
/// `angle_b` is the interior angle at Upper and `angle_c` the one at Lower, both in degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Triangle {
	Solved {
		angle_b: f32,
		angle_c: f32,
	},
	Unreachable {
		a: f32,
		b: f32,
		c: f32,
	},
}

impl Triangle {
	pub fn solve(a: f32, b: f32, c: f32) -> Triangle {
		let sides_valid = [a, b, c].iter().all(|side| side.is_finite() && *side > MIN_SEGMENT_LENGTH);
		let reachable = sides_valid
			&& c <= a + b + REACH_EPSILON
			&& c >= (a - b).abs() - REACH_EPSILON;

		if !reachable { return Triangle::Unreachable { a, b, c } }

		// inside the slack band rounding can push these just past 1
		let cos_b = ((c * c + a * a - b * b) / (2.0 * c * a)).clamp(-1.0, 1.0);
		let cos_c = ((a * a + b * b - c * c) / (2.0 * a * b)).clamp(-1.0, 1.0);

		Triangle::Solved {
			angle_b: deg(cos_b.acos()),
			angle_c: deg(cos_c.acos()),
		}
	}

	pub fn is_reachable(&self) -> bool {
		matches!(self, Triangle::Solved { .. })
	}
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RotationUpdate {
	pub anchor: Anchor,
	pub local: Quat,
	pub world: Quat,
}

/// Rotations produced by one solve, in the order they must be applied.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Solution {
	pub effector_target: Vec3,
	pub tip_target: Vec3,
	pub triangle: Triangle,
	pub updates: [RotationUpdate; 4],
}

impl Solution {
	pub fn is_reachable(&self) -> bool {
		self.triangle.is_reachable()
	}

	pub fn update(&self, anchor: Anchor) -> Option<&RotationUpdate> {
		self.updates.iter().find(|update| update.anchor == anchor)
	}

	pub fn pivot_rotation(&self) -> Quat {
		self.updates[0].world
	}

	pub fn upper_local_rotation(&self) -> Quat {
		self.updates[1].local
	}

	pub fn lower_local_rotation(&self) -> Quat {
		self.updates[2].local
	}

	pub fn effector_rotation(&self) -> Quat {
		self.updates[3].world
	}
}

/// Closed form solver for the pivot/upper/lower/effector/tip arm.
///
/// The pivot is aimed straight at the effector target, which takes care of yaw and pitch.
/// Upper and Lower then bend about a single axis to close the elbow triangle, and the
/// effector is finally aimed at the tip target.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LawOfCosinesSolver {
	lengths: SegmentLengths,
	config: SolverConfig,
	bend_axis: Vec3,
	up: Vec3,
	forward_correction: Quat,
}

impl LawOfCosinesSolver {
	/// Measures segment lengths from `rest`, which must be a non-degenerate arm layout.
	pub fn new(rest: &ChainPose, config: SolverConfig) -> Result<Self> {
		let lengths = SegmentLengths::measure(&rest.world_positions())?;

		let misaligned = rest.misaligned_segments(config.forward_axis.to_vec3());
		if !misaligned.is_empty() {
			warn!(
				"rest offsets of {:?} are not along the {:?} axis; bends will not land on the target",
				misaligned, config.forward_axis
			);
		}

		Self::from_lengths(lengths, config)
	}

	pub fn from_lengths(lengths: SegmentLengths, config: SolverConfig) -> Result<Self> {
		config.validate()?;

		let measured = [lengths.pivot, lengths.upper, lengths.lower, lengths.effector];
		for (&length, (&from, &to)) in zip(&measured, zip(&Anchor::ALL, &Anchor::ALL[1..])) {
			if !length.is_finite() || length <= MIN_SEGMENT_LENGTH {
				return Err(ChainError::DegenerateChain { from, to, length });
			}
		}
		debug!("arm segments measured: {:?}", lengths);

		Ok(LawOfCosinesSolver {
			lengths,
			config,
			bend_axis: config.bend_axis.to_vec3(),
			up: config.up.normalize(),
			forward_correction: Quat::from_rotation_arc(config.forward_axis.to_vec3(), Vec3::Z),
		})
	}

	pub fn lengths(&self) -> &SegmentLengths {
		&self.lengths
	}

	pub fn config(&self) -> &SolverConfig {
		&self.config
	}

	pub fn effector_target(&self, target: Vec3, normal: Vec3) -> Vec3 {
		target + normal * self.lengths.effector
	}

	/// Solves `pose` toward `target`, with the last segment arriving from `normal`.
	///
	/// `pose` is not modified. When the elbow triangle cannot close, Upper and Lower keep
	/// the local rotations `pose` already has, while Pivot and Effector are still aimed.
	pub fn solve(&self, pose: &ChainPose, target: Vec3, normal: Vec3) -> Solution {
		let effector_target = self.effector_target(target, normal);
		let tip_target = target;

		let mut scratch = *pose;

		let pivot_position = scratch.world_position(Anchor::Pivot);
		if let Some(rotation) = self.look_rotation(effector_target - pivot_position) {
			scratch.set_world_rotation(Anchor::Pivot, rotation);
		}

		let a = self.lengths.upper;
		let b = self.lengths.lower;
		let c = scratch.world_position(Anchor::Upper).distance(effector_target);

		let triangle = Triangle::solve(a, b, c);
		match triangle {
			Triangle::Solved { angle_b, angle_c } => {
				scratch.local_mut(Anchor::Upper).rotation = Quat::from_axis_angle(self.bend_axis, rad(-angle_b));
				scratch.local_mut(Anchor::Lower).rotation = Quat::from_axis_angle(self.bend_axis, rad(180.0 - angle_c));
			},
			Triangle::Unreachable { .. } => {
				debug!("effector target {} out of reach ({:?}), holding elbow", effector_target, triangle);
			},
		}

		let effector_position = scratch.world_position(Anchor::Effector);
		if let Some(rotation) = self.look_rotation(tip_target - effector_position) {
			scratch.set_world_rotation(Anchor::Effector, rotation);
		}

		let models = scratch.cumulative_transforms();
		let updates = [Anchor::Pivot, Anchor::Upper, Anchor::Lower, Anchor::Effector].map(|anchor| {
			RotationUpdate {
				anchor,
				local: scratch.local(anchor).rotation,
				world: models[anchor.index()].rotation,
			}
		});

		Solution { effector_target, tip_target, triangle, updates }
	}

	/// World rotation taking the configured forward axis onto `direction`.
	pub fn look_rotation(&self, direction: Vec3) -> Option<Quat> {
		if !direction.is_finite() { return None }

		let forward = direction.normalize_or_zero();
		if forward == Vec3::ZERO { return None }

		let mut right = self.up.cross(forward);
		if right.length_squared() < PARALLEL_THRESHOLD {
			let fallback = if forward.z.abs() < 0.9 { Vec3::Z } else { Vec3::X };
			right = fallback.cross(forward);
		}
		let right = right.normalize();
		let up = forward.cross(right);

		let look = Quat::from_mat3(&Mat3::from_cols(right, up, forward));
		Some((look * self.forward_correction).normalize())
	}
}
