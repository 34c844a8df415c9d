use std::f32::consts::PI;
use std::fmt;
use bevy::math::{Quat, Vec3};
use bevy::transform::components::Transform;
use itertools::{zip, Itertools};
use serde::{Deserialize, Serialize};
use crate::error::{ChainError, Result};
use crate::law_of_cosines::Solution;


/// Shortest segment `SegmentLengths::measure` accepts.
pub const MIN_SEGMENT_LENGTH: f32 = 1e-5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
	X, Y, Z
}

impl Axis {
	pub fn to_vec3(&self) -> Vec3 {
		match *self {
			Axis::X => Vec3::new(1.0, 0.0, 0.0),
			Axis::Y => Vec3::new(0.0, 1.0, 0.0),
			Axis::Z => Vec3::new(0.0, 0.0, 1.0),
		}
	}
}

/// The five named points of the arm, root first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Anchor {
	Pivot,
	Upper,
	Lower,
	Effector,
	Tip,
}

impl Anchor {
	pub const ALL: [Anchor; 5] = [
		Anchor::Pivot,
		Anchor::Upper,
		Anchor::Lower,
		Anchor::Effector,
		Anchor::Tip,
	];

	pub fn index(self) -> usize {
		match self {
			Anchor::Pivot    => 0,
			Anchor::Upper    => 1,
			Anchor::Lower    => 2,
			Anchor::Effector => 3,
			Anchor::Tip      => 4,
		}
	}

	/// `None` for the pivot, whose parent is the chain root transform.
	pub fn parent(self) -> Option<Anchor> {
		match self {
			Anchor::Pivot => None,
			other         => Some(Anchor::ALL[other.index() - 1]),
		}
	}

	pub fn name(self) -> &'static str {
		match self {
			Anchor::Pivot    => "pivot",
			Anchor::Upper    => "upper",
			Anchor::Lower    => "lower",
			Anchor::Effector => "effector",
			Anchor::Tip      => "tip",
		}
	}
}

impl fmt::Display for Anchor {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SegmentLengths {
	pub pivot: f32,
	pub upper: f32,
	pub lower: f32,
	pub effector: f32,
}

impl SegmentLengths {
	/// Measures the rest lengths from world positions given in `Anchor::ALL` order.
	pub fn measure(positions: &[Vec3; 5]) -> Result<Self> {
		let mut lengths = [0.0; 4];

		for (length, ((&from, a), (&to, b))) in zip(&mut lengths, zip(&Anchor::ALL, positions).tuple_windows()) {
			let distance = a.distance(*b);

			if !distance.is_finite() || distance <= MIN_SEGMENT_LENGTH {
				return Err(ChainError::DegenerateChain { from, to, length: distance });
			}
			*length = distance;
		}

		Ok(SegmentLengths {
			pivot: lengths[0],
			upper: lengths[1],
			lower: lengths[2],
			effector: lengths[3],
		})
	}

	pub fn total(&self) -> f32 {
		self.pivot + self.upper + self.lower + self.effector
	}

	/// Range of Upper -> effector target distances the elbow triangle can close over.
	pub fn elbow_reach(&self) -> (f32, f32) {
		((self.upper - self.lower).abs(), self.upper + self.lower)
	}
}

/// The arm's transforms, each relative to its parent anchor. The pivot is relative to `root`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChainPose {
	pub root: Transform,
	pub locals: [Transform; 5],
}

impl ChainPose {
	pub fn new(root: Transform, locals: [Transform; 5]) -> Self {
		ChainPose { root, locals }
	}

	/// Rest pose with every anchor sharing the root's orientation.
	pub fn from_world_positions(root: Transform, positions: [Vec3; 5]) -> Self {
		let inverse_rotation = root.rotation.inverse();
		let mut locals = [Transform::identity(); 5];
		let mut previous = root.translation;

		for (local, position) in zip(&mut locals, positions) {
			local.translation = inverse_rotation * ((position - previous) / root.scale);
			previous = position;
		}
		ChainPose { root, locals }
	}

	pub fn local(&self, anchor: Anchor) -> &Transform {
		&self.locals[anchor.index()]
	}

	pub fn local_mut(&mut self, anchor: Anchor) -> &mut Transform {
		&mut self.locals[anchor.index()]
	}

	pub fn cumulative_transforms(&self) -> [Transform; 5] {
		let mut models = [Transform::identity(); 5];
		let mut accumulator = self.root;

		for (model, local) in zip(&mut models, &self.locals) {
			accumulator = accumulator * *local;
			*model = accumulator;
		}
		models
	}

	pub fn world(&self, anchor: Anchor) -> Transform {
		self.cumulative_transforms()[anchor.index()]
	}

	pub fn parent_world(&self, anchor: Anchor) -> Transform {
		match anchor.parent() {
			Some(parent) => self.world(parent),
			None         => self.root,
		}
	}

	pub fn world_position(&self, anchor: Anchor) -> Vec3 {
		self.world(anchor).translation
	}

	pub fn world_positions(&self) -> [Vec3; 5] {
		self.cumulative_transforms().map(|model| model.translation)
	}

	pub fn world_rotation(&self, anchor: Anchor) -> Quat {
		self.world(anchor).rotation
	}

	/// Writes the parent-relative rotation that gives `anchor` the world rotation `rotation`.
	pub fn set_world_rotation(&mut self, anchor: Anchor, rotation: Quat) {
		let parent = self.parent_world(anchor);
		self.local_mut(anchor).rotation = (parent.rotation.inverse() * rotation).normalize();
	}

	pub fn tip_distance(&self, target: Vec3) -> f32 {
		self.world_position(Anchor::Tip).distance(target)
	}

	/// Child anchors whose rest offset does not lie along their parent's `forward` axis.
	pub fn misaligned_segments(&self, forward: Vec3) -> Vec<Anchor> {
		Anchor::ALL[1..]
			.iter()
			.copied()
			.filter(|&anchor| {
				let offset = self.local(anchor).translation.normalize_or_zero();
				offset.dot(forward) < 0.999
			})
			.collect()
	}

	pub fn apply(&mut self, solution: &Solution) {
		for update in &solution.updates {
			self.local_mut(update.anchor).rotation = update.local;
		}
	}
}

pub fn rad(degrees: f32) -> f32 {
	PI * degrees / 180.0
}

pub fn deg(radians: f32) -> f32 {
	180.0 * radians / PI
}
