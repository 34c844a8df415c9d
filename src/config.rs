use std::fs;
use std::path::Path;
use bevy::math::Vec3;
use serde::{Deserialize, Serialize};
use crate::chain::Axis;
use crate::error::{ChainError, Result};


/// Axis conventions the arm's segments are modelled with.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
	/// Local axis Upper and Lower rotate about when the elbow bends.
	pub bend_axis: Axis,
	/// Local axis each segment extends along toward its child.
	pub forward_axis: Axis,
	/// World up used when aiming the pivot and the effector.
	pub up: Vec3,
}

impl Default for SolverConfig {
	fn default() -> Self {
		SolverConfig {
			bend_axis: Axis::X,
			forward_axis: Axis::Z,
			up: Vec3::Y,
		}
	}
}

impl SolverConfig {
	pub fn validate(&self) -> Result<()> {
		if self.bend_axis == self.forward_axis {
			return Err(ChainError::invalid_config(format!(
				"bend axis and forward axis are both {:?}", self.bend_axis
			)));
		}
		if !self.up.is_finite() || self.up.length_squared() < 1e-12 {
			return Err(ChainError::invalid_config(format!("up vector {} cannot be normalized", self.up)));
		}
		Ok(())
	}
}

/// How the demo moves the target between ticks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum TargetDriver {
	Wander,
	Keyboard,
	Fixed,
}

impl Default for TargetDriver {
	fn default() -> Self { TargetDriver::Wander }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArmConfig {
	pub solver: SolverConfig,
	pub target: Vec3,
	pub normal: Vec3,
	pub driver: TargetDriver,
	pub seek_frames: u32,
	pub wait_frames: u32,
	pub wander_radius: f32,
}

impl Default for ArmConfig {
	fn default() -> Self {
		ArmConfig {
			solver: SolverConfig::default(),
			target: Vec3::Z,
			normal: Vec3::Y,
			driver: TargetDriver::default(),
			seek_frames: 180,
			wait_frames: 60,
			wander_radius: 5.0,
		}
	}
}

impl ArmConfig {
	pub fn from_json_str(json: &str) -> Result<Self> {
		let config: ArmConfig = serde_json::from_str(json)?;
		config.validate()?;
		Ok(config)
	}

	pub fn load(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let json = fs::read_to_string(path).map_err(|source| ChainError::ConfigIo {
			path: path.to_path_buf(),
			source,
		})?;
		Self::from_json_str(&json)
	}

	pub fn validate(&self) -> Result<()> {
		self.solver.validate()?;

		if !self.target.is_finite() || !self.normal.is_finite() {
			return Err(ChainError::invalid_config("target and normal must be finite"));
		}
		if self.seek_frames == 0 {
			return Err(ChainError::invalid_config("seek_frames must be at least 1"));
		}
		if !(self.wander_radius > 0.0) {
			return Err(ChainError::invalid_config(format!("wander radius {} must be positive", self.wander_radius)));
		}
		Ok(())
	}
}
