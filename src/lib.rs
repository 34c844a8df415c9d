pub mod chain;
pub mod config;
pub mod error;
pub mod law_of_cosines;
pub mod rig;

pub use chain::{Anchor, Axis, ChainPose, SegmentLengths};
pub use config::{ArmConfig, SolverConfig, TargetDriver};
pub use error::{ChainError, Result};
pub use law_of_cosines::{LawOfCosinesSolver, RotationUpdate, Solution, Triangle};
pub use rig::{ArmIkPlugin, ArmRig, ArmTarget};
