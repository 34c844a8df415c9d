use std::path::PathBuf;
use thiserror::Error;
use crate::chain::Anchor;


pub type Result<T> = std::result::Result<T, ChainError>;

#[derive(Debug, Error)]
pub enum ChainError {
	/// Two consecutive anchors coincide, so the segment between them has no length.
	#[error("degenerate chain: segment {from} -> {to} has length {length}")]
	DegenerateChain {
		from: Anchor,
		to: Anchor,
		length: f32,
	},

	#[error("invalid configuration: {0}")]
	InvalidConfig(String),

	#[error("failed to read config {path}: {source}")]
	ConfigIo {
		path: PathBuf,
		source: std::io::Error,
	},

	#[error("failed to parse config: {0}")]
	ConfigParse(#[from] serde_json::Error),

	#[error("anchor {0} is not assigned")]
	UnassignedAnchor(Anchor),
}

impl ChainError {
	pub fn invalid_config(reason: impl Into<String>) -> Self {
		ChainError::InvalidConfig(reason.into())
	}
}
