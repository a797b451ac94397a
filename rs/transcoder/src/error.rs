use std::{sync::Arc, time::Duration};

/// Everything that can end a frame, an attempt, or a job.
///
/// Cheap to clone so the same cause can reach both the listener and the job handle.
#[derive(thiserror::Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
	/// A second frame was produced before the previous one was drawn.
	#[error("protocol violation: frame produced before the previous one was drawn")]
	ProtocolViolation,

	/// The decoder did not produce a frame in time.
	#[error("no frame within {0:?}")]
	FrameTimeout(Duration),

	/// A transient codec or I/O failure; the attempt may be retried.
	#[error("recoverable: {0}")]
	Recoverable(Arc<anyhow::Error>),

	/// Invalid input, unsupported format, etc.
	#[error("unrecoverable: {0}")]
	Unrecoverable(Arc<anyhow::Error>),

	#[error("cancelled")]
	Cancelled,

	/// The bridge was already released.
	#[error("released")]
	Released,

	/// The scheduler is already running a job.
	#[error("busy")]
	Busy,

	#[error("invalid config: {0}")]
	InvalidConfig(String),
}

impl Error {
	pub fn recoverable(err: impl Into<anyhow::Error>) -> Self {
		Self::Recoverable(Arc::new(err.into()))
	}

	pub fn unrecoverable(err: impl Into<anyhow::Error>) -> Self {
		Self::Unrecoverable(Arc::new(err.into()))
	}

	pub fn is_cancelled(&self) -> bool {
		matches!(self, Self::Cancelled)
	}
}

pub type Result<T> = std::result::Result<T, Error>;
