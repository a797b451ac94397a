//! Runs a job to completion, retrying failed attempts with fresh options.

use std::{
	any::Any,
	panic::{self, AssertUnwindSafe},
};

use crate::{Cancel, Error, Listener, OptionFactory, Outcome, Result, Status};

/// Which failures deserve another attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RetryPolicy {
	/// Treat a stalled decoder like any other transient failure.
	pub retry_on_frame_timeout: bool,
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			retry_on_frame_timeout: true,
		}
	}
}

impl RetryPolicy {
	pub fn is_retryable(&self, err: &Error) -> bool {
		match err {
			Error::Recoverable(_) => true,
			Error::FrameTimeout(_) => self.retry_on_frame_timeout,
			_ => false,
		}
	}
}

/// What an attempt gets to work with, besides its options.
pub struct Attempt<'a> {
	index: u32,
	cancel: &'a Cancel,
	listener: &'a mut dyn Listener,
}

impl<'a> Attempt<'a> {
	pub fn new(index: u32, cancel: &'a Cancel, listener: &'a mut dyn Listener) -> Self {
		Self {
			index,
			cancel,
			listener,
		}
	}

	/// 0 for the first attempt.
	pub fn index(&self) -> u32 {
		self.index
	}

	pub fn cancel(&self) -> &Cancel {
		self.cancel
	}

	/// Return [Error::Cancelled] if the job was cancelled.
	pub fn check(&self) -> Result<()> {
		self.cancel.check()
	}

	pub fn progress(&mut self, progress: f64) {
		self.listener.on_progress(progress.clamp(0.0, 1.0));
	}
}

/// Executes one attempt of a job with the given options.
pub trait Transcode<O>: Send {
	fn transcode(&mut self, options: O, attempt: &mut Attempt<'_>) -> Result<Status>;
}

impl<O, F> Transcode<O> for F
where
	F: FnMut(O, &mut Attempt<'_>) -> Result<Status> + Send,
{
	fn transcode(&mut self, options: O, attempt: &mut Attempt<'_>) -> Result<Status> {
		self(options, attempt)
	}
}

#[derive(Debug)]
struct RetryState {
	attempt: u32,
	max: u32,
	last: Option<Error>,
}

impl RetryState {
	fn new(max: u32) -> Self {
		Self {
			attempt: 0,
			max,
			last: None,
		}
	}

	fn can_retry(&self) -> bool {
		self.attempt < self.max
	}

	fn advance(&mut self, cause: Error) {
		self.attempt += 1;
		self.last = Some(cause);
	}
}

/// Drives a job: one attempt per configuration from the [OptionFactory] until one succeeds,
/// one fails for good, or the retries run out.
///
/// Every attempt starts from scratch; partial output of a failed attempt is overwritten.
pub struct RetryExecutor<F, T> {
	factory: F,
	transcode: T,
	listener: Box<dyn Listener>,
	policy: RetryPolicy,
}

impl<F, T> RetryExecutor<F, T>
where
	F: OptionFactory,
	T: Transcode<F::Options>,
{
	pub fn new(factory: F, transcode: T) -> Self {
		Self {
			factory,
			transcode,
			listener: Box::new(()),
			policy: RetryPolicy::default(),
		}
	}

	pub fn with_listener(mut self, listener: impl Listener + 'static) -> Self {
		self.listener = Box::new(listener);
		self
	}

	pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
		self.policy = policy;
		self
	}

	/// Run the job on the calling thread and notify the listener exactly once.
	pub fn run(mut self, cancel: &Cancel) -> Outcome {
		let outcome = Outcome::from(self.execute(cancel));

		match &outcome {
			Outcome::Completed(status) => tracing::info!(?status, "transcode completed"),
			Outcome::Failed(err) => tracing::warn!(%err, "transcode failed"),
			Outcome::Cancelled => tracing::info!("transcode cancelled"),
		}

		outcome.notify(self.listener.as_mut());
		outcome
	}

	fn execute(&mut self, cancel: &Cancel) -> Result<Status> {
		let mut state = RetryState::new(self.factory.max_retry_times());

		loop {
			cancel.check()?;

			tracing::debug!(attempt = state.attempt, max = state.max, "starting attempt");

			let err = match self.attempt(state.attempt, cancel) {
				Ok(status) => return Ok(status),
				// Whatever broke, it broke because we asked it to stop.
				Err(_) if cancel.is_cancelled() => return Err(Error::Cancelled),
				Err(err) => err,
			};

			if !self.policy.is_retryable(&err) {
				return Err(err);
			}

			if !state.can_retry() {
				tracing::warn!(attempts = state.attempt + 1, previous = ?state.last, "retries exhausted");
				return Err(err);
			}

			tracing::warn!(attempt = state.attempt, max = state.max, %err, "attempt failed, retrying");
			state.advance(err);
		}
	}

	// A panic in the factory or transcode surfaces as an unrecoverable error.
	fn attempt(&mut self, index: u32, cancel: &Cancel) -> Result<Status> {
		panic::catch_unwind(AssertUnwindSafe(|| {
			let options = self.factory.create(index)?;
			let mut attempt = Attempt::new(index, cancel, self.listener.as_mut());
			self.transcode.transcode(options, &mut attempt)
		}))
		.unwrap_or_else(|payload| {
			let reason = panic_message(payload.as_ref());
			tracing::error!(attempt = index, %reason, "attempt panicked");
			Err(Error::unrecoverable(anyhow::anyhow!("attempt panicked: {reason}")))
		})
	}
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
	match payload.downcast_ref::<&'static str>() {
		Some(message) => *message,
		None => payload.downcast_ref::<String>().map(String::as_str).unwrap_or("unknown"),
	}
}
