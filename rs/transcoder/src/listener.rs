use crate::Error;

/// How a successful job ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Status {
	/// The output was written.
	Transcoded = 0,

	/// The validator decided the input could be used as-is.
	NotNeeded = 1,
}

impl Status {
	/// The integer reported to listeners on the other side of an FFI boundary.
	pub fn code(&self) -> u8 {
		*self as u8
	}
}

/// The terminal result of a job.
#[derive(Clone, Debug)]
pub enum Outcome {
	Completed(Status),
	Failed(Error),
	Cancelled,
}

impl Outcome {
	pub fn is_success(&self) -> bool {
		matches!(self, Self::Completed(_))
	}

	/// Deliver this outcome to the matching listener callback.
	pub fn notify(&self, listener: &mut dyn Listener) {
		match self {
			Self::Completed(status) => listener.on_completed(*status),
			Self::Failed(err) => listener.on_failure(err),
			Self::Cancelled => listener.on_cancelled(),
		}
	}
}

impl From<crate::Result<Status>> for Outcome {
	fn from(result: crate::Result<Status>) -> Self {
		match result {
			Ok(status) => Self::Completed(status),
			Err(Error::Cancelled) => Self::Cancelled,
			Err(err) => Self::Failed(err),
		}
	}
}

/// Observes a job.
///
/// Exactly one of the terminal callbacks is invoked per job, from the worker thread.
pub trait Listener: Send {
	/// Fraction of the current attempt completed, in `0.0..=1.0`.
	fn on_progress(&mut self, _progress: f64) {}

	fn on_completed(&mut self, status: Status);

	fn on_failure(&mut self, err: &Error);

	fn on_cancelled(&mut self);
}

/// Ignores everything.
impl Listener for () {
	fn on_completed(&mut self, _status: Status) {}
	fn on_failure(&mut self, _err: &Error) {}
	fn on_cancelled(&mut self) {}
}

#[cfg(test)]
mod test {
	use super::*;

	#[derive(Default)]
	struct Recorder(Vec<String>);

	impl Listener for Recorder {
		fn on_completed(&mut self, status: Status) {
			self.0.push(format!("completed {}", status.code()));
		}

		fn on_failure(&mut self, err: &Error) {
			self.0.push(format!("failed {err}"));
		}

		fn on_cancelled(&mut self) {
			self.0.push("cancelled".into());
		}
	}

	#[test]
	fn status_codes() {
		assert_eq!(Status::Transcoded.code(), 0);
		assert_eq!(Status::NotNeeded.code(), 1);
	}

	#[test]
	fn notify_dispatches() {
		let mut recorder = Recorder::default();
		Outcome::Completed(Status::NotNeeded).notify(&mut recorder);
		Outcome::Failed(Error::ProtocolViolation).notify(&mut recorder);
		Outcome::Cancelled.notify(&mut recorder);

		assert_eq!(
			recorder.0,
			[
				"completed 1",
				"failed protocol violation: frame produced before the previous one was drawn",
				"cancelled"
			]
		);
	}

	#[test]
	fn from_result() {
		assert!(matches!(Outcome::from(Err(Error::Cancelled)), Outcome::Cancelled));
		assert!(Outcome::from(Ok(Status::Transcoded)).is_success());
		assert!(matches!(Outcome::from(Err(Error::Busy)), Outcome::Failed(Error::Busy)));
	}
}
