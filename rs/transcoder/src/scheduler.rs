//! Runs at most one job at a time on a dedicated worker thread.

use std::{
	panic::{self, AssertUnwindSafe},
	sync::Arc,
	thread,
	time::{Duration, Instant},
};

use parking_lot::{Condvar, Mutex};

use crate::{Cancel, Error, OptionFactory, Outcome, Result, RetryExecutor, Status, Transcode};

/// Where a job is in its lifecycle.
///
/// `Idle → Running → {Completed, Failed, Cancelled}`; the last three are terminal.
#[derive(Clone, Debug, Default)]
pub enum JobState {
	#[default]
	Idle,
	Running,
	Completed(Status),
	Failed(Error),
	Cancelled,
}

impl JobState {
	pub fn is_running(&self) -> bool {
		matches!(self, Self::Running)
	}

	pub fn is_finished(&self) -> bool {
		matches!(self, Self::Completed(_) | Self::Failed(_) | Self::Cancelled)
	}
}

impl From<Outcome> for JobState {
	fn from(outcome: Outcome) -> Self {
		match outcome {
			Outcome::Completed(status) => Self::Completed(status),
			Outcome::Failed(err) => Self::Failed(err),
			Outcome::Cancelled => Self::Cancelled,
		}
	}
}

/// A unit of work for the [JobScheduler].
pub trait Job: Send + 'static {
	fn run(self, cancel: &Cancel) -> Outcome;
}

impl<F, T> Job for RetryExecutor<F, T>
where
	F: OptionFactory + 'static,
	T: Transcode<F::Options> + 'static,
{
	fn run(self, cancel: &Cancel) -> Outcome {
		RetryExecutor::run(self, cancel)
	}
}

#[derive(Default)]
struct Shared {
	state: Mutex<JobState>,
	finished: Condvar,
}

/// Observes and cancels one submitted job.
#[derive(Clone)]
pub struct JobHandle {
	id: u64,
	shared: Arc<Shared>,
	cancel: Cancel,
}

impl JobHandle {
	fn new(id: u64) -> Self {
		Self {
			id,
			shared: Arc::new(Shared {
				state: Mutex::new(JobState::Running),
				finished: Condvar::new(),
			}),
			cancel: Cancel::new(),
		}
	}

	pub fn id(&self) -> u64 {
		self.id
	}

	pub fn state(&self) -> JobState {
		self.shared.state.lock().clone()
	}

	pub fn is_finished(&self) -> bool {
		self.shared.state.lock().is_finished()
	}

	/// See [JobScheduler::cancel].
	pub fn cancel(&self, may_interrupt: bool) {
		tracing::debug!(job = self.id, may_interrupt, "cancelling job");
		self.cancel.cancel(may_interrupt);
	}

	/// Block until the job reaches a terminal state.
	pub fn wait(&self) -> JobState {
		let mut state = self.shared.state.lock();
		while !state.is_finished() {
			self.shared.finished.wait(&mut state);
		}
		state.clone()
	}

	/// Like [Self::wait], giving up after `timeout`.
	pub fn wait_timeout(&self, timeout: Duration) -> Option<JobState> {
		let deadline = Instant::now() + timeout;
		let mut state = self.shared.state.lock();

		while !state.is_finished() {
			if self.shared.finished.wait_until(&mut state, deadline).timed_out() {
				break;
			}
		}

		state.is_finished().then(|| state.clone())
	}

	fn finish(&self, outcome: Outcome) {
		let mut state = self.shared.state.lock();
		*state = outcome.into();
		self.shared.finished.notify_all();
	}
}

impl std::fmt::Debug for JobHandle {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("JobHandle")
			.field("id", &self.id)
			.field("state", &self.state())
			.finish()
	}
}

struct Active {
	handle: JobHandle,
	thread: thread::JoinHandle<()>,
}

impl Active {
	fn join(self) {
		// The worker catches job panics, so this only fails if finishing itself panicked.
		if self.thread.join().is_err() {
			tracing::error!(job = self.handle.id, "worker thread panicked");
		}
	}
}

/// Executes jobs off the calling thread, one at a time.
///
/// Jobs own GPU resources that must never be used concurrently, so a second job is only
/// started once the previous worker has exited.
pub struct JobScheduler {
	name: String,
	next_id: u64,
	active: Option<Active>,
}

impl Default for JobScheduler {
	fn default() -> Self {
		Self::new()
	}
}

impl JobScheduler {
	pub fn new() -> Self {
		Self::with_name("transcode")
	}

	/// Name worker threads `{name}-{job}`.
	pub fn with_name(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			next_id: 0,
			active: None,
		}
	}

	/// Start `job` on a new worker, failing with [Error::Busy] while another job is running.
	pub fn submit(&mut self, job: impl Job) -> Result<JobHandle> {
		if self.active.as_ref().is_some_and(|active| !active.handle.is_finished()) {
			return Err(Error::Busy);
		}

		self.reap();
		self.spawn(job)
	}

	/// Start `job` after interrupting the running one and waiting for it to exit.
	pub fn replace(&mut self, job: impl Job) -> Result<JobHandle> {
		if let Some(active) = self.active.take() {
			if !active.handle.is_finished() {
				tracing::info!(job = active.handle.id, "replacing running job");
				active.handle.cancel(true);
			}
			active.join();
		}

		self.spawn(job)
	}

	/// Cancel the active job, if any.
	///
	/// With `may_interrupt`, a blocked frame wait returns immediately.
	/// Otherwise the job stops at its next check, between frames or attempts.
	pub fn cancel(&self, may_interrupt: bool) {
		if let Some(active) = &self.active {
			active.handle.cancel(may_interrupt);
		}
	}

	/// The state of the most recent job, or [JobState::Idle] if there was none.
	pub fn state(&self) -> JobState {
		match &self.active {
			Some(active) => active.handle.state(),
			None => JobState::Idle,
		}
	}

	/// The most recent job.
	pub fn active(&self) -> Option<JobHandle> {
		self.active.as_ref().map(|active| active.handle.clone())
	}

	fn reap(&mut self) {
		if let Some(active) = self.active.take() {
			active.join();
		}
	}

	fn spawn(&mut self, job: impl Job) -> Result<JobHandle> {
		let id = self.next_id;
		self.next_id += 1;

		let handle = JobHandle::new(id);
		let worker = handle.clone();

		let thread = thread::Builder::new()
			.name(format!("{}-{}", self.name, id))
			.spawn(move || {
				let span = tracing::info_span!("job", id);
				let _entered = span.enter();

				let outcome = panic::catch_unwind(AssertUnwindSafe(|| job.run(&worker.cancel))).unwrap_or_else(|_| {
					tracing::error!("job panicked");
					Outcome::Failed(Error::unrecoverable(anyhow::anyhow!("job panicked")))
				});

				worker.finish(outcome);
			})
			.map_err(Error::unrecoverable)?;

		tracing::debug!(job = id, "submitted job");

		self.active = Some(Active {
			handle: handle.clone(),
			thread,
		});

		Ok(handle)
	}
}

impl Drop for JobScheduler {
	fn drop(&mut self) {
		if let Some(active) = self.active.take() {
			active.handle.cancel(true);
			active.join();
		}
	}
}
