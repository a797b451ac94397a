use std::{
	sync::{
		Arc,
		atomic::{AtomicU64, Ordering},
		mpsc,
	},
	thread,
	time::Duration,
};

use transcoder::{
	Error, FrameProducer, HeadlessStats, HeadlessStrategy, Job, Listener, ResizePolicy, Result, RetryExecutor,
	RetryPolicy, Status, TranscodeOptions, VideoDecoder, VideoEncoder, VideoFormat, VideoPipeline,
	WriteAlwaysValidator, option_factory,
};

/// A fully resolved simulation, see [crate::config::SimulateConfig].
#[derive(Clone, Debug)]
pub struct Simulation {
	pub width: u32,
	pub height: u32,
	pub input_rotation: i32,
	pub frames: u64,
	pub interval: Duration,
	pub stall_at: Option<u64>,
	pub failing_attempts: u32,
	pub retries: u32,
	pub frame_timeout: Duration,
	pub policy: RetryPolicy,
	pub rotate: i32,
	pub write_always: bool,
	pub resize: ResizePolicy,
}

/// What the simulated hardware did, across every attempt.
#[derive(Debug, Default)]
pub struct Counters {
	pub render: Arc<HeadlessStats>,
	pub encoded: AtomicU64,
	pub finished: AtomicU64,
}

impl Simulation {
	fn options(&self, attempt: u32, counters: &Arc<Counters>) -> Result<TranscodeOptions> {
		let decoder = SyntheticDecoder {
			format: VideoFormat {
				width: self.width,
				height: self.height,
				rotation: self.input_rotation,
				frames: Some(self.frames),
			},
			interval: self.interval,
			stall_at: self.stall_at,
			fail_at: (attempt < self.failing_attempts).then_some(self.frames / 2),
			released: 0,
			requests: None,
			thread: None,
		};

		let encoder = CountingEncoder {
			counters: counters.clone(),
		};

		let options = TranscodeOptions::new(encoder, HeadlessStrategy::with_stats(counters.render.clone()))
			.with_decoder(decoder)
			.with_resizer(self.resize.build()?)
			.with_rotation(self.rotate)
			.with_frame_timeout(self.frame_timeout);

		Ok(match self.write_always {
			true => options.with_validator(WriteAlwaysValidator),
			false => options,
		})
	}

	/// Build the job, counting into `counters`.
	pub fn job(self, counters: Arc<Counters>, listener: impl Listener + 'static) -> impl Job {
		let retries = self.retries;
		let policy = self.policy;

		let factory = option_factory(retries, move |attempt| {
			tracing::info!(attempt, "creating options");
			self.options(attempt, &counters)
		});

		RetryExecutor::new(factory, VideoPipeline::new())
			.with_policy(policy)
			.with_listener(listener)
	}
}

// Releases frames on its own thread, like a hardware codec's output callback.
struct SyntheticDecoder {
	format: VideoFormat,
	interval: Duration,
	stall_at: Option<u64>,
	fail_at: Option<u64>,
	released: u64,
	requests: Option<mpsc::Sender<()>>,
	thread: Option<thread::JoinHandle<()>>,
}

impl VideoDecoder for SyntheticDecoder {
	fn format(&self) -> Result<VideoFormat> {
		Ok(self.format)
	}

	fn start(&mut self, output: FrameProducer) -> Result<()> {
		let (tx, rx) = mpsc::channel::<()>();
		let interval = self.interval;

		let thread = thread::Builder::new()
			.name(format!("decoder-{}", output.surface()))
			.spawn(move || {
				for _ in rx {
					thread::sleep(interval);
					if let Err(err) = output.on_frame_produced() {
						tracing::warn!(%err, "decoder output rejected");
						return;
					}
				}
			})
			.map_err(Error::recoverable)?;

		self.requests = Some(tx);
		self.thread = Some(thread);

		Ok(())
	}

	fn release_frame(&mut self) -> Result<Option<Duration>> {
		let index = self.released;
		if Some(index) == self.format.frames {
			return Ok(None);
		}

		if Some(index) == self.fail_at {
			return Err(Error::recoverable(anyhow::anyhow!("synthetic decoder failure at frame {index}")));
		}

		self.released += 1;

		if Some(index) != self.stall_at {
			let requests = self
				.requests
				.as_ref()
				.ok_or_else(|| Error::unrecoverable(anyhow::anyhow!("decoder not started")))?;
			requests.send(()).map_err(Error::recoverable)?;
		}

		let index = u32::try_from(index).unwrap_or(u32::MAX);
		Ok(Some(self.interval.saturating_mul(index)))
	}

	fn stop(&mut self) {
		self.requests.take();
		if let Some(thread) = self.thread.take() {
			if thread.join().is_err() {
				tracing::error!("decoder thread panicked");
			}
		}
	}
}

struct CountingEncoder {
	counters: Arc<Counters>,
}

impl VideoEncoder for CountingEncoder {
	fn start(&mut self, width: u32, height: u32) -> Result<()> {
		tracing::info!(width, height, "encoder started");
		Ok(())
	}

	fn encode(&mut self, timestamp: Duration) -> Result<()> {
		tracing::trace!(?timestamp, "encoded frame");
		self.counters.encoded.fetch_add(1, Ordering::Relaxed);
		Ok(())
	}

	fn finish(&mut self) -> Result<()> {
		self.counters.finished.fetch_add(1, Ordering::Relaxed);
		Ok(())
	}
}

/// Logs progress in 10% steps.
#[derive(Debug, Default)]
pub struct Report {
	step: u32,
}

impl Listener for Report {
	fn on_progress(&mut self, progress: f64) {
		let step = (progress * 10.0) as u32;
		if step > self.step {
			self.step = step;
			tracing::info!(percent = step * 10, "progress");
		}
	}

	fn on_completed(&mut self, status: Status) {
		tracing::info!(?status, code = status.code(), "completed");
	}

	fn on_failure(&mut self, err: &Error) {
		tracing::error!(%err, "failed");
	}

	fn on_cancelled(&mut self) {
		tracing::warn!("cancelled");
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use transcoder::{Cancel, Outcome};

	fn simulation() -> Simulation {
		Simulation {
			width: 1920,
			height: 1080,
			input_rotation: 0,
			frames: 20,
			interval: Duration::ZERO,
			stall_at: None,
			failing_attempts: 0,
			retries: 2,
			frame_timeout: Duration::from_secs(5),
			policy: RetryPolicy::default(),
			rotate: 0,
			write_always: false,
			resize: ResizePolicy::AtMost {
				minor: 720,
				major: None,
			},
		}
	}

	#[test]
	fn completes() {
		let counters = Arc::new(Counters::default());
		let outcome = simulation().job(counters.clone(), ()).run(&Cancel::new());

		assert!(matches!(outcome, Outcome::Completed(Status::Transcoded)));
		assert_eq!(counters.encoded.load(Ordering::Relaxed), 20);
		assert_eq!(counters.render.drawn(), 20);
		assert_eq!(counters.render.destroyed(), 1);
	}

	#[test]
	fn recovers_from_failing_attempts() {
		let counters = Arc::new(Counters::default());
		let simulation = Simulation {
			failing_attempts: 2,
			..simulation()
		};

		let outcome = simulation.job(counters.clone(), ()).run(&Cancel::new());
		assert!(outcome.is_success());

		// Two half attempts, then a full one.
		assert_eq!(counters.encoded.load(Ordering::Relaxed), 10 + 10 + 20);
		assert_eq!(counters.finished.load(Ordering::Relaxed), 1);
		assert_eq!(counters.render.created(), 3);
		assert_eq!(counters.render.destroyed(), 3);
	}

	#[test]
	fn stall_times_out() {
		let counters = Arc::new(Counters::default());
		let simulation = Simulation {
			stall_at: Some(5),
			retries: 0,
			frame_timeout: Duration::from_millis(50),
			..simulation()
		};

		let outcome = simulation.job(counters.clone(), ()).run(&Cancel::new());
		assert!(matches!(outcome, Outcome::Failed(Error::FrameTimeout(_))));
		assert_eq!(counters.render.destroyed(), 1);
	}

	#[test]
	fn timestamps_saturate() {
		let mut decoder = SyntheticDecoder {
			format: VideoFormat {
				width: 1920,
				height: 1080,
				rotation: 0,
				frames: None,
			},
			interval: Duration::from_millis(1),
			stall_at: Some(u64::from(u32::MAX) + 1),
			fail_at: None,
			released: u64::from(u32::MAX) + 1,
			requests: None,
			thread: None,
		};

		// Past u32::MAX frames the index is clamped rather than wrapped to 0.
		assert_eq!(decoder.release_frame().unwrap(), Some(Duration::from_millis(u64::from(u32::MAX))));

		decoder.interval = Duration::MAX;
		decoder.stall_at = Some(decoder.released);
		assert_eq!(decoder.release_frame().unwrap(), Some(Duration::MAX));
	}

	#[test]
	fn pass_through_not_needed() {
		let counters = Arc::new(Counters::default());
		let simulation = Simulation {
			width: 1280,
			height: 720,
			..simulation()
		};

		let outcome = simulation.job(counters.clone(), ()).run(&Cancel::new());
		assert!(matches!(outcome, Outcome::Completed(Status::NotNeeded)));
		assert_eq!(counters.render.created(), 0);
	}
}
