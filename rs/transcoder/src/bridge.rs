//! Hands decoded frames from a hardware decoder to the render thread, one at a time.
//!
//! The decoder writes into a surface owned by a [FrameBridge] and announces each frame through a
//! [FrameProducer], usually from a codec callback thread.
//! The render thread blocks in [FrameBridge::await_and_draw_frame] until that announcement arrives,
//! then latches the frame into the texture and draws it.
//!
//! There is exactly one slot.
//! The consumer must drain a frame before the next one is produced; a second announcement while
//! the slot is full would silently drop a frame, so it is a [Error::ProtocolViolation] instead.

use std::{
	sync::Arc,
	thread::{self, ThreadId},
	time::{Duration, Instant},
};

use parking_lot::{Condvar, Mutex};

use crate::{
	Cancel, Error, FrameTransform, Interrupt, RenderStrategy, Result, SurfaceId, SurfaceTexture,
};

/// How long to wait for the decoder before declaring it stalled.
pub const DEFAULT_FRAME_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Default)]
struct SlotState {
	// A frame landed in the surface and was not drawn yet.
	pending: bool,

	// Sticky: the producer overran the consumer.
	violation: bool,

	// Sticky: the job was cancelled with interruption.
	interrupted: bool,

	// Sticky: the bridge released its resources.
	released: bool,
}

#[derive(Default)]
struct Slot {
	state: Mutex<SlotState>,
	ready: Condvar,
}

impl Interrupt for Slot {
	fn interrupt(&self) {
		let mut state = self.state.lock();
		state.interrupted = true;
		self.ready.notify_all();
	}
}

/// Announces frames written into the bridge's surface.
///
/// Cloned freely and handed to the decoder; it may outlive the bridge.
#[derive(Clone)]
pub struct FrameProducer {
	slot: Arc<Slot>,
	surface: SurfaceId,
}

impl FrameProducer {
	/// The surface this producer announces frames for.
	pub fn surface(&self) -> SurfaceId {
		self.surface
	}

	/// Signal that a new frame landed in the surface.
	///
	/// Fails with [Error::ProtocolViolation] if the previous frame was not drawn yet.
	/// The violation is also reported to the consumer, so the job fails even if the caller
	/// ignores this result.
	pub fn on_frame_produced(&self) -> Result<()> {
		let mut state = self.slot.state.lock();

		if state.released {
			return Err(Error::Released);
		}

		if state.pending {
			state.violation = true;
			self.slot.ready.notify_all();

			tracing::error!(surface = %self.surface, "frame produced before the previous one was drawn");
			return Err(Error::ProtocolViolation);
		}

		tracing::trace!(surface = %self.surface, "frame produced");
		state.pending = true;
		self.slot.ready.notify_one();

		Ok(())
	}
}

impl std::fmt::Debug for FrameProducer {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("FrameProducer").field("surface", &self.surface).finish()
	}
}

// The GPU resources, released together exactly once.
struct RenderContext {
	strategy: Box<dyn RenderStrategy>,
	surface: Box<dyn SurfaceTexture>,
}

impl RenderContext {
	fn release(mut self) {
		self.strategy.on_destroy();
		self.surface.release();
	}
}

/// The consumer side of the slot, owning the render resources.
///
/// Releasing consumes the bridge, and dropping it releases it, so the resources are torn down
/// exactly once on every path.
pub struct FrameBridge {
	slot: Arc<Slot>,
	context: Option<RenderContext>,
	surface: SurfaceId,
	timeout: Duration,

	// Used by [Self::draw_frame].
	transform: FrameTransform,

	// The first thread to draw owns the render target.
	render_thread: Option<ThreadId>,
}

impl FrameBridge {
	/// Create the texture and surface through `strategy`.
	pub fn new(mut strategy: Box<dyn RenderStrategy>) -> Result<Self> {
		let surface = strategy.on_create()?;
		let id = surface.id();

		tracing::debug!(surface = %id, "created frame bridge");

		Ok(Self {
			slot: Arc::default(),
			context: Some(RenderContext { strategy, surface }),
			surface: id,
			timeout: DEFAULT_FRAME_TIMEOUT,
			transform: FrameTransform::default(),
			render_thread: None,
		})
	}

	/// Give up waiting for a frame after `timeout`.
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;
		self
	}

	/// Wake a blocked wait when `cancel` is cancelled with interruption.
	pub fn with_cancel(self, cancel: &Cancel) -> Self {
		let slot: Arc<dyn Interrupt> = self.slot.clone();
		cancel.register(Arc::downgrade(&slot));
		self
	}

	/// The surface the decoder should write into.
	pub fn surface(&self) -> SurfaceId {
		self.surface
	}

	pub fn producer(&self) -> FrameProducer {
		FrameProducer {
			slot: self.slot.clone(),
			surface: self.surface,
		}
	}

	pub fn timeout(&self) -> Duration {
		self.timeout
	}

	pub fn set_scale(&mut self, scale_x: f32, scale_y: f32) {
		self.transform.scale_x = scale_x;
		self.transform.scale_y = scale_y;
	}

	/// Clockwise rotation relative to the frame's natural orientation.
	pub fn set_rotation(&mut self, rotation: i32) {
		self.transform.rotation = rotation;
	}

	pub fn set_transform(&mut self, transform: FrameTransform) {
		self.transform = transform;
	}

	/// Wait for the next frame and draw it with the stored scale and rotation.
	pub fn draw_frame(&mut self) -> Result<()> {
		let FrameTransform {
			scale_x,
			scale_y,
			rotation,
		} = self.transform;
		self.await_and_draw_frame(scale_x, scale_y, rotation)
	}

	/// Wait for the next frame and draw it into the current render target.
	///
	/// Must always be called from the same thread, the one owning the render target.
	pub fn await_and_draw_frame(&mut self, scale_x: f32, scale_y: f32, rotation: i32) -> Result<()> {
		let current = thread::current().id();
		match self.render_thread {
			None => self.render_thread = Some(current),
			Some(owner) if owner != current => {
				return Err(Error::unrecoverable(anyhow::anyhow!(
					"frame drawn from {current:?}, render target owned by {owner:?}"
				)));
			}
			Some(_) => {}
		}

		self.await_frame()?;

		let context = self.context.as_mut().ok_or(Error::Released)?;

		// Latch the data.
		context.surface.update_tex_image()?;
		context
			.surface
			.transform_matrix(context.strategy.texture_transform());

		context.strategy.draw_frame(scale_x, scale_y, rotation)
	}

	fn await_frame(&self) -> Result<()> {
		let deadline = Instant::now() + self.timeout;
		let mut state = self.slot.state.lock();

		loop {
			if state.released {
				return Err(Error::Released);
			}

			if state.violation {
				return Err(Error::ProtocolViolation);
			}

			if state.interrupted {
				return Err(Error::Cancelled);
			}

			if state.pending {
				state.pending = false;
				return Ok(());
			}

			// Spurious wakeups loop around; only the deadline ends the wait.
			if self.slot.ready.wait_until(&mut state, deadline).timed_out()
				&& !(state.pending || state.violation || state.interrupted)
			{
				tracing::warn!(surface = %self.surface, timeout = ?self.timeout, "frame wait timed out");
				return Err(Error::FrameTimeout(self.timeout));
			}
		}
	}

	/// Tear down the strategy's resources, then the surface.
	pub fn release(mut self) {
		self.release_context();
	}

	fn release_context(&mut self) {
		let Some(context) = self.context.take() else {
			return;
		};

		self.slot.state.lock().released = true;
		context.release();

		tracing::debug!(surface = %self.surface, "released frame bridge");
	}
}

impl Drop for FrameBridge {
	fn drop(&mut self) {
		self.release_context();
	}
}

impl std::fmt::Debug for FrameBridge {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("FrameBridge")
			.field("surface", &self.surface)
			.field("timeout", &self.timeout)
			.field("released", &self.context.is_none())
			.finish()
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::{HeadlessStats, HeadlessStrategy};
	use std::sync::mpsc;

	fn bridge() -> (FrameBridge, Arc<HeadlessStats>) {
		let strategy = HeadlessStrategy::new();
		let stats = strategy.stats();
		let bridge = FrameBridge::new(Box::new(strategy)).unwrap();
		(bridge, stats)
	}

	#[test]
	fn produce_then_draw() {
		let (mut bridge, stats) = bridge();
		assert_eq!(stats.created(), 1);

		bridge.producer().on_frame_produced().unwrap();
		bridge.await_and_draw_frame(1.0, 1.0, 0).unwrap();

		assert_eq!(stats.latched(), 1);
		assert_eq!(stats.drawn(), 1);
	}

	#[tracing_test::traced_test]
	#[test]
	fn double_produce_is_violation() {
		let (mut bridge, stats) = bridge();
		let producer = bridge.producer();

		producer.on_frame_produced().unwrap();
		assert!(matches!(producer.on_frame_produced(), Err(Error::ProtocolViolation)));
		assert!(logs_contain("frame produced before the previous one was drawn"));

		// The consumer sees it too, rather than drawing one of the two frames.
		assert!(matches!(bridge.draw_frame(), Err(Error::ProtocolViolation)));
		assert_eq!(stats.drawn(), 0);
	}

	#[test]
	fn blocks_until_produced() {
		let (mut bridge, stats) = bridge();
		let producer = bridge.producer();

		let start = Instant::now();
		let handle = thread::spawn(move || {
			thread::sleep(Duration::from_millis(100));
			producer.on_frame_produced()
		});

		bridge.await_and_draw_frame(1.0, 1.0, 0).unwrap();
		assert!(start.elapsed() >= Duration::from_millis(90));
		assert_eq!(stats.drawn(), 1);

		handle.join().unwrap().unwrap();
	}

	#[test]
	fn times_out_without_frame() {
		let (bridge, stats) = bridge();
		let mut bridge = bridge.with_timeout(Duration::from_millis(50));

		let start = Instant::now();
		let err = bridge.await_and_draw_frame(1.0, 1.0, 0).unwrap_err();

		assert!(matches!(err, Error::FrameTimeout(timeout) if timeout == Duration::from_millis(50)));
		assert!(start.elapsed() >= Duration::from_millis(50));
		assert!(start.elapsed() < Duration::from_secs(5));
		assert_eq!(stats.drawn(), 0);
	}

	#[test]
	fn interrupt_wakes_wait() {
		let cancel = Cancel::new();
		let (bridge, _stats) = bridge();
		let mut bridge = bridge.with_cancel(&cancel);

		let start = Instant::now();
		let canceller = {
			let cancel = cancel.clone();
			thread::spawn(move || {
				thread::sleep(Duration::from_millis(50));
				cancel.cancel(true);
			})
		};

		let err = bridge.await_and_draw_frame(1.0, 1.0, 0).unwrap_err();
		assert!(err.is_cancelled());
		assert!(start.elapsed() < DEFAULT_FRAME_TIMEOUT);

		canceller.join().unwrap();
	}

	#[test]
	fn soft_cancel_does_not_wake_wait() {
		let cancel = Cancel::new();
		let (bridge, _stats) = bridge();
		let mut bridge = bridge.with_cancel(&cancel).with_timeout(Duration::from_millis(100));

		cancel.cancel(false);
		assert!(matches!(bridge.draw_frame(), Err(Error::FrameTimeout(_))));
	}

	#[test]
	fn frames_alternate() {
		const FRAMES: usize = 100;

		let (mut bridge, stats) = bridge();
		let producer = bridge.producer();

		// The decoder releases the next buffer only when asked, like a real codec.
		let (request, requests) = mpsc::channel::<()>();
		let decoder = thread::spawn(move || {
			for _ in requests.iter().take(FRAMES) {
				producer.on_frame_produced()?;
			}
			Ok::<_, Error>(())
		});

		for _ in 0..FRAMES {
			request.send(()).unwrap();
			bridge.await_and_draw_frame(1.0, 1.0, 0).unwrap();
		}

		decoder.join().unwrap().unwrap();
		assert_eq!(stats.drawn(), FRAMES as u64);
	}

	#[test]
	fn stored_transform() {
		let strategy = HeadlessStrategy::new();
		let mut bridge = FrameBridge::new(Box::new(strategy)).unwrap();
		bridge.set_scale(2.0, 1.0);
		bridge.set_rotation(90);

		bridge.producer().on_frame_produced().unwrap();
		bridge.draw_frame().unwrap();
		assert_eq!(bridge.transform.scale_x, 2.0);
		assert_eq!(bridge.transform.rotation, 90);
	}

	#[test]
	fn release_once() {
		let (bridge, stats) = bridge();
		let producer = bridge.producer();

		bridge.release();
		assert_eq!(stats.destroyed(), 1);
		assert_eq!(stats.surfaces_released(), 1);

		// Nothing can be produced into a released surface.
		assert!(matches!(producer.on_frame_produced(), Err(Error::Released)));
	}

	#[test]
	fn drop_releases_once() {
		let (bridge, stats) = bridge();
		drop(bridge);

		assert_eq!(stats.destroyed(), 1);
		assert_eq!(stats.surfaces_released(), 1);
	}

	#[test]
	fn render_thread_is_pinned() {
		let (mut bridge, _stats) = bridge();
		bridge.producer().on_frame_produced().unwrap();
		bridge.draw_frame().unwrap();

		let producer = bridge.producer();
		let err = thread::spawn(move || {
			producer.on_frame_produced().unwrap();
			bridge.draw_frame()
		})
		.join()
		.unwrap()
		.unwrap_err();

		assert!(matches!(err, Error::Unrecoverable(_)));
	}
}
