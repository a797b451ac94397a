use std::sync::{
	Arc,
	atomic::{AtomicU64, Ordering},
};

use super::{FrameTransform, RenderStrategy, SurfaceId, SurfaceTexture, TextureTransform};
use crate::Result;

static NEXT_SURFACE: AtomicU64 = AtomicU64::new(1);

/// Counters shared between a [HeadlessStrategy] and whoever wants to inspect it.
#[derive(Debug, Default)]
pub struct HeadlessStats {
	created: AtomicU64,
	latched: AtomicU64,
	drawn: AtomicU64,
	destroyed: AtomicU64,
	surfaces_released: AtomicU64,
}

impl HeadlessStats {
	pub fn created(&self) -> u64 {
		self.created.load(Ordering::Acquire)
	}

	pub fn latched(&self) -> u64 {
		self.latched.load(Ordering::Acquire)
	}

	pub fn drawn(&self) -> u64 {
		self.drawn.load(Ordering::Acquire)
	}

	pub fn destroyed(&self) -> u64 {
		self.destroyed.load(Ordering::Acquire)
	}

	pub fn surfaces_released(&self) -> u64 {
		self.surfaces_released.load(Ordering::Acquire)
	}
}

/// A render strategy without a GPU.
///
/// Draw calls are counted instead of executed, which is enough to exercise the pipeline's
/// synchronization in dry runs and tests.
#[derive(Debug, Default)]
pub struct HeadlessStrategy {
	stats: Arc<HeadlessStats>,
	transform: TextureTransform,
	last: Option<FrameTransform>,
}

impl HeadlessStrategy {
	pub fn new() -> Self {
		Self::default()
	}

	/// Count into existing stats, e.g. to observe every attempt of a job at once.
	pub fn with_stats(stats: Arc<HeadlessStats>) -> Self {
		Self {
			stats,
			..Default::default()
		}
	}

	pub fn stats(&self) -> Arc<HeadlessStats> {
		self.stats.clone()
	}

	/// The placement of the most recent draw.
	pub fn last_frame(&self) -> Option<FrameTransform> {
		self.last
	}
}

impl RenderStrategy for HeadlessStrategy {
	fn on_create(&mut self) -> Result<Box<dyn SurfaceTexture>> {
		self.stats.created.fetch_add(1, Ordering::AcqRel);

		let id = SurfaceId(NEXT_SURFACE.fetch_add(1, Ordering::Relaxed));
		tracing::debug!(%id, "created headless surface");

		Ok(Box::new(HeadlessSurface {
			id,
			stats: self.stats.clone(),
		}))
	}

	fn texture_transform(&mut self) -> &mut TextureTransform {
		&mut self.transform
	}

	fn draw_frame(&mut self, scale_x: f32, scale_y: f32, rotation: i32) -> Result<()> {
		self.last = Some(FrameTransform {
			scale_x,
			scale_y,
			rotation,
		});
		self.stats.drawn.fetch_add(1, Ordering::AcqRel);
		Ok(())
	}

	fn on_destroy(&mut self) {
		self.stats.destroyed.fetch_add(1, Ordering::AcqRel);
	}
}

struct HeadlessSurface {
	id: SurfaceId,
	stats: Arc<HeadlessStats>,
}

impl SurfaceTexture for HeadlessSurface {
	fn id(&self) -> SurfaceId {
		self.id
	}

	fn update_tex_image(&mut self) -> Result<()> {
		self.stats.latched.fetch_add(1, Ordering::AcqRel);
		Ok(())
	}

	fn transform_matrix(&self, out: &mut TextureTransform) {
		*out = TextureTransform::IDENTITY;
	}

	fn release(&mut self) {
		self.stats.surfaces_released.fetch_add(1, Ordering::AcqRel);
	}
}
