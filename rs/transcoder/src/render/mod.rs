//! Rendering of decoded frames into the active render target.
//!
//! # Architecture
//!
//! A [RenderStrategy] is the GPU backend:
//! 1. [RenderStrategy::on_create] allocates a texture and wraps it in a [SurfaceTexture].
//! 2. The decoder writes frames into that surface, see [crate::FrameBridge].
//! 3. Each latched frame is drawn with [RenderStrategy::draw_frame] into whatever render target
//!    is current on the calling thread.
//! 4. [RenderStrategy::on_destroy] frees the GPU resources.
//!
//! # Threading
//!
//! Render calls are bound to the thread that owns the current render target.
//! Strategies are [Send] so they can be created on one thread and moved to the render thread,
//! but nothing here is [Sync].

mod headless;

pub use headless::*;

use std::fmt;

use crate::{Result, Size};

/// A 4x4 column-major texture coordinate transform, as reported by the surface for each frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextureTransform(pub [f32; 16]);

impl TextureTransform {
	pub const IDENTITY: Self = Self([
		1.0, 0.0, 0.0, 0.0, //
		0.0, 1.0, 0.0, 0.0, //
		0.0, 0.0, 1.0, 0.0, //
		0.0, 0.0, 0.0, 1.0, //
	]);
}

impl Default for TextureTransform {
	fn default() -> Self {
		Self::IDENTITY
	}
}

/// Identifies the surface handed to the decoder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SurfaceId(pub u64);

impl fmt::Display for SurfaceId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "surface-{}", self.0)
	}
}

/// The writable surface backing a texture.
pub trait SurfaceTexture: Send {
	fn id(&self) -> SurfaceId;

	/// Latch the most recently produced image into the texture.
	fn update_tex_image(&mut self) -> Result<()>;

	/// The transform of the latched image.
	fn transform_matrix(&self, out: &mut TextureTransform);

	fn release(&mut self);
}

/// A GPU backend that draws latched frames.
pub trait RenderStrategy: Send {
	/// Allocate the texture and the surface that wraps it.
	fn on_create(&mut self) -> Result<Box<dyn SurfaceTexture>>;

	/// Storage for the transform of the next frame to draw.
	fn texture_transform(&mut self) -> &mut TextureTransform;

	/// Draw the latched frame into the current render target.
	fn draw_frame(&mut self, scale_x: f32, scale_y: f32, rotation: i32) -> Result<()>;

	fn on_destroy(&mut self);
}

/// How a frame is placed into the render target.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameTransform {
	pub scale_x: f32,
	pub scale_y: f32,

	/// Clockwise degrees, a multiple of 90.
	pub rotation: i32,
}

impl Default for FrameTransform {
	fn default() -> Self {
		Self {
			scale_x: 1.0,
			scale_y: 1.0,
			rotation: 0,
		}
	}
}

impl FrameTransform {
	/// Fill an `output` sized target with an `input` sized frame, cropping the excess.
	///
	/// `rotation` is applied first, so a 90° rotation compares the flipped input.
	pub fn crop_to_fill(input: (u32, u32), output: (u32, u32), rotation: i32) -> Self {
		let rotation = normalize_rotation(rotation);
		let (width, height) = match rotation {
			90 | 270 => (input.1, input.0),
			_ => input,
		};

		let input_ratio = width as f32 / height as f32;
		let output_ratio = output.0 as f32 / output.1 as f32;

		let (scale_x, scale_y) = if input_ratio > output_ratio {
			(input_ratio / output_ratio, 1.0)
		} else if input_ratio < output_ratio {
			(1.0, output_ratio / input_ratio)
		} else {
			(1.0, 1.0)
		};

		Self {
			scale_x,
			scale_y,
			rotation,
		}
	}
}

/// Clamp any rotation into `0..360`.
pub fn normalize_rotation(rotation: i32) -> i32 {
	rotation.rem_euclid(360)
}

/// The (width, height) of `size` after a clockwise rotation.
pub fn rotated(size: Size, rotation: i32) -> Size {
	match normalize_rotation(rotation) {
		90 | 270 => size.flipped(),
		_ => size,
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn crop_same_ratio() {
		let transform = FrameTransform::crop_to_fill((1920, 1080), (1280, 720), 0);
		assert_eq!(transform, FrameTransform::default());
	}

	#[test]
	fn crop_wider_input() {
		let transform = FrameTransform::crop_to_fill((1920, 1080), (1080, 1080), 0);
		assert!((transform.scale_x - 16.0 / 9.0).abs() < 1e-5);
		assert_eq!(transform.scale_y, 1.0);
	}

	#[test]
	fn crop_taller_input() {
		let transform = FrameTransform::crop_to_fill((1080, 1080), (1920, 1080), 0);
		assert_eq!(transform.scale_x, 1.0);
		assert!((transform.scale_y - 16.0 / 9.0).abs() < 1e-5);
	}

	#[test]
	fn crop_rotated() {
		// A portrait recording stored as landscape fills a portrait target once rotated.
		let transform = FrameTransform::crop_to_fill((1920, 1080), (720, 1280), 90);
		assert_eq!(transform.scale_x, 1.0);
		assert_eq!(transform.scale_y, 1.0);
		assert_eq!(transform.rotation, 90);
	}

	#[test]
	fn rotation_normalized() {
		assert_eq!(normalize_rotation(-90), 270);
		assert_eq!(normalize_rotation(450), 90);
		assert_eq!(rotated(Size::exact(1920, 1080), -90), Size::exact(1080, 1920));
		assert_eq!(rotated(Size::exact(1920, 1080), 180), Size::exact(1920, 1080));
	}
}
