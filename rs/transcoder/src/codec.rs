//! The hardware codec stages, treated as black boxes.
//!
//! A [VideoDecoder] writes decoded frames into a surface and announces them through a
//! [FrameProducer]; a [VideoEncoder] consumes whatever was rendered into its input surface.
//! Container demuxing and muxing happen behind these traits.

use std::time::Duration;

use crate::{FrameProducer, Result};

/// The decoded video track, as reported by the demuxer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VideoFormat {
	pub width: u32,
	pub height: u32,

	/// Clockwise degrees needed to display the frames upright.
	pub rotation: i32,

	/// The number of frames, if known, used for progress reporting.
	pub frames: Option<u64>,
}

pub trait VideoDecoder: Send {
	fn format(&self) -> Result<VideoFormat>;

	/// Start decoding into the producer's surface.
	fn start(&mut self, output: FrameProducer) -> Result<()>;

	/// Release the next decoded frame into the surface.
	///
	/// The frame is announced asynchronously through the producer.
	/// Returns its presentation timestamp, or None at the end of the stream.
	fn release_frame(&mut self) -> Result<Option<Duration>>;

	/// Stop decoding; no frames are announced afterwards.
	fn stop(&mut self) {}
}

pub trait VideoEncoder: Send {
	fn start(&mut self, width: u32, height: u32) -> Result<()>;

	/// Encode the frame that was just rendered into the input surface.
	fn encode(&mut self, timestamp: Duration) -> Result<()>;

	/// Drain and finalize the output.
	fn finish(&mut self) -> Result<()>;
}
