//! The stock decode → render → encode loop for one attempt.

use std::time::Duration;

use crate::{
	Attempt, DEFAULT_FRAME_TIMEOUT, DefaultValidator, Error, FrameBridge, FrameTransform, PassThroughResizer,
	RenderStrategy, Resizer, Result, Size, Status, TrackStatus, Transcode, Validator, VideoDecoder, VideoEncoder,
	VideoFormat, normalize_rotation, rotated,
};

/// Everything one attempt needs, created fresh by the [crate::OptionFactory] for each attempt.
pub struct TranscodeOptions {
	decoder: Option<Box<dyn VideoDecoder>>,
	encoder: Box<dyn VideoEncoder>,
	renderer: Box<dyn RenderStrategy>,
	resizer: Box<dyn Resizer>,
	validator: Box<dyn Validator>,

	// Requested on top of the input's own rotation.
	rotation: i32,
	audio: TrackStatus,
	frame_timeout: Duration,
}

impl TranscodeOptions {
	/// Options without a video track; add one with [Self::with_decoder].
	pub fn new(encoder: impl VideoEncoder + 'static, renderer: impl RenderStrategy + 'static) -> Self {
		Self {
			decoder: None,
			encoder: Box::new(encoder),
			renderer: Box::new(renderer),
			resizer: Box::new(PassThroughResizer),
			validator: Box::new(DefaultValidator),
			rotation: 0,
			audio: TrackStatus::Absent,
			frame_timeout: DEFAULT_FRAME_TIMEOUT,
		}
	}

	pub fn with_decoder(mut self, decoder: impl VideoDecoder + 'static) -> Self {
		self.decoder = Some(Box::new(decoder));
		self
	}

	pub fn with_resizer(mut self, resizer: impl Resizer + 'static) -> Self {
		self.resizer = Box::new(resizer);
		self
	}

	pub fn with_validator(mut self, validator: impl Validator + 'static) -> Self {
		self.validator = Box::new(validator);
		self
	}

	/// Clockwise degrees, a multiple of 90.
	pub fn with_rotation(mut self, rotation: i32) -> Self {
		self.rotation = rotation;
		self
	}

	/// What happens to the audio track, which is handled outside of this pipeline.
	pub fn with_audio(mut self, audio: TrackStatus) -> Self {
		self.audio = audio;
		self
	}

	pub fn with_frame_timeout(mut self, timeout: Duration) -> Self {
		self.frame_timeout = timeout;
		self
	}
}

impl std::fmt::Debug for TranscodeOptions {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("TranscodeOptions")
			.field("video", &self.decoder.is_some())
			.field("resizer", &self.resizer)
			.field("validator", &self.validator)
			.field("rotation", &self.rotation)
			.field("audio", &self.audio)
			.field("frame_timeout", &self.frame_timeout)
			.finish_non_exhaustive()
	}
}

/// The output geometry of a video track.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VideoPlan {
	pub width: u32,
	pub height: u32,
	pub transform: FrameTransform,
	pub status: TrackStatus,
}

impl VideoPlan {
	/// Resize the input, as displayed after `rotation` on top of its own, and crop it to fill.
	pub fn new(format: &VideoFormat, resizer: &dyn Resizer, rotation: i32) -> Result<Self> {
		let input = Size::exact(format.width, format.height);
		if !input.is_positive() {
			return Err(Error::unrecoverable(anyhow::anyhow!("invalid input size: {input}")));
		}

		let total = normalize_rotation(normalize_rotation(format.rotation) + normalize_rotation(rotation));
		let displayed = rotated(input, total);

		let output = resizer.output_size(displayed);
		if !output.is_positive() {
			return Err(Error::unrecoverable(anyhow::anyhow!(
				"resizer produced {output} for {displayed}"
			)));
		}

		let (width, height) = output.oriented(displayed);
		let transform = FrameTransform::crop_to_fill((format.width, format.height), (width, height), total);

		let status = match normalize_rotation(rotation) == 0 && Size::exact(width, height) == displayed {
			true => TrackStatus::PassThrough,
			false => TrackStatus::Compressing,
		};

		Ok(Self {
			width,
			height,
			transform,
			status,
		})
	}
}

/// Transcodes the video track through a [FrameBridge], one frame at a time.
#[derive(Clone, Copy, Debug, Default)]
pub struct VideoPipeline;

impl VideoPipeline {
	pub fn new() -> Self {
		Self
	}

	fn pump(
		decoder: &mut dyn VideoDecoder,
		encoder: &mut dyn VideoEncoder,
		bridge: &mut FrameBridge,
		frames: Option<u64>,
		attempt: &mut Attempt<'_>,
	) -> Result<u64> {
		let mut drawn = 0;

		loop {
			attempt.check()?;

			let Some(timestamp) = decoder.release_frame()? else {
				break;
			};

			bridge.draw_frame()?;
			encoder.encode(timestamp)?;
			drawn += 1;

			if let Some(total) = frames.filter(|total| *total > 0) {
				attempt.progress(drawn as f64 / total as f64);
			}
		}

		encoder.finish()?;
		Ok(drawn)
	}
}

impl Transcode<TranscodeOptions> for VideoPipeline {
	fn transcode(&mut self, options: TranscodeOptions, attempt: &mut Attempt<'_>) -> Result<Status> {
		let TranscodeOptions {
			decoder,
			mut encoder,
			renderer,
			resizer,
			validator,
			rotation,
			audio,
			frame_timeout,
		} = options;

		attempt.check()?;

		let Some(mut decoder) = decoder else {
			if !validator.validate(TrackStatus::Absent, audio) {
				return Ok(Status::NotNeeded);
			}

			encoder.finish()?;
			return Ok(Status::Transcoded);
		};

		let format = decoder.format()?;
		let plan = VideoPlan::new(&format, resizer.as_ref(), rotation)?;

		tracing::debug!(attempt = attempt.index(), ?format, ?plan, "planned video track");

		if !validator.validate(plan.status, audio) {
			tracing::info!(video = ?plan.status, ?audio, "transcode not needed");
			return Ok(Status::NotNeeded);
		}

		let mut bridge = FrameBridge::new(renderer)?
			.with_timeout(frame_timeout)
			.with_cancel(attempt.cancel());
		bridge.set_transform(plan.transform);

		encoder.start(plan.width, plan.height)?;
		decoder.start(bridge.producer())?;

		let result = Self::pump(decoder.as_mut(), encoder.as_mut(), &mut bridge, format.frames, attempt);

		// No more frames may land in the surface once it is gone.
		decoder.stop();
		bridge.release();

		let drawn = result?;
		tracing::debug!(attempt = attempt.index(), drawn, "video track done");

		Ok(Status::Transcoded)
	}
}
