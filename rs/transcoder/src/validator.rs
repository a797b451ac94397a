use std::fmt;

/// What the pipeline would do with a track.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TrackStatus {
	/// The input has no such track.
	Absent,

	/// The track is dropped from the output.
	Removing,

	/// The track is copied without re-encoding.
	PassThrough,

	/// The track is decoded and re-encoded.
	Compressing,
}

impl TrackStatus {
	/// The output differs from the input for this track.
	pub fn is_transcoding(&self) -> bool {
		matches!(self, Self::Compressing | Self::Removing)
	}
}

/// Decides whether a transcode is needed at all.
pub trait Validator: fmt::Debug + Send + Sync {
	/// Return false to skip the job and report [crate::Status::NotNeeded].
	fn validate(&self, video: TrackStatus, audio: TrackStatus) -> bool;
}

/// Transcode only if at least one track changes.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultValidator;

impl Validator for DefaultValidator {
	fn validate(&self, video: TrackStatus, audio: TrackStatus) -> bool {
		video.is_transcoding() || audio.is_transcoding()
	}
}

/// Always transcode, e.g. to force a remux into the output container.
#[derive(Clone, Copy, Debug, Default)]
pub struct WriteAlwaysValidator;

impl Validator for WriteAlwaysValidator {
	fn validate(&self, _video: TrackStatus, _audio: TrackStatus) -> bool {
		true
	}
}
