use std::{fmt, path::Path, str::FromStr, time::Duration};

use anyhow::Context;
use transcoder::{DEFAULT_FRAME_TIMEOUT, ResizePolicy, RetryPolicy};

use crate::simulate::Simulation;

/// Parameters of a simulated transcode.
///
/// Every field is optional so a TOML file and the command line can be layered; flags win.
#[derive(clap::Args, Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields, default)]
#[non_exhaustive]
pub struct SimulateConfig {
	/// Width of the synthetic input (default: 1920).
	#[arg(long, env = "TRANSCODER_WIDTH")]
	#[serde(skip_serializing_if = "Option::is_none")]
	pub width: Option<u32>,

	/// Height of the synthetic input (default: 1080).
	#[arg(long, env = "TRANSCODER_HEIGHT")]
	#[serde(skip_serializing_if = "Option::is_none")]
	pub height: Option<u32>,

	/// Rotation metadata of the synthetic input, in clockwise degrees.
	#[arg(long = "input-rotation", env = "TRANSCODER_INPUT_ROTATION")]
	#[serde(skip_serializing_if = "Option::is_none")]
	pub input_rotation: Option<i32>,

	/// Number of frames to decode (default: 300).
	#[arg(long, env = "TRANSCODER_FRAMES")]
	#[serde(skip_serializing_if = "Option::is_none")]
	pub frames: Option<u64>,

	/// Time the decoder takes per frame (default: 1ms).
	#[arg(long, env = "TRANSCODER_INTERVAL", value_parser = humantime::parse_duration)]
	#[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
	pub interval: Option<Duration>,

	/// Stop announcing frames at this index, simulating a hung decoder.
	#[arg(long = "stall-at", env = "TRANSCODER_STALL_AT")]
	#[serde(skip_serializing_if = "Option::is_none")]
	pub stall_at: Option<u64>,

	/// Fail this many attempts halfway with a recoverable error.
	#[arg(long = "failing-attempts", env = "TRANSCODER_FAILING_ATTEMPTS")]
	#[serde(skip_serializing_if = "Option::is_none")]
	pub failing_attempts: Option<u32>,

	/// How many times a failed attempt is retried (default: 2).
	#[arg(long, env = "TRANSCODER_RETRIES")]
	#[serde(skip_serializing_if = "Option::is_none")]
	pub retries: Option<u32>,

	/// Give up on a stalled decoder after this long (default: 10s).
	#[arg(long = "frame-timeout", env = "TRANSCODER_FRAME_TIMEOUT", value_parser = humantime::parse_duration)]
	#[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
	pub frame_timeout: Option<Duration>,

	/// Retry attempts that failed with a frame timeout (default: true).
	#[arg(long = "retry-on-frame-timeout", env = "TRANSCODER_RETRY_ON_FRAME_TIMEOUT")]
	#[serde(skip_serializing_if = "Option::is_none")]
	pub retry_on_frame_timeout: Option<bool>,

	/// Rotate the output by this many clockwise degrees.
	#[arg(long, env = "TRANSCODER_ROTATE")]
	#[serde(skip_serializing_if = "Option::is_none")]
	pub rotate: Option<i32>,

	/// Transcode even if the output would match the input.
	#[arg(long = "write-always", env = "TRANSCODER_WRITE_ALWAYS")]
	#[serde(skip_serializing_if = "Option::is_none")]
	pub write_always: Option<bool>,

	/// The output size policy, ex. `exact:1280x720`, `at-most:720`, `fraction:0.5`.
	///
	/// Chains can only be configured in a file.
	#[arg(long, env = "TRANSCODER_RESIZE", value_parser = parse_resize)]
	#[serde(skip_serializing_if = "Option::is_none")]
	pub resize: Option<ResizePolicy>,
}

impl SimulateConfig {
	pub fn load(path: &Path) -> anyhow::Result<Self> {
		let raw = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
		toml::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
	}

	/// Overlay the values set in `flags`.
	pub fn merge(self, flags: Self) -> Self {
		Self {
			width: flags.width.or(self.width),
			height: flags.height.or(self.height),
			input_rotation: flags.input_rotation.or(self.input_rotation),
			frames: flags.frames.or(self.frames),
			interval: flags.interval.or(self.interval),
			stall_at: flags.stall_at.or(self.stall_at),
			failing_attempts: flags.failing_attempts.or(self.failing_attempts),
			retries: flags.retries.or(self.retries),
			frame_timeout: flags.frame_timeout.or(self.frame_timeout),
			retry_on_frame_timeout: flags.retry_on_frame_timeout.or(self.retry_on_frame_timeout),
			rotate: flags.rotate.or(self.rotate),
			write_always: flags.write_always.or(self.write_always),
			resize: flags.resize.or(self.resize),
		}
	}

	/// Fill in the defaults and validate.
	pub fn resolve(self) -> anyhow::Result<Simulation> {
		let (width, height) = (self.width.unwrap_or(1920), self.height.unwrap_or(1080));
		anyhow::ensure!(width > 0 && height > 0, "input size must be positive: {width}x{height}");

		let resize = self.resize.unwrap_or_default();
		resize.build().context("invalid resize policy")?;

		Ok(Simulation {
			width,
			height,
			input_rotation: self.input_rotation.unwrap_or(0),
			frames: self.frames.unwrap_or(300),
			interval: self.interval.unwrap_or(Duration::from_millis(1)),
			stall_at: self.stall_at,
			failing_attempts: self.failing_attempts.unwrap_or(0),
			retries: self.retries.unwrap_or(2),
			frame_timeout: self.frame_timeout.unwrap_or(DEFAULT_FRAME_TIMEOUT),
			policy: RetryPolicy {
				retry_on_frame_timeout: self.retry_on_frame_timeout.unwrap_or(true),
			},
			rotate: self.rotate.unwrap_or(0),
			write_always: self.write_always.unwrap_or(false),
			resize,
		})
	}
}

/// Parse `policy[:args]` from the command line.
fn parse_resize(value: &str) -> Result<ResizePolicy, String> {
	let (policy, args) = value.split_once(':').unwrap_or((value, ""));

	let policy = match policy {
		"pass-through" => ResizePolicy::PassThrough,
		"exact" => {
			let (width, height) = args.split_once('x').ok_or("expected exact:<width>x<height>")?;
			ResizePolicy::Exact {
				width: number("width", width)?,
				height: number("height", height)?,
			}
		}
		"fraction" => ResizePolicy::Fraction {
			fraction: number("fraction", args)?,
		},
		"at-most" => match args.split_once('x') {
			Some((minor, major)) => ResizePolicy::AtMost {
				minor: number("minor", minor)?,
				major: Some(number("major", major)?),
			},
			None => ResizePolicy::AtMost {
				minor: number("minor", args)?,
				major: None,
			},
		},
		"aspect-ratio" => ResizePolicy::AspectRatio {
			ratio: number("ratio", args)?,
		},
		"multiple-of" => ResizePolicy::MultipleOf {
			multiple: number("multiple", args)?,
		},
		other => return Err(format!("unknown resize policy: {other}")),
	};

	Ok(policy)
}

fn number<T>(name: &str, raw: &str) -> Result<T, String>
where
	T: FromStr,
	T::Err: fmt::Display,
{
	raw.trim().parse().map_err(|err| format!("invalid {name} {raw:?}: {err}"))
}

#[cfg(test)]
mod test {
	use super::*;
	use std::io::Write;

	#[test]
	fn parse_policies() {
		assert_eq!(parse_resize("pass-through"), Ok(ResizePolicy::PassThrough));
		assert_eq!(
			parse_resize("exact:1280x720"),
			Ok(ResizePolicy::Exact {
				width: 1280,
				height: 720
			})
		);
		assert_eq!(
			parse_resize("at-most:720"),
			Ok(ResizePolicy::AtMost {
				minor: 720,
				major: None
			})
		);
		assert_eq!(
			parse_resize("at-most:720x1280"),
			Ok(ResizePolicy::AtMost {
				minor: 720,
				major: Some(1280)
			})
		);
		assert_eq!(parse_resize("multiple-of:16"), Ok(ResizePolicy::MultipleOf { multiple: 16 }));
		assert_eq!(parse_resize("fraction:0.5"), Ok(ResizePolicy::Fraction { fraction: 0.5 }));

		assert!(parse_resize("exact:1280").is_err());
		assert!(parse_resize("stretch").is_err());
		assert!(parse_resize("multiple-of:x").is_err());
	}

	#[test]
	fn load_toml() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		write!(
			file,
			r#"
			frames = 30
			interval = "5ms"
			frame_timeout = "2s"

			[resize]
			policy = "chain"
			steps = [
				{{ policy = "at_most", minor = 720 }},
				{{ policy = "multiple_of", multiple = 16 }},
			]
			"#
		)
		.unwrap();

		let config = SimulateConfig::load(file.path()).unwrap();
		assert_eq!(config.frames, Some(30));
		assert_eq!(config.interval, Some(Duration::from_millis(5)));
		assert_eq!(config.frame_timeout, Some(Duration::from_secs(2)));
		assert!(matches!(config.resize, Some(ResizePolicy::Chain { ref steps }) if steps.len() == 2));

		let simulation = config.resolve().unwrap();
		assert_eq!(simulation.frames, 30);
		assert_eq!(simulation.retries, 2);
		assert!(simulation.policy.retry_on_frame_timeout);
	}

	#[test]
	fn unknown_fields_rejected() {
		assert!(toml::from_str::<SimulateConfig>("framez = 3").is_err());
	}

	#[test]
	fn flags_override_file() {
		let file = SimulateConfig {
			frames: Some(30),
			retries: Some(5),
			..Default::default()
		};
		let flags = SimulateConfig {
			frames: Some(10),
			..Default::default()
		};

		let merged = file.merge(flags);
		assert_eq!(merged.frames, Some(10));
		assert_eq!(merged.retries, Some(5));
	}

	#[test]
	fn invalid_policy_rejected() {
		let config = SimulateConfig {
			resize: Some(ResizePolicy::MultipleOf { multiple: 0 }),
			..Default::default()
		};
		assert!(config.resolve().is_err());
	}
}
