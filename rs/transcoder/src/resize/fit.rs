use super::{Resizer, require_positive};
use crate::{Error, Result, Size};

/// Scales the input down, preserving its ratio, until it fits within the bounds.
///
/// Inputs that already fit are returned unchanged.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AtMostResizer {
	minor: u32,
	major: u32,
}

impl AtMostResizer {
	/// Bound only the minor side.
	pub fn new(minor: u32) -> Result<Self> {
		Self::with_major(minor, u32::MAX)
	}

	pub fn with_major(minor: u32, major: u32) -> Result<Self> {
		let minor = require_positive("minor bound", minor)?;
		let major = require_positive("major bound", major)?;
		if minor > major {
			return Err(Error::InvalidConfig(format!(
				"minor bound {minor} exceeds major bound {major}"
			)));
		}

		Ok(Self { minor, major })
	}
}

impl Resizer for AtMostResizer {
	fn output_size(&self, input: Size) -> Size {
		if input.minor() <= self.minor && input.major() <= self.major {
			return input;
		}

		let minor_scale = input.minor() as f64 / self.minor as f64;
		let major_scale = input.major() as f64 / self.major as f64;
		let ratio = input.minor() as f64 / input.major() as f64;

		// Whichever side overflows the most is pinned to its bound.
		let (major, minor) = if major_scale >= minor_scale {
			(self.major, (self.major as f64 * ratio) as u32)
		} else {
			((self.minor as f64 / ratio) as u32, self.minor)
		};

		Size::new(major.max(1), minor.max(1))
	}
}

/// Crops the input to the given aspect ratio.
///
/// The ratio is orientation-agnostic: 16/9 and 9/16 are the same policy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AspectRatioResizer {
	ratio: f32,
}

impl AspectRatioResizer {
	pub fn new(ratio: f32) -> Result<Self> {
		if !(ratio.is_finite() && ratio > 0.0) {
			return Err(Error::InvalidConfig(format!("aspect ratio {ratio} must be positive")));
		}

		// Normalize to major / minor.
		let ratio = if ratio >= 1.0 { ratio } else { 1.0 / ratio };
		Ok(Self { ratio })
	}
}

impl Resizer for AspectRatioResizer {
	fn output_size(&self, input: Size) -> Size {
		let input_ratio = input.major() as f32 / input.minor() as f32;

		if input_ratio > self.ratio {
			// Wider than the target, reduce the major side.
			let major = (self.ratio * input.minor() as f32) as u32;
			Size::new(major.max(1), input.minor())
		} else if input_ratio < self.ratio {
			// Closer to square, reduce the minor side.
			let minor = (input.major() as f32 / self.ratio) as u32;
			Size::new(input.major(), minor.max(1))
		} else {
			input
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn at_most_fits_already() {
		let resizer = AtMostResizer::new(1080).unwrap();
		let input = Size::exact(1920, 1080);
		assert_eq!(resizer.output_size(input), input);
	}

	#[test]
	fn at_most_minor() {
		let resizer = AtMostResizer::new(720).unwrap();
		assert_eq!(resizer.output_size(Size::exact(1920, 1080)), Size::new(1280, 720));
		assert_eq!(resizer.output_size(Size::exact(1080, 1920)), Size::new(1280, 720));
	}

	#[test]
	fn at_most_major_wins() {
		// 2000x1000 into 900x1000: the major side overflows the most.
		let resizer = AtMostResizer::with_major(900, 1000).unwrap();
		assert_eq!(resizer.output_size(Size::exact(2000, 1000)), Size::new(1000, 500));
	}

	#[test]
	fn at_most_invalid() {
		assert!(AtMostResizer::new(0).is_err());
		assert!(AtMostResizer::with_major(1080, 720).is_err());
	}

	#[test]
	fn aspect_ratio_crops_major() {
		let resizer = AspectRatioResizer::new(1.0).unwrap();
		assert_eq!(resizer.output_size(Size::exact(1920, 1080)), Size::new(1080, 1080));
	}

	#[test]
	fn aspect_ratio_crops_minor() {
		let resizer = AspectRatioResizer::new(2.0).unwrap();
		assert_eq!(resizer.output_size(Size::exact(1600, 1200)), Size::new(1600, 800));
	}

	#[test]
	fn aspect_ratio_orientation_agnostic() {
		let landscape = AspectRatioResizer::new(2.0).unwrap();
		let portrait = AspectRatioResizer::new(0.5).unwrap();
		let input = Size::exact(1200, 1600);
		assert_eq!(landscape.output_size(input), portrait.output_size(input));
	}

	#[test]
	fn aspect_ratio_matching_input() {
		let resizer = AspectRatioResizer::new(2.0).unwrap();
		let input = Size::exact(1000, 2000);
		assert_eq!(resizer.output_size(input), input);
	}

	#[test]
	fn aspect_ratio_invalid() {
		assert!(AspectRatioResizer::new(0.0).is_err());
		assert!(AspectRatioResizer::new(f32::INFINITY).is_err());
	}
}
