use super::{Resizer, require_positive};
use crate::{Error, Result, Size};

/// Apply `f` to both sides, keeping the input's orientation if it has one.
fn map_sides(input: Size, f: impl Fn(u32) -> u32) -> Size {
	match input {
		Size::Exact { width, height } => Size::exact(f(width), f(height)),
		Size::Loose { major, minor } => Size::new(f(major), f(minor)),
	}
}

/// Scales both sides by a fraction in `(0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FractionResizer {
	fraction: f32,
}

impl FractionResizer {
	pub fn new(fraction: f32) -> Result<Self> {
		if !(fraction > 0.0 && fraction <= 1.0) {
			return Err(Error::InvalidConfig(format!("fraction {fraction} not in (0, 1]")));
		}

		Ok(Self { fraction })
	}
}

impl Resizer for FractionResizer {
	fn output_size(&self, input: Size) -> Size {
		map_sides(input, |side| ((side as f32 * self.fraction) as u32).max(1))
	}
}

/// Snaps both sides down to a multiple of some value, never going below it.
///
/// Encoders commonly require dimensions aligned to 2 or 16.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MultipleResizer {
	multiple: u32,
}

impl MultipleResizer {
	pub fn new(multiple: u32) -> Result<Self> {
		let multiple = require_positive("multiple", multiple)?;
		Ok(Self { multiple })
	}
}

impl Resizer for MultipleResizer {
	fn output_size(&self, input: Size) -> Size {
		map_sides(input, |side| (side / self.multiple * self.multiple).max(self.multiple))
	}
}
