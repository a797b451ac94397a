use super::{Resizer, require_positive};
use crate::{Result, Size};

/// Always returns the configured size.
///
/// The input aspect ratio is ignored: a mismatch stretches the frame rather than failing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExactResizer {
	output: Size,
}

impl ExactResizer {
	pub fn new(width: u32, height: u32) -> Result<Self> {
		Self::from_size(Size::exact(width, height))
	}

	/// Use any size, loose or exact, as the output.
	pub fn from_size(output: Size) -> Result<Self> {
		require_positive("exact output side", output.minor())?;
		Ok(Self { output })
	}

	pub fn size(&self) -> Size {
		self.output
	}
}

impl Resizer for ExactResizer {
	fn output_size(&self, _input: Size) -> Size {
		self.output
	}
}

/// Returns the input unchanged.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PassThroughResizer;

impl Resizer for PassThroughResizer {
	fn output_size(&self, input: Size) -> Size {
		input
	}
}
