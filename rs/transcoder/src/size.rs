//! Frame dimensions.
//!
//! A [Size] is either loose, a (major, minor) pair that is oriented later to match the input,
//! or exact, a (width, height) pair that is used verbatim.

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Size {
	/// Orientation-agnostic dimensions.
	Loose { major: u32, minor: u32 },

	/// Dimensions with a fixed orientation.
	Exact { width: u32, height: u32 },
}

impl Size {
	/// A loose size from two sides in any order.
	pub fn new(first: u32, second: u32) -> Self {
		Self::Loose {
			major: first.max(second),
			minor: first.min(second),
		}
	}

	pub fn exact(width: u32, height: u32) -> Self {
		Self::Exact { width, height }
	}

	pub fn major(&self) -> u32 {
		match *self {
			Self::Loose { major, .. } => major,
			Self::Exact { width, height } => width.max(height),
		}
	}

	pub fn minor(&self) -> u32 {
		match *self {
			Self::Loose { minor, .. } => minor,
			Self::Exact { width, height } => width.min(height),
		}
	}

	pub fn is_exact(&self) -> bool {
		matches!(self, Self::Exact { .. })
	}

	/// Both sides are non-zero.
	pub fn is_positive(&self) -> bool {
		self.minor() > 0
	}

	/// Resolve to (width, height).
	///
	/// Exact sizes are returned as-is. Loose sizes follow the orientation of `reference`:
	/// landscape (or square) references put the major side horizontally.
	/// A loose reference has no orientation and counts as landscape.
	pub fn oriented(&self, reference: Size) -> (u32, u32) {
		match *self {
			Self::Exact { width, height } => (width, height),
			Self::Loose { major, minor } => {
				let landscape = match reference {
					Self::Exact { width, height } => width >= height,
					Self::Loose { .. } => true,
				};

				if landscape { (major, minor) } else { (minor, major) }
			}
		}
	}

	/// The same dimensions with width and height swapped, as after a 90° rotation.
	pub fn flipped(&self) -> Self {
		match *self {
			Self::Exact { width, height } => Self::Exact {
				width: height,
				height: width,
			},
			loose => loose,
		}
	}
}

impl fmt::Display for Size {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match *self {
			Self::Exact { width, height } => write!(f, "{width}x{height}"),
			Self::Loose { major, minor } => write!(f, "{major}~{minor}"),
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn loose_sorts_sides() {
		assert_eq!(Size::new(720, 1280), Size::Loose { major: 1280, minor: 720 });
		assert_eq!(Size::new(1280, 720), Size::new(720, 1280));
	}

	#[test]
	fn exact_keeps_orientation() {
		let size = Size::exact(720, 1280);
		assert_eq!(size.major(), 1280);
		assert_eq!(size.minor(), 720);
		assert_eq!(size.oriented(Size::exact(1920, 1080)), (720, 1280));
	}

	#[test]
	fn loose_follows_reference() {
		let size = Size::new(640, 360);
		assert_eq!(size.oriented(Size::exact(1920, 1080)), (640, 360));
		assert_eq!(size.oriented(Size::exact(1080, 1920)), (360, 640));
		assert_eq!(size.oriented(Size::exact(500, 500)), (640, 360));
	}

	#[test]
	fn flipped() {
		assert_eq!(Size::exact(1920, 1080).flipped(), Size::exact(1080, 1920));
		assert_eq!(Size::new(1920, 1080).flipped(), Size::new(1920, 1080));
	}
}
