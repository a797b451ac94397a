//! Output geometry policies.
//!
//! A [Resizer] decides the output dimensions of a video track from its input dimensions.
//! Every implementation is a pure function of its configuration and the input, so they compose
//! freely with [ChainResizer] and can be tested without a pipeline.
//!
//! Configuration is validated when a resizer is constructed; [Resizer::output_size] itself never
//! fails for an input with positive dimensions.

mod exact;
mod fit;
mod scale;

pub use exact::*;
pub use fit::*;
pub use scale::*;

use std::fmt;

use crate::{Error, Result, Size};

/// Computes the output size of a track.
pub trait Resizer: fmt::Debug + Send + Sync {
	fn output_size(&self, input: Size) -> Size;
}

impl<R: Resizer + ?Sized> Resizer for Box<R> {
	fn output_size(&self, input: Size) -> Size {
		(**self).output_size(input)
	}
}

impl<R: Resizer + ?Sized> Resizer for std::sync::Arc<R> {
	fn output_size(&self, input: Size) -> Size {
		(**self).output_size(input)
	}
}

/// Applies resizers in order, feeding each the output of the previous one.
#[derive(Debug, Default)]
pub struct ChainResizer {
	resizers: Vec<Box<dyn Resizer>>,
}

impl ChainResizer {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with(mut self, resizer: impl Resizer + 'static) -> Self {
		self.resizers.push(Box::new(resizer));
		self
	}

	pub fn push(&mut self, resizer: Box<dyn Resizer>) {
		self.resizers.push(resizer);
	}

	pub fn len(&self) -> usize {
		self.resizers.len()
	}

	pub fn is_empty(&self) -> bool {
		self.resizers.is_empty()
	}
}

impl Resizer for ChainResizer {
	fn output_size(&self, input: Size) -> Size {
		self.resizers
			.iter()
			.fold(input, |size, resizer| resizer.output_size(size))
	}
}

/// A serializable description of a resizer, used by configuration files and flags.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "policy", rename_all = "snake_case"))]
pub enum ResizePolicy {
	#[default]
	PassThrough,
	Exact {
		width: u32,
		height: u32,
	},
	Fraction {
		fraction: f32,
	},
	AtMost {
		minor: u32,
		#[cfg_attr(feature = "serde", serde(default))]
		major: Option<u32>,
	},
	AspectRatio {
		ratio: f32,
	},
	MultipleOf {
		multiple: u32,
	},
	Chain {
		steps: Vec<ResizePolicy>,
	},
}

impl ResizePolicy {
	/// Validate the configuration and build the resizer.
	pub fn build(&self) -> Result<Box<dyn Resizer>> {
		Ok(match self {
			Self::PassThrough => Box::new(PassThroughResizer),
			Self::Exact { width, height } => Box::new(ExactResizer::new(*width, *height)?),
			Self::Fraction { fraction } => Box::new(FractionResizer::new(*fraction)?),
			Self::AtMost { minor, major } => match major {
				Some(major) => Box::new(AtMostResizer::with_major(*minor, *major)?),
				None => Box::new(AtMostResizer::new(*minor)?),
			},
			Self::AspectRatio { ratio } => Box::new(AspectRatioResizer::new(*ratio)?),
			Self::MultipleOf { multiple } => Box::new(MultipleResizer::new(*multiple)?),
			Self::Chain { steps } => {
				let mut chain = ChainResizer::new();
				for step in steps {
					chain.push(step.build()?);
				}
				Box::new(chain)
			}
		})
	}
}

fn require_positive(name: &str, value: u32) -> Result<u32> {
	match value {
		0 => Err(Error::InvalidConfig(format!("{name} must be positive"))),
		value => Ok(value),
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn chain_applies_in_order() {
		let chain = ChainResizer::new()
			.with(FractionResizer::new(0.5).unwrap())
			.with(MultipleResizer::new(16).unwrap());

		// 1920x1080 -> 960x540 -> 960x528
		assert_eq!(chain.output_size(Size::exact(1920, 1080)), Size::exact(960, 528));
	}

	#[test]
	fn empty_chain_is_identity() {
		let input = Size::exact(1280, 720);
		assert_eq!(ChainResizer::new().output_size(input), input);
	}

	#[test]
	fn policy_builds_nested_chain() {
		let policy = ResizePolicy::Chain {
			steps: vec![
				ResizePolicy::AtMost { minor: 720, major: None },
				ResizePolicy::MultipleOf { multiple: 2 },
			],
		};

		let resizer = policy.build().unwrap();
		assert_eq!(resizer.output_size(Size::exact(3840, 2160)), Size::new(1280, 720));
	}

	#[test]
	fn policy_rejects_invalid() {
		assert!(matches!(
			ResizePolicy::Fraction { fraction: 1.5 }.build(),
			Err(Error::InvalidConfig(_))
		));
		assert!(matches!(
			ResizePolicy::Chain {
				steps: vec![ResizePolicy::MultipleOf { multiple: 0 }]
			}
			.build(),
			Err(Error::InvalidConfig(_))
		));
	}
}
