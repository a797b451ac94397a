use crate::Result;

/// Produces the configuration for each attempt of a job.
///
/// `create` must return equivalent options when called twice with the same attempt, but is free
/// to degrade across attempts, e.g. lowering the bitrate or resolution for a retry.
pub trait OptionFactory: Send {
	type Options;

	fn create(&mut self, attempt: u32) -> Result<Self::Options>;

	/// How many times a failed attempt may be retried; 0 means a single attempt.
	fn max_retry_times(&self) -> u32;
}

/// An [OptionFactory] backed by a closure.
pub struct FnOptionFactory<F> {
	max_retry_times: u32,
	create: F,
}

impl<F> std::fmt::Debug for FnOptionFactory<F> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("FnOptionFactory")
			.field("max_retry_times", &self.max_retry_times)
			.finish_non_exhaustive()
	}
}

impl<O, F> OptionFactory for FnOptionFactory<F>
where
	F: FnMut(u32) -> Result<O> + Send,
{
	type Options = O;

	fn create(&mut self, attempt: u32) -> Result<O> {
		(self.create)(attempt)
	}

	fn max_retry_times(&self) -> u32 {
		self.max_retry_times
	}
}

/// Build an [OptionFactory] from a closure called with the attempt index.
pub fn option_factory<O, F>(max_retry_times: u32, create: F) -> FnOptionFactory<F>
where
	F: FnMut(u32) -> Result<O> + Send,
{
	FnOptionFactory {
		max_retry_times,
		create,
	}
}
