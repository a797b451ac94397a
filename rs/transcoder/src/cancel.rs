use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::{Error, Result};

/// Something blocked that can be woken early.
pub trait Interrupt: Send + Sync {
	fn interrupt(&self);
}

#[derive(Default)]
struct State {
	requested: bool,
	interrupted: bool,
	hooks: Vec<Weak<dyn Interrupt>>,
}

/// A cooperative cancellation flag for one job.
///
/// Cancelling without interruption is only observed at explicit [Cancel::check] calls,
/// between frames and between attempts.
/// Cancelling with interruption additionally wakes every registered [Interrupt], which is how a
/// blocked frame wait returns early.
#[derive(Clone, Default)]
pub struct Cancel {
	state: Arc<Mutex<State>>,
}

impl Cancel {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn cancel(&self, may_interrupt: bool) {
		let hooks = {
			let mut state = self.state.lock();
			state.requested = true;

			if !may_interrupt || state.interrupted {
				return;
			}

			state.interrupted = true;
			std::mem::take(&mut state.hooks)
		};

		// Called without our lock held; the hooks take their own.
		for hook in hooks.iter().filter_map(Weak::upgrade) {
			hook.interrupt();
		}
	}

	pub fn is_cancelled(&self) -> bool {
		self.state.lock().requested
	}

	pub fn is_interrupted(&self) -> bool {
		self.state.lock().interrupted
	}

	/// Return [Error::Cancelled] if cancellation was requested.
	pub fn check(&self) -> Result<()> {
		match self.is_cancelled() {
			true => Err(Error::Cancelled),
			false => Ok(()),
		}
	}

	/// Wake `hook` on an interrupting cancel, immediately if one already happened.
	pub fn register(&self, hook: Weak<dyn Interrupt>) {
		let mut state = self.state.lock();
		if state.interrupted {
			drop(state);
			if let Some(hook) = hook.upgrade() {
				hook.interrupt();
			}
			return;
		}

		state.hooks.retain(|hook| hook.strong_count() > 0);
		state.hooks.push(hook);
	}
}

impl std::fmt::Debug for Cancel {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let state = self.state.lock();
		f.debug_struct("Cancel")
			.field("requested", &state.requested)
			.field("interrupted", &state.interrupted)
			.finish()
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use std::sync::atomic::{AtomicUsize, Ordering};

	#[derive(Default)]
	struct Counter(AtomicUsize);

	impl Interrupt for Counter {
		fn interrupt(&self) {
			self.0.fetch_add(1, Ordering::SeqCst);
		}
	}

	#[test]
	fn soft_cancel_does_not_interrupt() {
		let cancel = Cancel::new();
		let counter = Arc::new(Counter::default());
		cancel.register(Arc::downgrade(&counter) as Weak<dyn Interrupt>);

		assert!(cancel.check().is_ok());
		cancel.cancel(false);

		assert!(matches!(cancel.check(), Err(Error::Cancelled)));
		assert!(!cancel.is_interrupted());
		assert_eq!(counter.0.load(Ordering::SeqCst), 0);
	}

	#[test]
	fn interrupt_wakes_once() {
		let cancel = Cancel::new();
		let counter = Arc::new(Counter::default());
		cancel.register(Arc::downgrade(&counter) as Weak<dyn Interrupt>);

		cancel.cancel(true);
		cancel.cancel(true);

		assert!(cancel.is_interrupted());
		assert_eq!(counter.0.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn late_registration_is_woken() {
		let cancel = Cancel::new();
		cancel.cancel(true);

		let counter = Arc::new(Counter::default());
		cancel.register(Arc::downgrade(&counter) as Weak<dyn Interrupt>);
		assert_eq!(counter.0.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn dropped_hooks_are_skipped() {
		let cancel = Cancel::new();
		let counter = Arc::new(Counter::default());
		cancel.register(Arc::downgrade(&counter) as Weak<dyn Interrupt>);
		drop(counter);

		cancel.cancel(true);
		assert!(cancel.is_cancelled());
	}
}
