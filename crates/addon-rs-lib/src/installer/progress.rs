use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Sent after every attempted action of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
	/// Zero based position of the action in the queue.
	pub action_index: usize,
	pub total_actions: usize,
	pub outcome: ProgressOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressOutcome {
	Executed,
	Failed,
}

/// Shared flag to stop a run between actions.
///
/// Cloning gives another handle to the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn cancel(&self) {
		self.0.store(true, Ordering::SeqCst);
	}

	pub fn is_cancelled(&self) -> bool {
		self.0.load(Ordering::SeqCst)
	}
}
