//! Ordered execution of [`InstallerAction`]s with rollback on failure.

use std::collections::HashSet;
use std::path::PathBuf;

use super::action::{ActionExecutionError, ActionStatus, InstallerAction, Receipt, RollbackError};
use super::progress::{CancelToken, ProgressEvent, ProgressOutcome};

#[derive(Debug, Clone)]
pub struct QueueOptions {
	/// Refuse to create a queue containing an action that can't be undone.
	pub require_rollback_safety: bool,
}

impl Default for QueueOptions {
	fn default() -> Self {
		Self { require_rollback_safety: true }
	}
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
	#[error("custom action `{name}` at position {index} has no reverse procedure.")]
	IrreversibleAction { index: usize, name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
	Completed,
	/// The action at `index` failed, nothing after it was attempted.
	Failed { index: usize },
	/// Cancellation was observed before the action at `before` started.
	Cancelled { before: usize },
}

#[derive(Debug)]
pub struct ActionOutcome {
	/// Human readable form of the action.
	pub description: String,
	pub status: ActionStatus,
	pub error: Option<ActionExecutionError>,
	pub rollback_error: Option<RollbackError>,
}

/// Outcome of a single [`InstallerQueue::run()`].
#[derive(Debug)]
pub struct RunResult {
	pub success: bool,
	pub status: RunStatus,
	/// One per action in queue order.
	pub outcomes: Vec<ActionOutcome>,
	/// Indices of the actions that were undone, in the order they were undone.
	pub rolled_back: Vec<usize>,
	/// Leftovers that couldn't be discarded after a successful run, the install itself is still complete.
	pub cleanup_failures: Vec<(usize, std::io::Error)>,
}

pub type InstallResult = RunResult;
pub type UninstallResult = RunResult;

impl RunResult {
	pub fn is_cancelled(&self) -> bool {
		matches!(self.status, RunStatus::Cancelled { .. })
	}

	/// The action that stopped the run.
	pub fn failed_action(&self) -> Option<(usize, &ActionExecutionError)> {
		self.outcomes.iter()
			.enumerate()
			.find_map(|(i, o)| o.error.as_ref().map(|e| (i, e)))
	}

	/// Undos that could not complete, in queue order.
	pub fn rollback_failures(&self) -> impl Iterator<Item = (usize, &RollbackError)> {
		self.outcomes.iter()
			.enumerate()
			.filter_map(|(i, o)| o.rollback_error.as_ref().map(|e| (i, e)))
	}
}

/// Executes actions strictly in order, one at a time.
///
/// If an action fails, or cancellation is requested between actions, every action that already
/// executed is undone in reverse order. Failed undos are recorded and the remaining ones are still attempted.
///
/// The queue itself holds no state between runs.
#[derive(Debug)]
pub struct InstallerQueue {
	actions: Vec<InstallerAction>,
	options: QueueOptions,
}

impl InstallerQueue {
	/// # Errors
	/// [`QueueError::IrreversibleAction`] when `options` requires rollback safety and a custom action has no reverse.
	pub fn new(actions: Vec<InstallerAction>, options: QueueOptions) -> Result<Self, QueueError> {
		if options.require_rollback_safety {
			for (index, action) in actions.iter().enumerate() {
				if let InstallerAction::Custom(custom) = action {
					if !action.is_reversible() {
						return Err(QueueError::IrreversibleAction { index, name: custom.name().to_owned() });
					}
				}
			}
		}

		Ok(Self { actions, options })
	}

	pub fn actions(&self) -> &[InstallerAction] {
		&self.actions
	}

	pub fn options(&self) -> &QueueOptions {
		&self.options
	}

	pub fn len(&self) -> usize {
		self.actions.len()
	}

	pub fn is_empty(&self) -> bool {
		self.actions.is_empty()
	}

	/// Runs every action in order.
	///
	/// `progress` is called after each attempted action on the calling thread.
	/// `cancel` is only checked before an action starts, never during one.
	pub fn run(&self, mut progress: impl FnMut(&ProgressEvent), cancel: &CancelToken) -> RunResult {
		let total = self.actions.len();
		log::info!("Running installer queue with {} actions", total);

		let mut outcomes: Vec<ActionOutcome> = self.actions.iter()
			.map(|action| ActionOutcome {
				description: action.to_string(),
				status: ActionStatus::Pending,
				error: None,
				rollback_error: None,
			})
			.collect();

		/* Executed actions and their receipts, the top is the most recent */
		let mut completed = Vec::<(usize, Receipt)>::with_capacity(total);
		let mut status = RunStatus::Completed;

		for (index, action) in self.actions.iter().enumerate() {
			if cancel.is_cancelled() {
				log::warn!("Installer queue cancelled before action {} of {}", index + 1, total);
				status = RunStatus::Cancelled { before: index };
				break;
			}

			log::debug!("[{}/{}] {}", index + 1, total, action);
			match action.execute() {
				Ok(receipt) => {
					outcomes[index].status = ActionStatus::Executed;
					completed.push((index, receipt));
					progress(&ProgressEvent { action_index: index, total_actions: total, outcome: ProgressOutcome::Executed });
				},
				Err(e) => {
					log::error!("Action {} ({}) failed: {}", index + 1, action, e);
					outcomes[index].status = ActionStatus::Failed;
					outcomes[index].error = Some(e);
					progress(&ProgressEvent { action_index: index, total_actions: total, outcome: ProgressOutcome::Failed });
					status = RunStatus::Failed { index };
					break;
				},
			}
		}

		let mut rolled_back = Vec::<usize>::new();
		let mut cleanup_failures = Vec::<(usize, std::io::Error)>::new();

		if status == RunStatus::Completed {
			for (index, receipt) in completed {
				if let Err(e) = self.actions[index].commit(receipt) {
					log::warn!("Failed to clean up after action {} ({}): {}", index + 1, self.actions[index], e);
					cleanup_failures.push((index, e));
				}
			}
			log::info!("Installer queue completed {} actions", total);
		} else {
			log::info!("Rolling back {} executed actions", completed.len());
			/* Paths a failed undo should have put back, earlier actions on them can't be undone */
			let mut unrestored = HashSet::<PathBuf>::new();

			while let Some((index, receipt)) = completed.pop() {
				let action = &self.actions[index];
				let undone = match action.touched_paths().into_iter().find(|p| unrestored.contains(*p)) {
					Some(path) => Err(RollbackError::NotRestored(path.to_path_buf())),
					None => action.undo(receipt),
				};
				match undone {
					Ok(()) => {
						log::debug!("Rolled back action {} ({})", index + 1, self.actions[index]);
						outcomes[index].status = ActionStatus::RolledBack;
						rolled_back.push(index);
					},
					Err(e) => {
						log::error!("Failed to roll back action {} ({}): {}", index + 1, self.actions[index], e);
						if let Some(path) = action.restores() {
							unrestored.insert(path.to_path_buf());
						}
						outcomes[index].status = ActionStatus::RollbackFailed;
						outcomes[index].rollback_error = Some(e);
					},
				}
			}
		}

		RunResult {
			success: status == RunStatus::Completed,
			status,
			outcomes,
			rolled_back,
			cleanup_failures,
		}
	}
}
