//! Running a queue off the calling thread.

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

use super::{CancelToken, InstallerQueue, ProgressEvent, RunResult};

/// Runs `queue` on tokio's blocking pool and streams its progress.
///
/// The receiver closes once the run is over. Keep a clone of `cancel` to stop the run between actions.
///
/// # Panics
/// When called outside of a tokio runtime.
pub fn spawn_run(queue: InstallerQueue, cancel: CancelToken) -> (JoinHandle<RunResult>, UnboundedReceiver<ProgressEvent>) {
	let (sender, receiver) = tokio::sync::mpsc::unbounded_channel();

	let handle = tokio::task::spawn_blocking(move || {
		queue.run(|event| {
			if sender.send(*event).is_err() {
				log::trace!("Progress receiver dropped, event {:?} discarded", event);
			}
		}, &cancel)
	});

	(handle, receiver)
}
