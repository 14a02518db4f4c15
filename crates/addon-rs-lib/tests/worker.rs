use addon_rs::installer::*;
use addon_rs_test_utils::{RecordingStep, StepLog};

#[tokio::test]
async fn worker_streams_progress() {
	let log = StepLog::new();
	let actions = (0..4).map(|i| InstallerAction::custom(i.to_string(), RecordingStep::new(i.to_string(), &log))).collect();
	let queue = InstallerQueue::new(actions, QueueOptions::default()).unwrap();

	let (handle, mut progress) = worker::spawn_run(queue, CancelToken::new());
	let mut indices = Vec::new();
	while let Some(event) = progress.recv().await {
		assert_eq!(event.total_actions, 4);
		indices.push(event.action_index);
	}

	let result = handle.await.unwrap();
	assert!(result.success);
	assert_eq!(indices, vec![0, 1, 2, 3]);
}

#[tokio::test]
async fn worker_reports_failure() {
	let log = StepLog::new();
	let actions = vec![
		InstallerAction::custom("a", RecordingStep::new("a", &log)),
		InstallerAction::custom("b", RecordingStep::new("b", &log).failing()),
	];
	let queue = InstallerQueue::new(actions, QueueOptions::default()).unwrap();

	let (handle, _progress) = worker::spawn_run(queue, CancelToken::new());
	let result = handle.await.unwrap();
	assert_eq!(result.status, RunStatus::Failed { index: 1 });
	assert_eq!(log.entries(), vec!["execute:a", "execute:b", "reverse:a"]);
}

#[tokio::test]
async fn dropped_receiver_does_not_stop_the_run() {
	let log = StepLog::new();
	let actions = (0..3).map(|i| InstallerAction::custom(i.to_string(), RecordingStep::new(i.to_string(), &log))).collect();
	let queue = InstallerQueue::new(actions, QueueOptions::default()).unwrap();

	let (handle, progress) = worker::spawn_run(queue, CancelToken::new());
	drop(progress);
	assert!(handle.await.unwrap().success);
	assert_eq!(log.entries().len(), 3);
}
