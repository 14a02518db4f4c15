use addon_rs::installer::*;
use addon_rs_test_utils::{RecordingStep, Sandbox, StepLog};

#[test]
fn uninstall_removes_files() {
	let _ = env_logger::builder().is_test(true).try_init();
	let sandbox = Sandbox::new().unwrap();
	sandbox.place_game_file("GameData/Scatterer/scatterer.dll", "dll").unwrap();
	sandbox.place_game_file("GameData/Scatterer/config.cfg", "cfg").unwrap();
	sandbox.place_game_file("GameData/ModuleManager.dll", "mm").unwrap();

	let request = UninstallRequest::from_installed([
		sandbox.game_path("GameData/Scatterer/scatterer.dll"),
		sandbox.game_path("GameData/Scatterer/config.cfg"),
	]);
	let actions = request.into_actions(&CustomSteps::new()).unwrap();
	let queue = InstallerQueue::new(actions, QueueOptions::default()).unwrap();
	let result: UninstallResult = queue.run(|_| {}, &CancelToken::new());

	assert!(result.success);
	assert!(result.cleanup_failures.is_empty());
	/* No backups are left once the run completes */
	assert_eq!(sandbox.game_files().unwrap(), vec!["GameData/ModuleManager.dll"]);
}

#[test]
fn failed_uninstall_restores_files() {
	let _ = env_logger::builder().is_test(true).try_init();
	let sandbox = Sandbox::new().unwrap();
	sandbox.place_game_file("GameData/a.cfg", "a").unwrap();
	sandbox.place_game_file("GameData/b.cfg", "b").unwrap();
	let log = StepLog::new();

	let actions = vec![
		InstallerAction::remove_file(sandbox.game_path("GameData/a.cfg")),
		InstallerAction::remove_file(sandbox.game_path("GameData/b.cfg")),
		InstallerAction::custom("cleanup", RecordingStep::new("cleanup", &log).failing()),
	];
	let queue = InstallerQueue::new(actions, QueueOptions::default()).unwrap();
	let result = queue.run(|_| {}, &CancelToken::new());

	assert_eq!(result.status, RunStatus::Failed { index: 2 });
	assert_eq!(result.rolled_back, vec![1, 0]);
	assert_eq!(sandbox.game_files().unwrap(), vec!["GameData/a.cfg", "GameData/b.cfg"]);
	assert_eq!(sandbox.read_game_file("GameData/b.cfg").unwrap(), "b");
}

#[test]
fn removing_a_missing_file_fails() {
	let sandbox = Sandbox::new().unwrap();
	let queue = InstallerQueue::new(vec![InstallerAction::remove_file(sandbox.game_path("gone.cfg"))], QueueOptions::default()).unwrap();
	let result = queue.run(|_| {}, &CancelToken::new());
	assert!(matches!(result.failed_action(), Some((0, ActionExecutionError::MissingSource(_)))));
}

#[test]
fn replacing_a_file_within_one_run() {
	let sandbox = Sandbox::new().unwrap();
	let staged = sandbox.stage_file("settings.cfg", "new").unwrap();
	sandbox.place_game_file("settings.cfg", "old").unwrap();

	let actions = vec![
		InstallerAction::remove_file(sandbox.game_path("settings.cfg")),
		InstallerAction::install_file(&staged, sandbox.game_path("settings.cfg")),
	];
	let actions = RuleSet::new().with(Rule::RejectExisting).apply(actions).expect("the old file is removed first");
	let queue = InstallerQueue::new(actions, QueueOptions::default()).unwrap();
	let result = queue.run(|_| {}, &CancelToken::new());

	assert!(result.success);
	assert_eq!(sandbox.game_files().unwrap(), vec!["settings.cfg"]);
	assert_eq!(sandbox.read_game_file("settings.cfg").unwrap(), "new");
}
