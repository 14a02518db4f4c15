use addon_rs::installer::*;
use addon_rs_test_utils::Sandbox;

#[test]
fn rename_on_conflict() {
	let _ = env_logger::builder().is_test(true).try_init();
	let sandbox = Sandbox::new().unwrap();
	let first = sandbox.stage_file("a/foo.cfg", "first").unwrap();
	let second = sandbox.stage_file("b/foo.cfg", "second").unwrap();
	sandbox.place_game_file("foo.cfg", "existing").unwrap();

	let rules = RuleSet::new().with(Rule::RenameOnConflict { suffix: "_conflict".into() });
	let actions = rules.apply(vec![
		InstallerAction::install_file(&first, sandbox.game_path("foo.cfg")),
		InstallerAction::install_file(&second, sandbox.game_path("foo.cfg")),
	]).unwrap();

	assert_eq!(actions[0].destination(), Some(sandbox.game_path("foo_conflict.cfg").as_path()));
	assert_eq!(actions[1].destination(), Some(sandbox.game_path("foo_conflict2.cfg").as_path()));

	let queue = InstallerQueue::new(actions, QueueOptions::default()).unwrap();
	assert!(queue.run(|_| {}, &CancelToken::new()).success);
	assert_eq!(sandbox.read_game_file("foo.cfg").unwrap(), "existing");
	assert_eq!(sandbox.read_game_file("foo_conflict.cfg").unwrap(), "first");
	assert_eq!(sandbox.read_game_file("foo_conflict2.cfg").unwrap(), "second");
}

#[test]
fn reject_existing_sees_earlier_actions() {
	let sandbox = Sandbox::new().unwrap();
	let staged = sandbox.stage_file("foo.cfg", "x").unwrap();
	let rules = RuleSet::new().with(Rule::RejectExisting);

	let e = rules.apply(vec![
		InstallerAction::install_file(&staged, sandbox.game_path("foo.cfg")),
		InstallerAction::install_file(&staged, sandbox.game_path("foo.cfg")),
	]).expect_err("second install collides with the first");
	assert!(matches!(e, ValidationError::DestinationOccupied(p) if p == sandbox.game_path("foo.cfg")));
}

#[test]
fn reject_existing_on_disk() {
	let sandbox = Sandbox::new().unwrap();
	let staged = sandbox.stage_file("foo.cfg", "x").unwrap();
	sandbox.place_game_file("foo.cfg", "y").unwrap();
	let rules = RuleSet::new().with(Rule::RejectExisting);
	assert!(rules.apply(vec![InstallerAction::install_file(&staged, sandbox.game_path("foo.cfg"))]).is_err());
}

#[test]
fn renamed_away_path_is_free() {
	let sandbox = Sandbox::new().unwrap();
	let staged = sandbox.stage_file("foo.cfg", "x").unwrap();
	sandbox.place_game_file("foo.cfg", "y").unwrap();
	let rules = RuleSet::new().with(Rule::RejectExisting);
	let actions = rules.apply(vec![
		InstallerAction::rename_file(sandbox.game_path("foo.cfg"), sandbox.game_path("foo.cfg.bak")),
		InstallerAction::install_file(&staged, sandbox.game_path("foo.cfg")),
	]).unwrap();
	assert_eq!(actions.len(), 2);
}

#[test]
fn block_pattern() {
	let sandbox = Sandbox::new().unwrap();
	let rules = RuleSet::new().with(Rule::block_pattern(r"\.exe$").unwrap());
	let e = rules.apply(vec![
		InstallerAction::install_file(sandbox.staged("a.cfg"), sandbox.game_path("a.cfg")),
		InstallerAction::install_file(sandbox.staged("setup.exe"), sandbox.game_path("setup.exe")),
	]).expect_err("executables are blocked");
	assert!(matches!(e, ValidationError::BlockedPath { ref pattern, .. } if pattern == r"\.exe$"));
}

#[test]
fn invalid_block_pattern() {
	assert!(matches!(Rule::block_pattern("(unclosed"), Err(addon_rs::Error::Regex(_))));
}

#[test]
fn confine_to_root() {
	let sandbox = Sandbox::new().unwrap();
	let rules = RuleSet::new().with(Rule::ConfineTo(sandbox.game_dir()));

	assert!(rules.apply(vec![InstallerAction::install_file(sandbox.staged("a.cfg"), sandbox.game_path("GameData/a.cfg"))]).is_ok());

	let e = rules.apply(vec![InstallerAction::install_file(sandbox.staged("a.cfg"), sandbox.game_path("GameData/../../escape.cfg"))]).expect_err("path climbs out of the game directory");
	assert!(matches!(e, ValidationError::OutsideRoot { .. }));

	/* Rename sources count too */
	let e = rules.apply(vec![InstallerAction::rename_file(sandbox.staged("a.cfg"), sandbox.game_path("a.cfg"))]).expect_err("source is outside");
	assert!(matches!(e, ValidationError::OutsideRoot { path, .. } if path == sandbox.staged("a.cfg")));
}

#[test]
fn later_rules_see_rewrites() {
	let sandbox = Sandbox::new().unwrap();
	sandbox.place_game_file("foo.cfg", "y").unwrap();
	let rules = RuleSet::new()
		.with(Rule::RenameOnConflict { suffix: "_conflict".into() })
		.with(Rule::block_pattern("_conflict").unwrap());
	assert!(matches!(
		rules.apply(vec![InstallerAction::install_file(sandbox.staged("foo.cfg"), sandbox.game_path("foo.cfg"))]),
		Err(ValidationError::BlockedPath { .. })
	));
}

#[test]
fn custom_actions_pass_path_rules() {
	let rules = RuleSet::new().with(Rule::RejectExisting).with(Rule::ConfineTo("/nowhere".into()));
	let actions = rules.apply(vec![InstallerAction::custom("noop", FnStep::new(|| Ok(())))]).unwrap();
	assert_eq!(actions.len(), 1);
}

#[test]
fn confine_to_relative_root() {
	let rules = RuleSet::new().with(Rule::ConfineTo("game".into()));

	assert!(rules.apply(vec![InstallerAction::install_file("staging/a.cfg", "game/GameData/a.cfg")]).is_ok());

	/* Checked where the queue will write, not joined onto the root */
	let e = rules.apply(vec![InstallerAction::install_file("staging/a.cfg", "game/../evil.cfg")]).expect_err("lands next to the game directory");
	assert!(matches!(e, ValidationError::OutsideRoot { path, .. } if path == std::path::Path::new("game/../evil.cfg")));
}

#[test]
fn confine_to_absolute_root_rejects_relative_destination() {
	let sandbox = Sandbox::new().unwrap();
	let rules = RuleSet::new().with(Rule::ConfineTo(sandbox.game_dir()));
	let e = rules.apply(vec![InstallerAction::install_file(sandbox.staged("a.cfg"), "evil.cfg")]).expect_err("relative to the working directory, not the root");
	assert!(matches!(e, ValidationError::OutsideRoot { .. }));
}

#[test]
fn rename_follows_conflict_rewrite() {
	let sandbox = Sandbox::new().unwrap();
	let staged = sandbox.stage_file("foo.cfg", "addon").unwrap();
	sandbox.place_game_file("foo.cfg", "user").unwrap();

	let rules = RuleSet::new().with(Rule::RenameOnConflict { suffix: "_conflict".into() });
	let actions = rules.apply(vec![
		InstallerAction::install_file(&staged, sandbox.game_path("foo.cfg")),
		InstallerAction::rename_file(sandbox.game_path("foo.cfg"), sandbox.game_path("foo.cfg.disabled")),
	]).unwrap();
	assert_eq!(actions[1].to_string(), format!("rename {} -> {}", sandbox.game_path("foo_conflict.cfg").display(), sandbox.game_path("foo.cfg.disabled").display()));

	let queue = InstallerQueue::new(actions, QueueOptions::default()).unwrap();
	assert!(queue.run(|_| {}, &CancelToken::new()).success);
	assert_eq!(sandbox.read_game_file("foo.cfg").unwrap(), "user");
	assert_eq!(sandbox.read_game_file("foo.cfg.disabled").unwrap(), "addon");
	assert_eq!(sandbox.game_files().unwrap(), vec!["foo.cfg", "foo.cfg.disabled"]);
}

#[test]
fn removal_follows_conflict_rewrite() {
	let sandbox = Sandbox::new().unwrap();
	let staged = sandbox.stage_file("foo.cfg", "addon").unwrap();
	sandbox.place_game_file("foo.cfg", "user").unwrap();

	let rules = RuleSet::new().with(Rule::RenameOnConflict { suffix: "_conflict".into() });
	let actions = rules.apply(vec![
		InstallerAction::install_file(&staged, sandbox.game_path("foo.cfg")),
		InstallerAction::remove_file(sandbox.game_path("foo.cfg")),
	]).unwrap();
	assert_eq!(actions[1].to_string(), format!("remove {}", sandbox.game_path("foo_conflict.cfg").display()));
}
