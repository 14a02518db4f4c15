use addon_rs::{Config, ResolverKind};

#[test]
fn config_round_trip() {
	let dir = tempfile::tempdir().unwrap();
	let mut config = Config::default();
	assert!(config.set_data_dir(dir.path().to_path_buf()));
	config.set_resolver_kind(ResolverKind::BreadthFirst);
	config.set_require_rollback_safety(false);
	config.set_conflict_suffix(".new");
	config.save_to_disk().unwrap();

	let loaded = Config::load_from_file(config.config_path()).unwrap();
	assert_eq!(loaded, config);
	assert!(!loaded.queue_options().require_rollback_safety);
}

#[test]
fn missing_fields_use_defaults() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("config.json");
	std::fs::write(&path, r#"{ "resolver_kind": "breadth-first" }"#).unwrap();

	let config = Config::load_from_file(&path).unwrap();
	assert_eq!(config.resolver_kind(), ResolverKind::BreadthFirst);
	assert!(config.require_rollback_safety());
	assert_eq!(config.conflict_suffix(), "_conflict");
}

#[test]
fn invalid_data_dir_is_refused() {
	let mut config = Config::default();
	let before = config.data_dir().to_path_buf();
	assert!(!config.set_data_dir("/this/path/does/not/exist".into()));
	assert_eq!(config.data_dir(), before);
}

#[test]
fn missing_file_is_io_error() {
	let dir = tempfile::tempdir().unwrap();
	assert!(matches!(Config::load_from_file(dir.path().join("config.json")), Err(addon_rs::Error::IO(_))));
}
