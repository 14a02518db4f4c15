//! Options for the resolver and installer.
//!
//! Stored as `config.json` inside the data directory.

use std::path::{Path, PathBuf};

use serde::{Serialize, Deserialize};

use crate::relationship_resolver::ResolverKind;
use crate::installer::QueueOptions;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
	data_dir: PathBuf,
	resolver_kind: ResolverKind,
	require_rollback_safety: bool,
	conflict_suffix: String,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			data_dir: {
				#[cfg(target_os = "windows")]
				let path = std::env::var_os("APPDATA").map(PathBuf::from).unwrap_or_default();

				#[cfg(not(target_os = "windows"))]
				let path = if let Some(e) = std::env::var_os("XDG_DATA_HOME") {
					PathBuf::from(e)
				} else {
					std::env::var_os("HOME").map(PathBuf::from).unwrap_or_default().join(".local/share")
				};

				path.join("addon-rs")
			},
			resolver_kind: ResolverKind::default(),
			require_rollback_safety: true,
			conflict_suffix: "_conflict".to_string(),
		}
	}
}

impl Config {
	/// Loads the config from the default data directory.
	///
	/// # Errors
	/// - [`IO`](crate::error::Error::IO) when the file can't be opened, this includes the file not existing.
	/// - [`SerdeJSON`](crate::error::Error::SerdeJSON) when the file contents are invalid.
	pub fn load_from_disk() -> crate::Result<Self> {
		let path = Config::default().config_path();
		Self::load_from_file(path)
	}

	/// Loads a config from a file at a given path.
	///
	/// # Errors
	/// Same as [`load_from_disk()`](Config::load_from_disk()).
	pub fn load_from_file(path: impl AsRef<Path>) -> crate::Result<Self> {
		log::debug!("Loading config from {}", path.as_ref().display());
		let file = std::fs::File::open(path)?;
		Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
	}

	/// Saves the config to `config.json` in [`data_dir()`](Config::data_dir()), creating the directory if needed.
	pub fn save_to_disk(&self) -> crate::Result<()> {
		let path = self.config_path();
		log::debug!("Saving config to {}", path.display());
		std::fs::create_dir_all(&self.data_dir)?;
		let file = std::fs::File::create(path)?;
		serde_json::to_writer_pretty(file, self)?;
		Ok(())
	}

	pub fn config_path(&self) -> PathBuf {
		self.data_dir.join("config.json")
	}

	pub fn data_dir(&self) -> &Path {
		&self.data_dir
	}
	/// returns if the directory is valid or not.
	pub fn set_data_dir(&mut self, data_dir: PathBuf) -> bool {
		if data_dir.is_dir() {
			self.data_dir = data_dir;
			true
		} else {
			false
		}
	}

	pub fn resolver_kind(&self) -> ResolverKind {
		self.resolver_kind
	}
	pub fn set_resolver_kind(&mut self, resolver_kind: ResolverKind) {
		self.resolver_kind = resolver_kind;
	}

	pub fn require_rollback_safety(&self) -> bool {
		self.require_rollback_safety
	}
	pub fn set_require_rollback_safety(&mut self, require_rollback_safety: bool) {
		self.require_rollback_safety = require_rollback_safety;
	}

	/// Suffix used by [`Rule::RenameOnConflict`](crate::installer::Rule::RenameOnConflict) rules built from this config.
	pub fn conflict_suffix(&self) -> &str {
		&self.conflict_suffix
	}
	pub fn set_conflict_suffix(&mut self, conflict_suffix: impl Into<String>) {
		self.conflict_suffix = conflict_suffix.into();
	}

	pub fn queue_options(&self) -> QueueOptions {
		QueueOptions {
			require_rollback_safety: self.require_rollback_safety,
		}
	}
}
