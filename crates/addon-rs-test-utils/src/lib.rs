//! Various helper functions for testing
//!
//! functions in this module should use results and not use any panics to avoid confusion in callers

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use addon_rs::installer::{CustomStep, CustomStepError};

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("IO error: {0}")]
	IO(#[from] std::io::Error),
	#[error("fs_extra error: {0}")]
	FsExtra(#[from] fs_extra::error::Error),
	#[error("path {0} is not inside the sandbox")]
	OutsideSandbox(PathBuf),
}

pub type Result<T> = std::result::Result<T, Error>;

/// A temporary staging directory and game directory, removed on drop.
pub struct Sandbox {
	root: tempfile::TempDir,
}

impl Sandbox {
	pub fn new() -> Result<Self> {
		let root = tempfile::tempdir()?;
		std::fs::create_dir_all(root.path().join("staging"))?;
		std::fs::create_dir_all(root.path().join("game"))?;
		Ok(Self { root })
	}

	pub fn staging_dir(&self) -> PathBuf {
		self.root.path().join("staging")
	}

	pub fn game_dir(&self) -> PathBuf {
		self.root.path().join("game")
	}

	pub fn staged(&self, relative: impl AsRef<Path>) -> PathBuf {
		self.staging_dir().join(relative)
	}

	pub fn game_path(&self, relative: impl AsRef<Path>) -> PathBuf {
		self.game_dir().join(relative)
	}

	/// Writes a file into the staging directory, creating parents.
	pub fn stage_file(&self, relative: impl AsRef<Path>, contents: &str) -> Result<PathBuf> {
		write_file(self.staged(relative), contents)
	}

	/// Writes a file into the game directory as if it was already installed.
	pub fn place_game_file(&self, relative: impl AsRef<Path>, contents: &str) -> Result<PathBuf> {
		write_file(self.game_path(relative), contents)
	}

	pub fn read_game_file(&self, relative: impl AsRef<Path>) -> Result<String> {
		Ok(std::fs::read_to_string(self.game_path(relative))?)
	}

	/// Every file in the game directory relative to it, `/` separated and sorted.
	pub fn game_files(&self) -> Result<Vec<String>> {
		list_files(&self.game_dir())
	}

	/// Every directory in the game directory relative to it, excluding the game directory itself.
	pub fn game_dirs(&self) -> Result<Vec<String>> {
		let game_dir = self.game_dir();
		let content = fs_extra::dir::get_dir_content(&game_dir)?;
		let mut dirs = Vec::new();
		for d in content.directories {
			let relative = relative_to(&game_dir, Path::new(&d))?;
			if !relative.is_empty() {
				dirs.push(relative);
			}
		}
		dirs.sort();
		Ok(dirs)
	}
}

fn write_file(path: PathBuf, contents: &str) -> Result<PathBuf> {
	if let Some(parent) = path.parent() {
		std::fs::create_dir_all(parent)?;
	}
	std::fs::write(&path, contents)?;
	Ok(path)
}

fn list_files(dir: &Path) -> Result<Vec<String>> {
	let content = fs_extra::dir::get_dir_content(dir)?;
	let mut files = content.files.iter()
		.map(|f| relative_to(dir, Path::new(f)))
		.collect::<Result<Vec<_>>>()?;
	files.sort();
	Ok(files)
}

fn relative_to(base: &Path, path: &Path) -> Result<String> {
	let relative = path.strip_prefix(base).map_err(|_| Error::OutsideSandbox(path.to_path_buf()))?;
	Ok(relative.components()
		.map(|c| c.as_os_str().to_string_lossy().into_owned())
		.collect::<Vec<_>>()
		.join("/"))
}

/// Shared record of custom step calls, e.g. `["execute:a", "execute:b", "reverse:a"]`.
#[derive(Debug, Clone, Default)]
pub struct StepLog(Arc<Mutex<Vec<String>>>);

impl StepLog {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn entries(&self) -> Vec<String> {
		self.0.lock().map(|l| l.clone()).unwrap_or_default()
	}

	fn push(&self, entry: String) {
		if let Ok(mut log) = self.0.lock() {
			log.push(entry);
		}
	}
}

/// A custom step that records its calls to a [`StepLog`].
pub struct RecordingStep {
	name: String,
	log: StepLog,
	fail_execute: bool,
	fail_reverse: bool,
	reversible: bool,
}

impl RecordingStep {
	pub fn new(name: impl Into<String>, log: &StepLog) -> Self {
		Self {
			name: name.into(),
			log: log.clone(),
			fail_execute: false,
			fail_reverse: false,
			reversible: true,
		}
	}

	pub fn failing(mut self) -> Self {
		self.fail_execute = true;
		self
	}

	pub fn failing_reverse(mut self) -> Self {
		self.fail_reverse = true;
		self
	}

	pub fn irreversible(mut self) -> Self {
		self.reversible = false;
		self
	}
}

impl CustomStep for RecordingStep {
	fn execute(&self) -> std::result::Result<(), CustomStepError> {
		self.log.push(format!("execute:{}", self.name));
		if self.fail_execute {
			return Err(format!("{} failed on purpose", self.name).into());
		}
		Ok(())
	}

	fn is_reversible(&self) -> bool {
		self.reversible
	}

	fn reverse(&self) -> std::result::Result<(), CustomStepError> {
		self.log.push(format!("reverse:{}", self.name));
		if self.fail_reverse {
			return Err(format!("{} failed to reverse on purpose", self.name).into());
		}
		Ok(())
	}
}
