//! The units of filesystem work the queue runs, each one knows how to reverse itself.

use std::path::{Path, PathBuf};

use super::custom::CustomAction;

/// A single reversible operation.
///
/// Actions are immutable once created, everything needed to undo an executed action is kept
/// in the [`Receipt`] it returns so the same action can be run again by a later queue run.
#[derive(Debug)]
pub enum InstallerAction {
	InstallFile(InstallFile),
	RenameFile(RenameFile),
	/// Used for uninstalls, the file is kept aside until the run completes.
	RemoveFile(RemoveFile),
	Custom(CustomAction),
}

/// Copies `source` to a new file at `destination`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallFile {
	pub source: PathBuf,
	pub destination: PathBuf,
}

/// Moves `source` to `destination`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameFile {
	pub source: PathBuf,
	pub destination: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveFile {
	pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionStatus {
	/// Never attempted.
	Pending,
	Executed,
	Failed,
	RolledBack,
	/// Was executed but the undo could not complete, see [`ActionOutcome::rollback_error`](super::ActionOutcome::rollback_error).
	RollbackFailed,
}

#[derive(Debug, thiserror::Error)]
pub enum ActionExecutionError {
	#[error("IO error: {0}")]
	IO(#[from] std::io::Error),
	#[error("destination {0} already exists.")]
	DestinationExists(PathBuf),
	#[error("source {0} does not exist.")]
	MissingSource(PathBuf),
	#[error("path {0} has no file name.")]
	InvalidPath(PathBuf),
	#[error("custom action `{name}` failed: {reason}")]
	Custom { name: String, reason: super::CustomStepError },
}

#[derive(Debug, thiserror::Error)]
pub enum RollbackError {
	#[error("IO error: {0}")]
	IO(#[from] std::io::Error),
	/// Restoring would overwrite something that now occupies the original path.
	#[error("can't restore {0}, the path is occupied.")]
	Conflict(PathBuf),
	/// The installed file was modified after it was written so it is left in place.
	#[error("{0} changed since it was installed.")]
	ContentChanged(PathBuf),
	#[error("custom action `{0}` has no reverse procedure.")]
	Irreversible(String),
	/// A later action's undo should have put this path back first but failed.
	#[error("{0} was not restored by a later undo.")]
	NotRestored(PathBuf),
	#[error("custom action `{name}` failed to reverse: {reason}")]
	Custom { name: String, reason: super::CustomStepError },
}

/// What an executed action left behind for its undo.
#[derive(Debug)]
pub(super) enum Receipt {
	Installed {
		digest: String,
		/// Deepest first.
		created_dirs: Vec<PathBuf>,
	},
	Renamed {
		created_dirs: Vec<PathBuf>,
	},
	Removed {
		backup: PathBuf,
	},
	Custom,
}

impl InstallerAction {
	pub fn install_file(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
		InstallerAction::InstallFile(InstallFile { source: source.into(), destination: destination.into() })
	}

	pub fn rename_file(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
		InstallerAction::RenameFile(RenameFile { source: source.into(), destination: destination.into() })
	}

	pub fn remove_file(path: impl Into<PathBuf>) -> Self {
		InstallerAction::RemoveFile(RemoveFile { path: path.into() })
	}

	pub fn custom(name: impl Into<String>, step: impl super::CustomStep + 'static) -> Self {
		InstallerAction::Custom(CustomAction::new(name, step))
	}

	/// The path this action creates, if any.
	pub fn destination(&self) -> Option<&Path> {
		match self {
			InstallerAction::InstallFile(a) => Some(&a.destination),
			InstallerAction::RenameFile(a) => Some(&a.destination),
			InstallerAction::RemoveFile(_) | InstallerAction::Custom(_) => None,
		}
	}

	/// Every path the action writes to or removes.
	pub fn touched_paths(&self) -> Vec<&Path> {
		match self {
			InstallerAction::InstallFile(a) => vec![&a.destination],
			InstallerAction::RenameFile(a) => vec![&a.source, &a.destination],
			InstallerAction::RemoveFile(a) => vec![&a.path],
			InstallerAction::Custom(_) => vec![],
		}
	}

	/// Replaces the destination of actions that have one, other actions are returned unchanged.
	pub fn with_destination(self, destination: PathBuf) -> Self {
		match self {
			InstallerAction::InstallFile(a) => InstallerAction::InstallFile(InstallFile { destination, ..a }),
			InstallerAction::RenameFile(a) => InstallerAction::RenameFile(RenameFile { destination, ..a }),
			other => other,
		}
	}

	/// The path this action's undo puts back in place, if any.
	pub(super) fn restores(&self) -> Option<&Path> {
		match self {
			InstallerAction::RenameFile(a) => Some(&a.source),
			InstallerAction::RemoveFile(a) => Some(&a.path),
			InstallerAction::InstallFile(_) | InstallerAction::Custom(_) => None,
		}
	}

	pub fn is_reversible(&self) -> bool {
		match self {
			InstallerAction::Custom(a) => a.step().is_reversible(),
			_ => true,
		}
	}

	pub(super) fn execute(&self) -> Result<Receipt, ActionExecutionError> {
		match self {
			InstallerAction::InstallFile(a) => a.execute(),
			InstallerAction::RenameFile(a) => a.execute(),
			InstallerAction::RemoveFile(a) => a.execute(),
			InstallerAction::Custom(a) => {
				a.step().execute().map_err(|reason| ActionExecutionError::Custom { name: a.name().to_owned(), reason })?;
				Ok(Receipt::Custom)
			},
		}
	}

	pub(super) fn undo(&self, receipt: Receipt) -> Result<(), RollbackError> {
		match (self, receipt) {
			(InstallerAction::InstallFile(a), Receipt::Installed { digest, created_dirs }) => a.undo(&digest, &created_dirs),
			(InstallerAction::RenameFile(a), Receipt::Renamed { created_dirs }) => a.undo(&created_dirs),
			(InstallerAction::RemoveFile(a), Receipt::Removed { backup }) => a.undo(&backup),
			(InstallerAction::Custom(a), Receipt::Custom) => {
				if !a.step().is_reversible() {
					return Err(RollbackError::Irreversible(a.name().to_owned()));
				}
				a.step().reverse().map_err(|reason| RollbackError::Custom { name: a.name().to_owned(), reason })
			},
			(action, receipt) => unreachable!("receipt {:?} was not produced by action {}", receipt, action),
		}
	}

	/// Called once the whole run has succeeded, discards anything kept around for the undo.
	pub(super) fn commit(&self, receipt: Receipt) -> std::io::Result<()> {
		if let Receipt::Removed { backup } = receipt {
			log::trace!("Discarding backup {}", backup.display());
			if backup.is_dir() {
				std::fs::remove_dir_all(backup)?;
			} else {
				std::fs::remove_file(backup)?;
			}
		}
		Ok(())
	}
}

impl std::fmt::Display for InstallerAction {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			InstallerAction::InstallFile(a) => write!(f, "install {} -> {}", a.source.display(), a.destination.display()),
			InstallerAction::RenameFile(a) => write!(f, "rename {} -> {}", a.source.display(), a.destination.display()),
			InstallerAction::RemoveFile(a) => write!(f, "remove {}", a.path.display()),
			InstallerAction::Custom(a) => write!(f, "custom `{}`", a.name()),
		}
	}
}

impl InstallFile {
	fn execute(&self) -> Result<Receipt, ActionExecutionError> {
		if !self.source.is_file() {
			return Err(ActionExecutionError::MissingSource(self.source.clone()));
		}
		if path_occupied(&self.destination) {
			return Err(ActionExecutionError::DestinationExists(self.destination.clone()));
		}

		let created_dirs = create_parent_dirs(&self.destination)?;
		match write_new_file(&self.source, &self.destination) {
			Ok(digest) => Ok(Receipt::Installed { digest, created_dirs }),
			Err(e) => {
				remove_created_dirs(&created_dirs);
				Err(e)
			},
		}
	}

	fn undo(&self, digest: &str, created_dirs: &[PathBuf]) -> Result<(), RollbackError> {
		if !path_occupied(&self.destination) {
			log::warn!("{} was already removed before rollback", self.destination.display());
			remove_created_dirs(created_dirs);
			return Ok(());
		}

		if file_digest(&self.destination)? != digest {
			return Err(RollbackError::ContentChanged(self.destination.clone()));
		}

		std::fs::remove_file(&self.destination)?;
		remove_created_dirs(created_dirs);
		Ok(())
	}
}

impl RenameFile {
	fn execute(&self) -> Result<Receipt, ActionExecutionError> {
		if !path_occupied(&self.source) {
			return Err(ActionExecutionError::MissingSource(self.source.clone()));
		}
		if path_occupied(&self.destination) {
			return Err(ActionExecutionError::DestinationExists(self.destination.clone()));
		}

		let created_dirs = create_parent_dirs(&self.destination)?;
		if let Err(e) = std::fs::rename(&self.source, &self.destination) {
			remove_created_dirs(&created_dirs);
			return Err(e.into());
		}
		Ok(Receipt::Renamed { created_dirs })
	}

	fn undo(&self, created_dirs: &[PathBuf]) -> Result<(), RollbackError> {
		if path_occupied(&self.source) {
			return Err(RollbackError::Conflict(self.source.clone()));
		}
		if let Some(parent) = self.source.parent() {
			std::fs::create_dir_all(parent)?;
		}
		std::fs::rename(&self.destination, &self.source)?;
		remove_created_dirs(created_dirs);
		Ok(())
	}
}

impl RemoveFile {
	/// Sibling of the removed file so the move never crosses filesystems.
	fn backup_path(&self) -> Result<PathBuf, ActionExecutionError> {
		let name = self.path.file_name().ok_or_else(|| ActionExecutionError::InvalidPath(self.path.clone()))?;
		Ok(self.path.with_file_name(format!(".{}.addon-rs-backup", name.to_string_lossy())))
	}

	fn execute(&self) -> Result<Receipt, ActionExecutionError> {
		if !path_occupied(&self.path) {
			return Err(ActionExecutionError::MissingSource(self.path.clone()));
		}
		let backup = self.backup_path()?;
		if path_occupied(&backup) {
			return Err(ActionExecutionError::DestinationExists(backup));
		}
		std::fs::rename(&self.path, &backup)?;
		Ok(Receipt::Removed { backup })
	}

	fn undo(&self, backup: &Path) -> Result<(), RollbackError> {
		if path_occupied(&self.path) {
			return Err(RollbackError::Conflict(self.path.clone()));
		}
		std::fs::rename(backup, &self.path)?;
		Ok(())
	}
}

/// Unlike `Path::exists` this is also true for broken symlinks.
fn path_occupied(path: &Path) -> bool {
	std::fs::symlink_metadata(path).is_ok()
}

/// Copies into a file that must not exist yet and returns the digest of what was written.
///
/// A partially written file is removed before returning the error.
fn write_new_file(source: &Path, destination: &Path) -> Result<String, ActionExecutionError> {
	let mut reader = std::fs::File::open(source)?;
	let mut writer = std::fs::OpenOptions::new()
		.write(true)
		.create_new(true)
		.open(destination)
		.map_err(|e| match e.kind() {
			std::io::ErrorKind::AlreadyExists => ActionExecutionError::DestinationExists(destination.to_path_buf()),
			_ => ActionExecutionError::IO(e),
		})?;

	let written = std::io::copy(&mut reader, &mut writer)
		.and_then(|_| writer.sync_all())
		.and_then(|_| std::fs::set_permissions(destination, reader.metadata()?.permissions()));
	drop(writer);

	let result = written.and_then(|_| file_digest(destination));
	if result.is_err() {
		log::debug!("Removing partially written file {}", destination.display());
		if let Err(e) = std::fs::remove_file(destination) {
			log::error!("Failed to remove partially written file {}: {}", destination.display(), e);
		}
	}
	Ok(result?)
}

fn file_digest(path: &Path) -> std::io::Result<String> {
	let content = std::fs::read(path)?;
	Ok(sha256::digest(content.as_slice()))
}

/// Creates any missing parents of `path` and returns the ones created, deepest first.
fn create_parent_dirs(path: &Path) -> std::io::Result<Vec<PathBuf>> {
	let mut missing = Vec::<PathBuf>::new();
	let mut current = path.parent();
	while let Some(dir) = current {
		if dir.as_os_str().is_empty() || path_occupied(dir) { break; }
		missing.push(dir.to_path_buf());
		current = dir.parent();
	}

	if let Some(deepest) = missing.first() {
		std::fs::create_dir_all(deepest)?;
	}
	Ok(missing)
}

/// Removes directories from [`create_parent_dirs`], stopping at the first one still in use.
fn remove_created_dirs(dirs: &[PathBuf]) {
	for dir in dirs {
		if std::fs::remove_dir(dir).is_err() {
			log::trace!("Leaving directory {} in place", dir.display());
			break;
		}
	}
}
