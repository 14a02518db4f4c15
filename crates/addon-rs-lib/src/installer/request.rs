//! File manifests handed over by the package layer and their translation into actions.

use std::path::{Path, PathBuf};

use serde::{Serialize, Deserialize};

use super::{CustomSteps, InstallerAction};

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
	/// Copy `source` to `destination`, directories are copied file by file.
	#[default] Copy,
	/// Move `source` to `destination`.
	Rename,
	/// Remove `destination`.
	Remove,
	/// A step registered in [`CustomSteps`] under this name.
	Custom(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestEntry {
	#[serde(default)]
	pub source: PathBuf,
	pub destination: PathBuf,
	#[serde(default)]
	pub kind: EntryKind,
}

impl RequestEntry {
	pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>, kind: EntryKind) -> Self {
		Self { source: source.into(), destination: destination.into(), kind }
	}

	/// Makes relative paths absolute, `source` against `source_root` and `destination` against `destination_root`.
	pub fn rooted(mut self, source_root: &Path, destination_root: &Path) -> Self {
		if !self.source.as_os_str().is_empty() {
			self.source = source_root.join(&self.source);
		}
		self.destination = destination_root.join(&self.destination);
		self
	}
}

#[derive(Debug, thiserror::Error)]
pub enum RequestError {
	#[error("source {0} does not exist.")]
	MissingSource(PathBuf),
	#[error("no custom step registered as `{0}`.")]
	UnknownCustomStep(String),
	#[error("path {0} can't be made relative to the source directory.")]
	InvalidPath(PathBuf),
	#[error("error walking directory: {0}")]
	WalkDir(#[from] walkdir::Error),
}

/// Files to apply for one add-on, in order.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallRequest {
	pub entries: Vec<RequestEntry>,
}

impl InstallRequest {
	pub fn new(entries: Vec<RequestEntry>) -> Self {
		Self { entries }
	}

	pub fn push(&mut self, entry: RequestEntry) {
		self.entries.push(entry);
	}

	/// # Errors
	/// - [`RequestError::MissingSource`] when a copy or rename source is absent.
	/// - [`RequestError::UnknownCustomStep`] when a custom entry names a step not in `steps`.
	pub fn into_actions(&self, steps: &CustomSteps) -> Result<Vec<InstallerAction>, RequestError> {
		entries_to_actions(&self.entries, steps)
	}
}

/// Files to take away for one add-on, in order.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UninstallRequest {
	pub entries: Vec<RequestEntry>,
}

impl UninstallRequest {
	pub fn new(entries: Vec<RequestEntry>) -> Self {
		Self { entries }
	}

	/// A request removing each of `paths`.
	pub fn from_installed(paths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
		Self {
			entries: paths.into_iter()
				.map(|p| RequestEntry::new(PathBuf::new(), p, EntryKind::Remove))
				.collect(),
		}
	}

	/// # Errors
	/// Same as [`InstallRequest::into_actions()`].
	pub fn into_actions(&self, steps: &CustomSteps) -> Result<Vec<InstallerAction>, RequestError> {
		entries_to_actions(&self.entries, steps)
	}
}

fn entries_to_actions(entries: &[RequestEntry], steps: &CustomSteps) -> Result<Vec<InstallerAction>, RequestError> {
	let mut actions = Vec::<InstallerAction>::with_capacity(entries.len());

	for entry in entries {
		match &entry.kind {
			EntryKind::Copy => {
				if entry.source.is_dir() {
					for (source, destination) in expand_directory(&entry.source, &entry.destination)? {
						actions.push(InstallerAction::install_file(source, destination));
					}
				} else if entry.source.is_file() {
					actions.push(InstallerAction::install_file(&entry.source, &entry.destination));
				} else {
					return Err(RequestError::MissingSource(entry.source.clone()));
				}
			},
			EntryKind::Rename => {
				/* The source may be placed by an earlier action of the same run so it isn't checked here */
				actions.push(InstallerAction::rename_file(&entry.source, &entry.destination));
			},
			EntryKind::Remove => actions.push(InstallerAction::remove_file(&entry.destination)),
			EntryKind::Custom(name) => {
				let action = steps.create(name, entry).ok_or_else(|| RequestError::UnknownCustomStep(name.clone()))?;
				actions.push(InstallerAction::Custom(action));
			},
		}
	}

	Ok(actions)
}

/// Lists every file under `source` paired with its place under `destination`, sorted by path.
fn expand_directory(source: &Path, destination: &Path) -> Result<Vec<(PathBuf, PathBuf)>, RequestError> {
	log::trace!("Expanding directory {} into {}", source.display(), destination.display());
	let mut files = Vec::<(PathBuf, PathBuf)>::new();

	for entry in walkdir::WalkDir::new(source).sort_by_file_name() {
		let entry = entry?.into_path();
		if entry.is_file() {
			let relative = pathdiff::diff_paths(&entry, source).ok_or_else(|| RequestError::InvalidPath(entry.clone()))?;
			files.push((entry, destination.join(relative)));
		}
	}

	Ok(files)
}
