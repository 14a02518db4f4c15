//! Checks applied to actions before they are queued.
//!
//! Rules see the filesystem as it will be at that point of the run, destinations claimed
//! by earlier actions in the same batch count as occupied and paths they move away count as free.
//! When a destination is rewritten, later renames and removals of the original path follow the rewrite.

use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};

use super::InstallerAction;

/// Upper bound on the numbered names [`Rule::RenameOnConflict`] will try.
const MAX_RENAME_ATTEMPTS: usize = 1000;

#[derive(Debug, Clone)]
pub enum Rule {
	/// Reject actions whose destination is already occupied.
	RejectExisting,
	/// Rewrite an occupied destination to `<stem><suffix><ext>`, then `<stem><suffix>2<ext>` and so on.
	RenameOnConflict { suffix: String },
	/// Reject actions touching a path matching the pattern.
	BlockPattern(regex::Regex),
	/// Reject actions touching a path outside the directory.
	///
	/// Relative paths, including the directory itself, are taken from the current working directory.
	ConfineTo(PathBuf),
}

#[derive(Debug)]
pub enum RuleVerdict {
	Pass,
	Rewrite(PathBuf),
	Reject(ValidationError),
}

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
	#[error("destination {0} is already occupied.")]
	DestinationOccupied(PathBuf),
	#[error("{path} matches blocked pattern `{pattern}`.")]
	BlockedPath { path: PathBuf, pattern: String },
	#[error("{path} is outside of {root}.")]
	OutsideRoot { path: PathBuf, root: PathBuf },
	#[error("no free name found for {0}.")]
	NoFreeName(PathBuf),
}

impl Rule {
	/// # Errors
	/// When `pattern` isn't a valid regex.
	pub fn block_pattern(pattern: &str) -> crate::Result<Rule> {
		Ok(Rule::BlockPattern(regex::Regex::new(pattern)?))
	}

	pub fn check(&self, action: &InstallerAction, state: &BatchState) -> RuleVerdict {
		match self {
			Rule::RejectExisting => match action.destination() {
				Some(destination) if state.is_occupied(destination) => RuleVerdict::Reject(ValidationError::DestinationOccupied(destination.to_path_buf())),
				_ => RuleVerdict::Pass,
			},
			Rule::RenameOnConflict { suffix } => match action.destination() {
				Some(destination) if state.is_occupied(destination) => {
					match (1..=MAX_RENAME_ATTEMPTS).map(|n| numbered_name(destination, suffix, n)).find(|p| !state.is_occupied(p)) {
						Some(free) => RuleVerdict::Rewrite(free),
						None => RuleVerdict::Reject(ValidationError::NoFreeName(destination.to_path_buf())),
					}
				},
				_ => RuleVerdict::Pass,
			},
			Rule::BlockPattern(pattern) => {
				for path in action.touched_paths() {
					if pattern.is_match(&path.to_string_lossy()) {
						return RuleVerdict::Reject(ValidationError::BlockedPath { path: path.to_path_buf(), pattern: pattern.as_str().to_owned() });
					}
				}
				RuleVerdict::Pass
			},
			Rule::ConfineTo(root) => {
				let absolute_root = absolute(root);
				for path in action.touched_paths() {
					let inside = match (&absolute_root, absolute(path)) {
						(Some(root), Some(path)) => path.starts_with(root),
						_ => false,
					};
					if !inside {
						return RuleVerdict::Reject(ValidationError::OutsideRoot { path: path.to_path_buf(), root: root.clone() });
					}
				}
				RuleVerdict::Pass
			},
		}
	}
}

/// Destinations claimed and freed by the actions accepted so far.
#[derive(Debug, Default)]
pub struct BatchState {
	claimed: HashSet<PathBuf>,
	freed: HashSet<PathBuf>,
	/// Requested destination to the one it was rewritten to.
	rewritten: HashMap<PathBuf, PathBuf>,
}

impl BatchState {
	pub fn is_occupied(&self, path: &Path) -> bool {
		if self.claimed.contains(path) {
			return true;
		}
		!self.freed.contains(path) && std::fs::symlink_metadata(path).is_ok()
	}

	/// Points the source of a rename or removal at the rewritten destination of an earlier action.
	fn redirect(&self, action: InstallerAction) -> InstallerAction {
		match action {
			InstallerAction::RenameFile(mut a) => {
				if let Some(rewritten) = self.rewritten.get(&a.source) {
					log::debug!("Redirecting rename of {} to {}", a.source.display(), rewritten.display());
					a.source = rewritten.clone();
				}
				InstallerAction::RenameFile(a)
			},
			InstallerAction::RemoveFile(mut a) => {
				if let Some(rewritten) = self.rewritten.get(&a.path) {
					log::debug!("Redirecting removal of {} to {}", a.path.display(), rewritten.display());
					a.path = rewritten.clone();
				}
				InstallerAction::RemoveFile(a)
			},
			other => other,
		}
	}

	fn record_rewrite(&mut self, requested: PathBuf, rewritten: PathBuf) {
		if requested != rewritten {
			self.rewritten.insert(requested, rewritten);
		}
	}

	fn accept(&mut self, action: &InstallerAction) {
		match action {
			InstallerAction::InstallFile(a) => self.claim(&a.destination),
			InstallerAction::RenameFile(a) => {
				self.free(&a.source);
				self.claim(&a.destination);
			},
			InstallerAction::RemoveFile(a) => self.free(&a.path),
			InstallerAction::Custom(_) => {},
		}
	}

	fn claim(&mut self, path: &Path) {
		self.freed.remove(path);
		self.claimed.insert(path.to_path_buf());
	}

	fn free(&mut self, path: &Path) {
		self.claimed.remove(path);
		self.freed.insert(path.to_path_buf());
	}
}

/// An ordered list of rules applied to every action of a batch.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
	rules: Vec<Rule>,
}

impl RuleSet {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with(mut self, rule: Rule) -> Self {
		self.rules.push(rule);
		self
	}

	pub fn rules(&self) -> &[Rule] {
		&self.rules
	}

	/// Runs each action through every rule in order, rewrites are seen by the rules after them.
	///
	/// # Errors
	/// The first [`ValidationError`] any rule rejects with. Nothing has been executed at this point.
	pub fn apply(&self, actions: Vec<InstallerAction>) -> Result<Vec<InstallerAction>, ValidationError> {
		let mut state = BatchState::default();
		let mut validated = Vec::<InstallerAction>::with_capacity(actions.len());

		for action in actions {
			let mut action = state.redirect(action);
			let requested = action.destination().map(Path::to_path_buf);

			for rule in &self.rules {
				match rule.check(&action, &state) {
					RuleVerdict::Pass => {},
					RuleVerdict::Rewrite(destination) => {
						log::info!("Rewriting destination of `{}` to {}", action, destination.display());
						action = action.with_destination(destination);
					},
					RuleVerdict::Reject(e) => {
						log::warn!("Rejected `{}`: {}", action, e);
						return Err(e);
					},
				}
			}
			if let (Some(requested), Some(destination)) = (requested, action.destination()) {
				state.record_rewrite(requested, destination.to_path_buf());
			}
			state.accept(&action);
			validated.push(action);
		}

		Ok(validated)
	}
}

fn numbered_name(path: &Path, suffix: &str, n: usize) -> PathBuf {
	let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
	let counter = if n == 1 { String::new() } else { n.to_string() };
	let name = match path.extension() {
		Some(ext) => format!("{}{}{}.{}", stem, suffix, counter, ext.to_string_lossy()),
		None => format!("{}{}{}", stem, suffix, counter),
	};
	path.with_file_name(name)
}

/// `path` made absolute against the working directory and normalized.
fn absolute(path: &Path) -> Option<PathBuf> {
	if path.is_absolute() {
		normalize(path)
	} else {
		normalize(&std::env::current_dir().ok()?.join(path))
	}
}

/// Resolves `.` and `..` without touching the filesystem, `None` if `..` climbs above the start.
fn normalize(path: &Path) -> Option<PathBuf> {
	let mut normalized = PathBuf::new();
	for component in path.components() {
		match component {
			Component::CurDir => {},
			Component::ParentDir => {
				if !normalized.pop() {
					return None;
				}
			},
			other => normalized.push(other.as_os_str()),
		}
	}
	Some(normalized)
}

#[cfg(test)]
mod tests {
	use super::*;
	#[test] fn numbered_name_keeps_extension() { assert_eq!(numbered_name(Path::new("a/foo.cfg"), "_conflict", 1), PathBuf::from("a/foo_conflict.cfg")) }
	#[test] fn numbered_name_counts_from_two() { assert_eq!(numbered_name(Path::new("a/foo.cfg"), "_conflict", 3), PathBuf::from("a/foo_conflict3.cfg")) }
	#[test] fn numbered_name_without_extension() { assert_eq!(numbered_name(Path::new("a/README"), "_old", 1), PathBuf::from("a/README_old")) }
	#[test] fn normalize_resolves_parent() { assert_eq!(normalize(Path::new("/game/GameData/../GameData/x")), Some(PathBuf::from("/game/GameData/x"))) }
	#[test] fn normalize_rejects_escape() { assert_eq!(normalize(Path::new("a/../..")), None) }
}
