//! Add-on specific steps that don't fit the built-in file actions, e.g. patching a config after install.

use std::collections::HashMap;

use super::RequestEntry;

pub type CustomStepError = Box<dyn std::error::Error + Send + Sync>;

/// The procedure behind a [`CustomAction`].
///
/// A step that returns `false` from [`is_reversible()`](CustomStep::is_reversible()) is refused by
/// queues that require rollback safety.
pub trait CustomStep: Send + Sync {
	fn execute(&self) -> Result<(), CustomStepError>;

	fn is_reversible(&self) -> bool {
		false
	}

	/// Only called after a successful [`execute()`](CustomStep::execute()) and only when reversible.
	fn reverse(&self) -> Result<(), CustomStepError> {
		Err("step has no reverse procedure".into())
	}
}

pub struct CustomAction {
	name: String,
	step: Box<dyn CustomStep>,
}

impl CustomAction {
	pub fn new(name: impl Into<String>, step: impl CustomStep + 'static) -> Self {
		Self { name: name.into(), step: Box::new(step) }
	}

	pub fn from_boxed(name: impl Into<String>, step: Box<dyn CustomStep>) -> Self {
		Self { name: name.into(), step }
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn step(&self) -> &dyn CustomStep {
		self.step.as_ref()
	}
}

impl std::fmt::Debug for CustomAction {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("CustomAction")
			.field("name", &self.name)
			.field("reversible", &self.step.is_reversible())
			.finish()
	}
}

type StepFn = Box<dyn Fn() -> Result<(), CustomStepError> + Send + Sync>;

/// A [`CustomStep`] made of closures.
pub struct FnStep {
	execute: StepFn,
	reverse: Option<StepFn>,
}

impl FnStep {
	pub fn new(execute: impl Fn() -> Result<(), CustomStepError> + Send + Sync + 'static) -> Self {
		Self { execute: Box::new(execute), reverse: None }
	}

	pub fn with_reverse(mut self, reverse: impl Fn() -> Result<(), CustomStepError> + Send + Sync + 'static) -> Self {
		self.reverse = Some(Box::new(reverse));
		self
	}
}

impl CustomStep for FnStep {
	fn execute(&self) -> Result<(), CustomStepError> {
		(self.execute)()
	}

	fn is_reversible(&self) -> bool {
		self.reverse.is_some()
	}

	fn reverse(&self) -> Result<(), CustomStepError> {
		match &self.reverse {
			Some(reverse) => reverse(),
			None => Err("step has no reverse procedure".into()),
		}
	}
}

type StepFactory = Box<dyn Fn(&RequestEntry) -> Box<dyn CustomStep> + Send + Sync>;

/// Named step factories that [`EntryKind::Custom`](super::EntryKind::Custom) request entries refer to.
#[derive(Default)]
pub struct CustomSteps {
	factories: HashMap<String, StepFactory>,
}

impl CustomSteps {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn register(&mut self, name: impl Into<String>, factory: impl Fn(&RequestEntry) -> Box<dyn CustomStep> + Send + Sync + 'static) {
		let name = name.into();
		log::trace!("Registering custom step `{}`", name);
		self.factories.insert(name, Box::new(factory));
	}

	pub fn contains(&self, name: &str) -> bool {
		self.factories.contains_key(name)
	}

	pub(super) fn create(&self, name: &str, entry: &RequestEntry) -> Option<CustomAction> {
		self.factories.get(name).map(|factory| CustomAction::from_boxed(name, factory(entry)))
	}
}

impl std::fmt::Debug for CustomSteps {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let mut names: Vec<&String> = self.factories.keys().collect();
		names.sort();
		f.debug_struct("CustomSteps").field("names", &names).finish()
	}
}
