//! Applies add-on files to a game directory as a single all-or-nothing run.
//!
//! # Usage
//! 1. Turn each add-on's [`InstallRequest`] into [`InstallerAction`]s, in resolver order. See [`plan`].
//! 1. Pass them through a [`RuleSet`] to catch name collisions and unwanted destinations.
//! 1. Create an [`InstallerQueue`] and [`run()`](InstallerQueue::run()) it, or hand it to [`worker::spawn_run()`].
//! 1. Inspect the [`RunResult`], when anything failed every earlier action has already been undone.

mod action;
pub use action::InstallerAction;
pub use action::InstallFile;
pub use action::RenameFile;
pub use action::RemoveFile;
pub use action::ActionStatus;
pub use action::ActionExecutionError;
pub use action::RollbackError;

mod custom;
pub use custom::CustomAction;
pub use custom::CustomStep;
pub use custom::CustomStepError;
pub use custom::CustomSteps;
pub use custom::FnStep;

mod progress;
pub use progress::CancelToken;
pub use progress::ProgressEvent;
pub use progress::ProgressOutcome;

mod queue;
pub use queue::InstallerQueue;
pub use queue::QueueOptions;
pub use queue::QueueError;
pub use queue::RunResult;
pub use queue::RunStatus;
pub use queue::ActionOutcome;
pub use queue::InstallResult;
pub use queue::UninstallResult;

mod rules;
pub use rules::Rule;
pub use rules::RuleSet;
pub use rules::RuleVerdict;
pub use rules::BatchState;
pub use rules::ValidationError;

mod request;
pub use request::EntryKind;
pub use request::RequestEntry;
pub use request::InstallRequest;
pub use request::UninstallRequest;
pub use request::RequestError;

pub mod plan;
pub mod worker;
