//! Joins a resolved order with each add-on's request into one validated action list.

use std::collections::HashMap;

use super::{CustomSteps, InstallRequest, InstallerAction, RuleSet, UninstallRequest};

/// Actions for every add-on in `order`, add-ons keep their resolved order and files keep their request order.
///
/// Add-ons in `order` without a request contribute nothing, they usually have no files of their own.
///
/// # Errors
/// - [`Request`](crate::Error::Request) if a request can't be turned into actions.
/// - [`Validation`](crate::Error::Validation) if `rules` rejects an action.
pub fn build_install_actions(order: &[String], requests: &HashMap<String, InstallRequest>, rules: &RuleSet, steps: &CustomSteps) -> crate::Result<Vec<InstallerAction>> {
	let mut actions = Vec::<InstallerAction>::new();
	for name in order {
		match requests.get(name) {
			Some(request) => {
				log::trace!("Planning install of {} ({} entries)", name, request.entries.len());
				actions.append(&mut request.into_actions(steps)?);
			},
			None => log::trace!("{} has no files to install", name),
		}
	}
	warn_unordered(order, requests.keys());

	Ok(rules.apply(actions)?)
}

/// Like [`build_install_actions()`] for removal, `order` should come from [`removal_order()`](crate::relationship_resolver::removal_order()).
pub fn build_uninstall_actions(order: &[String], requests: &HashMap<String, UninstallRequest>, rules: &RuleSet, steps: &CustomSteps) -> crate::Result<Vec<InstallerAction>> {
	let mut actions = Vec::<InstallerAction>::new();
	for name in order {
		if let Some(request) = requests.get(name) {
			log::trace!("Planning removal of {} ({} entries)", name, request.entries.len());
			actions.append(&mut request.into_actions(steps)?);
		}
	}
	warn_unordered(order, requests.keys());

	Ok(rules.apply(actions)?)
}

fn warn_unordered<'a>(order: &[String], names: impl Iterator<Item = &'a String>) {
	for name in names {
		if !order.contains(name) {
			log::warn!("Request for {} ignored, it is not part of the resolved order", name);
		}
	}
}
