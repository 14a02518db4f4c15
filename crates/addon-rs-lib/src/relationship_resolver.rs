//! Utilities for getting a valid install order from a set of add-ons and their dependencies.
//!
//! # Usage
//! 1. Build a [`DependencyGraph`] from add-on metadata.
//! 1. [`ResolverFactory::create()`] a [`GraphResolver`] for the wanted [`ResolverKind`].
//! 1. [`GraphResolver::resolve()`] to get the install order, every add-on comes after everything it depends on.
//! 1. [`removal_order()`] when the same add-ons are being removed instead.
//!
//! Resolution never guesses its way out of a cycle, a [`CycleDetectedError`] is returned
//! and the user has to decide which add-on to drop.

use std::str::FromStr;

use serde::{Serialize, Deserialize};

mod dependency_graph;
pub use dependency_graph::AddonMetadata;
pub use dependency_graph::DependencyGraph;
pub use dependency_graph::DependencyNode;
pub use dependency_graph::GraphError;

mod depth_first;
pub use depth_first::DepthFirstResolver;
mod breadth_first;
pub use breadth_first::BreadthFirstResolver;

/// Traversal used to linearize the graph.
///
/// Both produce a valid order but differ in the placement of add-ons that are independent of each other.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolverKind {
	/// Post-order walk from each add-on in name order. Keeps an add-on close to its dependencies.
	#[default] DepthFirst,
	/// Layer by layer, every add-on whose dependencies are already placed is emitted together.
	BreadthFirst,
}

impl FromStr for ResolverKind {
	type Err = crate::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_lowercase().as_str() {
			"depth-first" | "depthfirst" | "dfs" => Ok(ResolverKind::DepthFirst),
			"breadth-first" | "breadthfirst" | "bfs" => Ok(ResolverKind::BreadthFirst),
			_ => Err(crate::Error::Parse(format!("unknown resolver kind \"{}\"", s))),
		}
	}
}

impl std::fmt::Display for ResolverKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			ResolverKind::DepthFirst => write!(f, "depth-first"),
			ResolverKind::BreadthFirst => write!(f, "breadth-first"),
		}
	}
}

/// The graph can't be linearized.
///
/// `cycle` is the loop itself starting and ending on the same add-on, e.g. `[A, B, A]`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("dependency cycle detected: {}", .cycle.join(" -> "))]
pub struct CycleDetectedError {
	pub cycle: Vec<String>,
}

/// A strategy for turning a [`DependencyGraph`] into an install order.
pub trait GraphResolver: Send + Sync {
	fn kind(&self) -> ResolverKind;

	/// Orders every add-on in `graph` after all of its dependencies.
	///
	/// Resolving the same graph again gives the same order.
	/// # Errors
	/// [`CycleDetectedError`] when any add-on depends on itself, directly or through others.
	fn resolve(&self, graph: &DependencyGraph) -> Result<Vec<String>, CycleDetectedError>;
}

pub struct ResolverFactory;

impl ResolverFactory {
	pub fn create(kind: ResolverKind) -> Box<dyn GraphResolver> {
		match kind {
			ResolverKind::DepthFirst => Box::new(DepthFirstResolver),
			ResolverKind::BreadthFirst => Box::new(BreadthFirstResolver),
		}
	}
}

/// Shorthand for creating a resolver of `kind` and resolving `graph` with it.
pub fn resolve(graph: &DependencyGraph, kind: ResolverKind) -> Result<Vec<String>, CycleDetectedError> {
	log::debug!("Resolving {} add-ons using {} strategy", graph.len(), kind);
	let order = ResolverFactory::create(kind).resolve(graph);
	match &order {
		Ok(order) => log::trace!("Resolved order {:?}", order),
		Err(e) => log::warn!("Resolve failed: {}", e),
	}
	order
}

/// Dependents have to go before the add-ons they depend on when removing.
pub fn removal_order(install_order: &[String]) -> Vec<String> {
	install_order.iter().rev().cloned().collect()
}
