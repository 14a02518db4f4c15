//! Module for only DependencyGraph functions not related to the overall resolving process.

use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::prelude::*;
use serde::{Serialize, Deserialize};

/// Name and dependencies of an add-on as supplied by the catalog.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddonMetadata {
	pub name: String,
	#[serde(default)]
	pub depends: Vec<String>,
}

impl AddonMetadata {
	pub fn new(name: impl Into<String>, depends: impl IntoIterator<Item = impl Into<String>>) -> Self {
		Self {
			name: name.into(),
			depends: depends.into_iter().map(Into::into).collect(),
		}
	}
}

#[derive(Debug, Clone)]
pub struct DependencyNode {
	name: String,
	/// In the order they were declared, duplicates removed.
	dependencies: Vec<NodeIndex>,
}

impl DependencyNode {
	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn dependencies(&self) -> &[NodeIndex] {
		&self.dependencies
	}
}

/// Errors when building a graph, these happen before any resolver runs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
	#[error("`{node}` depends on `{missing}` which is not present.")]
	DanglingDependency { node: String, missing: String },
	#[error("`{0}` was declared more than once.")]
	DuplicateNode(String),
}

/// Add-ons and their "depends-on" relations.
///
/// An edge `a -> b` means `a` depends on `b`. Nodes are never removed so indices stay dense.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
	graph: DiGraph<DependencyNode, ()>,
	lookup: HashMap<String, NodeIndex>,
}

impl DependencyGraph {
	/// Builds a graph from `(name, dependencies)` pairs.
	///
	/// # Errors
	/// - [`GraphError::DuplicateNode`] if a name appears twice.
	/// - [`GraphError::DanglingDependency`] if a dependency names an add-on that isn't in `addons`.
	pub fn build<N, D, S>(addons: impl IntoIterator<Item = (N, D)>) -> Result<Self, GraphError>
	where
		N: Into<String>,
		D: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let addons: Vec<(String, Vec<String>)> = addons.into_iter()
			.map(|(name, depends)| (name.into(), depends.into_iter().map(Into::into).collect()))
			.collect();

		let mut dep_graph = DependencyGraph {
			graph: DiGraph::with_capacity(addons.len(), 0),
			lookup: HashMap::with_capacity(addons.len()),
		};

		for (name, _) in &addons {
			if dep_graph.lookup.contains_key(name) {
				return Err(GraphError::DuplicateNode(name.clone()));
			}
			let index = dep_graph.graph.add_node(DependencyNode { name: name.clone(), dependencies: Vec::new() });
			dep_graph.lookup.insert(name.clone(), index);
		}

		for (name, depends) in &addons {
			let src = dep_graph.lookup[name];
			for dependency in depends {
				let target = *dep_graph.lookup.get(dependency).ok_or_else(|| GraphError::DanglingDependency {
					node: name.clone(),
					missing: dependency.clone(),
				})?;
				if dep_graph.graph[src].dependencies.contains(&target) {
					continue;
				}
				dep_graph.graph[src].dependencies.push(target);
				dep_graph.graph.add_edge(src, target, ());
			}
		}

		log::trace!("Built dependency graph with {} add-ons and {} edges", dep_graph.graph.node_count(), dep_graph.graph.edge_count());

		Ok(dep_graph)
	}

	pub fn from_metadata<'a>(addons: impl IntoIterator<Item = &'a AddonMetadata>) -> Result<Self, GraphError> {
		Self::build(addons.into_iter().map(|a| (a.name.as_str(), a.depends.iter().map(String::as_str))))
	}

	pub fn len(&self) -> usize {
		self.graph.node_count()
	}

	pub fn is_empty(&self) -> bool {
		self.graph.node_count() == 0
	}

	pub fn contains(&self, name: &str) -> bool {
		self.lookup.contains_key(name)
	}

	pub fn node(&self, name: &str) -> Option<&DependencyNode> {
		self.lookup.get(name).map(|i| &self.graph[*i])
	}

	/// All add-on names in ascending order.
	pub fn names(&self) -> Vec<&str> {
		let mut names: Vec<&str> = self.lookup.keys().map(String::as_str).collect();
		names.sort_unstable();
		names
	}

	/// Direct dependencies of `name` in their declared order.
	pub fn dependencies_of(&self, name: &str) -> Option<Vec<&str>> {
		let node = self.node(name)?;
		Some(node.dependencies.iter().map(|i| self.name_of(*i)).collect())
	}

	/// Add-ons that directly depend on `name`, sorted.
	pub fn dependents_of(&self, name: &str) -> Option<Vec<&str>> {
		let index = *self.lookup.get(name)?;
		let mut dependents: Vec<&str> = self.graph.neighbors_directed(index, Incoming)
			.map(|i| self.name_of(i))
			.collect();
		dependents.sort_unstable();
		dependents.dedup();
		Some(dependents)
	}

	/// Every add-on that would break if `name` was removed, directly or through another add-on. Sorted.
	pub fn reverse_dependencies(&self, name: &str) -> Option<Vec<String>> {
		let start = *self.lookup.get(name)?;
		let mut breaking = HashSet::<NodeIndex>::new();
		let mut queue = VecDeque::<NodeIndex>::new();
		queue.push_back(start);

		while let Some(i) = queue.pop_front() {
			for dependent in self.graph.neighbors_directed(i, Incoming) {
				if dependent != start && breaking.insert(dependent) {
					queue.push_back(dependent);
				}
			}
		}

		let mut breaking: Vec<String> = breaking.into_iter().map(|i| self.name_of(i).to_owned()).collect();
		breaking.sort_unstable();
		Some(breaking)
	}

	/* Resolver internals */

	pub(super) fn inner(&self) -> &DiGraph<DependencyNode, ()> {
		&self.graph
	}

	pub(super) fn name_of(&self, index: NodeIndex) -> &str {
		&self.graph[index].name
	}

	/// Node indices ordered by name, used as the starting frontier so output doesn't depend on insertion order.
	pub(super) fn sorted_indices(&self) -> Vec<NodeIndex> {
		let mut indices: Vec<NodeIndex> = self.graph.node_indices().collect();
		indices.sort_unstable_by(|a, b| self.name_of(*a).cmp(self.name_of(*b)));
		indices
	}
}
