use petgraph::prelude::*;

use super::{CycleDetectedError, DependencyGraph, GraphResolver, ResolverKind};

/// Emits add-ons in layers, a layer holds every add-on whose dependencies are all in earlier layers.
///
/// Add-ons are name sorted within a layer.
#[derive(Debug, Default, Clone, Copy)]
pub struct BreadthFirstResolver;

impl BreadthFirstResolver {
	/// Same as [`resolve()`](GraphResolver::resolve()) but keeps the layers separate.
	///
	/// Add-ons in the same layer don't depend on each other.
	pub fn resolve_layers(&self, graph: &DependencyGraph) -> Result<Vec<Vec<String>>, CycleDetectedError> {
		let nodes = graph.inner();

		/* Number of dependencies not yet emitted */
		let mut unresolved: Vec<usize> = nodes.node_indices()
			.map(|i| nodes[i].dependencies().len())
			.collect();

		let mut layer: Vec<NodeIndex> = graph.sorted_indices()
			.into_iter()
			.filter(|i| unresolved[i.index()] == 0)
			.collect();

		let mut layers = Vec::<Vec<String>>::new();
		let mut emitted = 0;

		while !layer.is_empty() {
			emitted += layer.len();
			let mut next = Vec::<NodeIndex>::new();

			for &node in &layer {
				for dependent in nodes.neighbors_directed(node, Incoming) {
					unresolved[dependent.index()] -= 1;
					if unresolved[dependent.index()] == 0 {
						next.push(dependent);
					}
				}
			}

			layers.push(layer.iter().map(|i| graph.name_of(*i).to_owned()).collect());

			next.sort_unstable_by(|a, b| graph.name_of(*a).cmp(graph.name_of(*b)));
			layer = next;
		}

		if emitted < nodes.node_count() {
			return Err(find_cycle(graph, &unresolved));
		}

		Ok(layers)
	}
}

impl GraphResolver for BreadthFirstResolver {
	fn kind(&self) -> ResolverKind {
		ResolverKind::BreadthFirst
	}

	fn resolve(&self, graph: &DependencyGraph) -> Result<Vec<String>, CycleDetectedError> {
		Ok(self.resolve_layers(graph)?.into_iter().flatten().collect())
	}
}

/// Walks unresolved dependencies from the first unresolved add-on until one repeats.
///
/// Every unresolved add-on has at least one unresolved dependency so the walk always ends on a loop,
/// add-ons that are only stuck behind the loop are not part of the result.
fn find_cycle(graph: &DependencyGraph, unresolved: &[usize]) -> CycleDetectedError {
	let nodes = graph.inner();
	let is_unresolved = |i: NodeIndex| unresolved[i.index()] > 0;

	let mut path = Vec::<NodeIndex>::new();
	let mut current = graph.sorted_indices().into_iter().find(|i| is_unresolved(*i));

	while let Some(node) = current {
		if let Some(start) = path.iter().position(|n| *n == node) {
			let mut cycle: Vec<String> = path[start..].iter().map(|i| graph.name_of(*i).to_owned()).collect();
			cycle.push(graph.name_of(node).to_owned());
			return CycleDetectedError { cycle };
		}
		path.push(node);
		current = nodes[node].dependencies().iter().copied().find(|d| is_unresolved(*d));
	}

	/* Unreachable while the counts are consistent, report what was walked */
	CycleDetectedError { cycle: path.iter().map(|i| graph.name_of(*i).to_owned()).collect() }
}
