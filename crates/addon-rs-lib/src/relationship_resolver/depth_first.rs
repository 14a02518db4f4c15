use petgraph::prelude::*;

use super::{CycleDetectedError, DependencyGraph, GraphResolver, ResolverKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
	Unvisited,
	/// On the current path, reaching it again means a cycle.
	Visiting,
	Visited,
}

/// Emits each add-on after recursively emitting its dependencies.
///
/// Roots are taken in ascending name order and dependencies in declared order.
#[derive(Debug, Default, Clone, Copy)]
pub struct DepthFirstResolver;

impl GraphResolver for DepthFirstResolver {
	fn kind(&self) -> ResolverKind {
		ResolverKind::DepthFirst
	}

	fn resolve(&self, graph: &DependencyGraph) -> Result<Vec<String>, CycleDetectedError> {
		let nodes = graph.inner();
		let mut marks = vec![Mark::Unvisited; nodes.node_count()];
		let mut order = Vec::<String>::with_capacity(nodes.node_count());

		for root in graph.sorted_indices() {
			if marks[root.index()] != Mark::Unvisited { continue; }

			/* Explicit stack of (node, next dependency position) so long chains don't overflow */
			let mut stack = vec![(root, 0usize)];
			marks[root.index()] = Mark::Visiting;

			while let Some(frame) = stack.last_mut() {
				let (node, position) = *frame;
				frame.1 += 1;

				match nodes[node].dependencies().get(position) {
					Some(&dependency) => match marks[dependency.index()] {
						Mark::Visited => {},
						Mark::Unvisited => {
							marks[dependency.index()] = Mark::Visiting;
							stack.push((dependency, 0));
						},
						Mark::Visiting => {
							return Err(cycle_from_stack(graph, &stack, dependency));
						},
					},
					None => {
						marks[node.index()] = Mark::Visited;
						order.push(graph.name_of(node).to_owned());
						stack.pop();
					},
				}
			}
		}

		Ok(order)
	}
}

/// The cycle is the part of the current path starting at `repeated`, closed with `repeated` again.
fn cycle_from_stack(graph: &DependencyGraph, stack: &[(NodeIndex, usize)], repeated: NodeIndex) -> CycleDetectedError {
	let start = stack.iter().position(|(n, _)| *n == repeated).unwrap_or(0);
	let mut cycle: Vec<String> = stack[start..].iter()
		.map(|(n, _)| graph.name_of(*n).to_owned())
		.collect();
	cycle.push(graph.name_of(repeated).to_owned());
	CycleDetectedError { cycle }
}
