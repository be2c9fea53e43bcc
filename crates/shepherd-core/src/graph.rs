use std::collections::{BTreeMap, BTreeSet};

use shepherd_types::Service;

/// Vertex colors for the depth-first walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unseen,
    OnStack,
    Done,
}

/// Dependency graph over service names. An edge `u -> v` means `u` requires
/// `v`. Names referenced in `deps` but not defined as services are legal
/// vertices with no outgoing edges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepGraph {
    edges: BTreeMap<String, Vec<String>>,
}

impl DepGraph {
    /// Build the graph from a service map, one vertex per defined service.
    #[must_use]
    pub fn build(services: &BTreeMap<String, Service>) -> Self {
        let edges = services
            .iter()
            .map(|(name, service)| (name.clone(), service.deps.clone()))
            .collect();
        Self { edges }
    }

    /// True iff the graph contains a directed cycle.
    ///
    /// An edge to a vertex currently on the DFS stack proves a cycle. Edges
    /// to undefined services bottom out immediately and never form one.
    #[must_use]
    pub fn is_cyclic(&self) -> bool {
        let mut marks = BTreeMap::new();
        self.edges
            .keys()
            .any(|root| self.cycle_from(root, &mut marks))
    }

    fn cycle_from<'a>(&'a self, vertex: &'a str, marks: &mut BTreeMap<&'a str, Mark>) -> bool {
        match marks.get(vertex).copied().unwrap_or(Mark::Unseen) {
            Mark::Done => return false,
            Mark::OnStack => return true,
            Mark::Unseen => {}
        }

        marks.insert(vertex, Mark::OnStack);
        if let Some(deps) = self.edges.get(vertex) {
            for dep in deps {
                if self.cycle_from(dep, marks) {
                    return true;
                }
            }
        }
        marks.insert(vertex, Mark::Done);

        false
    }

    /// Topological order over the defined services: every dependency is
    /// emitted strictly before its dependents. Deterministic for a given
    /// input map. Must only be called on an acyclic graph.
    #[must_use]
    pub fn topological_order(&self) -> Vec<String> {
        let mut order = Vec::with_capacity(self.edges.len());
        let mut seen = BTreeSet::new();
        for root in self.edges.keys() {
            self.emit_after_deps(root, &mut seen, &mut order);
        }
        order
    }

    fn emit_after_deps<'a>(
        &'a self,
        vertex: &'a str,
        seen: &mut BTreeSet<&'a str>,
        order: &mut Vec<String>,
    ) {
        if !seen.insert(vertex) {
            return;
        }

        // Undefined dependency targets are marked seen but never emitted.
        if let Some(deps) = self.edges.get(vertex) {
            for dep in deps {
                self.emit_after_deps(dep, seen, order);
            }
            order.push(vertex.to_string());
        }
    }
}
