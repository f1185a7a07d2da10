//! A directed graph over type names, used for dependency checks
//! (structure containment, function block inheritance).
use fixedbitset::FixedBitSet;
use petgraph::{
    algo::is_cyclic_directed,
    stable_graph::{NodeIndex, StableDiGraph},
    visit::Dfs,
};
use plx_dsl::common::TypeName;
use std::collections::HashMap;

pub type SymbolNode = NodeIndex;

pub struct SymbolGraph<N> {
    graph: StableDiGraph<(), (), u32>,
    nodes: HashMap<TypeName, (SymbolNode, N)>,
}

impl<N> SymbolGraph<N> {
    pub fn new() -> Self {
        Self {
            graph: StableDiGraph::new(),
            nodes: HashMap::new(),
        }
    }

    pub fn add_node(&mut self, id: &TypeName, data: N) -> SymbolNode {
        match self.nodes.get(id) {
            Some(node_and_data) => node_and_data.0,
            None => {
                let node = self.graph.add_node(());
                self.nodes.insert(id.clone(), (node, data));
                node
            }
        }
    }

    /// Returns a reference to the key and node corresponding to the
    /// key. Returning the key matters because identifiers can be equal
    /// without being identical.
    pub fn get_node(&self, id: &TypeName) -> Option<(&TypeName, &SymbolNode)> {
        self.nodes.get_key_value(id).map(|kv| (kv.0, &kv.1 .0))
    }

    pub fn data(&self, id: &TypeName) -> Option<&N> {
        self.nodes.get(id).map(|node_and_data| &node_and_data.1)
    }

    pub fn add_edge(&mut self, from: SymbolNode, to: SymbolNode) {
        self.graph.add_edge(from, to, ());
    }

    /// True when the graph contains a directed cycle.
    pub fn has_cycle(&self) -> bool {
        is_cyclic_directed(&self.graph)
    }

    /// Names whose node participates in a cycle reachable from itself.
    pub fn cyclic_names(&self) -> Vec<TypeName> {
        let mut names: Vec<TypeName> = self
            .nodes
            .iter()
            .filter(|(_, (node, _))| self.reaches_itself(*node))
            .map(|(name, _)| name.clone())
            .collect();
        names.sort_by(|a, b| a.name.cmp(&b.name));
        names
    }

    fn reaches_itself(&self, start: SymbolNode) -> bool {
        // A depth-first search never revisits its start, so begin the
        // search from each successor instead.
        self.graph.neighbors(start).any(|successor| {
            if successor == start {
                return true;
            }
            let mut dfs = Dfs::new(&self.graph, successor);
            while let Some(reached) = dfs.next(&self.graph) {
                if reached == start {
                    return true;
                }
            }
            false
        })
    }

    pub fn dfs(&self, start: SymbolNode) -> SymbolDfs {
        SymbolDfs::new(&self.graph, start)
    }
}

impl<N> Default for SymbolGraph<N> {
    fn default() -> Self {
        Self::new()
    }
}

pub struct SymbolDfs {
    dfs: Dfs<SymbolNode, FixedBitSet>,
}

impl SymbolDfs {
    fn new(graph: &StableDiGraph<(), (), u32>, start: SymbolNode) -> Self {
        Self {
            dfs: Dfs::new(graph, start),
        }
    }
    pub fn next<N>(&mut self, graph: &SymbolGraph<N>) -> Option<SymbolNode> {
        self.dfs.next(&graph.graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_graph_when_acyclic_then_no_cycle() {
        let mut graph: SymbolGraph<()> = SymbolGraph::new();
        let a = graph.add_node(&TypeName::from("A"), ());
        let b = graph.add_node(&TypeName::from("B"), ());
        graph.add_edge(a, b);
        assert!(!graph.has_cycle());
    }

    #[test]
    fn symbol_graph_when_cycle_then_detected_with_names() {
        let mut graph: SymbolGraph<()> = SymbolGraph::new();
        let a = graph.add_node(&TypeName::from("A"), ());
        let b = graph.add_node(&TypeName::from("B"), ());
        let c = graph.add_node(&TypeName::from("C"), ());
        graph.add_edge(a, b);
        graph.add_edge(b, a);
        graph.add_edge(a, c);
        assert!(graph.has_cycle());
        let names = graph.cyclic_names();
        assert_eq!(names.len(), 2);
    }

    #[test]
    fn symbol_graph_when_self_edge_then_cycle() {
        let mut graph: SymbolGraph<()> = SymbolGraph::new();
        let a = graph.add_node(&TypeName::from("A"), ());
        graph.add_edge(a, a);
        assert!(graph.has_cycle());
        assert_eq!(graph.cyclic_names().len(), 1);
    }
}
