//! Dependency-cycle detection over the aggregated reference graph.

use std::collections::BTreeMap;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::builder::NodeState;

/// Strongly connected components of size >= 2 over `agg_to` edges.
///
/// Edge targets absent from the node set are outside the analyzable graph
/// and are skipped. Nodes are inserted in sorted identifier order, so the
/// result is deterministic for identical input; members within each group
/// are sorted, and the groups themselves are sorted.
pub(crate) fn detect_cycles(nodes: &BTreeMap<String, NodeState>) -> Vec<Vec<String>> {
    let mut graph: DiGraph<&str, ()> = DiGraph::new();
    let mut index: BTreeMap<&str, NodeIndex> = BTreeMap::new();

    for id in nodes.keys() {
        index.insert(id.as_str(), graph.add_node(id.as_str()));
    }
    for (id, state) in nodes {
        let from = index[id.as_str()];
        for target in &state.agg_to {
            if let Some(&to) = index.get(target.as_str()) {
                graph.add_edge(from, to, ());
            }
        }
    }

    let mut cycles: Vec<Vec<String>> = tarjan_scc(&graph)
        .into_iter()
        .filter(|scc| scc.len() >= 2)
        .map(|scc| {
            let mut group: Vec<String> = scc.into_iter().map(|ix| graph[ix].to_string()).collect();
            group.sort();
            group
        })
        .collect();
    cycles.sort();
    cycles
}

#[cfg(test)]
mod tests {
    use crate::GraphBuilder;
    use pretty_assertions::assert_eq;

    #[test]
    fn mutual_imports_form_one_cycle_group() {
        let mut builder = GraphBuilder::new("demo");
        builder.add_unit(["p", "p.m1", "p.m2"], None);
        builder.add_edge("p.m1", "p.m2");
        builder.add_edge("p.m2", "p.m1");

        let graph = builder.finish().unwrap();
        assert_eq!(
            graph.cycles,
            vec![vec!["p.m1".to_string(), "p.m2".to_string()]]
        );
    }

    #[test]
    fn acyclic_graph_reports_no_cycles() {
        let mut builder = GraphBuilder::new("demo");
        builder.add_unit(["p", "p.a", "p.b", "p.c"], None);
        builder.add_edge("p.a", "p.b");
        builder.add_edge("p.b", "p.c");

        let graph = builder.finish().unwrap();
        assert!(graph.cycles.is_empty());
    }

    #[test]
    fn disconnected_components_are_both_detected() {
        let mut builder = GraphBuilder::new("demo");
        builder.add_unit(["p", "p.a", "p.b", "p.x", "p.y", "p.z", "p.solo"], None);
        builder.add_edge("p.a", "p.b");
        builder.add_edge("p.b", "p.a");
        builder.add_edge("p.x", "p.y");
        builder.add_edge("p.y", "p.z");
        builder.add_edge("p.z", "p.x");

        let graph = builder.finish().unwrap();
        assert_eq!(
            graph.cycles,
            vec![
                vec!["p.a".to_string(), "p.b".to_string()],
                vec!["p.x".to_string(), "p.y".to_string(), "p.z".to_string()],
            ]
        );
    }

    #[test]
    fn edges_to_unknown_targets_are_skipped() {
        let mut builder = GraphBuilder::new("demo");
        builder.add_unit(["p", "p.a"], None);
        builder.add_edge("p.a", "p.a.ghost");

        // p.a.ghost exists only as a placeholder leaf; no cycle, no error.
        let graph = builder.finish().unwrap();
        assert!(graph.cycles.is_empty());
    }
}
