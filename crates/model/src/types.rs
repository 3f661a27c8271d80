use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Kind of a source symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Function,
    Type,
    Method,
}

/// Visibility of a symbol, most to least visible.
///
/// `Restricted` covers language-specific in-between levels (Java
/// package/protected, Rust `pub(crate)`); a symbol can never be more visible
/// than its containing namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Restricted,
    Private,
}

/// A function, type, or method within a namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,

    /// 1-based source line, when a front-end knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,

    /// Names this symbol calls (textual evidence, not a resolved call graph).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub calls: Vec<String>,

    /// Names this symbol inherits from or implements.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inherits: Vec<String>,

    /// Nested symbols: a type's methods or nested types, keyed by name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub children: BTreeMap<String, Symbol>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
}

impl Symbol {
    pub fn new(name: impl Into<String>, kind: SymbolKind) -> Self {
        Self {
            name: name.into(),
            kind,
            line: None,
            calls: Vec::new(),
            inherits: Vec::new(),
            children: BTreeMap::new(),
            visibility: None,
        }
    }
}

/// A node in the project hierarchy (package, module, crate module).
///
/// `children` is the tree relation; `imports_to` / `imports_from` are the
/// aggregated cross-boundary reference edges at this node's level of
/// abstraction. All lists are sorted so identical input yields identical
/// serialized output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imports_to: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imports_from: Vec<String>,

    /// Symbols defined by this node; present only on leaf source units.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbols: Option<BTreeMap<String, Symbol>>,

    /// Per-symbol dependency targets, finer grained than node-level edges.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_deps: Option<BTreeMap<String, Vec<String>>>,

    /// Whether this node is part of its parent's public surface.
    #[serde(default = "default_exported")]
    pub is_exported: bool,
}

fn default_exported() -> bool {
    true
}

impl Node {
    pub fn new() -> Self {
        Self {
            is_exported: true,
            ..Default::default()
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// An external package dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalDep {
    pub name: String,
    pub is_direct: bool,
}

/// Complete project structure produced by one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectGraph {
    pub project_name: String,

    /// Root namespace identifiers: one for a single-unit project, several
    /// for a multi-unit workspace.
    #[serde(default)]
    pub roots: Vec<String>,

    #[serde(default)]
    pub hierarchy: BTreeMap<String, Node>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub external_deps: Vec<ExternalDep>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub external_dep_graph: BTreeMap<String, Vec<String>>,

    /// Dependency cycles: strongly connected components of size >= 2 over
    /// the aggregated `imports_to` edges. Members within a group are sorted.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cycles: Vec<Vec<String>>,
}

impl ProjectGraph {
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.hierarchy.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_defaults_to_exported() {
        let node: Node = serde_json::from_str("{}").unwrap();
        assert!(node.is_exported);
        assert!(node.is_leaf());
    }

    #[test]
    fn graph_round_trips_through_json() {
        let mut graph = ProjectGraph {
            project_name: "demo".into(),
            roots: vec!["demo".into()],
            ..Default::default()
        };
        let mut node = Node::new();
        node.imports_to.push("demo.util".into());
        graph.hierarchy.insert("demo.core".into(), node);

        let json = serde_json::to_string(&graph).unwrap();
        let back: ProjectGraph = serde_json::from_str(&json).unwrap();
        assert_eq!(back, graph);
    }
}
