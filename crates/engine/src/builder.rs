use std::collections::{BTreeMap, BTreeSet};

use scopemap_model::{ExternalDep, Node, ProjectGraph, Symbol, Visibility};

use crate::aggregate;
use crate::cycles;
use crate::error::Result;
use crate::ident;
use crate::merge;
use crate::roots;

/// Mutable per-node state while facts are being merged.
///
/// Raw edges (`raw_to` / `raw_from`) are what front-ends reported; the
/// aggregated sets (`agg_to` / `agg_from`) are recomputed from scratch by
/// every aggregation pass, so re-running after a later fact batch never
/// accumulates stale values.
#[derive(Debug, Clone)]
pub(crate) struct NodeState {
    pub(crate) children: BTreeSet<String>,
    pub(crate) raw_to: BTreeSet<String>,
    pub(crate) raw_from: BTreeSet<String>,
    pub(crate) agg_to: BTreeSet<String>,
    pub(crate) agg_from: BTreeSet<String>,
    pub(crate) symbols: Option<BTreeMap<String, Symbol>>,
    pub(crate) class_deps: Option<BTreeMap<String, Vec<String>>>,
    pub(crate) is_exported: bool,
}

impl NodeState {
    pub(crate) fn new() -> Self {
        Self {
            children: BTreeSet::new(),
            raw_to: BTreeSet::new(),
            raw_from: BTreeSet::new(),
            agg_to: BTreeSet::new(),
            agg_from: BTreeSet::new(),
            symbols: None,
            class_deps: None,
            is_exported: true,
        }
    }
}

/// Builds a [`ProjectGraph`] from the facts front-ends feed in.
///
/// Front-ends call the `add_*` / `merge_*` methods in pipeline order; each
/// batch may only add or refine information. `finish` then aggregates edges
/// bottom-up, projects cross-root edges, detects cycles, and emits the
/// immutable output graph.
pub struct GraphBuilder {
    project_name: String,
    roots: Vec<String>,
    nodes: BTreeMap<String, NodeState>,
    external_deps: Vec<ExternalDep>,
    external_dep_graph: BTreeMap<String, BTreeSet<String>>,
}

impl GraphBuilder {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            roots: Vec::new(),
            nodes: BTreeMap::new(),
            external_deps: Vec::new(),
            external_dep_graph: BTreeMap::new(),
        }
    }

    /// Root identifiers registered so far, in registration order.
    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    /// Whether an identifier exists as a node (declared or placeholder).
    pub fn has_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Register one unit's namespace identifiers as a subtree.
    ///
    /// The unit root is `explicit_root` when given, otherwise the longest
    /// common dotted prefix of `ids` (falling back to the first identifier in
    /// sorted order when they share no leading segment). Every intermediate
    /// ancestor between the root and each identifier is materialized, and the
    /// root is appended to the root set. Returns the unit root, or `None` for
    /// an empty batch with no explicit root.
    ///
    /// Multi-unit workspaces call this once per unit with that unit's own
    /// identifiers; no synthetic super-root is created.
    pub fn add_unit<I, S>(&mut self, ids: I, explicit_root: Option<&str>) -> Option<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut well_formed: BTreeSet<String> = BTreeSet::new();
        for id in ids {
            let id = id.as_ref();
            if ident::is_well_formed(id) {
                well_formed.insert(id.to_string());
            } else {
                log::warn!("Dropping malformed identifier: {id:?}");
            }
        }

        let root = match explicit_root {
            Some(r) if ident::is_well_formed(r) => r.to_string(),
            Some(r) => {
                log::warn!("Dropping unit with malformed root: {r:?}");
                return None;
            }
            None => {
                let prefix = ident::common_prefix(well_formed.iter().map(String::as_str));
                match prefix.or_else(|| well_formed.iter().next().cloned()) {
                    Some(root) => root,
                    None => return None,
                }
            }
        };

        self.ensure_node(&root);
        let root_depth = ident::depth(&root);

        for id in &well_formed {
            if !ident::contains(&root, id) {
                log::debug!("Identifier {id:?} lies outside unit root {root:?}");
                self.ensure_node(id);
                continue;
            }
            self.attach_chain(&root, root_depth, id);
        }

        if !self.roots.contains(&root) {
            self.roots.push(root.clone());
        }
        Some(root)
    }

    /// Record one raw reference edge between two namespace identifiers.
    ///
    /// Unknown endpoints become placeholder nodes so that independent
    /// extraction passes can report edges in any order. Self-edges and
    /// malformed endpoints are dropped.
    pub fn add_edge(&mut self, source: &str, target: &str) {
        if !ident::is_well_formed(source) || !ident::is_well_formed(target) {
            log::warn!("Dropping edge with malformed endpoint: {source:?} -> {target:?}");
            return;
        }
        if source == target {
            return;
        }
        self.ensure_node(source);
        self.ensure_node(target);
        self.node_mut(source).raw_to.insert(target.to_string());
        self.node_mut(target).raw_from.insert(source.to_string());
    }

    /// Merge a pass's symbol mapping into `namespace`.
    ///
    /// A name not previously present is added wholesale; an existing name is
    /// merged field-by-field with the new pass's non-empty values replacing
    /// the old, recursively over nested children. When `namespace` falls
    /// under a known root its ancestor chain is materialized on demand.
    pub fn merge_symbols(&mut self, namespace: &str, symbols: BTreeMap<String, Symbol>) {
        if !ident::is_well_formed(namespace) {
            log::warn!("Dropping symbols for malformed namespace: {namespace:?}");
            return;
        }

        if let Some(root) = self.owning_root(namespace) {
            let root_depth = ident::depth(&root);
            self.attach_chain(&root, root_depth, namespace);
        } else {
            self.ensure_node(namespace);
        }

        let node = self.node_mut(namespace);
        let existing = node.symbols.get_or_insert_with(BTreeMap::new);
        merge::merge_symbol_maps(existing, symbols);
    }

    /// Mark whether a node is part of its parent's public surface.
    pub fn set_exported(&mut self, id: &str, is_exported: bool) {
        if !ident::is_well_formed(id) {
            log::warn!("Dropping export flag for malformed identifier: {id:?}");
            return;
        }
        self.ensure_node(id);
        self.node_mut(id).is_exported = is_exported;
    }

    /// Attach per-symbol dependency targets to a node.
    pub fn set_class_deps(&mut self, id: &str, deps: BTreeMap<String, Vec<String>>) {
        if !ident::is_well_formed(id) {
            log::warn!("Dropping class deps for malformed identifier: {id:?}");
            return;
        }
        self.ensure_node(id);
        let deps = deps
            .into_iter()
            .map(|(symbol, mut targets)| {
                targets.sort();
                targets.dedup();
                (symbol, targets)
            })
            .collect();
        self.node_mut(id).class_deps = Some(deps);
    }

    /// External-dependency facts are passed through to the output unmodified.
    pub fn add_external_deps(&mut self, deps: impl IntoIterator<Item = ExternalDep>) {
        self.external_deps.extend(deps);
    }

    /// Merge external-dependency adjacency (package -> packages it pulls in).
    pub fn extend_external_dep_graph<I, S>(&mut self, adjacency: I)
    where
        I: IntoIterator<Item = (String, Vec<S>)>,
        S: Into<String>,
    {
        for (name, deps) in adjacency {
            let entry = self.external_dep_graph.entry(name).or_default();
            entry.extend(deps.into_iter().map(Into::into));
        }
    }

    /// Recompute every node's aggregated `imports_to` / `imports_from` from
    /// the current raw edges and tree shape.
    ///
    /// Safe to re-run after any batch of facts; the result is a pure function
    /// of the builder's current state. Fails only on a cyclic `children`
    /// relation.
    pub fn aggregate(&mut self) -> Result<()> {
        aggregate::aggregate(&mut self.nodes, &self.roots)
    }

    /// Aggregated outgoing references of a node, sorted. `None` for unknown
    /// identifiers. Mostly useful to inspect intermediate state in tests.
    pub fn aggregated_imports_to(&self, id: &str) -> Option<Vec<String>> {
        self.nodes
            .get(id)
            .map(|n| n.agg_to.iter().cloned().collect())
    }

    /// Run the remaining passes and emit the finished graph: aggregate,
    /// project cross-root edges (multi-root only), detect cycles, apply the
    /// visibility floor for non-exported namespaces.
    pub fn finish(mut self) -> Result<ProjectGraph> {
        self.aggregate()?;

        if self.roots.len() > 1 {
            roots::project_cross_root(&mut self.nodes, &self.roots);
        }

        let cycles = cycles::detect_cycles(&self.nodes);

        for state in self.nodes.values_mut() {
            if !state.is_exported {
                if let Some(symbols) = state.symbols.as_mut() {
                    merge::force_visibility(symbols, Visibility::Private);
                }
            }
        }

        let mut external_deps = self.external_deps;
        external_deps.sort_by(|a, b| a.name.cmp(&b.name));
        external_deps.dedup_by(|a, b| {
            if a.name == b.name {
                b.is_direct |= a.is_direct;
                true
            } else {
                false
            }
        });

        let hierarchy = self
            .nodes
            .into_iter()
            .map(|(id, state)| {
                let node = Node {
                    children: state.children.into_iter().collect(),
                    imports_to: state.agg_to.into_iter().collect(),
                    imports_from: state.agg_from.into_iter().collect(),
                    symbols: state.symbols,
                    class_deps: state.class_deps,
                    is_exported: state.is_exported,
                };
                (id, node)
            })
            .collect();

        Ok(ProjectGraph {
            project_name: self.project_name,
            roots: self.roots,
            hierarchy,
            external_deps,
            external_dep_graph: self
                .external_dep_graph
                .into_iter()
                .map(|(name, deps)| (name, deps.into_iter().collect()))
                .collect(),
            cycles,
        })
    }

    fn ensure_node(&mut self, id: &str) {
        if !self.nodes.contains_key(id) {
            self.nodes.insert(id.to_string(), NodeState::new());
        }
    }

    fn node_mut(&mut self, id: &str) -> &mut NodeState {
        self.nodes
            .get_mut(id)
            .expect("node must be ensured before mutation")
    }

    /// Walk `id`'s segments from the root's depth down, registering a
    /// parent->child relationship at each step and materializing every
    /// intermediate identifier. Never creates a self-parent edge.
    fn attach_chain(&mut self, root: &str, root_depth: usize, id: &str) {
        self.ensure_node(id);
        let parts: Vec<&str> = id.split(ident::SEPARATOR).collect();
        let mut parent = root.to_string();
        for d in root_depth..parts.len() {
            let child = parts[..=d].join(".");
            if child != parent {
                self.ensure_node(&child);
                self.node_mut(&parent).children.insert(child.clone());
            }
            parent = child;
        }
    }

    fn owning_root(&self, id: &str) -> Option<String> {
        self.roots
            .iter()
            .filter(|root| ident::contains(root, id))
            .max_by_key(|root| root.len())
            .cloned()
    }
}
