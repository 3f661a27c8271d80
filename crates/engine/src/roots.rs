//! Cross-root edge projection for multi-unit workspaces.

use std::collections::{BTreeMap, BTreeSet};

use crate::builder::NodeState;
use crate::ident;

/// Derive root-to-root edges from aggregated node-level edges.
///
/// Every contained identifier is mapped to its owning root (longest matching
/// root prefix); each root's `agg_to` / `agg_from` then becomes the set of
/// *other* roots its subtree references / is referenced by. Callers skip this
/// for single-root graphs, where the root's own aggregated set already is the
/// boundary view.
pub(crate) fn project_cross_root(nodes: &mut BTreeMap<String, NodeState>, roots: &[String]) {
    let owner_of: BTreeMap<String, String> = nodes
        .keys()
        .filter_map(|id| owning_root(roots, id).map(|root| (id.clone(), root)))
        .collect();

    let mut root_to: BTreeMap<&str, BTreeSet<String>> = BTreeMap::new();
    let mut root_from: BTreeMap<&str, BTreeSet<String>> = BTreeMap::new();

    for (id, state) in nodes.iter() {
        let Some(owner) = owner_of.get(id) else {
            continue;
        };
        for target in &state.agg_to {
            if let Some(far_owner) = owner_of.get(target) {
                if far_owner != owner {
                    root_to
                        .entry(owner.as_str())
                        .or_default()
                        .insert(far_owner.clone());
                }
            }
        }
        for source in &state.agg_from {
            if let Some(far_owner) = owner_of.get(source) {
                if far_owner != owner {
                    root_from
                        .entry(owner.as_str())
                        .or_default()
                        .insert(far_owner.clone());
                }
            }
        }
    }

    for root in roots {
        let to = root_to.remove(root.as_str()).unwrap_or_default();
        let from = root_from.remove(root.as_str()).unwrap_or_default();
        if let Some(state) = nodes.get_mut(root) {
            state.agg_to = to;
            state.agg_from = from;
        }
    }
}

fn owning_root(roots: &[String], id: &str) -> Option<String> {
    roots
        .iter()
        .filter(|root| ident::contains(root, id))
        .max_by_key(|root| root.len())
        .cloned()
}
