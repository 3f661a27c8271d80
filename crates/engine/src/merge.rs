//! Field-level symbol merging across independent extraction passes.
//!
//! One pass may establish a method's existence and line number while a later
//! pass refines only its call list; merging must never erase what an earlier
//! pass contributed unless the later pass actually supplies a replacement.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use scopemap_model::{Symbol, Visibility};

/// Merge `incoming` into `existing`, by symbol name.
///
/// New names are added wholesale. For an existing name, the incoming pass's
/// non-empty values replace the old (`kind` is last-writer-wins), while
/// nested children are merged recursively by the same rule rather than
/// replaced wholesale.
pub(crate) fn merge_symbol_maps(
    existing: &mut BTreeMap<String, Symbol>,
    incoming: BTreeMap<String, Symbol>,
) {
    for (name, symbol) in incoming {
        match existing.entry(name) {
            Entry::Vacant(slot) => {
                slot.insert(symbol);
            }
            Entry::Occupied(mut slot) => merge_symbol(slot.get_mut(), symbol),
        }
    }
}

fn merge_symbol(existing: &mut Symbol, incoming: Symbol) {
    existing.kind = incoming.kind;
    if incoming.line.is_some() {
        existing.line = incoming.line;
    }
    if !incoming.calls.is_empty() {
        existing.calls = incoming.calls;
    }
    if !incoming.inherits.is_empty() {
        existing.inherits = incoming.inherits;
    }
    if incoming.visibility.is_some() {
        existing.visibility = incoming.visibility;
    }
    merge_symbol_maps(&mut existing.children, incoming.children);
}

/// Force every symbol and nested symbol to `visibility`.
///
/// Applied when the owning namespace is non-exported: a symbol cannot be
/// more visible than its containing namespace.
pub(crate) fn force_visibility(symbols: &mut BTreeMap<String, Symbol>, visibility: Visibility) {
    for symbol in symbols.values_mut() {
        symbol.visibility = Some(visibility);
        force_visibility(&mut symbol.children, visibility);
    }
}
