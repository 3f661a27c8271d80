//! # Scopemap Model
//!
//! Language-agnostic data model for project structure graphs.
//!
//! A [`ProjectGraph`] is the finished artifact handed to consumers: the
//! namespace hierarchy (`hierarchy`), the root identifiers (`roots`), the
//! external package dependencies, and the detected dependency cycles.
//! Front-ends never build these types directly; they feed facts into the
//! engine, which emits a `ProjectGraph` once per run.

mod types;

pub use types::{ExternalDep, Node, ProjectGraph, Symbol, SymbolKind, Visibility};
