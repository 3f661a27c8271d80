//! # Scopemap Engine
//!
//! Hierarchical dependency-aggregation engine: turns flat, possibly
//! incomplete sets of (qualified-name, reference-edge) facts contributed by
//! language front-ends into a consistent, navigable tree with correctly
//! aggregated cross-boundary edges at every level, plus cycle detection.
//!
//! ## Pipeline
//!
//! ```text
//! Front-end facts (identifiers, edges, symbols, external deps)
//!     │
//!     ├──> Tree Builder        (materialize ancestors, per-unit roots)
//!     ├──> Symbol Merger       (field-level merge across passes)
//!     │
//!     └──> finish()
//!            ├─ Edge Aggregator      (bottom-up, boundary edges only)
//!            ├─ Cross-Root Projector (multi-unit workspaces)
//!            ├─ Cycle Detector       (SCCs of size >= 2)
//!            └─> ProjectGraph
//! ```
//!
//! The engine is single-threaded and synchronous; a [`GraphBuilder`] is
//! exclusively owned by one pipeline run. Facts are merged in the order
//! front-ends are invoked, and aggregation may be re-run after every batch.
//!
//! ## Example
//!
//! ```
//! use scopemap_engine::GraphBuilder;
//!
//! let mut builder = GraphBuilder::new("demo");
//! builder.add_unit(["demo", "demo.core", "demo.util"], None);
//! builder.add_edge("demo.core", "demo.util");
//!
//! let graph = builder.finish()?;
//! assert_eq!(graph.roots, vec!["demo".to_string()]);
//! assert_eq!(graph.hierarchy["demo.core"].imports_to, vec!["demo.util".to_string()]);
//! # Ok::<(), scopemap_engine::EngineError>(())
//! ```

mod aggregate;
mod builder;
mod cycles;
mod error;
mod ident;
mod merge;
mod roots;

pub use builder::GraphBuilder;
pub use error::{EngineError, Result};
pub use ident::{contains, is_well_formed, SEPARATOR};
