//! # Scopemap Extract
//!
//! Front-end collaborators that read a project directory and feed raw facts
//! (namespace identifiers, reference edges, symbols, external dependencies)
//! into the engine's `GraphBuilder`.
//!
//! Each front-end implements the fixed [`Extractor`] capability set: detect
//! applicability, produce facts. Front-ends are composed into an ordered
//! pipeline by [`detect_extractors`]; the engine never knows which front-end
//! contributed which fact. All file reads go through a run-scoped
//! [`SourceCache`] passed by reference into every extractor.

mod cache;
mod detect;
mod error;
pub mod python;
pub mod rust;

use std::path::Path;

use scopemap_engine::GraphBuilder;

pub use cache::SourceCache;
pub use detect::detect_extractors;
pub use error::{ExtractError, Result};

/// A project-structure front-end for one source ecosystem.
pub trait Extractor {
    /// Short name for logging.
    fn name(&self) -> &'static str;

    /// Whether this extractor applies to the given project directory.
    fn can_handle(&self, project_dir: &Path) -> bool;

    /// Read the project and merge facts into `builder`.
    ///
    /// Per-fact issues (unreadable file, unresolvable import) are handled
    /// locally; an `Err` means the extractor could not run at all.
    fn extract(
        &self,
        project_dir: &Path,
        cache: &mut SourceCache,
        builder: &mut GraphBuilder,
    ) -> Result<()>;
}
