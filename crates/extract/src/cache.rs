use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Run-scoped cache of file contents shared by the extractor pipeline.
///
/// Several extractors read the same sources (hierarchy, edges, symbols);
/// caching keeps each file on disk read once per run. The cache lives
/// exactly as long as one pipeline run and is passed by reference into every
/// extractor, never held process-wide.
#[derive(Default)]
pub struct SourceCache {
    files: HashMap<PathBuf, Option<String>>,
}

impl SourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a file, memoized. `None` when the file is missing or unreadable;
    /// the failure is remembered so it is logged only once.
    pub fn read(&mut self, path: &Path) -> Option<&str> {
        if !self.files.contains_key(path) {
            let content = match fs::read_to_string(path) {
                Ok(content) => Some(content),
                Err(e) => {
                    log::debug!("Could not read {}: {e}", path.display());
                    None
                }
            };
            self.files.insert(path.to_path_buf(), content);
        }
        self.files.get(path).and_then(|c| c.as_deref())
    }

    /// Number of distinct paths looked up so far.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
