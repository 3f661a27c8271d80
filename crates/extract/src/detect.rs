//! Project-type detection: marker files to an ordered extractor pipeline.

use std::path::Path;

use crate::python::{
    is_python_project, PythonModuleHierarchy, PythonPackageDeps, PythonSymbols,
};
use crate::rust::{is_rust_project, RustCargoDeps, RustModuleHierarchy, RustSymbols};
use crate::Extractor;

/// Return the ordered list of extractors applicable to `project_dir`.
///
/// Order matters: dependency and hierarchy passes run before symbol passes
/// so symbol facts land on already-declared namespaces. A project can match
/// several ecosystems (e.g. a Rust crate with Python bindings); each
/// ecosystem's extractors are appended independently.
pub fn detect_extractors(project_dir: &Path) -> Vec<Box<dyn Extractor>> {
    let mut extractors: Vec<Box<dyn Extractor>> = Vec::new();

    if is_python_project(project_dir) {
        extractors.push(Box::new(PythonPackageDeps));
        extractors.push(Box::new(PythonModuleHierarchy));
        extractors.push(Box::new(PythonSymbols));
    }

    if is_rust_project(project_dir) {
        extractors.push(Box::new(RustCargoDeps));
        extractors.push(Box::new(RustModuleHierarchy));
        extractors.push(Box::new(RustSymbols));
    }

    extractors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_directory_detects_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(detect_extractors(dir.path()).is_empty());
    }

    #[test]
    fn cargo_toml_selects_rust_extractors() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "[package]\nname = \"x\"\n").unwrap();
        let names: Vec<_> = detect_extractors(dir.path())
            .iter()
            .map(|e| e.name())
            .collect();
        assert_eq!(names, vec!["rust-cargo-deps", "rust-hierarchy", "rust-symbols"]);
    }

    #[test]
    fn pyproject_selects_python_extractors() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("pyproject.toml"), "[project]\nname = \"x\"\n").unwrap();
        let names: Vec<_> = detect_extractors(dir.path())
            .iter()
            .map(|e| e.name())
            .collect();
        assert_eq!(
            names,
            vec!["python-package-deps", "python-hierarchy", "python-symbols"]
        );
    }
}
