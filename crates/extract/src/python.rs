//! Python front-end: module hierarchy from the package file layout, reference
//! edges from import statements, symbols from line-oriented scanning, and
//! external dependencies from `pyproject.toml` / `uv.lock`.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use walkdir::WalkDir;

use scopemap_engine::GraphBuilder;
use scopemap_model::{ExternalDep, Symbol, SymbolKind, Visibility};

use crate::{Extractor, Result, SourceCache};

pub fn is_python_project(project_dir: &Path) -> bool {
    project_dir.join("pyproject.toml").exists() || project_dir.join("setup.py").exists()
}

/// Directories that never contain the importable package.
const SKIP_DIRS: &[&str] = &[
    ".git",
    ".tox",
    ".venv",
    ".mypy_cache",
    ".pytest_cache",
    "__pycache__",
    "node_modules",
    "build",
    "dist",
    "docs",
    "tests",
    "test",
    "scripts",
    "examples",
];

static IMPORT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:import|from)\s+([A-Za-z0-9_.]+)").expect("valid regex"));

static DEF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\s*)def\s+([A-Za-z0-9_]+)\s*\(").expect("valid regex"));

static CLASS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^class\s+([A-Za-z0-9_]+)\s*(?:\(([^)]*)\))?\s*:").expect("valid regex")
});

/// Locate the importable package directory: `src/<pkg>/__init__.py`
/// (src-layout) or `<pkg>/__init__.py` (flat layout).
fn find_package_dir(project_dir: &Path) -> Option<PathBuf> {
    for base in [project_dir.join("src"), project_dir.to_path_buf()] {
        let Ok(entries) = std::fs::read_dir(&base) else {
            continue;
        };
        let mut candidates: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.is_dir()
                    && p.file_name()
                        .and_then(|n| n.to_str())
                        .map(|n| !SKIP_DIRS.contains(&n))
                        .unwrap_or(false)
                    && p.join("__init__.py").exists()
            })
            .collect();
        candidates.sort();
        if let Some(pkg) = candidates.into_iter().next() {
            return Some(pkg);
        }
    }
    None
}

/// `pkg/sub/mod.py` -> `pkg.sub.mod`; `pkg/sub/__init__.py` -> `pkg.sub`.
fn module_path(py_file: &Path, package_parent: &Path) -> Option<String> {
    let rel = py_file.strip_prefix(package_parent).ok()?;
    let mut parts: Vec<String> = rel
        .with_extension("")
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.last().map(String::as_str) == Some("__init__") {
        parts.pop();
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("."))
}

fn python_files(package_dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(package_dir)
        .into_iter()
        .filter_entry(|entry| {
            entry
                .file_name()
                .to_str()
                .map(|n| n != "__pycache__")
                .unwrap_or(true)
        })
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("py"))
        .collect();
    files.sort();
    files
}

/// Visibility by naming convention: `__dunder__` is public API, a single or
/// double leading underscore is private.
fn visibility_of(name: &str) -> Visibility {
    if name.starts_with("__") && name.ends_with("__") {
        Visibility::Public
    } else if name.starts_with('_') {
        Visibility::Private
    } else {
        Visibility::Public
    }
}

/// Populate the hierarchy with the package/module tree and inter-module
/// import edges.
pub struct PythonModuleHierarchy;

impl Extractor for PythonModuleHierarchy {
    fn name(&self) -> &'static str {
        "python-hierarchy"
    }

    fn can_handle(&self, project_dir: &Path) -> bool {
        is_python_project(project_dir)
    }

    fn extract(
        &self,
        project_dir: &Path,
        cache: &mut SourceCache,
        builder: &mut GraphBuilder,
    ) -> Result<()> {
        let Some(package_dir) = find_package_dir(project_dir) else {
            log::warn!("No Python package found in {}", project_dir.display());
            return Ok(());
        };
        let package_parent = package_dir.parent().unwrap_or(project_dir).to_path_buf();
        let root = package_dir
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();

        let files = python_files(&package_dir);
        let ids: BTreeSet<String> = files
            .iter()
            .filter_map(|f| module_path(f, &package_parent))
            .collect();
        builder.add_unit(ids.iter(), Some(&root));

        // Underscore-prefixed modules are private by convention.
        for id in &ids {
            if let Some(last) = id.rsplit('.').next() {
                if last.starts_with('_') {
                    builder.set_exported(id, false);
                }
            }
        }

        let mut edge_count = 0usize;
        for file in &files {
            let Some(source) = module_path(file, &package_parent) else {
                continue;
            };
            let Some(content) = cache.read(file) else {
                continue;
            };
            for line in content.lines() {
                let Some(caps) = IMPORT_RE.captures(line) else {
                    continue;
                };
                let imported = &caps[1];
                if !scopemap_engine::contains(&root, imported) {
                    continue; // stdlib or third-party import
                }
                // Resolve to the longest known module prefix, so
                // `from pkg.sub.mod import thing` lands on pkg.sub.mod.
                let segments: Vec<&str> = imported.split('.').collect();
                let target = (1..=segments.len())
                    .rev()
                    .map(|len| segments[..len].join("."))
                    .find(|candidate| ids.contains(candidate));
                let Some(target) = target else { continue };
                if scopemap_engine::contains(&source, &target)
                    || scopemap_engine::contains(&target, &source)
                {
                    continue;
                }
                builder.add_edge(&source, &target);
                edge_count += 1;
            }
        }

        log::debug!("Python hierarchy: {} modules, {} edges", ids.len(), edge_count);
        Ok(())
    }
}

/// Populate leaf modules with function/class/method symbols.
pub struct PythonSymbols;

impl Extractor for PythonSymbols {
    fn name(&self) -> &'static str {
        "python-symbols"
    }

    fn can_handle(&self, project_dir: &Path) -> bool {
        is_python_project(project_dir)
    }

    fn extract(
        &self,
        project_dir: &Path,
        cache: &mut SourceCache,
        builder: &mut GraphBuilder,
    ) -> Result<()> {
        let Some(package_dir) = find_package_dir(project_dir) else {
            return Ok(());
        };
        let package_parent = package_dir.parent().unwrap_or(project_dir).to_path_buf();

        for file in python_files(&package_dir) {
            if file.file_name().and_then(|n| n.to_str()) == Some("__init__.py") {
                continue;
            }
            let Some(module) = module_path(&file, &package_parent) else {
                continue;
            };
            let Some(content) = cache.read(&file) else {
                continue;
            };
            let symbols = scan_symbols(content);
            if !symbols.is_empty() {
                builder.merge_symbols(&module, symbols);
            }
        }
        Ok(())
    }
}

/// Line-oriented symbol scan: top-level `def` and `class`, plus indented
/// `def` inside the most recent class as methods. Class bases land in
/// `inherits`.
fn scan_symbols(content: &str) -> BTreeMap<String, Symbol> {
    let mut symbols: BTreeMap<String, Symbol> = BTreeMap::new();
    let mut current_class: Option<String> = None;

    for (lineno, line) in content.lines().enumerate() {
        let line_number = (lineno + 1) as u32;

        if let Some(caps) = CLASS_RE.captures(line) {
            let name = caps[1].to_string();
            let mut class = Symbol::new(&name, SymbolKind::Type);
            class.line = Some(line_number);
            class.visibility = Some(visibility_of(&name));
            if let Some(bases) = caps.get(2) {
                class.inherits = bases
                    .as_str()
                    .split(',')
                    .map(str::trim)
                    .filter(|b| !b.is_empty() && *b != "object")
                    .map(str::to_string)
                    .collect();
            }
            symbols.insert(name.clone(), class);
            current_class = Some(name);
            continue;
        }

        let Some(caps) = DEF_RE.captures(line) else {
            continue;
        };
        let indent = &caps[1];
        let name = caps[2].to_string();
        let mut symbol = Symbol::new(
            &name,
            if indent.is_empty() {
                SymbolKind::Function
            } else {
                SymbolKind::Method
            },
        );
        symbol.line = Some(line_number);
        symbol.visibility = Some(visibility_of(&name));

        if indent.is_empty() {
            current_class = None;
            symbols.insert(name, symbol);
        } else if let Some(class_name) = &current_class {
            if let Some(class) = symbols.get_mut(class_name) {
                class.children.insert(name, symbol);
            }
        }
    }

    symbols
}

/// Populate external dependencies from `pyproject.toml` (direct) and
/// `uv.lock` (transitive closure + adjacency).
pub struct PythonPackageDeps;

impl Extractor for PythonPackageDeps {
    fn name(&self) -> &'static str {
        "python-package-deps"
    }

    fn can_handle(&self, project_dir: &Path) -> bool {
        project_dir.join("pyproject.toml").exists()
    }

    fn extract(
        &self,
        project_dir: &Path,
        cache: &mut SourceCache,
        builder: &mut GraphBuilder,
    ) -> Result<()> {
        let mut direct: BTreeSet<String> = BTreeSet::new();
        if let Some(content) = cache.read(&project_dir.join("pyproject.toml")) {
            if let Ok(pyproject) = content.parse::<toml::Value>() {
                for dep in pyproject
                    .get("project")
                    .and_then(|p| p.get("dependencies"))
                    .and_then(|d| d.as_array())
                    .into_iter()
                    .flatten()
                    .filter_map(|d| d.as_str())
                {
                    if let Some(name) = requirement_name(dep) {
                        direct.insert(name);
                    }
                }
            }
        }

        let mut all = direct.clone();
        let mut adjacency: BTreeMap<String, Vec<String>> = BTreeMap::new();
        if let Some(content) = cache.read(&project_dir.join("uv.lock")) {
            if let Ok(lock) = content.parse::<toml::Value>() {
                for pkg in lock
                    .get("package")
                    .and_then(|p| p.as_array())
                    .into_iter()
                    .flatten()
                {
                    let Some(name) = pkg.get("name").and_then(|n| n.as_str()) else {
                        continue;
                    };
                    let deps: Vec<String> = pkg
                        .get("dependencies")
                        .and_then(|d| d.as_array())
                        .into_iter()
                        .flatten()
                        .filter_map(|d| d.get("name").and_then(|n| n.as_str()))
                        .map(|n| n.to_lowercase())
                        .collect();
                    if !deps.is_empty() {
                        adjacency.insert(name.to_lowercase(), deps);
                    }
                }
            }
        }

        // Transitive closure from the direct set over the lock adjacency.
        let mut queue: Vec<String> = direct.iter().cloned().collect();
        while let Some(name) = queue.pop() {
            for dep in adjacency.get(&name).cloned().unwrap_or_default() {
                if all.insert(dep.clone()) {
                    queue.push(dep);
                }
            }
        }

        builder.add_external_deps(all.iter().map(|name| ExternalDep {
            name: name.clone(),
            is_direct: direct.contains(name),
        }));
        builder.extend_external_dep_graph(adjacency);
        Ok(())
    }
}

/// `requests[socks]>=2.0; python_version > "3.8"` -> `requests`.
fn requirement_name(requirement: &str) -> Option<String> {
    let name: String = requirement
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '-' || *c == '_' || *c == '.')
        .collect();
    if name.is_empty() {
        None
    } else {
        Some(name.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn file_layout_maps_to_module_paths() {
        let parent = Path::new("/p/src");
        let case = |file: &str| module_path(Path::new(file), parent);
        assert_eq!(case("/p/src/pkg/__init__.py"), Some("pkg".to_string()));
        assert_eq!(case("/p/src/pkg/core.py"), Some("pkg.core".to_string()));
        assert_eq!(
            case("/p/src/pkg/sub/util.py"),
            Some("pkg.sub.util".to_string())
        );
    }

    #[test]
    fn requirement_names_are_normalized() {
        assert_eq!(requirement_name("requests>=2.0"), Some("requests".to_string()));
        assert_eq!(
            requirement_name("Pillow[extra] ; python_version > \"3.8\""),
            Some("pillow".to_string())
        );
        assert_eq!(requirement_name(""), None);
    }

    #[test]
    fn symbol_scan_nests_methods_under_classes() {
        let code = r#"
def top_level():
    pass

class Client(Base, mixins.Retry):
    def connect(self):
        pass

    def _private(self):
        pass
"#;
        let symbols = scan_symbols(code);
        assert_eq!(symbols["top_level"].kind, SymbolKind::Function);
        let client = &symbols["Client"];
        assert_eq!(
            client.inherits,
            vec!["Base".to_string(), "mixins.Retry".to_string()]
        );
        assert_eq!(client.children["connect"].kind, SymbolKind::Method);
        assert_eq!(
            client.children["_private"].visibility,
            Some(Visibility::Private)
        );
    }

    #[test]
    fn dunder_methods_stay_public() {
        assert_eq!(visibility_of("__init__"), Visibility::Public);
        assert_eq!(visibility_of("_helper"), Visibility::Private);
        assert_eq!(visibility_of("run"), Visibility::Public);
    }
}
