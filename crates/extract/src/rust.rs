//! Rust front-end: module hierarchy from the `src/` file layout, reference
//! edges from `use` statements, symbols from line-oriented scanning, and
//! external dependencies from `Cargo.toml` / `Cargo.lock`.
//!
//! Each workspace crate becomes its own root; cross-crate `use` statements
//! become cross-root reference edges.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use walkdir::WalkDir;

use scopemap_engine::GraphBuilder;
use scopemap_model::{ExternalDep, Symbol, SymbolKind, Visibility};

use crate::{Extractor, Result, SourceCache};

pub fn is_rust_project(project_dir: &Path) -> bool {
    project_dir.join("Cargo.toml").exists()
}

/// One workspace member with a source tree.
#[derive(Debug, Clone)]
struct CrateInfo {
    /// Package name with hyphens normalized to underscores.
    name: String,
    src_dir: PathBuf,
}

static USE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:pub(?:\([^)]*\))?\s+)?use\s+([A-Za-z0-9_]+)::([A-Za-z0-9_:{}, ]+)")
        .expect("valid regex")
});

static MOD_DECL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(pub(?:\([^)]*\))?\s+)?mod\s+([A-Za-z0-9_]+)\s*;").expect("valid regex")
});

static FN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(\s*)(pub(?:\([^)]*\))?\s+)?(?:async\s+)?(?:const\s+)?(?:unsafe\s+)?fn\s+([A-Za-z0-9_]+)",
    )
    .expect("valid regex")
});

static TYPE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(pub(?:\([^)]*\))?\s+)?(?:struct|enum|trait|union)\s+([A-Za-z0-9_]+)")
        .expect("valid regex")
});

static IMPL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^impl(?:<[^>]*>)?\s+(?:([A-Za-z0-9_:]+)(?:<[^>]*>)?\s+for\s+)?([A-Za-z0-9_]+)")
        .expect("valid regex")
});

/// Discover workspace members (or the single package) with their `src/`
/// directories.
fn discover_crates(project_dir: &Path, cache: &mut SourceCache) -> Vec<CrateInfo> {
    let manifest_path = project_dir.join("Cargo.toml");
    let Some(content) = cache.read(&manifest_path) else {
        return Vec::new();
    };
    let manifest: toml::Value = match content.parse() {
        Ok(value) => value,
        Err(e) => {
            log::warn!("Could not parse {}: {e}", manifest_path.display());
            return Vec::new();
        }
    };

    let mut member_dirs: Vec<PathBuf> = Vec::new();
    if let Some(members) = manifest
        .get("workspace")
        .and_then(|w| w.get("members"))
        .and_then(|m| m.as_array())
    {
        for member in members.iter().filter_map(|m| m.as_str()) {
            member_dirs.extend(expand_member(project_dir, member));
        }
    }
    if manifest.get("package").is_some() {
        member_dirs.push(project_dir.to_path_buf());
    }

    let mut crates = Vec::new();
    for dir in member_dirs {
        let Some(name) = package_name(&dir, cache) else {
            continue;
        };
        let src_dir = dir.join("src");
        if !src_dir.is_dir() {
            continue;
        }
        crates.push(CrateInfo {
            name: name.replace('-', "_"),
            src_dir,
        });
    }
    crates.sort_by(|a, b| a.name.cmp(&b.name));
    crates.dedup_by(|a, b| a.name == b.name);
    crates
}

/// Expand a workspace member entry, supporting a trailing `*` component
/// (`crates/*`).
fn expand_member(project_dir: &Path, member: &str) -> Vec<PathBuf> {
    match member.strip_suffix("/*") {
        Some(parent) => {
            let parent = project_dir.join(parent);
            let Ok(entries) = std::fs::read_dir(&parent) else {
                return Vec::new();
            };
            let mut dirs: Vec<PathBuf> = entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.join("Cargo.toml").exists())
                .collect();
            dirs.sort();
            dirs
        }
        None => vec![project_dir.join(member)],
    }
}

fn package_name(member_dir: &Path, cache: &mut SourceCache) -> Option<String> {
    let content = cache.read(&member_dir.join("Cargo.toml"))?;
    let manifest: toml::Value = content.parse().ok()?;
    manifest
        .get("package")?
        .get("name")?
        .as_str()
        .map(str::to_string)
}

/// `src/spatial/kd_tree.rs` -> `crate_name.spatial.kd_tree`,
/// `src/spatial/mod.rs` -> `crate_name.spatial`,
/// `src/lib.rs` / `src/main.rs` -> `crate_name`.
fn module_path(rs_file: &Path, src_dir: &Path, crate_name: &str) -> Option<String> {
    let rel = rs_file.strip_prefix(src_dir).ok()?;
    let mut parts: Vec<String> = rel
        .with_extension("")
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();

    match parts.last().map(String::as_str) {
        Some("lib") | Some("main") if parts.len() == 1 => return Some(crate_name.to_string()),
        Some("mod") => {
            parts.pop();
        }
        _ => {}
    }

    if parts.is_empty() {
        return Some(crate_name.to_string());
    }
    Some(format!("{crate_name}.{}", parts.join(".")))
}

fn source_files(src_dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(src_dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("rs"))
        .collect();
    files.sort();
    files
}

/// Resolve a `::`-separated use path against a crate's known modules by
/// trying progressively shorter prefixes, so `spatial::kd_tree::KDTree`
/// lands on `crate.spatial.kd_tree`.
fn resolve_use_target(crate_name: &str, use_path: &str, known: &BTreeSet<String>) -> Option<String> {
    let parts: Vec<&str> = use_path
        .split("::")
        .take_while(|p| !p.starts_with('{'))
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    for len in (1..=parts.len()).rev() {
        let candidate = format!("{crate_name}.{}", parts[..len].join("."));
        if known.contains(&candidate) {
            return Some(candidate);
        }
    }
    if known.contains(crate_name) {
        return Some(crate_name.to_string());
    }
    None
}

/// Populate the hierarchy with per-crate module trees, module visibility,
/// and `use`-statement reference edges.
pub struct RustModuleHierarchy;

impl Extractor for RustModuleHierarchy {
    fn name(&self) -> &'static str {
        "rust-hierarchy"
    }

    fn can_handle(&self, project_dir: &Path) -> bool {
        is_rust_project(project_dir)
    }

    fn extract(
        &self,
        project_dir: &Path,
        cache: &mut SourceCache,
        builder: &mut GraphBuilder,
    ) -> Result<()> {
        let crates = discover_crates(project_dir, cache);
        if crates.is_empty() {
            log::warn!("No crates with src/ found in {}", project_dir.display());
            return Ok(());
        }
        let crate_names: BTreeSet<String> = crates.iter().map(|c| c.name.clone()).collect();

        // Pass 1: register each crate's module tree as one unit.
        let mut modules_per_crate: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut files_per_crate: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
        for info in &crates {
            let files = source_files(&info.src_dir);
            let ids: BTreeSet<String> = files
                .iter()
                .filter_map(|f| module_path(f, &info.src_dir, &info.name))
                .collect();
            builder.add_unit(ids.iter(), Some(&info.name));
            modules_per_crate.insert(info.name.clone(), ids);
            files_per_crate.insert(info.name.clone(), files);
        }

        // Pass 2: `use` edges (intra-crate and cross-crate) and module
        // visibility from `mod` declarations.
        let mut edge_count = 0usize;
        for info in &crates {
            let known = &modules_per_crate[&info.name];
            for file in &files_per_crate[&info.name] {
                let Some(source) = module_path(file, &info.src_dir, &info.name) else {
                    continue;
                };
                let Some(content) = cache.read(file) else {
                    continue;
                };

                for line in content.lines() {
                    if let Some(caps) = MOD_DECL_RE.captures(line) {
                        let child = format!("{source}.{}", &caps[2]);
                        if builder.has_node(&child) {
                            builder.set_exported(&child, caps.get(1).is_some());
                        }
                        continue;
                    }

                    let Some(caps) = USE_RE.captures(line) else {
                        continue;
                    };
                    let (head, rest) = (&caps[1], &caps[2]);
                    let target = if head == "crate" {
                        resolve_use_target(&info.name, rest, known)
                    } else if crate_names.contains(head) && head != info.name {
                        let far = modules_per_crate[head].clone();
                        resolve_use_target(head, rest, &far)
                            .or_else(|| Some(head.to_string()))
                    } else {
                        None
                    };

                    let Some(target) = target else { continue };
                    // Edges to self or to an ancestor/descendant would only
                    // be filtered out again during aggregation.
                    if scopemap_engine::contains(&source, &target)
                        || scopemap_engine::contains(&target, &source)
                    {
                        continue;
                    }
                    builder.add_edge(&source, &target);
                    edge_count += 1;
                }
            }
        }

        log::debug!(
            "Rust hierarchy: {} crates, {} use edges",
            crates.len(),
            edge_count
        );
        Ok(())
    }
}

/// Populate leaf modules with function/type/method symbols.
pub struct RustSymbols;

impl Extractor for RustSymbols {
    fn name(&self) -> &'static str {
        "rust-symbols"
    }

    fn can_handle(&self, project_dir: &Path) -> bool {
        is_rust_project(project_dir)
    }

    fn extract(
        &self,
        project_dir: &Path,
        cache: &mut SourceCache,
        builder: &mut GraphBuilder,
    ) -> Result<()> {
        for info in discover_crates(project_dir, cache) {
            for file in source_files(&info.src_dir) {
                let Some(module) = module_path(&file, &info.src_dir, &info.name) else {
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
        }
        Ok(())
    }
}

fn visibility_of(modifier: Option<&str>) -> Visibility {
    match modifier {
        Some(m) if m.trim_end() == "pub" => Visibility::Public,
        Some(_) => Visibility::Restricted,
        None => Visibility::Private,
    }
}

/// Line-oriented symbol scan: top-level `fn` / `struct` / `enum` / `trait`,
/// plus methods inside `impl` blocks attached to their type (trait impls
/// record the trait in `inherits`).
fn scan_symbols(content: &str) -> BTreeMap<String, Symbol> {
    let mut symbols: BTreeMap<String, Symbol> = BTreeMap::new();
    let mut current_impl: Option<String> = None;

    for (lineno, line) in content.lines().enumerate() {
        let line_number = (lineno + 1) as u32;

        if let Some(caps) = IMPL_RE.captures(line) {
            let type_name = caps[2].to_string();
            let entry = symbols
                .entry(type_name.clone())
                .or_insert_with(|| Symbol::new(&type_name, SymbolKind::Type));
            if let Some(trait_name) = caps.get(1) {
                let trait_name = trait_name.as_str().to_string();
                if !entry.inherits.contains(&trait_name) {
                    entry.inherits.push(trait_name);
                }
            }
            current_impl = Some(type_name);
            continue;
        }
        if line.starts_with('}') {
            current_impl = None;
            continue;
        }

        if let Some(caps) = TYPE_RE.captures(line) {
            let name = caps[2].to_string();
            let entry = symbols
                .entry(name.clone())
                .or_insert_with(|| Symbol::new(&name, SymbolKind::Type));
            entry.line = Some(line_number);
            entry.visibility = Some(visibility_of(caps.get(1).map(|m| m.as_str())));
            continue;
        }

        if let Some(caps) = FN_RE.captures(line) {
            let indent = &caps[1];
            let name = caps[3].to_string();
            let visibility = Some(visibility_of(caps.get(2).map(|m| m.as_str())));

            if indent.is_empty() {
                let entry = symbols
                    .entry(name.clone())
                    .or_insert_with(|| Symbol::new(&name, SymbolKind::Function));
                entry.line = Some(line_number);
                entry.visibility = visibility;
            } else if let Some(impl_target) = &current_impl {
                if let Some(owner) = symbols.get_mut(impl_target) {
                    let method = owner
                        .children
                        .entry(name.clone())
                        .or_insert_with(|| Symbol::new(&name, SymbolKind::Method));
                    method.line = Some(line_number);
                    method.visibility = visibility;
                }
            }
        }
    }

    symbols
}

/// Populate external dependencies from `Cargo.toml` (direct) and
/// `Cargo.lock` (transitive closure + adjacency).
pub struct RustCargoDeps;

impl Extractor for RustCargoDeps {
    fn name(&self) -> &'static str {
        "rust-cargo-deps"
    }

    fn can_handle(&self, project_dir: &Path) -> bool {
        is_rust_project(project_dir)
    }

    fn extract(
        &self,
        project_dir: &Path,
        cache: &mut SourceCache,
        builder: &mut GraphBuilder,
    ) -> Result<()> {
        let crates = discover_crates(project_dir, cache);
        let member_names: BTreeSet<String> = crates
            .iter()
            .map(|c| c.name.replace('_', "-"))
            .flat_map(|n| [n.clone(), n.replace('-', "_")])
            .collect();

        let mut manifest_dirs: Vec<PathBuf> = vec![project_dir.to_path_buf()];
        for info in &crates {
            if let Some(parent) = info.src_dir.parent() {
                manifest_dirs.push(parent.to_path_buf());
            }
        }

        let mut direct: BTreeSet<String> = BTreeSet::new();
        for dir in manifest_dirs {
            let Some(content) = cache.read(&dir.join("Cargo.toml")) else {
                continue;
            };
            let Ok(manifest) = content.parse::<toml::Value>() else {
                continue;
            };
            if let Some(deps) = manifest.get("dependencies").and_then(|d| d.as_table()) {
                for (name, spec) in deps {
                    // Path-only entries are workspace-internal, not external.
                    let path_only = spec
                        .as_table()
                        .map(|t| t.contains_key("path"))
                        .unwrap_or(false);
                    if !path_only && !member_names.contains(name) {
                        direct.insert(name.clone());
                    }
                }
            }
        }

        let mut all: BTreeSet<String> = direct.clone();
        let mut adjacency: BTreeMap<String, Vec<String>> = BTreeMap::new();
        if let Some(content) = cache.read(&project_dir.join("Cargo.lock")) {
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
                    if member_names.contains(name) {
                        continue;
                    }
                    all.insert(name.to_string());
                    let deps: Vec<String> = pkg
                        .get("dependencies")
                        .and_then(|d| d.as_array())
                        .into_iter()
                        .flatten()
                        .filter_map(|d| d.as_str())
                        // Lock entries may be "name" or "name version".
                        .map(|d| d.split_whitespace().next().unwrap_or(d).to_string())
                        .filter(|d| !member_names.contains(d))
                        .collect();
                    if !deps.is_empty() {
                        adjacency.insert(name.to_string(), deps);
                    }
                }
            }
        }

        builder.add_external_deps(all.iter().map(|name| ExternalDep {
            name: name.clone(),
            is_direct: direct.contains(name),
        }));
        builder.extend_external_dep_graph(adjacency);
        log::debug!("Rust deps: {} direct, {} total", direct.len(), all.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn file_layout_maps_to_module_paths() {
        let src = Path::new("/p/src");
        let case = |file: &str| module_path(Path::new(file), src, "mycrate");
        assert_eq!(case("/p/src/lib.rs"), Some("mycrate".to_string()));
        assert_eq!(case("/p/src/main.rs"), Some("mycrate".to_string()));
        assert_eq!(
            case("/p/src/spatial/mod.rs"),
            Some("mycrate.spatial".to_string())
        );
        assert_eq!(
            case("/p/src/spatial/kd_tree.rs"),
            Some("mycrate.spatial.kd_tree".to_string())
        );
    }

    #[test]
    fn use_targets_resolve_by_longest_known_prefix() {
        let known: BTreeSet<String> = ["c", "c.spatial", "c.spatial.kd_tree"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            resolve_use_target("c", "spatial::kd_tree::KDTree", &known),
            Some("c.spatial.kd_tree".to_string())
        );
        assert_eq!(
            resolve_use_target("c", "spatial::{a, b}", &known),
            Some("c.spatial".to_string())
        );
        assert_eq!(
            resolve_use_target("c", "unknown::Thing", &known),
            Some("c".to_string())
        );
    }

    #[test]
    fn symbol_scan_finds_types_methods_and_traits() {
        let code = r"
pub struct Store;

impl Store {
    pub fn open(&self) {}
    fn flush(&self) {}
}

impl Drop for Store {
    fn drop(&mut self) {}
}

pub(crate) fn helper() {}
";
        let symbols = scan_symbols(code);
        let store = &symbols["Store"];
        assert_eq!(store.kind, SymbolKind::Type);
        assert_eq!(store.visibility, Some(Visibility::Public));
        assert_eq!(store.inherits, vec!["Drop".to_string()]);
        assert_eq!(
            store.children["open"].visibility,
            Some(Visibility::Public)
        );
        assert_eq!(
            store.children["flush"].visibility,
            Some(Visibility::Private)
        );
        assert!(store.children.contains_key("drop"));
        assert_eq!(
            symbols["helper"].visibility,
            Some(Visibility::Restricted)
        );
    }
}
