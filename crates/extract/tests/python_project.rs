use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;
use scopemap_engine::GraphBuilder;
use scopemap_extract::{detect_extractors, SourceCache};
use scopemap_model::{ProjectGraph, SymbolKind, Visibility};

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn run_pipeline(project_dir: &Path) -> ProjectGraph {
    let mut builder = GraphBuilder::new("fixture");
    let mut cache = SourceCache::new();
    for extractor in detect_extractors(project_dir) {
        if extractor.can_handle(project_dir) {
            extractor
                .extract(project_dir, &mut cache, &mut builder)
                .unwrap();
        }
    }
    builder.finish().unwrap()
}

#[test]
fn src_layout_package_with_imports_and_symbols() {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path();

    write(
        &root.join("pyproject.toml"),
        "[project]\nname = \"mypkg\"\ndependencies = [\"requests>=2.0\"]\n",
    );
    write(&root.join("src/mypkg/__init__.py"), "");
    write(&root.join("src/mypkg/sub/__init__.py"), "");
    write(
        &root.join("src/mypkg/core.py"),
        r#"
from mypkg.sub.util import helper
import os

class Engine(Base):
    def start(self):
        pass

def run():
    pass
"#,
    );
    write(
        &root.join("src/mypkg/sub/util.py"),
        "def helper():\n    pass\n",
    );
    write(&root.join("src/mypkg/_internal.py"), "def _hidden():\n    pass\n");

    let graph = run_pipeline(root);

    assert_eq!(graph.roots, vec!["mypkg".to_string()]);
    assert_eq!(
        graph.hierarchy["mypkg"].children,
        vec![
            "mypkg._internal".to_string(),
            "mypkg.core".to_string(),
            "mypkg.sub".to_string()
        ]
    );
    assert_eq!(
        graph.hierarchy["mypkg.sub"].children,
        vec!["mypkg.sub.util".to_string()]
    );

    // Import edge resolves to the module, not the imported name; the os
    // import is outside the root package and ignored.
    assert_eq!(
        graph.hierarchy["mypkg.core"].imports_to,
        vec!["mypkg.sub.util".to_string()]
    );
    assert_eq!(
        graph.hierarchy["mypkg.sub"].imports_from,
        vec!["mypkg.core".to_string()]
    );

    // Underscore module is non-exported; its symbols are forced private.
    assert!(!graph.hierarchy["mypkg._internal"].is_exported);
    let internal = graph.hierarchy["mypkg._internal"].symbols.as_ref().unwrap();
    assert_eq!(internal["_hidden"].visibility, Some(Visibility::Private));

    let core = graph.hierarchy["mypkg.core"].symbols.as_ref().unwrap();
    assert_eq!(core["Engine"].kind, SymbolKind::Type);
    assert_eq!(core["Engine"].inherits, vec!["Base".to_string()]);
    assert_eq!(core["Engine"].children["start"].kind, SymbolKind::Method);
    assert_eq!(core["run"].kind, SymbolKind::Function);

    assert_eq!(graph.external_deps.len(), 1);
    assert_eq!(graph.external_deps[0].name, "requests");
    assert!(graph.external_deps[0].is_direct);
}

#[test]
fn uv_lock_supplies_transitive_closure() {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path();

    write(
        &root.join("pyproject.toml"),
        "[project]\nname = \"app\"\ndependencies = [\"requests\"]\n",
    );
    write(&root.join("app/__init__.py"), "");
    write(
        &root.join("uv.lock"),
        r#"
[[package]]
name = "requests"
version = "2.32.0"

[[package.dependencies]]
name = "urllib3"

[[package]]
name = "urllib3"
version = "2.2.0"

[[package]]
name = "unrelated"
version = "1.0.0"
"#,
    );

    let graph = run_pipeline(root);

    let names: Vec<&str> = graph.external_deps.iter().map(|d| d.name.as_str()).collect();
    // `unrelated` is in the lock but not reachable from the direct set.
    assert_eq!(names, vec!["requests", "urllib3"]);
    assert!(graph.external_deps[0].is_direct);
    assert!(!graph.external_deps[1].is_direct);
    assert_eq!(
        graph.external_dep_graph["requests"],
        vec!["urllib3".to_string()]
    );
}
