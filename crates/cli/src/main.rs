use anyhow::{bail, Context, Result};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};

use scopemap_engine::GraphBuilder;
use scopemap_extract::{detect_extractors, SourceCache};

#[derive(Parser)]
#[command(name = "scopemap")]
#[command(about = "Drill-down map of a project's internal structure", long_about = None)]
#[command(version)]
struct Cli {
    /// Project directory to analyze
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Project display name (default: guessed from the project manifest)
    #[arg(short, long)]
    name: Option<String>,

    /// Output file for the graph JSON (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for JSON)
    #[arg(long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .target(env_logger::Target::Stderr)
        .init();

    let project_dir = cli
        .path
        .canonicalize()
        .with_context(|| format!("invalid project path: {}", cli.path.display()))?;

    let project_name = cli
        .name
        .unwrap_or_else(|| guess_project_name(&project_dir));
    log::debug!("Project: {project_name} at {}", project_dir.display());

    let extractors = detect_extractors(&project_dir);
    if extractors.is_empty() {
        bail!(
            "could not detect project type in {} (expected Cargo.toml or pyproject.toml)",
            project_dir.display()
        );
    }

    let mut builder = GraphBuilder::new(&project_name);
    let mut cache = SourceCache::new();
    for extractor in &extractors {
        if !extractor.can_handle(&project_dir) {
            continue;
        }
        log::info!("Running extractor: {}", extractor.name());
        if let Err(e) = extractor.extract(&project_dir, &mut cache, &mut builder) {
            // One failed front-end must not abort the run; later extractors
            // may still produce a useful graph.
            log::warn!("Extractor {} failed: {e}", extractor.name());
        }
    }

    let graph = builder.finish().context("graph construction failed")?;
    log::info!(
        "Graph: {} roots, {} nodes, {} cycles",
        graph.roots.len(),
        graph.hierarchy.len(),
        graph.cycles.len()
    );

    let json = serde_json::to_string_pretty(&graph).context("could not serialize graph")?;
    match &cli.output {
        Some(path) => {
            fs::write(path, json)
                .with_context(|| format!("could not write {}", path.display()))?;
            log::info!("Wrote {}", path.display());
        }
        None => println!("{json}"),
    }

    Ok(())
}

/// Guess the project display name from Cargo.toml or pyproject.toml, falling
/// back to the directory name.
fn guess_project_name(project_dir: &Path) -> String {
    if let Some(name) = cargo_package_name(project_dir) {
        return name;
    }
    if let Some(name) = pyproject_name(project_dir) {
        // PyPI allows hyphens but import names use underscores.
        return name.replace('-', "_");
    }
    project_dir
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("project")
        .replace('-', "_")
}

fn cargo_package_name(project_dir: &Path) -> Option<String> {
    let content = fs::read_to_string(project_dir.join("Cargo.toml")).ok()?;
    let manifest: toml::Value = content.parse().ok()?;
    manifest
        .get("package")?
        .get("name")?
        .as_str()
        .map(str::to_string)
}

fn pyproject_name(project_dir: &Path) -> Option<String> {
    let content = fs::read_to_string(project_dir.join("pyproject.toml")).ok()?;
    let pyproject: toml::Value = content.parse().ok()?;
    pyproject
        .get("project")?
        .get("name")?
        .as_str()
        .map(str::to_string)
}
