//! `ctxgraph`: build a cross-file relationship graph from extraction records.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use ctxgraph_core::config::BuildOptions;
use ctxgraph_core::graph::Relation;
use ctxgraph_core::indexer::pipeline::{build_from_dir, BuildStats};

#[derive(Parser, Debug)]
#[command(name = "ctxgraph", version, about = "Cross-file relationship graph builder")]
struct Cli {
    /// Directory holding `.context` / `.json` extraction records
    #[arg(short, long)]
    records: PathBuf,

    /// Write the graph document here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Project root for relative record paths and root-relative includes
    #[arg(long)]
    root: Option<PathBuf>,

    /// Extra include search directory (repeatable)
    #[arg(long = "include-dir")]
    include_dirs: Vec<PathBuf>,

    /// Represent unresolved includes as external nodes
    #[arg(long)]
    external_imports: bool,

    /// Worker threads for record parsing
    #[arg(short, long)]
    workers: Option<usize>,

    /// JSON file with build options
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn build_options(&self) -> Result<BuildOptions> {
        let base = match &self.config {
            Some(path) => BuildOptions::from_file(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?,
            None => BuildOptions::default(),
        };
        let mut options = base
            .with_env_overrides()
            .context("Invalid CTXGRAPH_* environment override")?;

        if let Some(root) = &self.root {
            options.root_directory = Some(root.clone());
        }
        options.include_dirs.extend(self.include_dirs.iter().cloned());
        if self.external_imports {
            options.represent_external_imports = true;
        }
        if let Some(workers) = self.workers {
            options.workers = workers;
        }
        Ok(options)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let options = cli.build_options()?;
    let (graph, stats) = build_from_dir(&cli.records, &options)
        .with_context(|| format!("Failed to build graph from {}", cli.records.display()))?;

    match &cli.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            graph.write_json(&mut writer)?;
            writer.flush()?;
            info!("Wrote graph to {}", path.display());
        }
        None => {
            let stdout = io::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            graph.write_json(&mut writer)?;
            writeln!(writer)?;
            writer.flush()?;
        }
    }

    eprintln!("{}", summary(&stats));
    for relation in Relation::ALL {
        let count = graph.count_relation(relation);
        if count > 0 {
            eprintln!("  {relation:<16} {count}");
        }
    }
    eprintln!("fingerprint {}", graph.fingerprint());
    Ok(())
}

fn summary(stats: &BuildStats) -> String {
    let r = &stats.resolution;
    format!(
        "{} records ({} rejected), {} nodes, {} edges in {} ms; \
         unresolved {} symbols / {} imports, {} ambiguous, {} dropped",
        stats.records,
        stats.rejected_records,
        stats.nodes,
        stats.edges,
        stats.elapsed_ms,
        r.unresolved_symbols,
        r.unresolved_imports,
        r.ambiguous_symbols,
        r.dropped_edges
    )
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("ctxgraph_core=debug,ctxgraph=debug,info")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("ctxgraph_core=info,ctxgraph=info,warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false),
        )
        .init();
}
