// Command-line entry point for methodgraph.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use methodgraph::application::ReplayUsecase;
use methodgraph::domain::store::{DiskRecordStore, RecordStore};
use methodgraph::infrastructure::concurrency::init_thread_pool;
use methodgraph::infrastructure::{CallCounter, ProfilerConfig, StaticTypeTable, TraceLoader};
use methodgraph::MethodGraph;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable trace-level logging on stderr
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a recorded trace into a call graph
    Replay {
        /// Trace file (JSON)
        #[arg(short, long)]
        trace: PathBuf,

        /// Configuration file (TOML)
        #[arg(short, long, default_value = "methodgraph.toml")]
        config: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Names)]
        format: Format,

        /// Output file path (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// sled directory to persist records into (overrides the config)
        #[arg(long)]
        store: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    /// Method records as JSON
    Json,
    /// One `Owner#method` per line, followed by a tab and `file:line`
    Names,
    /// One call-tree name per line
    Calltree,
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_exclusions(
    host: &StaticTypeTable,
    names: &[String],
) -> Vec<(Option<methodgraph::TypeRef>, Option<methodgraph::MethodId>)> {
    names
        .iter()
        .flat_map(|name| {
            let parsed = host.parse_full_name(name);
            if parsed.is_empty() {
                warn!(%name, "exclusion does not match any known method");
            }
            parsed
        })
        .collect()
}

fn render(graph: &MethodGraph, host: &StaticTypeTable, config: &ProfilerConfig, format: Format) -> Result<String> {
    let mut out = String::new();
    match format {
        Format::Json => {
            let records = graph.dump_all()?;
            out = serde_json::to_string_pretty(&records)?;
            out.push('\n');
        }
        Format::Names => {
            for (_, node) in graph.methods() {
                out.push_str(&format!(
                    "{}\t{}:{}\n",
                    node.full_name(host),
                    node.source_label(&config.native_label),
                    node.line()
                ));
            }
        }
        Format::Calltree => {
            for (_, node) in graph.methods() {
                out.push_str(&node.call_tree_name(host));
                out.push('\n');
            }
        }
    }
    Ok(out)
}

fn replay(
    trace: PathBuf,
    config: PathBuf,
    format: Format,
    output: Option<PathBuf>,
    store: Option<PathBuf>,
) -> Result<()> {
    let config = ProfilerConfig::load(&config)?;
    init_thread_pool(config.threads)?;

    let trace = TraceLoader::load(&trace)?;
    let host = trace.type_table();

    let mut graph = MethodGraph::new();
    let mut counter = CallCounter::default();
    let usecase = ReplayUsecase { host: &host };
    usecase.exclude(&mut graph, &resolve_exclusions(&host, &config.exclude));
    let summary = usecase.run(&mut graph, &mut counter, &trace.events);
    if summary.unbalanced_returns > 0 {
        warn!(count = summary.unbalanced_returns, "trace has unbalanced returns");
    }

    let rendered = render(&graph, &host, &config, format)?;
    match &output {
        Some(path) => fs::write(path, &rendered)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => std::io::stdout().write_all(rendered.as_bytes())?,
    }

    if let Some(path) = store.or(config.store.path) {
        let records = graph.dump_all()?;
        let store = DiskRecordStore::new(&path.to_string_lossy())?;
        store.put_all(&records)?;
        store.flush()?;
        info!(records = records.len(), path = %path.display(), "persisted records");
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    match cli.command {
        Command::Replay {
            trace,
            config,
            format,
            output,
            store,
        } => replay(trace, config, format, output, store),
    }
}
