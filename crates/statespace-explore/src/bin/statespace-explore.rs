//! CLI binary for the state-space explorer.
//!
//! Explores every reachable configuration of a scripted discrete-event
//! model and reports what it found.
//!
//! # Usage
//!
//! ```bash
//! # Explore a model on the current thread
//! statespace-explore run --model model.json
//!
//! # Use 8 worker threads and keep the transition graph
//! statespace-explore run --model model.json --engine concurrent --threads 8 \
//!     --graph graph.json --dot graph.dot
//!
//! # Generate a random model for stress testing
//! statespace-explore generate --seed 42 --processes 4 --output model.json
//!
//! # Summarize a saved graph
//! statespace-explore show --graph graph.json
//! ```
//!
//! Set `RUST_LOG=info` (or `debug`) to see progress while a run is active.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use crossbeam_channel::{bounded, RecvTimeoutError};
use log::info;
use statespace_explore::{
    format_report, load_graph, save_dot, save_graph, EngineKind, Exploration, ExplorationReport,
    ExploreError, Explorer, ExplorerConfig, GraphExport, GraphStats, TransitionGraphRecord,
    WorklistOrder,
};
use statespace_core::Frozen;
use statespace_script::{
    generate_model, load_model, save_model, GeneratorConfig, ScriptFrame, ScriptScheduler,
    StepInfo,
};

#[derive(Parser)]
#[command(name = "statespace-explore")]
#[command(about = "Exhaustive state-space exploration of scripted discrete-event models")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Explore every reachable configuration of a model.
    Run {
        /// Path to a JSON model.
        #[arg(short, long)]
        model: PathBuf,

        /// Engine: "sequential" or "concurrent".
        #[arg(short, long, default_value = "sequential")]
        engine: String,

        /// Worker threads for the concurrent engine (default: all cores).
        #[arg(short, long)]
        threads: Option<usize>,

        /// Worklist order of the sequential engine: "fifo" or "lifo".
        #[arg(short, long, default_value = "fifo")]
        order: String,

        /// How long idle workers wait before re-checking for work.
        #[arg(long, default_value = "1000")]
        poll_ms: u64,

        /// Write the transition graph as JSON.
        #[arg(short, long)]
        graph: Option<PathBuf>,

        /// Write the transition graph as Graphviz DOT.
        #[arg(short, long)]
        dot: Option<PathBuf>,

        /// Log progress every N seconds.
        #[arg(long, default_value = "5")]
        progress_secs: u64,
    },

    /// Write a random model.
    Generate {
        /// Random seed for reproducibility.
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Number of processes.
        #[arg(short, long, default_value = "3")]
        processes: usize,

        /// Number of distinct events.
        #[arg(short, long, default_value = "3")]
        events: usize,

        /// Statements per process body.
        #[arg(long, default_value = "6")]
        statements: usize,

        /// Output path.
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Summarize a saved transition graph.
    Show {
        /// Path to a JSON graph written by `run --graph`.
        #[arg(short, long)]
        graph: PathBuf,
    },
}

struct RunArgs {
    model: PathBuf,
    config: ExplorerConfig,
    graph: Option<PathBuf>,
    dot: Option<PathBuf>,
    progress: Duration,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            model,
            engine,
            threads,
            order,
            poll_ms,
            graph,
            dot,
            progress_secs,
        } => parse_config(&engine, threads, &order, poll_ms).and_then(|config| {
            cmd_run(RunArgs {
                model,
                config,
                graph,
                dot,
                progress: Duration::from_secs(progress_secs.max(1)),
            })
        }),
        Commands::Generate {
            seed,
            processes,
            events,
            statements,
            output,
        } => cmd_generate(seed, processes, events, statements, &output),
        Commands::Show { graph } => cmd_show(&graph),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn parse_config(
    engine: &str,
    threads: Option<usize>,
    order: &str,
    poll_ms: u64,
) -> Result<ExplorerConfig, ExploreError> {
    let defaults = ExplorerConfig::default();
    let config = ExplorerConfig {
        engine: engine.parse::<EngineKind>()?,
        threads: threads.unwrap_or(defaults.threads),
        poll_timeout: Duration::from_millis(poll_ms),
        order: order.parse::<WorklistOrder>()?,
    };
    config.validate()?;
    Ok(config)
}

fn cmd_run(args: RunArgs) -> Result<(), ExploreError> {
    let model = load_model(&args.model)?;
    let scheduler = ScriptScheduler::from_model(model)?;
    let initial = scheduler.initial_configuration();

    println!("Exploring {}", args.model.display());
    println!("  Engine:    {}", args.config.engine);
    if args.config.engine == EngineKind::Concurrent {
        println!("  Threads:   {}", args.config.threads);
    }
    println!("  Processes: {}", scheduler.processes().len());
    println!();

    // Seed the initial node so a model without transitions still shows up.
    let record = TransitionGraphRecord::<ScriptFrame, StepInfo>::new();
    record.add_node(&Frozen::new(initial.clone()));
    let explorer = Explorer::new(&args.config, scheduler, record, [initial])?;

    let start = Instant::now();
    let (stop_tx, stop_rx) = bounded::<()>(0);
    let outcome = std::thread::scope(|scope| {
        let monitor = &explorer;
        scope.spawn(move || loop {
            match stop_rx.recv_timeout(args.progress) {
                Err(RecvTimeoutError::Timeout) => info!(
                    "progress: {} explored, {} pending, {:.1?} elapsed",
                    monitor.num_explored_states(),
                    monitor.num_pending_states(),
                    start.elapsed()
                ),
                _ => break,
            }
        });
        let outcome = explorer.run();
        drop(stop_tx);
        outcome
    });

    let report = ExplorationReport::from_run(
        &explorer,
        explorer.engine(),
        explorer.threads(),
        start.elapsed(),
    )
    .with_graph(GraphStats::from_record(explorer.record()));
    print!("{}", format_report(&report));

    if args.graph.is_some() || args.dot.is_some() {
        let graph = GraphExport::from_record(explorer.record());
        if let Some(path) = &args.graph {
            save_graph(&graph, path)?;
            println!("Graph saved to {}", path.display());
        }
        if let Some(path) = &args.dot {
            save_dot(&graph, path)?;
            println!("DOT graph saved to {}", path.display());
        }
    }

    outcome
}

fn cmd_generate(
    seed: u64,
    processes: usize,
    events: usize,
    statements: usize,
    output: &Path,
) -> Result<(), ExploreError> {
    let config = GeneratorConfig {
        processes,
        events,
        statements,
        ..GeneratorConfig::default()
    };
    let model = generate_model(seed, &config);
    save_model(&model, output)?;
    println!(
        "Generated model with {} processes (seed {}) at {}",
        model.processes.len(),
        seed,
        output.display()
    );
    Ok(())
}

fn cmd_show(path: &Path) -> Result<(), ExploreError> {
    let graph = load_graph(path)?;
    let terminal = graph.terminal_nodes();
    let stopped = graph.nodes.iter().filter(|node| node.stopped).count();

    println!("Graph: {}", path.display());
    println!("  Nodes:           {}", graph.nodes.len());
    println!("  Edges:           {}", graph.edges.len());
    println!("  Terminal states: {}", terminal.len());
    println!("  Stopped states:  {}", stopped);

    for id in terminal.iter().take(10) {
        if let Some(node) = graph.nodes.get(*id) {
            println!("    #{} {}", node.id, node.state);
        }
    }
    if terminal.len() > 10 {
        println!("    ... and {} more", terminal.len() - 10);
    }
    Ok(())
}
