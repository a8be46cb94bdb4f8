use clap::{Parser, Subcommand};
use nagare::prelude::*;
use nagare::workflow::{CONDITION_KEY, EXPRESSION_KEY, payload_from_json, switch_cases};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Workflow graph inspection and condition evaluation CLI
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Optional TOML engine config
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate a condition expression against an inputs object
    Eval {
        /// The condition text, e.g. `input.value > 10`
        #[arg(short, long)]
        expr: String,
        /// Inputs as inline JSON or a path to a JSON file
        #[arg(short, long, default_value = "{}")]
        inputs: String,
    },
    /// Print the nodes, edges and branch conditions of a workflow document
    Inspect {
        /// Path to the editor workflow JSON
        workflow: PathBuf,
    },
    /// Dry-run a workflow from its entry points
    Run {
        /// Path to the editor workflow JSON
        workflow: PathBuf,
    },
    /// Convert a workflow document into a binary snapshot
    Snapshot {
        /// Path to the editor workflow JSON
        workflow: PathBuf,
        /// Where to write the snapshot
        output: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("nagare=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => EngineConfig::from_file(path).unwrap_or_else(|e| {
            exit_with_error(&format!("Failed to load config '{}': {}", path.display(), e))
        }),
        None => EngineConfig::default(),
    };

    match cli.command {
        Command::Eval { expr, inputs } => run_eval(&config, &expr, &inputs),
        Command::Inspect { workflow } => run_inspect(load_graph(&workflow, config)),
        Command::Run { workflow } => run_dry(load_graph(&workflow, config)),
        Command::Snapshot { workflow, output } => {
            run_snapshot(load_graph(&workflow, config), &output)
        }
    }
}

fn run_eval(config: &EngineConfig, expr: &str, inputs: &str) {
    let inputs = load_inputs(inputs);
    let compiler = Compiler::new(&config.evaluation);

    let compile_start = Instant::now();
    let condition = compiler
        .compile(expr)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to parse condition: {}", e)));
    let compile_duration = compile_start.elapsed();

    println!("Parsed: {}", condition);
    let required = condition.required_inputs();
    if !required.is_empty() {
        println!(
            "Reads:  {}",
            required.into_iter().collect::<Vec<_>>().join(", ")
        );
    }

    let eval_start = Instant::now();
    match evaluate(&condition.expression, &inputs) {
        Ok(evaluation) => {
            println!("\n  -> Value: {}", evaluation.value);
            println!("  -> Matched: {}", evaluation.is_truthy());
            println!("  -> Reason: {}", evaluation.reason());
        }
        Err(e) => {
            println!("\n  -> Evaluation failed: {}", e);
            println!("  -> Matched: false");
        }
    }
    let eval_duration = eval_start.elapsed();

    println!("\n--- Performance Summary ---");
    println!("Parsing:     {:?}", compile_duration);
    println!("Evaluation:  {:?}", eval_duration);
}

fn run_inspect(graph: WorkflowGraph) {
    println!("--- Nodes ({}) ---", graph.node_count());
    for node in graph.nodes() {
        let label = node.data.label.as_deref().unwrap_or("");
        println!(
            "{:<24} {:<16} ({:.0}, {:.0}) {}",
            node.id,
            node.kind.as_str(),
            node.position.x, node.position.y, label
        );
        if !graph.edges().any(|edge| edge.touches(&node.id)) {
            println!("    (not connected)");
        }
        if !node.data.inputs.is_empty() {
            let mut keys: Vec<&String> = node.data.inputs.keys().collect();
            keys.sort();
            println!("    inputs: {:?}", keys);
        }
        match node.kind {
            NodeKind::IfElse => {
                if let Some(condition) = node.data.config_str(CONDITION_KEY) {
                    println!("    condition: {}", condition);
                }
            }
            NodeKind::Switch => {
                println!("    cases: [{}]", switch_cases(node).join(", "));
                if let Some(expression) = node.data.config_str(EXPRESSION_KEY) {
                    println!("    expression: {}", expression);
                }
            }
            _ => {}
        }
    }

    println!("\n--- Edges ({}) ---", graph.edge_count());
    for edge in graph.edges() {
        println!(
            "{} [{}] -> {} [{}]",
            edge.source, edge.source_handle, edge.target, edge.target_handle
        );
    }
}

fn run_dry(graph: WorkflowGraph) {
    let run_start = Instant::now();
    let report = Runner::new(&graph)
        .run()
        .unwrap_or_else(|e| exit_with_error(&format!("Run failed: {}", e)));
    let run_duration = run_start.elapsed();

    println!("--- Dry Run ---");
    for (i, step) in report.steps.iter().enumerate() {
        println!("{:>3}. {} ({})", i + 1, step.node_id, step.kind);
        if let Some(decision) = &step.decision {
            match &decision.handle {
                Some(handle) => println!("       -> took '{}': {}", handle, decision.reason),
                None => println!("       -> stopped: {}", decision.reason),
            }
        }
    }
    if !report.unreached.is_empty() {
        println!("\nNot reached: {}", report.unreached.join(", "));
    }
    if report.truncated {
        println!("\nStopped early at the step limit.");
    }
    println!("\nFinished in {:?}", run_duration);
}

fn run_snapshot(graph: WorkflowGraph, output: &Path) {
    let snapshot = graph.snapshot();
    snapshot
        .save(output)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to write snapshot: {}", e)));
    println!(
        "Wrote {} nodes and {} edges to '{}'",
        snapshot.nodes.len(),
        snapshot.edges.len(),
        output.display()
    );
}

fn load_graph(path: &Path, config: EngineConfig) -> WorkflowGraph {
    let json = fs::read_to_string(path).unwrap_or_else(|e| {
        exit_with_error(&format!(
            "Failed to read workflow file '{}': {}",
            path.display(),
            e
        ))
    });
    WorkflowGraph::from_editor_json(&json, config)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to load workflow: {}", e)))
}

/// Accepts inline JSON, or a path to a file containing it.
fn load_inputs(raw: &str) -> Payload {
    let text = if Path::new(raw).is_file() {
        fs::read_to_string(raw).unwrap_or_else(|e| {
            exit_with_error(&format!("Failed to read inputs file '{}': {}", raw, e))
        })
    } else {
        raw.to_string()
    };
    let json: serde_json::Value = serde_json::from_str(&text)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to parse inputs JSON: {}", e)));
    payload_from_json(json).unwrap_or_else(|| exit_with_error("Inputs must be a JSON object"))
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
