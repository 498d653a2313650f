// crates/flowcli/src/main.rs

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use flowcore::{EventType, ExecutionEvent, Value};
use flowruntime::{FlowRuntime, NodeRegistry, RuntimeConfig, SchedulingStrategy};
use std::collections::HashMap;
use std::io::BufRead;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "flow")]
#[command(about = "Dependency-ordered workflow engine CLI", long_about = None)]
struct Cli {
    /// Show debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the sentiment flow once per text
    Analyze {
        /// Text to analyze; repeat for several runs. Reads stdin lines when omitted
        #[arg(short, long)]
        text: Vec<String>,

        /// Scheduling strategy (levelled | fixed-point); defaults to FLOW_STRATEGY
        #[arg(short, long)]
        strategy: Option<SchedulingStrategy>,

        /// Print node completions as they happen
        #[arg(long)]
        trace_events: bool,
    },

    /// List registered nodes and their dependencies
    Nodes,

    /// Check the dependency graph and print its execution levels
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Analyze {
            text,
            strategy,
            trace_events,
        } => {
            let mut config = RuntimeConfig::from_env();
            if let Some(strategy) = strategy {
                config.strategy = strategy;
            }
            analyze(text, config, trace_events).await?;
        }

        Commands::Nodes => {
            list_nodes()?;
        }

        Commands::Validate => {
            validate()?;
        }
    }

    Ok(())
}

fn sentiment_registry() -> Result<NodeRegistry> {
    let mut registry = NodeRegistry::new();
    flownodes::register_all(&mut registry).context("failed to register sentiment flow")?;
    Ok(registry)
}

async fn analyze(texts: Vec<String>, config: RuntimeConfig, trace_events: bool) -> Result<()> {
    let texts = if texts.is_empty() {
        std::io::stdin()
            .lock()
            .lines()
            .collect::<std::io::Result<Vec<_>>>()
            .context("failed to read stdin")?
    } else {
        texts
    };

    let runtime = FlowRuntime::with_registry(Arc::new(sentiment_registry()?), config);

    if trace_events {
        runtime.subscribe(EventType::NodeCompleted, |event| {
            if let ExecutionEvent::NodeCompleted {
                node, duration_ms, ..
            } = event
            {
                eprintln!("  ✅ {} completed in {}ms", node, duration_ms);
            }
        });
    }

    for text in texts {
        let inputs = HashMap::from([("text".to_string(), Value::from(text))]);
        let result = runtime.run(inputs).await?;

        tracing::debug!("Run {} finished in {}ms", result.run_id, result.duration_ms);
        println!("{}", serde_json::to_string_pretty(&flownodes::report(&result))?);
    }

    Ok(())
}

fn list_nodes() -> Result<()> {
    println!("📦 Registered nodes:");
    println!();

    let registry = sentiment_registry()?;
    for descriptor in registry.descriptors() {
        let metadata = descriptor.metadata();
        let deps = if descriptor.depends_on().is_empty() {
            "-".to_string()
        } else {
            descriptor.depends_on().join(", ")
        };

        println!("  • {} ({})", descriptor.name(), metadata.category);
        println!("    type:       {}", descriptor.type_name());
        println!("    depends on: {}", deps);
        if descriptor.is_injectable() {
            println!("    receives run context at construction");
        }
        if !metadata.description.is_empty() {
            println!("    {}", metadata.description);
        }
    }

    Ok(())
}

fn validate() -> Result<()> {
    let runtime = FlowRuntime::with_registry(Arc::new(sentiment_registry()?), RuntimeConfig::default());
    let plan = runtime.validate()?;

    println!("✅ Graph is valid: {} nodes, {} levels", plan.node_count(), plan.levels().len());
    for (depth, level) in plan.levels().iter().enumerate() {
        println!("   {}: {}", depth, level.join(", "));
    }

    Ok(())
}
