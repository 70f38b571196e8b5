use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;

use fleet::actors::AutomationActor;
use fleet::config::Config;
use fleet::core::Task;
use fleet::report::ReportKind;
use fleet::store::{JsonStore, RecordStore};
use fleet::{flog, Error, Pipeline, Result};

/// Fleet - evaluate, plan and execute tasks with pooled sub-workers
#[derive(Parser, Debug)]
#[command(name = "fleet")]
#[command(version, about, long_about = None)]
#[command(after_help = "ENVIRONMENT:\n    FLEET_DEBUG=1     Enable debug logging (alternative to --debug)")]
pub struct Cli {
    /// Enable debug logging (writes to ~/.fleet/fleet.log)
    #[arg(short = 'd', long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Run one task through the pipeline and print its record
    Run {
        /// Task type label
        #[arg(long, default_value = "general")]
        kind: String,

        /// Free-text description
        #[arg(long)]
        description: String,

        #[arg(long, default_value_t = 1)]
        complexity: u32,

        #[arg(long, default_value_t = 1)]
        urgency: u32,

        #[arg(long, default_value_t = 1)]
        impact: u32,

        /// Sub-workers the task asks for per dispatch
        #[arg(long)]
        workers: Option<usize>,
    },

    /// Show coordinator status and metrics
    Status,

    /// List stored task records, newest first
    Tasks {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Generate and store a performance report
    Report {
        #[arg(value_enum)]
        kind: ReportKind,
    },

    /// Submit automated analysis tasks on an interval
    Auto {
        /// Seconds between submissions (defaults to auto_interval_secs)
        #[arg(long)]
        interval_secs: Option<u64>,

        /// Stop after this many tasks; runs until Ctrl-C otherwise
        #[arg(long)]
        cycles: Option<usize>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    fleet::log::init(cli.debug);

    let config = Config::load()?;
    let store: Arc<dyn RecordStore> = Arc::new(JsonStore::new(config.store_path()?));
    let pipeline = Arc::new(Pipeline::from_config(&config).with_store(Arc::clone(&store)));

    flog!("main", "fleet starting: {:?}", cli.command);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        pipeline.restore().await?;
        match cli.command {
            Command::Run {
                kind,
                description,
                complexity,
                urgency,
                impact,
                workers,
            } => {
                let mut task = Task::new(&kind, &description)
                    .with_complexity(complexity)
                    .with_urgency(urgency)
                    .with_impact(impact);
                if let Some(workers) = workers {
                    task = task.with_allocation(workers);
                }
                print_json(&pipeline.submit(task).await)
            }
            Command::Status => {
                let output = serde_json::json!({
                    "coordinators": pipeline.statuses().await,
                    "metrics": pipeline.metrics().await,
                });
                print_json(&output)
            }
            Command::Tasks { limit } => print_json(&store.tasks(Some(limit)).await?),
            Command::Report { kind } => print_json(&pipeline.report(kind).await?),
            Command::Auto {
                interval_secs,
                cycles,
            } => run_auto(pipeline, &config, interval_secs, cycles).await,
        }
    })
}

async fn run_auto(
    pipeline: Arc<Pipeline>,
    config: &Config,
    interval_secs: Option<u64>,
    cycles: Option<usize>,
) -> Result<()> {
    let interval = match interval_secs {
        Some(0) => {
            return Err(Error::Validation(
                "--interval-secs must be at least 1".into(),
            ))
        }
        Some(secs) => std::time::Duration::from_secs(secs),
        None => config.auto_interval(),
    };
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

    let mut actor = AutomationActor::new(pipeline, interval).with_records(tx);
    if let Some(cycles) = cycles {
        actor = actor.with_cycles(cycles);
    }
    let handle = actor.spawn();

    loop {
        tokio::select! {
            record = rx.recv() => match record {
                Some(record) => print_json(&record)?,
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                flog!("main", "interrupted, stopping automation");
                handle.shutdown();
                break;
            }
        }
    }
    handle.join().await
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
