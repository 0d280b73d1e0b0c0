//! flowdash - flow-health report for a Taiga project

#![forbid(unsafe_code)]

mod output;

use anyhow::{anyhow, Context};
use chrono::NaiveDate;
use clap::Parser;
use flow_core::{ItemKind, PredicateSet};
use flow_pipeline::{FlowConfig, FlowPipeline};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "flowdash",
    version,
    about = "flowdash: flow-health metrics for a Taiga project",
    long_about = None
)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long, env = "FLOWDASH_CONFIG")]
    config: Option<PathBuf>,

    /// Backend root URL (overrides config and TAIGA_URL).
    #[arg(long)]
    base_url: Option<String>,

    /// Login name (overrides config and TAIGA_USERNAME).
    #[arg(long)]
    username: Option<String>,

    /// Project id or slug (overrides config and TAIGA_PROJECT_ID).
    #[arg(long)]
    project: Option<String>,

    /// Keep only these item kinds (story, task, issue).
    #[arg(long = "kind")]
    kinds: Vec<ItemKind>,

    /// Keep only items in these statuses.
    #[arg(long = "status")]
    statuses: Vec<String>,

    /// Keep only items assigned to these people ("Unassigned" for none).
    #[arg(long = "assignee")]
    assignees: Vec<String>,

    /// Keep only items with these priorities.
    #[arg(long = "priority")]
    priorities: Vec<String>,

    /// Keep only items carrying at least one of these tags.
    #[arg(long = "tag")]
    tags: Vec<String>,

    /// Keep only blocked items.
    #[arg(long)]
    blocked: bool,

    /// Keep only unassigned items.
    #[arg(long)]
    unassigned: bool,

    /// Earliest creation date, inclusive (YYYY-MM-DD).
    #[arg(long)]
    created_from: Option<NaiveDate>,

    /// Latest creation date, inclusive (YYYY-MM-DD).
    #[arg(long)]
    created_to: Option<NaiveDate>,

    /// Emit the full metrics record as JSON.
    #[arg(long)]
    json: bool,

    /// Emit logs as JSON lines.
    #[arg(long)]
    log_json: bool,
}

impl Cli {
    fn predicates(&self) -> PredicateSet {
        PredicateSet {
            kinds: self.kinds.iter().copied().collect(),
            assignees: self.assignees.iter().cloned().collect(),
            statuses: self.statuses.iter().cloned().collect(),
            priorities: self.priorities.iter().cloned().collect(),
            tags: self.tags.iter().cloned().collect(),
            blocked_only: self.blocked,
            unassigned_only: self.unassigned,
            created_from: self.created_from,
            created_to: self.created_to,
        }
    }

    /// File, then environment, then flags.
    fn load_config(&self) -> anyhow::Result<FlowConfig> {
        let mut config = match &self.config {
            Some(path) => FlowConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => FlowConfig::default(),
        };
        config.apply_env();
        if let Some(url) = &self.base_url {
            config.connection.base_url.clone_from(url);
        }
        if let Some(username) = &self.username {
            config.connection.username = Some(username.clone());
        }
        if let Some(project) = &self.project {
            config.project = project.parse().ok();
        }
        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }
}

async fn run(cli: &Cli, pipeline: &FlowPipeline) -> anyhow::Result<()> {
    let record = pipeline
        .metrics(&cli.predicates())
        .await
        .map_err(|e| anyhow!("{} error: {e}", e.category()))?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&*record)?);
    } else {
        print!("{}", output::TextReport(&record));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let pipeline = match cli
        .load_config()
        .and_then(|config| FlowPipeline::new(&config).context("invalid configuration"))
    {
        Ok(pipeline) => pipeline,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::from(2);
        }
    };

    match run(&cli, &pipeline).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}
