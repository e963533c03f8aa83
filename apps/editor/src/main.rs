use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use authority::InMemoryAuthority;
use clap::{Parser, ValueEnum};
use client_core::{
    load_settings, load_settings_from, FixedAnswer, ModelClient, ModelSnapshot, Prompt,
};
use shared::domain::LayoutId;
use tokio::sync::watch;
use tracing::{info, warn};

mod prompt;
mod script;
mod view;

use prompt::TerminalPrompt;
use script::{demo_script, parse_script, run_step};
use view::SnapshotView;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Confirm {
    Yes,
    No,
    Ask,
}

/// Replays an editing session against an in-memory model and prints the
/// resulting client snapshot as JSON.
#[derive(Parser, Debug)]
struct Args {
    /// Settings file; defaults to `sketch.toml` in the working directory if present.
    #[arg(long)]
    config: Option<PathBuf>,
    /// JSON array of steps; the built-in demo network is used when omitted.
    #[arg(long)]
    script: Option<PathBuf>,
    #[arg(long)]
    layout: Option<String>,
    /// How destructive steps are answered.
    #[arg(long, value_enum, default_value_t = Confirm::Yes)]
    confirm: Confirm,
    /// Quiet period after each step before the next one runs.
    #[arg(long, default_value_t = 50)]
    settle_ms: u64,
    #[arg(long)]
    compact: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = match &args.config {
        Some(path) => load_settings_from(path)?,
        None => load_settings()?,
    };
    if let Some(layout) = &args.layout {
        settings.layout_id = LayoutId::new(layout.as_str());
    }

    let steps = match &args.script {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read script '{}'", path.display()))?;
            parse_script(&raw)?
        }
        None => demo_script(),
    };

    let prompt: Arc<dyn Prompt> = match args.confirm {
        Confirm::Yes => Arc::new(FixedAnswer(true)),
        Confirm::No => Arc::new(FixedAnswer(false)),
        Confirm::Ask => Arc::new(TerminalPrompt),
    };

    let (client, link) = ModelClient::start(&settings, prompt)?;
    let (commands, events) = link.into_parts();
    let authority = tokio::spawn(InMemoryAuthority::new().serve(commands, events));

    let quiet = Duration::from_millis(args.settle_ms);
    let mut snapshots = client.subscribe();
    settle(&mut snapshots, quiet).await?;

    info!(steps = steps.len(), layout = %client.layout(), "replaying script");
    for (index, step) in steps.iter().enumerate() {
        if let Err(err) = run_step(&client, step).await {
            warn!(index, ?step, error = %err, "step failed");
            continue;
        }
        settle(&mut snapshots, quiet).await?;
    }

    let snapshot = client.snapshot();
    print_snapshot(&snapshot, args.compact)?;

    client.shutdown();
    let authority = authority.await.context("authority task failed")?;
    info!(
        variables = authority.variable_count(),
        "authoritative model after replay"
    );
    Ok(())
}

/// Absorbs snapshot updates until none arrives for `quiet`.
async fn settle(snapshots: &mut watch::Receiver<ModelSnapshot>, quiet: Duration) -> Result<()> {
    loop {
        match tokio::time::timeout(quiet, snapshots.changed()).await {
            Ok(Ok(())) => {
                snapshots.borrow_and_update();
            }
            Ok(Err(_)) => anyhow::bail!("model session stopped"),
            Err(_) => return Ok(()),
        }
    }
}

fn print_snapshot(snapshot: &ModelSnapshot, compact: bool) -> Result<()> {
    let view = SnapshotView::from(snapshot);
    let json = if compact {
        serde_json::to_string(&view)?
    } else {
        serde_json::to_string_pretty(&view)?
    };
    println!("{json}");
    Ok(())
}
