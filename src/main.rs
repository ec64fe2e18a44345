//! CLI entry point — analyze a webpage with the multi-agent pipeline.

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use webintel::config::OracleConfig;
use webintel::Pipeline;

#[derive(Debug, Parser)]
#[command(name = "webintel", about = "Analyze a webpage with the multi-agent pipeline")]
struct Cli {
    /// URL to analyze.
    url: String,

    /// Override the oracle model.
    #[arg(long)]
    model: Option<String>,

    /// Override the oracle base URL.
    #[arg(long)]
    base_url: Option<String>,

    /// Per-call oracle timeout in seconds.
    #[arg(long, default_value_t = 60)]
    timeout_secs: u64,

    /// Print the full run outcome as JSON instead of a summary.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mut config = OracleConfig::from_env().context("oracle configuration")?;
    if let Some(model) = cli.model {
        config.model = model;
    }
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }
    config.timeout = std::time::Duration::from_secs(cli.timeout_secs);

    // Ctrl-C cancels in-flight oracle and tool calls; the run still
    // returns its partial results.
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling run");
            signal_cancel.cancel();
        }
    });

    let pipeline = Pipeline::standard(&config);
    let outcome = pipeline.run_with_cancel(&cli.url, cancel).await;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        println!("success: {}", outcome.success);
        println!(
            "stages executed: {} (final: {})",
            outcome.summary.stages_executed, outcome.summary.final_stage
        );
        if !outcome.errors.is_empty() {
            eprintln!("errors:");
            for error in &outcome.errors {
                eprintln!("  - {error}");
            }
        }
        if !outcome.final_report.is_empty() {
            println!("\n{}", outcome.final_report);
        }
    }

    if !outcome.success {
        std::process::exit(1);
    }
    Ok(())
}
