mod batch;
mod config;
mod error;
mod gemini;
mod http;
mod markdown;
mod notion;
mod prompt;

use std::io::Read;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::batch::{Batch, Status};
use crate::config::{request_id, Config, EnvSource, MapSource};
use crate::gemini::GeminiClient;
use crate::notion::client::PAGE_SIZE;
use crate::notion::{Collector, NotionClient};

#[derive(Parser)]
#[command(name = "report_feedback", about = "Writes AI feedback into Notion daily reports")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process pages flagged ready for feedback
    Run {
        /// Max pages to process (overrides MAX_ITEMS_PER_RUN)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// Log assembled reports and generated feedback
        #[arg(long)]
        debug: bool,
    },
    /// Show the report Markdown and feedback region of one page (read-only)
    Preview {
        page_id: String,
    },
    /// Compile feedback Markdown to Notion blocks and print them as JSON
    Compile {
        /// Markdown file (default: stdin)
        file: Option<PathBuf>,
    },
    /// Count pages currently eligible for feedback
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let debug = matches!(cli.command, Commands::Run { debug: true, .. })
        || std::env::var("DEBUG").as_deref() == Ok("1");
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| if debug { "debug" } else { "info" }.into()),
        )
        .init();

    let t0 = Instant::now();

    let result = match cli.command {
        Commands::Run { limit, debug } => {
            let mut overrides = MapSource::new(limit.map(|n| ("MAX_ITEMS_PER_RUN", n.to_string())));
            if debug {
                overrides.set("DEBUG", "1");
            }
            let config = Config::load(overrides).context("loading configuration")?;

            let notion = NotionClient::new(&config.notion)?;
            let gemini = GeminiClient::new(&config.gemini)?;
            let rid = request_id(&EnvSource);
            let summary = Batch::new(&config, &notion, &gemini, rid)
                .run()
                .await
                .context("batch run aborted")?;

            for r in summary.results.iter().filter(|r| r.status == Status::Failed) {
                println!("FAILED {}: {}", r.page_id, r.message.as_deref().unwrap_or(""));
            }
            println!(
                "Done: {} written, {} skipped, {} failed.",
                summary.count(Status::Done),
                summary.count(Status::Skipped),
                summary.count(Status::Failed)
            );
            Ok(())
        }
        Commands::Preview { page_id } => {
            let config = Config::load(MapSource::default()).context("loading configuration")?;
            let notion = NotionClient::new(&config.notion)?;
            let collected = Collector::new(&notion)
                .collect(&page_id)
                .await
                .with_context(|| format!("collecting blocks of {page_id}"))?;

            let report = markdown::assemble_report(&collected.blocks);
            println!("{report}");
            println!("{}", "-".repeat(40));
            println!("Chars:     {}", report.chars().count());
            println!("Container: {}", collected.feedback_container_id.as_deref().unwrap_or("-"));
            println!("Divider:   {}", collected.feedback_divider_id.as_deref().unwrap_or("-"));
            println!("Stale:     {} blocks", collected.feedback_content_ids.len());
            Ok(())
        }
        Commands::Compile { file } => {
            let text = match &file {
                Some(path) => std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?,
                None => {
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf).context("reading stdin")?;
                    buf
                }
            };
            let blocks = markdown::compile(&text);
            println!("{}", serde_json::to_string_pretty(&blocks)?);
            Ok(())
        }
        Commands::Stats => {
            let config = Config::load(MapSource::default()).context("loading configuration")?;
            let notion = NotionClient::new(&config.notion)?;
            let ids = notion.query_ready_pages(PAGE_SIZE).await?;
            let more = if ids.len() == PAGE_SIZE { "+" } else { "" };
            println!("Eligible:  {}{}", ids.len(), more);
            println!("Per run:   {}", config.batch.max_items_per_run);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
