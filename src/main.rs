use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use mdtracker::config::Config;
use mdtracker::extract::ExtractionMode;
use mdtracker::logging::configure_logging;
use mdtracker::tracker;

/// Scrape interview results from a subreddit into an HTML table.
///
/// Every flag overrides the matching environment variable.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Subreddit to read (SUBREDDIT)
    #[arg(short, long)]
    subreddit: Option<String>,

    /// Number of newest posts to fetch, at most 100 (POST_LIMIT)
    #[arg(short, long)]
    limit: Option<u32>,

    /// Extraction strategy (EXTRACTION_MODE)
    #[arg(short, long, value_enum)]
    mode: Option<ExtractionMode>,

    /// Where to write the HTML report (OUTPUT_PATH)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Model used by the `model` strategy (LLM_MODEL)
    #[arg(long)]
    model: Option<String>,

    /// User-Agent sent to Reddit (USER_AGENT)
    #[arg(long)]
    user_agent: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    configure_logging();

    let mut config = Config::from_env()?;
    if let Some(subreddit) = args.subreddit {
        config.subreddit = subreddit;
    }
    if let Some(limit) = args.limit {
        config.post_limit = limit;
    }
    if let Some(mode) = args.mode {
        config.mode = mode;
    }
    if let Some(output) = args.output {
        config.output_path = output;
    }
    if let Some(model) = args.model {
        config.llm.model = Some(model);
    }
    if let Some(user_agent) = args.user_agent {
        config.reddit.user_agent = user_agent;
    }

    info!(
        "Reading {} newest posts from r/{} into {}",
        config.post_limit,
        config.subreddit,
        config.output_path.display()
    );

    tracker::run(&config).await?;
    Ok(())
}
