use anyhow::{Context, Result};
use clap::Parser;
use mdtracker::config::Config;
use mdtracker::extract::ExtractionMode;
use serde_json::to_string_pretty;
use std::io::Read;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Run one extraction strategy over a single post body and print the result.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// File containing the post text; reads stdin when omitted
    file: Option<PathBuf>,

    /// Extraction strategy
    #[arg(short, long, value_enum, default_value = "lenient")]
    mode: ExtractionMode,

    /// Model used by the `model` strategy (overrides LLM_MODEL)
    #[arg(long)]
    model: Option<String>,

    /// Log LLM traffic
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::WARN })
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let text = match &args.file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read stdin")?;
            text
        }
    };

    let mut config = Config::from_env()?;
    config.mode = args.mode;
    if let Some(model) = args.model {
        config.llm.model = Some(model);
    }

    let strategy = config.build_strategy()?;
    info!("Extracting {} characters with {} strategy", text.len(), strategy.mode());

    match strategy.extract(&text).await {
        Some(extraction) => println!("{}", to_string_pretty(&extraction)?),
        None => println!("no match"),
    }

    Ok(())
}
