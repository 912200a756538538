use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::AsyncReadExt;
use tracing_subscriber::EnvFilter;

use devreview::{Config, OpenAIClient};

/// Send a prompt to an OpenAI model and print the generated review.
#[derive(Parser, Debug)]
#[command(name = "devreview", version, about)]
struct Cli {
    /// File containing the prompt. Reads stdin when omitted.
    prompt: Option<PathBuf>,

    /// Path to the YAML config file.
    #[arg(short, long, default_value = "devreview.yaml")]
    config: PathBuf,

    /// Model identifier (overrides config).
    #[arg(short, long)]
    model: Option<String>,

    /// Sampling temperature (overrides config).
    #[arg(short, long)]
    temperature: Option<f32>,

    /// Maximum completion tokens (overrides config).
    #[arg(long)]
    max_tokens: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::load(&cli.config)
        .await
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(model) = cli.model {
        config.openai.model = model;
    }
    if let Some(temperature) = cli.temperature {
        config.openai.temperature = temperature;
    }
    if let Some(max_tokens) = cli.max_tokens {
        config.openai.max_completion_tokens = max_tokens;
    }

    let client = OpenAIClient::new(config.openai.client_config()?)?;

    let prompt = match &cli.prompt {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading prompt from {}", path.display()))?,
        None => {
            let mut buf = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buf)
                .await
                .context("reading prompt from stdin")?;
            buf
        }
    };

    let review = client.generate_response(&prompt).await?;
    println!("{review}");

    Ok(())
}
