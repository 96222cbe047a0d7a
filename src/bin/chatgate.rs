//! chatgate CLI
//!
//! Run with: cargo run --bin chatgate -- "Write a haiku about rust"

use anyhow::{bail, Context, Result};
use chatgate::{ConfigLoader, GatewayClient, GatewayError, DEFAULT_MODEL};
use chatgate::{ChatCompletionOptions, ChatMessage};
use clap::Parser;
use std::io::{Read, Write};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "chatgate")]
#[command(about = "Query an OpenAI-compatible chat completions gateway", long_about = None)]
struct Cli {
    /// Prompt text; read from stdin when omitted
    prompt: Vec<String>,

    /// Model identifier
    #[arg(short, long, default_value = DEFAULT_MODEL)]
    model: String,

    /// Print fragments as they arrive
    #[arg(short, long)]
    stream: bool,

    /// Treat the input as document text and print a title generated by --model
    #[arg(short, long, conflicts_with = "stream")]
    title: bool,

    /// Explicit config file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn read_prompt(args: &[String]) -> Result<String> {
    if !args.is_empty() {
        return Ok(args.join(" "));
    }

    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("failed to read prompt from stdin")?;
    Ok(input)
}

async fn stream_to_stdout(client: &GatewayClient, prompt: String, model: String) -> Result<()> {
    let token = CancellationToken::new();
    let ctrl_c = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let options = ChatCompletionOptions::new(model, vec![ChatMessage::user(prompt)]);
    let mut stream = client
        .stream_chat_completion_with_cancellation(&options, token)
        .await?;

    let mut stdout = std::io::stdout();
    while let Some(fragment) = stream.next_fragment().await {
        write!(stdout, "{}", fragment?)?;
        stdout.flush()?;
    }
    writeln!(stdout)?;

    Ok(())
}

async fn run(client: &GatewayClient, cli: Cli, prompt: String) -> Result<()> {
    if cli.title {
        match client.generate_title(&prompt, &cli.model).await? {
            Some(title) => println!("{}", title),
            None => bail!("the model did not return a usable title"),
        }
    } else if cli.stream {
        stream_to_stdout(client, prompt, cli.model).await?;
    } else {
        let text = client.generate_text(&prompt, &cli.model).await?;
        println!("{}", text);
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ConfigLoader::from_path(path)?.into_config(),
        None => ConfigLoader::new()?.into_config(),
    };
    let client = GatewayClient::with_config(config)?;

    if !client.is_configured() {
        bail!(
            "AI gateway is not configured: set AI_GATEWAY_API_KEY (in the environment or .env) \
             or add \"api_key\" to chatgate.json"
        );
    }

    let prompt = read_prompt(&cli.prompt)?;
    if prompt.trim().is_empty() {
        bail!("prompt is empty");
    }

    run(&client, cli, prompt).await.map_err(|e| {
        let hint = match e.downcast_ref::<GatewayError>() {
            Some(err) if err.is_auth_error() => Some("check your API key"),
            Some(err) if err.is_network_error() => Some("check your connection and base URL"),
            _ => None,
        };
        match hint {
            Some(hint) => e.context(hint),
            None => e,
        }
    })
}
