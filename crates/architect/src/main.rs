use std::path::{Path, PathBuf};

use architect::api::Client;
use architect::error::ArchitectError;
use architect::{inputs, outputs};
use clap::Parser;

#[derive(Parser)]
#[command(
    name = "architect",
    about = "Generate technical design documents using the Anthropic API",
    version
)]
struct Cli {
    /// Feature descriptions (literal text or path to a .md file)
    #[arg(short, long)]
    features: String,

    /// Technical context (literal text or path to a .md file)
    #[arg(short, long)]
    context: Option<String>,

    /// Existing markdown files to fold into the design
    #[arg(short, long, num_args = 1..)]
    existing: Vec<PathBuf>,

    /// Anthropic API key (overrides ANTHROPIC_API_KEY)
    #[arg(short = 'k', long)]
    api_key: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .init();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = rt.block_on(run(cli)) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let api_key = resolve_api_key(cli.api_key)?;

    let features = inputs::resolve_input(&cli.features)?;
    let context = match &cli.context {
        Some(c) => inputs::resolve_input(c)?,
        None => String::new(),
    };
    let existing_content = inputs::combine_existing(&cli.existing)?;

    let client = Client::new(api_key)?;

    println!("Generating system slug...");
    let slug = client.slug(&features).await?;
    println!("Generated slug: {slug}");

    println!("Generating technical design document (streaming)...");
    let response = client
        .technical_design(&features, &context, &existing_content, &mut |chunks| {
            if chunks % 100 == 0 {
                println!("  ...{chunks} chunks received");
            }
        })
        .await?;
    println!("Streaming complete");

    let written = outputs::save_outputs(Path::new("specs"), &response, &slug, &cli.existing)?;
    println!("Generated files:");
    for path in &written {
        println!("  - {}", path.display());
    }
    Ok(())
}

/// Flag value wins over the environment; neither present is an error.
fn resolve_api_key(cli_key: Option<String>) -> Result<String, ArchitectError> {
    if let Some(key) = cli_key {
        return Ok(key);
    }
    std::env::var("ANTHROPIC_API_KEY")
        .ok()
        .filter(|k| !k.is_empty())
        .ok_or(ArchitectError::MissingApiKey)
}
