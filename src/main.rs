use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use rbi_parser::pipeline;
use rbi_parser::resolver::{Resolver, Vocabulary};
use rbi_parser::utils::http::create_client;
use rbi_parser::Config;

#[derive(Parser)]
#[command(name = "rbi-parser", about = "Download, convert and merge the RBI IFSC/MICR sheets")]
struct Cli {
    /// Config file (TOML, JSON or YAML); defaults to ./rbi_parser.* if present
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Download new or changed spreadsheets
    Fetch,
    /// Convert downloaded spreadsheets to CSV
    Convert,
    /// Normalize the converted CSV files
    Clean,
    /// Combine the cleaned CSV files into the master file
    Merge,
    /// Run every stage in order
    All,
    /// List the links on the directory page and the bank each resolves to
    Links,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("rbi_parser=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Command::Fetch => {
            pipeline::run_fetch(&config).await.context("Fetch failed")?;
        }
        Command::Convert => {
            pipeline::run_convert(&config).context("Conversion failed")?;
        }
        Command::Clean => {
            pipeline::run_clean(&config).context("Cleaning failed")?;
        }
        Command::Merge => {
            pipeline::run_merge(&config).context("Merge failed")?;
        }
        Command::All => {
            pipeline::run_all(&config).await?;
        }
        Command::Links => {
            let resolver = Resolver::new(Vocabulary::load(&config.vocabulary_path)?);
            let client = create_client(&config)?;

            for link in pipeline::discover(&client, &config).await? {
                match resolver.resolve(&link.context) {
                    Ok(name) => println!("{}\t{}", name, link.locator),
                    Err(_) => println!("?\t{}", link.locator),
                }
            }
        }
    }

    info!("Done");
    Ok(())
}
