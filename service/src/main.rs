#![deny(
    clippy::expect_used,
    clippy::panic,
    clippy::print_stdout,
    clippy::todo,
    clippy::unimplemented,
    clippy::unwrap_used
)]

use anyhow::Context;
use camara_crawler::{
    camara::{Endpoints, HttpPageFetcher},
    config::Config,
    crawl::Crawler,
    lookup::{fetch_member_details, fetch_organization_details},
};
use camara_model::COLUMNS;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use figment::providers::Serialized;
use serde::Serialize;
use std::io::{self, BufWriter, Write};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "camara-crawler")]
#[command(about = "Crawl parties, deputies and speeches from the Câmara open-data API")]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "config.yaml", global = true)]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Crawl and write one JSON object per row to stdout
    Crawl(CrawlArgs),
    /// Print the row column names
    Columns,
    /// Look up one party by id
    Organization { id: i64 },
    /// Look up one deputy by id
    Member { id: i64 },
}

/// Overrides applied on top of config.yaml and CAMARA_ variables.
#[derive(Args)]
struct CrawlArgs {
    /// Party acronyms (overrides crawl.parties)
    #[arg(short, long = "party", value_delimiter = ',')]
    parties: Vec<String>,

    /// Legislature ids (overrides crawl.legislatures)
    #[arg(short, long = "legislature", value_delimiter = ',')]
    legislatures: Vec<u32>,

    #[arg(long)]
    start_date: Option<NaiveDate>,

    #[arg(long)]
    end_date: Option<NaiveDate>,

    /// Members whose speeches are fetched at the same time
    #[arg(long)]
    concurrency: Option<usize>,
}

impl CrawlArgs {
    fn apply(&self, figment: figment::Figment) -> figment::Figment {
        let mut figment = figment;
        if !self.parties.is_empty() {
            figment = figment.merge(Serialized::default("crawl.parties", &self.parties));
        }
        if !self.legislatures.is_empty() {
            figment = figment.merge(Serialized::default("crawl.legislatures", &self.legislatures));
        }
        if let Some(start) = self.start_date {
            figment = figment.merge(Serialized::default("crawl.start_date", start));
        }
        if let Some(end) = self.end_date {
            figment = figment.merge(Serialized::default("crawl.end_date", end));
        }
        if let Some(concurrency) = self.concurrency {
            figment = figment.merge(Serialized::default("crawl.concurrency", concurrency));
        }
        figment
    }
}

fn init_tracing(level: &str) -> anyhow::Result<()> {
    // RUST_LOG wins over logging.level when set.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("invalid logging.level '{level}'"))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
    Ok(())
}

fn write_json_line(out: &mut impl Write, value: &impl Serialize) -> anyhow::Result<()> {
    serde_json::to_writer(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

async fn crawl(config: &Config) -> anyhow::Result<()> {
    config.validate_for_crawl()?;

    let crawler = Crawler::from_config(config)?;
    let output = tokio::select! {
        output = crawler.crawl() => output?,
        _ = tokio::signal::ctrl_c() => anyhow::bail!("interrupted, nothing written"),
    };

    let mut out = BufWriter::new(io::stdout().lock());
    for row in output.rows() {
        write_json_line(&mut out, &row)?;
    }
    out.flush()?;

    tracing::info!(
        report = %serde_json::to_string(&output.report)?,
        "Crawl report"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut figment = Config::figment(&cli.config);
    if let Command::Crawl(args) = &cli.command {
        figment = args.apply(figment);
    }
    let config: Config = figment.extract().context("failed to load configuration")?;
    config.validate()?;

    init_tracing(&config.logging.level)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "camara-crawler starting up");

    match cli.command {
        Command::Crawl(_) => crawl(&config).await?,
        Command::Columns => {
            let mut out = io::stdout().lock();
            for column in COLUMNS {
                writeln!(out, "{column}")?;
            }
        }
        Command::Organization { id } => {
            let fetcher = HttpPageFetcher::new(&config.api, config.retry.clone())?;
            let endpoints = Endpoints::new(&config.api.base_url)?;
            let details = fetch_organization_details(&fetcher, &endpoints, id)
                .await?
                .with_context(|| format!("party {id} not found"))?;
            write_json_line(&mut io::stdout().lock(), &details)?;
        }
        Command::Member { id } => {
            let fetcher = HttpPageFetcher::new(&config.api, config.retry.clone())?;
            let endpoints = Endpoints::new(&config.api.base_url)?;
            let details = fetch_member_details(&fetcher, &endpoints, id)
                .await?
                .with_context(|| format!("deputy {id} not found"))?;
            write_json_line(&mut io::stdout().lock(), &details)?;
        }
    }

    Ok(())
}
