//! Paper Surfer - Entry Point
//!
//! Runs a single collection, an interactive collection, or a weekly schedule.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use paper_surfer::{
    Collector, Config, OutputWriter, PubMedClient, RunContext, Settings,
    formatters::format_summary_markdown, models::OutputFormat, schedule::Schedule,
    schedule::run_scheduled,
};

const PREVIEW_COUNT: usize = 5;

#[derive(Parser, Debug)]
#[command(name = "paper-surfer")]
#[command(about = "Collect, score and file PubMed papers by keyword relevance")]
#[command(version)]
struct Cli {
    /// Settings file (JSON). Built-in defaults are used when omitted
    #[arg(long, short, global = true, env = "PAPER_SURFER_CONFIG")]
    config: Option<PathBuf>,

    /// Output root directory (overrides the settings file)
    #[arg(long, short, global = true)]
    output: Option<PathBuf>,

    /// Document format (overrides the settings file)
    #[arg(long, global = true)]
    format: Option<OutputFormat>,

    /// NCBI API key (optional, raises the rate limit to 10 req/s)
    #[arg(long, global = true, env = "PUBMED_API_KEY")]
    api_key: Option<String>,

    /// Contact email sent with every E-utilities request
    #[arg(long, global = true, env = "PUBMED_CONTACT_EMAIL")]
    email: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Run one collection and exit (default)
    Once {
        /// Search keyword; repeat for several. Defaults to the settings keywords
        #[arg(long = "keyword", short = 'k')]
        keywords: Vec<String>,

        /// Candidate ids requested per keyword
        #[arg(long, short = 'n')]
        max_results: Option<u32>,
    },
    /// Prompt for keywords, preview the best matches, then save on confirmation
    Interactive,
    /// Run on the weekly schedule from the settings file until Ctrl-C
    Schedule,
    /// Print the effective settings and exit
    ShowConfig,
}

fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber.with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)).init();
    } else {
        subscriber
            .with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }
}

fn load_settings(cli: &Cli) -> anyhow::Result<Settings> {
    let mut settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if let Some(output) = &cli.output {
        settings.output_root.clone_from(output);
    }
    if let Some(format) = cli.format {
        settings.format = format;
    }
    settings.validate()?;
    Ok(settings)
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = Config::from_env()?;
    if cli.api_key.is_some() || cli.email.is_some() {
        let base_url = config.base_url.clone();
        let tool_name = config.tool_name.clone();
        config = Config::new(
            cli.api_key.clone().or(config.api_key),
            cli.email.clone().or(config.email),
        );
        config.base_url = base_url;
        config.tool_name = tool_name;
    }
    if config.email.is_none() {
        tracing::warn!("No contact email configured; NCBI asks E-utilities callers to provide one");
    }
    Ok(config)
}

fn build_collector(config: Config, settings: Settings) -> anyhow::Result<Collector> {
    let client = PubMedClient::new(config)?;
    let writer = OutputWriter::new(&settings.output_root, settings.format);
    Ok(Collector::new(Arc::new(client), Arc::new(writer), settings))
}

async fn prompt(
    lines: &mut tokio::io::Lines<BufReader<tokio::io::Stdin>>,
    question: &str,
) -> anyhow::Result<String> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(question.as_bytes()).await?;
    stdout.flush().await?;
    Ok(lines.next_line().await?.unwrap_or_default().trim().to_string())
}

async fn run_interactive(collector: &Collector) -> anyhow::Result<()> {
    let settings = collector.settings();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let answer = prompt(
        &mut lines,
        &format!("Keywords, comma separated [{}]: ", settings.keywords.join(", ")),
    )
    .await?;
    let keywords: Vec<String> = if answer.is_empty() {
        settings.keywords.clone()
    } else {
        answer.split(',').map(|k| k.trim().to_string()).filter(|k| !k.is_empty()).collect()
    };

    let answer = prompt(&mut lines, &format!("Max results per keyword [{}]: ", settings.max_results))
        .await?;
    let max_results = if answer.is_empty() {
        settings.max_results
    } else {
        answer.parse().with_context(|| format!("'{answer}' is not a number"))?
    };

    let collection = collector.collect(&keywords, max_results, RunContext::now()).await?;
    if collection.records.is_empty() {
        println!("No matching papers found.");
        return Ok(());
    }

    println!("\nTop {} of {} papers:", collection.top(PREVIEW_COUNT).len(), collection.records.len());
    for (rank, scored) in collection.top(PREVIEW_COUNT).iter().enumerate() {
        println!(
            "{:>2}. [{:.2} {}] {} ({})",
            rank + 1,
            scored.score,
            scored.category,
            scored.record.title_or_default(),
            scored.record.journal_or_empty(),
        );
    }

    let answer = prompt(&mut lines, "\nSave these papers? [y/N]: ").await?;
    if !matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes") {
        println!("Nothing saved.");
        return Ok(());
    }

    let summary = collector.persist(collection);
    println!("\n{}", format_summary_markdown(&summary));
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    init_tracing(&cli.log_level, cli.json_logs);

    let settings = load_settings(&cli)?;
    let command = cli.command.clone().unwrap_or(Command::Once { keywords: Vec::new(), max_results: None });

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        command = ?command,
        output = %settings.output_root.display(),
        "Starting Paper Surfer"
    );

    match command {
        Command::ShowConfig => {
            let config = load_config(&cli)?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
            println!("{config:#?}");
        }
        Command::Once { keywords, max_results } => {
            let keywords = if keywords.is_empty() { settings.keywords.clone() } else { keywords };
            let max_results = max_results.unwrap_or(settings.max_results);
            let collector = build_collector(load_config(&cli)?, settings)?;

            let summary = collector.run(&keywords, max_results, RunContext::now()).await?;
            println!("{}", format_summary_markdown(&summary));
        }
        Command::Interactive => {
            let collector = build_collector(load_config(&cli)?, settings)?;
            run_interactive(&collector).await?;
        }
        Command::Schedule => {
            if !settings.schedule.enabled {
                anyhow::bail!("scheduling is disabled in the settings file (schedule.enabled = false)");
            }
            let schedule = Schedule::parse(&settings.schedule)?;
            let keywords = settings.keywords.clone();
            let max_results = settings.max_results;
            let collector = build_collector(load_config(&cli)?, settings)?;

            run_scheduled(&collector, &schedule, &keywords, max_results).await?;
        }
    }

    Ok(())
}
