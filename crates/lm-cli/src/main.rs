//! listmerge CLI
//!
//! CLI tool for merging filter lists and inspecting how lines are handled.

mod config;
mod fetch;
mod output;

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use env_logger::Env;

use lm_compiler::Aggregator;
use lm_core::{classify, to_adguard_blocking, to_adguard_dns_rewrite, to_browser_cosmetic, to_hosts};

use crate::config::Config;
use crate::fetch::HttpFetcher;
use crate::output::{write_stats, FileSink};

#[derive(Parser)]
#[command(name = "listmerge")]
#[command(about = "Merge, normalize and deduplicate ad/tracker block lists")]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch all configured sources and write the merged rule sets
    Build {
        /// JSON configuration file
        #[arg(short, long, default_value = "listmerge.json")]
        config: String,

        /// Output directory (overrides the config)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Report how each line of a local list is classified
    Classify {
        /// Filter list file
        #[arg(short, long)]
        input: String,
    },

    /// Convert a local list into one output format
    Convert {
        /// Filter list file
        #[arg(short, long)]
        input: String,

        /// Target format
        #[arg(short, long, value_enum)]
        format: Format,

        /// Answer used for dns-rewrite output
        #[arg(long, default_value = lm_core::DEFAULT_DNS_REWRITE_TARGET)]
        target: String,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Hosts,
    Adguard,
    DnsRewrite,
    Browser,
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    let result = match cli.command {
        Commands::Build { config, output } => cmd_build(&config, output.as_deref()),
        Commands::Classify { input } => cmd_classify(&input, cli.verbose),
        Commands::Convert {
            input,
            format,
            target,
            output,
        } => cmd_convert(&input, format, &target, output.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn cmd_build(config_path: &str, output: Option<&str>) -> Result<(), String> {
    let config = Config::load(Path::new(config_path)).map_err(|e| e.to_string())?;
    let output_dir = output.map(PathBuf::from).unwrap_or_else(|| config.output_dir.clone());

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| format!("Failed to start tokio runtime: {}", e))?;
    runtime.block_on(run_build(config, output_dir))
}

async fn run_build(config: Config, output_dir: PathBuf) -> Result<(), String> {
    let start = Instant::now();

    let fetcher = HttpFetcher::new(config.fetch.timeout(), config.fetch.retry_policy())
        .map_err(|e| format!("Failed to build HTTP client: {}", e))?;
    let personal_rules = config.read_personal_rules().await;
    let ctx = config.run_context(personal_rules);

    let result = Aggregator::new(Arc::new(fetcher)).run(&ctx).await;

    let sink = FileSink::new(&output_dir);
    let finalized = result
        .persist(&sink, &config.metadata, Utc::now())
        .await
        .map_err(|e| e.to_string())?;
    let stats_path = write_stats(&output_dir, &result.stats).await.map_err(|e| e.to_string())?;

    println!("Merged {} source(s) into '{}'", ctx.sources.len(), output_dir.display());
    for set in &finalized {
        println!("  {:<20} {} rules", set.kind.display_name(), set.lines.len());
    }
    println!("{}", result.stats.render_table());
    println!("Stats:     {}", stats_path.display());
    println!("Time:      {:.1}ms", start.elapsed().as_secs_f64() * 1000.0);

    Ok(())
}

fn cmd_classify(input: &str, verbose: bool) -> Result<(), String> {
    let content = fs::read_to_string(input)
        .map_err(|e| format!("Failed to read '{}': {}", input, e))?;

    let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
    for line in content.lines() {
        let category = classify(line);
        *counts.entry(category.as_str()).or_default() += 1;
        if verbose {
            println!("{:<10} {}", category.as_str(), line.trim());
        }
    }

    println!("Classified {} lines from '{}'", content.lines().count(), input);
    for (category, count) in &counts {
        println!("  {:<10} {}", category, count);
    }

    Ok(())
}

fn cmd_convert(input: &str, format: Format, target: &str, output: Option<&str>) -> Result<(), String> {
    let content = fs::read_to_string(input)
        .map_err(|e| format!("Failed to read '{}': {}", input, e))?;

    let converted: BTreeSet<String> = content
        .lines()
        .filter_map(|line| match format {
            Format::Hosts => to_hosts(line),
            Format::Adguard => to_adguard_blocking(line),
            Format::DnsRewrite => to_adguard_dns_rewrite(line, target),
            Format::Browser => to_browser_cosmetic(line),
        })
        .collect();

    let text: String = converted.iter().map(|rule| format!("{rule}\n")).collect();

    match output {
        Some(path) => {
            fs::write(path, &text).map_err(|e| format!("Failed to write '{}': {}", path, e))?;
            log::info!("Wrote {} rules to {}", converted.len(), path);
        }
        None => print!("{text}"),
    }

    Ok(())
}
