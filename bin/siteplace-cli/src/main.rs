//! Siteplace CLI - Replica placement from the command line
//!
//! Loads a catalog snapshot from JSON and runs placement decisions
//! against it.

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use serde::Serialize;
use siteplace_common::{SelectorConfig, SiteId};
use siteplace_placement::{
    CandidateSnapshot, MemoryCatalog, ResolveOptions, SelectionRequest, SelectorOptions,
    SiteCatalog, SiteSelector, WeightingMode, resolve_expression_with_config,
};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "siteplace-cli")]
#[command(about = "Siteplace replica placement CLI")]
#[command(version)]
struct Args {
    /// Catalog snapshot (JSON)
    #[arg(short, long, env = "SITEPLACE_CATALOG")]
    catalog: PathBuf,

    /// Selector configuration (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(ClapArgs, Debug)]
struct Target {
    /// Account the placement is charged to
    #[arg(short, long)]
    account: String,

    /// Site expression selecting the candidates
    #[arg(short, long)]
    expression: String,

    /// Weighting token (omit for uniform, the cost token for cost mode)
    #[arg(short, long)]
    weight: Option<String>,

    /// Copies per selection
    #[arg(short = 'n', long)]
    copies: Option<usize>,

    /// Skip quota and space enforcement
    #[arg(long)]
    ignore_account_limit: bool,

    /// RNG seed
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(ClapArgs, Debug)]
struct Preferences {
    /// Preferred site, repeat in order of preference
    #[arg(long = "prefer")]
    preferred: Vec<String>,

    /// Site to exclude
    #[arg(long = "block")]
    blocklist: Vec<String>,

    /// Take the first eligible preferred site instead of drawing
    #[arg(long)]
    prioritize_order: bool,

    /// Bytes already stored on a site as NAME=SIZE, repeatable
    #[arg(long = "present", value_parser = parse_present)]
    already_present: Vec<(String, u64)>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Place one piece of data
    Select {
        #[command(flatten)]
        target: Target,
        #[command(flatten)]
        preferences: Preferences,
        /// Size (e.g. "10G", "500M", "1024")
        #[arg(short, long, default_value = "0")]
        size: String,
    },
    /// Place a dataset, one selection per file
    Batch {
        #[command(flatten)]
        target: Target,
        #[command(flatten)]
        preferences: Preferences,
        /// Comma separated file sizes
        #[arg(long, value_delimiter = ',', required = true)]
        sizes: Vec<String>,
    },
    /// Show the quota-filtered candidates
    Candidates {
        #[command(flatten)]
        target: Target,
    },
}

#[derive(Serialize)]
struct BatchEntry {
    size: u64,
    sites: Vec<String>,
}

#[derive(Serialize)]
struct CandidateRow {
    id: String,
    #[serde(flatten)]
    snapshot: CandidateSnapshot,
}

/// Parse a human-readable size string (e.g. "10G", "1T", "500M") into bytes.
fn parse_size(s: &str) -> Result<u64> {
    let s = s.trim();
    let (num, multiplier) = if let Some(n) = s.strip_suffix('T') {
        (n, 1024 * 1024 * 1024 * 1024)
    } else if let Some(n) = s.strip_suffix('G') {
        (n, 1024 * 1024 * 1024)
    } else if let Some(n) = s.strip_suffix('M') {
        (n, 1024 * 1024)
    } else if let Some(n) = s.strip_suffix('K') {
        (n, 1024)
    } else {
        (s, 1)
    };
    let value: u64 = num
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid size: '{s}'"))?;
    value
        .checked_mul(multiplier)
        .ok_or_else(|| anyhow::anyhow!("Size out of range: '{s}'"))
}

/// Parse a `NAME=SIZE` pair naming bytes already stored on a site.
fn parse_present(s: &str) -> Result<(String, u64)> {
    let (name, size) = s
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("Expected NAME=SIZE, got '{s}'"))?;
    let name = name.trim();
    if name.is_empty() {
        anyhow::bail!("Missing site name in '{s}'");
    }
    Ok((name.to_string(), parse_size(size)?))
}

fn load_config(path: Option<&PathBuf>) -> Result<SelectorConfig> {
    let Some(path) = path else {
        return Ok(SelectorConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    Ok(SelectorConfig::from_json(&text)?)
}

fn build_selector(
    catalog: &MemoryCatalog,
    target: &Target,
    config: &SelectorConfig,
) -> Result<(SiteSelector, Vec<(String, SiteId)>)> {
    let raw = catalog.resolve_expression(&target.expression)?;
    let mut options = SelectorOptions::new(
        target.account.as_str(),
        target.copies.unwrap_or(config.default_copies),
    )
    .with_weighting(WeightingMode::from_token(
        target.weight.as_deref(),
        &config.cost_token,
    ));
    if target.ignore_account_limit {
        options = options.ignore_account_limit();
    }
    if let Some(seed) = target.seed {
        options = options.with_seed(seed);
    }
    let selector = SiteSelector::with_config(catalog, &raw, options, config)?;
    let names = raw.into_iter().map(|c| (c.name, c.id)).collect();
    Ok((selector, names))
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let result = run(args);
    if let Err(e) = &result
        && let Some(placement) = e.downcast_ref::<siteplace_common::Error>()
    {
        error!(
            kind = placement.kind(),
            retryable = placement.is_capacity_error(),
            "placement failed"
        );
    }
    result
}

fn run(args: Args) -> Result<()> {
    let config = load_config(args.config.as_ref())?;
    let catalog = MemoryCatalog::load(&args.catalog)
        .with_context(|| format!("Failed to load catalog {}", args.catalog.display()))?;
    info!("catalog loaded from {}", args.catalog.display());

    match args.command {
        Commands::Select {
            target,
            preferences,
            size,
        } => {
            let options = ResolveOptions {
                account: target.account.as_str().into(),
                weight: target.weight,
                copies: target.copies.unwrap_or(config.default_copies),
                size: parse_size(&size)?,
                preferred: preferences.preferred,
                blocklist: preferences.blocklist,
                already_present: preferences.already_present,
                prioritize_order: preferences.prioritize_order,
                ignore_account_limit: target.ignore_account_limit,
                seed: target.seed,
            };
            let resolution =
                resolve_expression_with_config(&catalog, &target.expression, options, &config)?;
            println!("{}", serde_json::to_string_pretty(&resolution)?);
        }
        Commands::Batch {
            target,
            preferences,
            sizes,
        } => {
            let (mut selector, names) = build_selector(&catalog, &target, &config)?;
            let lookup = |name: &String| {
                names
                    .iter()
                    .find(|(n, _)| n == name)
                    .map(|(_, id)| *id)
            };
            let preferred: Vec<_> = preferences.preferred.iter().filter_map(lookup).collect();
            let blocked: Vec<_> = preferences.blocklist.iter().filter_map(lookup).collect();
            let present: Vec<_> = preferences
                .already_present
                .iter()
                .filter_map(|(name, bytes)| lookup(name).map(|id| (id, *bytes)))
                .collect();

            let mut entries = Vec::with_capacity(sizes.len());
            for size in &sizes {
                let size = parse_size(size)?;
                let mut request = SelectionRequest::new(size)
                    .prefer(preferred.iter().copied())
                    .block(blocked.iter().copied());
                for (id, bytes) in &present {
                    request = request.already_present(*id, *bytes);
                }
                if preferences.prioritize_order {
                    request = request.prioritize_order();
                }
                let picks = selector.select(&request)?;
                entries.push(BatchEntry {
                    size,
                    sites: picks
                        .iter()
                        .filter_map(|p| selector.site_name(p.site_id).map(str::to_string))
                        .collect(),
                });
            }
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        Commands::Candidates { target } => {
            let (selector, _) = build_selector(&catalog, &target, &config)?;
            let rows: Vec<CandidateRow> = selector
                .candidates()
                .into_iter()
                .map(|(id, snapshot)| CandidateRow {
                    id: id.to_string(),
                    snapshot,
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
    }

    Ok(())
}
