//! Command-line interface (spec §6): a thin wrapper over [`crate::engine::Engine`]
//! for manual/ops use — fetching a single URL, inspecting domain risk and
//! pattern health, and querying recorded traces.

use clap::{Parser, Subcommand};
use serde_json::json;

use crate::domain::{Request, Tier};
use crate::engine::Engine;
use crate::storage::InMemoryKeyValueStore;
use crate::trace::TraceFilter;

#[derive(Parser)]
#[command(name = "fetch-ops", about = "Tiered, learning web-fetching engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch a single URL and print the extraction result as JSON.
    Fetch(FetchArgs),

    /// Show the current risk assessment for a domain.
    Risk(RiskArgs),

    /// List learned patterns for a domain.
    Patterns(PatternsArgs),

    /// Query recorded decision traces.
    Traces(TracesArgs),
}

#[derive(Parser)]
pub struct FetchArgs {
    /// URL to fetch
    pub url: String,

    /// Plan tier (FREE, STARTER, TEAM, ENTERPRISE)
    #[arg(long, default_value = "FREE")]
    pub plan: String,

    /// Tenant identifier, for multi-tenant deployments
    #[arg(long, default_value = "cli")]
    pub tenant: String,

    /// Force a starting tier instead of the cost-ordered default
    #[arg(long)]
    pub tier: Option<String>,
}

#[derive(Parser)]
pub struct RiskArgs {
    pub domain: String,
}

#[derive(Parser)]
pub struct PatternsArgs {
    pub domain: String,

    /// Restrict to a single endpoint path
    #[arg(long)]
    pub endpoint: Option<String>,
}

#[derive(Parser)]
pub struct TracesArgs {
    #[arg(long)]
    pub domain: Option<String>,

    #[arg(long)]
    pub success: Option<bool>,
}

/// Runs one CLI invocation against a fresh in-memory engine. Each CLI run
/// starts with no learned state; use the library directly for a
/// long-running process that accumulates learning across requests.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let engine = Engine::in_memory(crate::config::Config::default());

    match cli.command {
        Commands::Fetch(args) => run_fetch(&engine, args).await,
        Commands::Risk(args) => run_risk(&engine, args).await,
        Commands::Patterns(args) => run_patterns(&engine, args).await,
        Commands::Traces(args) => run_traces(&engine, args).await,
    }
}

async fn run_fetch(engine: &Engine<InMemoryKeyValueStore>, args: FetchArgs) -> anyhow::Result<()> {
    let mut request = Request::new(args.url, args.tenant, args.plan)?;
    if let Some(tier) = args.tier {
        request = request.with_tier_hint(parse_tier(&tier)?);
    }

    match engine.fetch(&request).await {
        Ok(result) => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "title": result.title,
                    "tier_used": result.tier_used,
                    "fell_back": result.fell_back,
                    "confidence": result.confidence,
                    "text_length": result.text.len(),
                    "tables": result.tables.len(),
                    "links": result.links.len(),
                }))?
            );
            Ok(())
        }
        Err(failure) => {
            eprintln!("fetch failed: {}", failure.error);
            println!("{}", serde_json::to_string_pretty(&failure.trace)?);
            Err(anyhow::anyhow!(failure))
        }
    }
}

async fn run_risk(engine: &Engine<InMemoryKeyValueStore>, args: RiskArgs) -> anyhow::Result<()> {
    let risk = engine.get_domain_risk(&args.domain).await?;
    println!("{}", serde_json::to_string_pretty(&risk)?);
    Ok(())
}

async fn run_patterns(engine: &Engine<InMemoryKeyValueStore>, args: PatternsArgs) -> anyhow::Result<()> {
    let patterns = engine.get_pattern_health(&args.domain, args.endpoint.as_deref()).await?;
    println!("{}", serde_json::to_string_pretty(&patterns)?);
    Ok(())
}

async fn run_traces(engine: &Engine<InMemoryKeyValueStore>, args: TracesArgs) -> anyhow::Result<()> {
    let filter = TraceFilter {
        domain: args.domain,
        success: args.success,
        ..Default::default()
    };
    let matches = engine.query_traces(&filter).await;
    println!("{}", serde_json::to_string_pretty(&matches.iter().map(|m| &m.entry).collect::<Vec<_>>())?);
    Ok(())
}

fn parse_tier(raw: &str) -> anyhow::Result<Tier> {
    match raw.to_lowercase().as_str() {
        "intelligence" => Ok(Tier::Intelligence),
        "lightweight" => Ok(Tier::Lightweight),
        "playwright" => Ok(Tier::Playwright),
        other => Err(anyhow::anyhow!("unknown tier: {other}")),
    }
}
