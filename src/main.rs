//! ki-controls - diagnostic CLI for the control resolution engine.
//!
//! Loads the session snapshots named by the configuration, builds the
//! strategy catalog from the built-in variants and reports how capabilities
//! resolve.

use anyhow::{bail, Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ki_page_controls::{
    capabilities,
    config::{CliArgs, ResolverSettings},
    BuiltinSource, CandidateSource, CapabilityId, ControlFactory, ControlMetadata,
    EnvironmentInfo, PageContext, RedirectionInfo, RedirectorRegistry, SessionSnapshot,
    StrategyResolver, VERSION,
};

/// ANSI color codes for terminal output
mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
}

/// Build the CLI command parser
fn build_cli() -> Command {
    Command::new("ki-controls")
        .version(VERSION)
        .about("Inspect how page-control capabilities resolve for a session")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Path to configuration file (TOML or JSON)")
                .global(true)
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("environment")
                .long("environment")
                .value_name("FILE")
                .help("Environment snapshot (TOML or JSON)")
                .global(true)
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("redirection")
                .long("redirection")
                .value_name("FILE")
                .help("Redirection snapshot (TOML or JSON)")
                .global(true)
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .value_name("MS")
                .help("Catalog readiness timeout in milliseconds")
                .global(true)
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("no-wait")
                .long("no-wait")
                .help("Fail instead of waiting for the catalog to load")
                .global(true)
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .global(true)
                .action(ArgAction::Count),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Suppress logging except errors")
                .global(true)
                .action(ArgAction::SetTrue)
                .conflicts_with("verbose"),
        )
        .subcommand(
            Command::new("resolve")
                .about("Show the redirection chain and variant chosen for a capability")
                .arg(
                    Arg::new("capability")
                        .value_name("CAPABILITY")
                        .help("Capability name, e.g. Field")
                        .required(true),
                )
                .arg(
                    Arg::new("name")
                        .short('n')
                        .long("name")
                        .value_name("NAME")
                        .help("Logical control name"),
                ),
        )
        .subcommand(Command::new("catalog").about("List catalogued capabilities and their variants"))
        .subcommand(Command::new("info").about("Show facts derived from the redirection snapshot"))
}

/// Parse CLI arguments into CliArgs struct
fn parse_cli_args(matches: &ArgMatches) -> CliArgs {
    CliArgs {
        config_file: matches.get_one::<PathBuf>("config").cloned(),
        environment_path: matches.get_one::<PathBuf>("environment").cloned(),
        redirection_path: matches.get_one::<PathBuf>("redirection").cloned(),
        timeout_ms: matches.get_one::<u64>("timeout").copied(),
        wait_for_ready: matches.get_flag("no-wait").then_some(false),
        page_url: None,
    }
}

/// Initialize the tracing/logging subsystem
fn init_tracing(verbosity: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbosity {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(filter)
        .init();
}

/// Looks up a built-in capability by name, ignoring case.
fn parse_capability(name: &str) -> Result<CapabilityId> {
    capabilities::ALL
        .iter()
        .copied()
        .find(|capability| capability.as_str().eq_ignore_ascii_case(name))
        .with_context(|| {
            let known: Vec<_> = capabilities::ALL.iter().map(|c| c.as_str()).collect();
            format!("Unknown capability '{}'. Known: {}", name, known.join(", "))
        })
}

/// Starts the catalog load and, if configured, waits for it.
async fn start_resolver(settings: &ResolverSettings) -> Result<Arc<StrategyResolver>> {
    let sources: Vec<Arc<dyn CandidateSource>> = vec![Arc::new(BuiltinSource)];
    let resolver = StrategyResolver::spawn_load(sources);

    if settings.wait_for_ready {
        tokio::time::timeout(settings.ready_timeout(), resolver.wait_ready())
            .await
            .with_context(|| {
                format!(
                    "Strategy catalog not ready after {}ms",
                    settings.ready_timeout_ms
                )
            })?;
    }

    Ok(resolver)
}

fn require_environment(settings: &ResolverSettings) -> Result<EnvironmentInfo> {
    match settings.load_environment()? {
        Some(env) => Ok(env),
        None => bail!("No environment snapshot configured (use --environment or KI_CONTROLS_ENVIRONMENT)"),
    }
}

async fn run_resolve(settings: &ResolverSettings, matches: &ArgMatches) -> Result<()> {
    let capability = parse_capability(
        matches
            .get_one::<String>("capability")
            .map(String::as_str)
            .unwrap_or_default(),
    )?;
    let name = matches.get_one::<String>("name").map(String::as_str);

    let environment = require_environment(settings)?;
    let redirection = settings.load_redirection()?;
    let resolver = start_resolver(settings).await?;

    let redirection_snapshot = SessionSnapshot::new("redirection info");
    if let Some(redirection) = redirection {
        redirection_snapshot.set(redirection)?;
    }

    let mut factory = ControlFactory::new(resolver)
        .with_redirectors(RedirectorRegistry::builtin())
        .with_environment(Arc::new(SessionSnapshot::with_value(
            "environment info",
            environment.clone(),
        )))
        .with_redirection(Arc::new(redirection_snapshot));
    if let Some(url) = &settings.page_url {
        factory = factory.with_page(Arc::new(PageContext::new(url.as_str(), "Page")));
    }

    let plan = factory.plan(capability, name, None)?;
    let catalog = factory.resolver().catalog()?;
    let effective = catalog.effective_version(plan.chain.target(), &environment);

    println!(
        "{bold}{blue}Resolution:{reset}",
        bold = colors::BOLD,
        blue = colors::BLUE,
        reset = colors::RESET
    );
    println!(
        "  {dim}Requested:{reset}      {}",
        capability,
        dim = colors::DIM,
        reset = colors::RESET
    );
    println!(
        "  {dim}Chain:{reset}          {}",
        plan.chain,
        dim = colors::DIM,
        reset = colors::RESET
    );
    println!(
        "  {dim}Version:{reset}        {}",
        effective,
        dim = colors::DIM,
        reset = colors::RESET
    );
    println!(
        "  {dim}Variant:{reset}        {green}{}{reset} (from {})",
        plan.entry.variant(),
        plan.entry.min_version,
        dim = colors::DIM,
        green = colors::GREEN,
        reset = colors::RESET
    );

    Ok(())
}

async fn run_catalog(settings: &ResolverSettings) -> Result<()> {
    let environment = settings.load_environment()?;
    let resolver = start_resolver(settings).await?;
    let catalog = resolver.catalog()?;

    for capability in catalog.capabilities() {
        let selected = environment
            .as_ref()
            .and_then(|env| catalog.select(capability, env).ok())
            .map(|entry| entry.variant());

        println!(
            "{bold}{}{reset}",
            capability,
            bold = colors::BOLD,
            reset = colors::RESET
        );
        for entry in catalog.entries(capability) {
            let marker = if selected == Some(entry.variant()) {
                format!("{green}*{reset}", green = colors::GREEN, reset = colors::RESET)
            } else {
                " ".to_string()
            };
            println!(
                "  {} {dim}{:>16}{reset}  {}",
                marker,
                entry.min_version,
                entry.variant(),
                dim = colors::DIM,
                reset = colors::RESET
            );
        }
    }

    Ok(())
}

fn run_info(settings: &ResolverSettings) -> Result<()> {
    let Some(info) = settings.load_redirection()? else {
        bail!("No redirection snapshot configured (use --redirection or KI_CONTROLS_REDIRECTION)");
    };
    print_redirection_summary(&info);
    Ok(())
}

fn yes_no(value: bool) -> String {
    if value {
        format!("{green}yes{reset}", green = colors::GREEN, reset = colors::RESET)
    } else {
        format!("{yellow}no{reset}", yellow = colors::YELLOW, reset = colors::RESET)
    }
}

/// Print derived redirection facts
fn print_redirection_summary(info: &RedirectionInfo) {
    println!(
        "{bold}{blue}Redirection:{reset}",
        bold = colors::BOLD,
        blue = colors::BLUE,
        reset = colors::RESET
    );
    println!(
        "  {dim}Version:{reset}        {}",
        info.version,
        dim = colors::DIM,
        reset = colors::RESET
    );
    println!(
        "  {dim}New look:{reset}       {}",
        yes_no(info.is_new_look_enabled()),
        dim = colors::DIM,
        reset = colors::RESET
    );
    println!(
        "  {dim}Channel:{reset}        {}",
        info.active_release_channel(),
        dim = colors::DIM,
        reset = colors::RESET
    );
    println!(
        "  {dim}Search:{reset}         {}",
        yes_no(info.org.search_enabled),
        dim = colors::DIM,
        reset = colors::RESET
    );
    println!(
        "  {dim}Relevance:{reset}      {}",
        yes_no(info.org.relevance_search_enabled),
        dim = colors::DIM,
        reset = colors::RESET
    );

    let field = RedirectorRegistry::builtin()
        .resolve_target(capabilities::FIELD, Some(info), &ControlMetadata::named("name"))
        .map(|chain| chain.to_string())
        .unwrap_or_else(|e| e.to_string());
    println!(
        "  {dim}Field:{reset}          {}",
        field,
        dim = colors::DIM,
        reset = colors::RESET
    );
}

/// Main application entry point
#[tokio::main]
async fn main() -> Result<()> {
    let matches = build_cli().get_matches();

    let verbosity = matches.get_count("verbose");
    let quiet = matches.get_flag("quiet");
    init_tracing(verbosity, quiet);

    let settings = parse_cli_args(&matches)
        .load_settings()
        .context("Failed to load configuration")?;
    info!(wait_for_ready = settings.wait_for_ready, "Configuration loaded");

    match matches.subcommand() {
        Some(("resolve", sub)) => run_resolve(&settings, sub).await,
        Some(("catalog", _)) => run_catalog(&settings).await,
        Some(("info", _)) => run_info(&settings),
        _ => unreachable!("subcommand is required"),
    }
}
