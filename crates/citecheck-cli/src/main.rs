use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use citecheck_core::{BibliographicProvider, Checker, Config, ProgressEvent, WebProvider};
use citecheck_ingest::IngestError;

mod output;

use output::ColorMode;

/// Citation checker - confirm that references in generated text actually exist
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check every citation after the "References:" marker of a text file
    Check(CheckArgs),
}

#[derive(clap::Args, Debug)]
struct CheckArgs {
    /// Path to the response text file (prompted for when omitted)
    file_path: Option<PathBuf>,

    /// Candidates scanned per citation before falling back
    #[arg(long)]
    scan_limit: Option<usize>,

    /// Citations verified concurrently within each category
    #[arg(long)]
    workers: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Bibliographic provider: google_scholar or openalex
    #[arg(long)]
    bibliographic: Option<BibliographicProvider>,

    /// Primary web search provider: google, bing or searxng
    #[arg(long)]
    primary_web: Option<WebProvider>,

    /// Secondary web search provider: google, bing or searxng
    #[arg(long)]
    secondary_web: Option<WebProvider>,

    /// SearxNG base URL (e.g., http://localhost:8080)
    #[arg(long)]
    searxng_url: Option<String>,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Emit both result lists as JSON instead of the text report
    #[arg(long)]
    json: bool,

    /// Path to output file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Dry run: parse and print citations without searching
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Check(args) => {
            if args.dry_run {
                dry_run_check(args)
            } else {
                check(args).await
            }
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Resolve configuration: CLI flags > env vars > config file > defaults.
fn resolve_config(args: &CheckArgs) -> anyhow::Result<Config> {
    let mut config = Config::default();
    citecheck_core::config_file::load_config().apply_to(&mut config)?;

    if let Some(n) = env_parse::<usize>("CITECHECK_SCAN_LIMIT")? {
        config.scan_limit = n;
    }
    if let Some(n) = env_parse::<usize>("CITECHECK_WORKERS")? {
        config.num_workers = n;
    }
    if let Some(secs) = env_parse::<u64>("CITECHECK_TIMEOUT")? {
        config.timeout_secs = secs;
    }
    if let Some(p) = env_parse::<BibliographicProvider>("CITECHECK_BIBLIOGRAPHIC")? {
        config.bibliographic = p;
    }
    if let Some(p) = env_parse::<WebProvider>("CITECHECK_PRIMARY_WEB")? {
        config.primary_web = p;
    }
    if let Some(p) = env_parse::<WebProvider>("CITECHECK_SECONDARY_WEB")? {
        config.secondary_web = p;
    }
    if let Ok(url) = std::env::var("SEARXNG_URL") {
        config.searxng_url = Some(url);
    }
    if let Ok(mailto) = std::env::var("OPENALEX_MAILTO") {
        config.openalex_mailto = Some(mailto);
    }

    if let Some(n) = args.scan_limit {
        config.scan_limit = n;
    }
    if let Some(n) = args.workers {
        config.num_workers = n;
    }
    if let Some(secs) = args.timeout {
        config.timeout_secs = secs;
    }
    if let Some(p) = args.bibliographic {
        config.bibliographic = p;
    }
    if let Some(p) = args.primary_web {
        config.primary_web = p;
    }
    if let Some(p) = args.secondary_web {
        config.secondary_web = p;
    }
    if let Some(ref url) = args.searxng_url {
        config.searxng_url = Some(url.clone());
    }

    if config.scan_limit == 0 {
        anyhow::bail!("scan limit must be at least 1");
    }
    tracing::debug!(?config, "resolved configuration");
    Ok(config)
}

fn env_parse<T>(key: &str) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("invalid {}={:?}: {}", key, raw, e)),
        Err(_) => Ok(None),
    }
}

/// The file to check, asking on stdin when no path was given.
fn input_path(arg: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    if let Some(path) = arg {
        return Ok(path);
    }
    eprint!("Please input the file's path: ");
    std::io::stderr().flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let line = line.trim();
    if line.is_empty() {
        anyhow::bail!("no input file given");
    }
    Ok(PathBuf::from(line))
}

fn open_writer(output: &Option<PathBuf>) -> anyhow::Result<Box<dyn Write>> {
    Ok(match output {
        Some(path) => Box::new(
            std::fs::File::create(path)
                .with_context(|| format!("cannot create {}", path.display()))?,
        ),
        None => Box::new(std::io::stdout()),
    })
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

async fn check(args: CheckArgs) -> anyhow::Result<()> {
    let config = resolve_config(&args)?;
    let file_path = input_path(args.file_path.clone())?;

    // Color only on an interactive text report
    let use_color = !args.no_color && !args.json && args.output.is_none();
    let color = ColorMode(use_color);
    let mut writer = open_writer(&args.output)?;

    // Progress goes to stderr so stdout carries only the report
    let progress_writer: Arc<Mutex<Box<dyn Write + Send>>> =
        Arc::new(Mutex::new(Box::new(std::io::stderr())));
    let progress_cb = {
        let pw = Arc::clone(&progress_writer);
        move |event: ProgressEvent| {
            if let Ok(mut w) = pw.lock() {
                let _ = output::print_progress(&mut *w, &event, color);
                let _ = w.flush();
            }
        }
    };

    let checker = Checker::from_config(config)?;
    let checker = if args.json {
        checker
    } else {
        checker.with_progress(progress_cb)
    };

    let cancel = CancellationToken::new();

    // Set up Ctrl+C handler
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_clone.cancel();
        }
    });

    let report = match citecheck_ingest::check_file(&file_path, &checker, &cancel).await {
        Ok(report) => report,
        Err(IngestError::Cancelled) => {
            eprintln!("Cancelled.");
            std::process::exit(130);
        }
        Err(e) => return Err(e).with_context(|| format!("checking {}", file_path.display())),
    };

    if args.json {
        serde_json::to_writer_pretty(&mut writer, &report)?;
        writeln!(writer)?;
        return Ok(());
    }

    writeln!(writer)?;
    output::print_conclusions(&mut writer, &report, color)?;
    output::print_summary(&mut writer, &report, color)?;
    Ok(())
}

fn dry_run_check(args: CheckArgs) -> anyhow::Result<()> {
    let file_path = input_path(args.file_path)?;
    let use_color = !args.no_color && !args.json && args.output.is_none();
    let mut writer = open_writer(&args.output)?;

    let parsed = citecheck_ingest::parse_file(&file_path)
        .with_context(|| format!("parsing {}", file_path.display()))?;

    if args.json {
        serde_json::to_writer_pretty(&mut writer, &parsed)?;
        writeln!(writer)?;
        return Ok(());
    }

    output::print_dry_run(
        &mut writer,
        &display_name(&file_path),
        &parsed,
        ColorMode(use_color),
    )?;
    Ok(())
}
