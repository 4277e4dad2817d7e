use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use jsid_engine::analyzer::{analyze_page, validate_url};
use jsid_engine::codegen::generate_test;
use jsid_engine::config::{ConfigLoader, JsidConfig};
use jsid_engine::driver::Driver;
use jsid_engine::recorder::Recorder;
use jsid_functional::{
    CapturedCall, detect_usage, generate_instrumentation_script, generate_test_file,
    parse_dts_file,
};
use jsid_h::HeadlessDriver;
use std::collections::BTreeSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "jsid",
    version,
    about = "Detect JavaScript-driven interactions on web pages"
)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Config file (default: ./jsid.yaml, then ~/.jsid/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze a page for input validations (default)
    Analyze {
        /// URL to analyze (http, https, or file://)
        url: String,
    },
    /// Record interactions and generate a Playwright test
    Record {
        /// URL to record (http, https, or file://)
        url: String,
        /// Output path for the generated test
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Settle timeout in milliseconds
        #[arg(short, long)]
        timeout: Option<u64>,
        /// Run the browser without a window
        #[arg(long)]
        headless: bool,
    },
    /// Print a runtime instrumentation script for a library's calls
    Instrument {
        /// Library name as imported, e.g. lodash
        library: String,
        /// Source tree to scan
        source_dir: PathBuf,
        /// Only instrument functions declared in this .d.ts file
        #[arg(long)]
        types: Option<PathBuf>,
    },
    /// Generate a Jest test file from captured calls
    GenTests {
        /// Library name as imported
        library: String,
        /// JSON array of captured calls
        calls: PathBuf,
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

const SUBCOMMANDS: &[&str] = &["analyze", "record", "instrument", "gen-tests", "help"];

/// A bare URL in first position means `analyze <url>`.
fn normalize_args(mut argv: Vec<OsString>) -> Vec<OsString> {
    let implicit_analyze = argv.get(1).and_then(|arg| arg.to_str()).is_some_and(|arg| {
        !arg.starts_with('-') && !SUBCOMMANDS.contains(&arg)
    });
    if implicit_analyze {
        argv.insert(1, OsString::from("analyze"));
    }
    argv
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_from(normalize_args(std::env::args_os().collect()));

    // stdout carries the JSON result, so logs go to stderr
    let default_level = if args.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let config = match &args.config {
        Some(path) => ConfigLoader::load_from(path)
            .await
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ConfigLoader::load_default().await?,
    };

    match args.command {
        Command::Analyze { url } => run_analyze(config, &url).await,
        Command::Record {
            url,
            output,
            timeout,
            headless,
        } => {
            let mut config = config;
            if headless {
                config.browser.headless = true;
            }
            if let Some(timeout) = timeout {
                config.recorder.settle_timeout_ms = timeout;
            }
            if let Some(output) = output {
                config.recorder.output = output;
            }
            run_record(config, &url).await
        }
        Command::Instrument {
            library,
            source_dir,
            types,
        } => run_instrument(&library, &source_dir, types.as_deref()),
        Command::GenTests {
            library,
            calls,
            output,
        } => run_gen_tests(&library, &calls, output.as_deref()).await,
    }
}

async fn run_analyze(mut config: JsidConfig, url: &str) -> Result<()> {
    info!("Analyzing URL: {}", url);
    config.browser.headless = true;
    let mut driver = HeadlessDriver::from_config(&config.browser);

    let result = analyze_page(&mut driver, url).await;
    if let Err(e) = driver.close().await {
        warn!("Error closing browser: {}", e);
    }

    println!("{}", result.to_json()?);
    Ok(())
}

async fn run_record(config: JsidConfig, url: &str) -> Result<()> {
    let mut driver = HeadlessDriver::from_config(&config.browser);
    let result = record(&mut driver, &config, url).await;
    if let Err(e) = driver.close().await {
        warn!("Error closing browser: {}", e);
    }
    let (recorded, failure) = match result {
        Ok(recorded) => (recorded, None),
        Err(e) => (Vec::new(), Some(e)),
    };

    let test = generate_test(url, &recorded);
    let output = &config.recorder.output;
    tokio::fs::write(output, test)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;
    eprintln!(
        "Recorded {} actions, test written to {}",
        recorded.len(),
        output.display()
    );
    failure.map_or(Ok(()), Err)
}

async fn record(
    driver: &mut HeadlessDriver,
    config: &JsidConfig,
    url: &str,
) -> Result<Vec<jsid_engine::change::RecordedAction>> {
    validate_url(url)?;
    driver.launch().await?;
    let navigation = driver.navigate(url).await?;
    let page = driver.open_recording(config.recorder.observer()).await?;

    let mut recorder = Recorder::new(page, navigation.url, config.recorder.options());
    recorder.start().await?;
    eprintln!("Recording {}. Interact with the page, press Ctrl-C to stop.", url);

    let recorded = recorder
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await?;
    Ok(recorded)
}

fn run_instrument(library: &str, source_dir: &Path, types: Option<&Path>) -> Result<()> {
    let call_sites = detect_usage(source_dir, library)?;
    let mut functions: BTreeSet<String> = call_sites
        .into_iter()
        .map(|site| site.function_name)
        .collect();

    if let Some(types) = types {
        let declared: BTreeSet<String> = parse_dts_file(types)?
            .into_iter()
            .map(|signature| signature.name)
            .collect();
        functions.retain(|name| declared.contains(name));
    }

    if functions.is_empty() {
        warn!("No calls into {} found under {}", library, source_dir.display());
    }
    let functions: Vec<String> = functions.into_iter().collect();
    println!("{}", generate_instrumentation_script(library, &functions));
    Ok(())
}

async fn run_gen_tests(library: &str, calls: &Path, output: Option<&Path>) -> Result<()> {
    let content = tokio::fs::read_to_string(calls)
        .await
        .with_context(|| format!("Failed to read {}", calls.display()))?;
    let calls: Vec<CapturedCall> =
        serde_json::from_str(&content).context("Captured calls must be a JSON array")?;
    let file = generate_test_file(library, &calls);

    match output {
        Some(path) => tokio::fs::write(path, file)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => print!("{}", file),
    }
    Ok(())
}
