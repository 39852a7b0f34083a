//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use chimei_catalog::{Catalog, Pattern};
use chimei_core::{Pipeline, ProgressReporter};
use chimei_shared::{
    AppConfig, RunOverrides, StrategyKind, WorkExtraction, WorkText, init_config, load_config,
    load_config_from,
};
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// chimei: find the places in Japanese literature.
#[derive(Parser)]
#[command(
    name = "chimei",
    version,
    about = "Extract place names, with context, from Japanese literary texts.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.chimei/chimei.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Extract places from one or more works.
    Extract {
        /// UTF-8 text files; each file is one work, identified by its stem.
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Strategies to run (comma-separated). Defaults to the config file.
        #[arg(long, value_delimiter = ',')]
        strategies: Option<Vec<StrategyKind>>,

        /// Never call the completion service.
        #[arg(long)]
        no_ai: bool,

        /// Completion-service API key (overrides the configured env var).
        #[arg(long, env = "CHIMEI_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// Write output to a file instead of stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Emit one pretty-printed JSON array instead of JSON lines.
        #[arg(long)]
        pretty: bool,
    },

    /// List the compiled pattern catalog.
    Patterns,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr; stdout carries
/// the extraction output.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "chimei=info",
        1 => "chimei=debug",
        _ => "chimei=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config;
    match cli.command {
        Command::Extract {
            files,
            strategies,
            no_ai,
            api_key,
            out,
            pretty,
        } => {
            let config = resolve_config(config_path.as_deref())?;
            let overrides = build_overrides(&config, strategies, no_ai, api_key);
            cmd_extract(&config, &overrides, &files, out.as_deref(), pretty).await
        }
        Command::Patterns => cmd_patterns(&resolve_config(config_path.as_deref())?),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(&resolve_config(config_path.as_deref())?),
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    Ok(match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    })
}

/// Combine `--strategies`, `--no-ai`, and `--api-key` into run overrides.
fn build_overrides(
    config: &AppConfig,
    strategies: Option<Vec<StrategyKind>>,
    no_ai: bool,
    api_key: Option<String>,
) -> RunOverrides {
    let strategies = match (strategies, no_ai) {
        (strategies, true) => Some(
            strategies
                .unwrap_or_else(|| config.extraction.strategies.clone())
                .into_iter()
                .filter(|kind| *kind != StrategyKind::Ai)
                .collect(),
        ),
        (strategies, false) => strategies,
    };
    RunOverrides {
        strategies,
        api_key,
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_extract(
    config: &AppConfig,
    overrides: &RunOverrides,
    files: &[PathBuf],
    out: Option<&Path>,
    pretty: bool,
) -> Result<()> {
    let pipeline = Pipeline::from_config(config, overrides)?;

    let mut works = Vec::with_capacity(files.len());
    for path in files {
        let text = std::fs::read_to_string(path)
            .map_err(|e| eyre!("cannot read '{}': {e}", path.display()))?;
        works.push(WorkText::new(work_id_for(path), text));
    }

    info!(works = works.len(), strategies = ?pipeline.registry().names(), "extracting");

    let reporter = CliProgress::new();
    let results = pipeline.extract_batch(works, &reporter).await;
    reporter.finish();

    let mut extractions = Vec::with_capacity(results.len());
    let mut failures = 0usize;
    for result in results {
        match result {
            Ok(extraction) => extractions.push(extraction),
            Err(e) => {
                failures += 1;
                error!(error = %e, "work failed");
            }
        }
    }

    let rendered = render(&extractions, pretty)?;
    match out {
        Some(path) => std::fs::write(path, rendered)
            .map_err(|e| eyre!("cannot write '{}': {e}", path.display()))?,
        None => print!("{rendered}"),
    }

    let places: usize = extractions.iter().map(|e| e.places.len()).sum();
    info!(works = extractions.len(), places, failures, "extraction complete");

    if failures > 0 {
        return Err(eyre!("{failures} work(s) failed, see log for details"));
    }
    Ok(())
}

/// Work id for a file: its stem, or the whole path when it has none.
fn work_id_for(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// JSON lines, or one pretty array.
fn render(extractions: &[WorkExtraction], pretty: bool) -> Result<String> {
    if pretty {
        return Ok(format!("{}\n", serde_json::to_string_pretty(extractions)?));
    }
    let mut rendered = String::new();
    for extraction in extractions {
        rendered.push_str(&serde_json::to_string(extraction)?);
        rendered.push('\n');
    }
    Ok(rendered)
}

fn cmd_patterns(config: &AppConfig) -> Result<()> {
    let catalog = Catalog::with_config(&config.catalog)?;
    println!(
        "{:<20} {:<22} {:>8} {:>10}  {:<9} FLAGS",
        "NAME", "CATEGORY", "PRIORITY", "CONFIDENCE", "GROUP"
    );
    for pattern in catalog.patterns() {
        let group = format!("{:?}", pattern.group());
        println!(
            "{:<20} {:<22} {:>8} {:>10.2}  {:<9} {}",
            pattern.name(),
            pattern.category().as_str(),
            pattern.priority(),
            pattern.confidence().get(),
            group,
            pattern_flags(pattern),
        );
    }
    Ok(())
}

/// Comma-separated matching behaviours of a pattern, or `-`.
fn pattern_flags(pattern: &Pattern) -> String {
    let flags: Vec<&str> = [
        (pattern.is_guarded(), "guarded"),
        (pattern.is_screened(), "screened"),
        (pattern.category().is_compound(), "decomposed"),
    ]
    .into_iter()
    .filter_map(|(set, flag)| set.then_some(flag))
    .collect();
    if flags.is_empty() {
        "-".to_string()
    } else {
        flags.join(",")
    }
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner on stderr.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn work_started(&self, work_id: &str, sentences: usize) {
        self.spinner
            .set_message(format!("{work_id}: {sentences} sentences"));
    }

    fn sentence_resolved(&self, work_id: &str, done: usize, total: usize) {
        self.spinner
            .set_message(format!("{work_id}: resolving [{done}/{total}]"));
    }

    fn work_finished(&self, extraction: &WorkExtraction) {
        self.spinner.set_message(format!(
            "{}: {} places",
            extraction.work_id,
            extraction.places.len()
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_extract_flags() {
        let cli = Cli::try_parse_from([
            "chimei",
            "extract",
            "a.txt",
            "b.txt",
            "--strategies",
            "lexical,compound",
            "--pretty",
        ])
        .expect("parse");
        match cli.command {
            Command::Extract {
                files,
                strategies,
                pretty,
                no_ai,
                ..
            } => {
                assert_eq!(files.len(), 2);
                assert_eq!(
                    strategies,
                    Some(vec![StrategyKind::Lexical, StrategyKind::Compound])
                );
                assert!(pretty);
                assert!(!no_ai);
            }
            _ => panic!("expected extract"),
        }
    }

    #[test]
    fn unknown_strategy_is_rejected() {
        let parsed = Cli::try_parse_from(["chimei", "extract", "a.txt", "--strategies", "oracle"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn no_ai_removes_ai_from_configured_strategies() {
        let config = AppConfig::default();
        let overrides = build_overrides(&config, None, true, None);
        let strategies = overrides.strategies.expect("strategies");
        assert!(!strategies.contains(&StrategyKind::Ai));
        assert!(strategies.contains(&StrategyKind::Lexical));

        let overrides = build_overrides(&config, None, false, None);
        assert!(overrides.strategies.is_none());
    }

    #[test]
    fn work_id_is_file_stem() {
        assert_eq!(work_id_for(Path::new("texts/000879_sanshiro.txt")), "000879_sanshiro");
    }

    #[test]
    fn pattern_flags_describe_matching() {
        let catalog = Catalog::builtin().expect("builtin");
        let flags = |name: &str| {
            let pattern = catalog
                .patterns()
                .iter()
                .find(|p| p.name() == name)
                .expect("pattern exists");
            pattern_flags(pattern)
        };
        assert_eq!(flags("natural-place"), "guarded,screened");
        assert_eq!(flags("prefecture"), "guarded");
        assert_eq!(flags("famous-place"), "-");
        assert_eq!(flags("station-front"), "screened,decomposed");
        assert_eq!(flags("known-compound"), "decomposed");
    }

    #[test]
    fn json_lines_have_one_object_per_work() {
        let works = vec![WorkExtraction::empty("a"), WorkExtraction::empty("b")];
        let rendered = render(&works, false).expect("render");
        assert_eq!(rendered.lines().count(), 2);
        let pretty = render(&works, true).expect("render");
        let parsed: serde_json::Value = serde_json::from_str(&pretty).expect("json");
        assert_eq!(parsed.as_array().map(Vec::len), Some(2));
    }
}
