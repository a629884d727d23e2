//! actview CLI - Browse feature activations from the terminal
//!
//! Usage:
//!   actview show <DICTIONARY> <FEATURE> [--tab <ANALYSIS>]
//!   actview custom <DICTIONARY> <FEATURE> <TEXT> [--json]
//!   actview interactive <DICTIONARY> <FEATURE>
//!
//! Example:
//!   actview show L9M 1024
//!   actview custom L9M 1024 "def foo():⏎    return 1"
//!   ACTVIEW_BACKEND_URL=http://gpu-box:24577 actview interactive L9M 1024

use actview::panel::{CustomInputPanel, SubmitOutcome};
use actview::render::{self, CardView, SampleBlock, DEFAULT_TAB};
use actview::source::{ActivationSource, HttpSource};
use actview::ViewerConfig;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "actview")]
#[command(about = "Browse sparse-autoencoder feature activations")]
#[command(version)]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Backend URL (overrides config and ACTVIEW_BACKEND_URL)
    #[arg(short, long)]
    backend_url: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show a feature card with its sample groups
    Show {
        dictionary: String,
        feature_index: u64,

        /// Analysis name of the tab to open
        #[arg(short, long, default_value = DEFAULT_TAB)]
        tab: String,
    },

    /// Run a feature over custom text
    Custom {
        dictionary: String,
        feature_index: u64,

        /// Input text; ⏎ ⇥ ↵ are sent as newline, tab and carriage return
        text: String,

        /// Print the validated sample as JSON
        #[arg(long)]
        json: bool,
    },

    /// Open a feature card and type custom inputs line by line
    Interactive {
        dictionary: String,
        feature_index: u64,
    },
}

fn load_config(cli: &Cli) -> Result<ViewerConfig> {
    let config = match &cli.config {
        Some(path) => ViewerConfig::load(path)
            .with_context(|| format!("Failed to load config file: {}", path.display()))?,
        None => ViewerConfig::default(),
    };

    Ok(config
        .with_env_overrides()
        .with_backend_url(cli.backend_url.clone()))
}

/// One line typed in interactive mode
#[derive(Debug, PartialEq)]
enum LineCommand<'a> {
    Quit,
    Card,
    Toggle,
    Tab(&'a str),
    Input(&'a str),
}

/// `:tab` only counts as a command when followed by whitespace or nothing,
/// so text like `:tablet` is submitted as input.
fn parse_line(line: &str) -> LineCommand<'_> {
    let cmd = line.trim_end();
    match cmd {
        ":quit" | ":q" => LineCommand::Quit,
        ":card" => LineCommand::Card,
        ":toggle" => LineCommand::Toggle,
        _ => match cmd.strip_prefix(":tab") {
            Some(rest) if rest.is_empty() || rest.starts_with(char::is_whitespace) => {
                LineCommand::Tab(rest.trim())
            }
            _ => LineCommand::Input(line),
        },
    }
}

fn print_help_line() {
    eprintln!(
        "{}",
        "Type text and press Enter to submit. Commands: :tab <name>, :toggle, :card, :quit"
            .dimmed()
    );
}

async fn show(source: &HttpSource, dictionary: &str, feature_index: u64, tab: &str) -> Result<()> {
    let feature = source
        .feature(dictionary, feature_index)
        .await
        .with_context(|| format!("Failed to fetch feature {dictionary}#{feature_index}"))?;

    let card = CardView::new(&feature);
    print!("{}", render::render_card(&card, tab, None));
    Ok(())
}

async fn custom(
    source: &HttpSource,
    dictionary: &str,
    feature_index: u64,
    text: &str,
    json: bool,
) -> Result<()> {
    let mut panel = CustomInputPanel::new(dictionary, feature_index);
    panel.set_input(text);

    if let SubmitOutcome::Rejected(reason) = panel.submit(source).await {
        eprintln!("{} {}", "Warning:".yellow(), reason);
        std::process::exit(1);
    }

    if let Some(error) = panel.error() {
        eprintln!("{} {}", "Error:".red().bold(), error);
        std::process::exit(1);
    }

    if let Some(sample) = panel.sample() {
        if json {
            println!("{}", serde_json::to_string_pretty(sample)?);
        } else {
            // No feature fetched here, so shade relative to the sample itself
            let scale = sample.max_activation();
            print!(
                "{}",
                render::render_sample(
                    SampleBlock {
                        name: "Custom Input",
                        sample,
                    },
                    scale,
                )
            );
            println!("{}", render::custom_input_summary(sample).bold());
        }
    }

    Ok(())
}

async fn interactive(source: &HttpSource, dictionary: &str, feature_index: u64) -> Result<()> {
    let feature = source
        .feature(dictionary, feature_index)
        .await
        .with_context(|| format!("Failed to fetch feature {dictionary}#{feature_index}"))?;
    let card = CardView::new(&feature);

    let mut panel = CustomInputPanel::new(dictionary, feature_index);
    let mut show_custom_input = false;
    let mut selected = DEFAULT_TAB.to_string();

    let redraw = |panel: &CustomInputPanel, show_custom_input: bool, selected: &str| {
        let shown = show_custom_input.then_some(panel);
        print!("{}", render::render_card(&card, selected, shown));
        let _ = std::io::stdout().flush();
    };

    redraw(&panel, show_custom_input, &selected);
    print_help_line();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_line(&line) {
            LineCommand::Quit => break,
            LineCommand::Card => {}
            LineCommand::Toggle => show_custom_input = !show_custom_input,
            LineCommand::Tab(name) => {
                if card.tab(name).is_some() {
                    selected = name.to_string();
                } else {
                    let known: Vec<_> = card.tabs.iter().map(|t| t.analysis_name).collect();
                    eprintln!(
                        "{} unknown tab `{}` (available: {})",
                        "Warning:".yellow(),
                        name,
                        known.join(", ")
                    );
                    continue;
                }
            }
            LineCommand::Input(text) => {
                show_custom_input = true;
                panel.set_input(text);
                if let SubmitOutcome::Rejected(reason) = panel.submit(source).await {
                    eprintln!("{} {}", "Warning:".yellow(), reason);
                    continue;
                }
            }
        }

        debug!(tab = %selected, show_custom_input, "Redrawing card");
        println!();
        redraw(&panel, show_custom_input, &selected);
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config(&cli)?;
    debug!(backend_url = %config.backend_url, timeout_secs = ?config.timeout_secs, "Loaded configuration");

    let source = HttpSource::from_config(&config).context("Failed to create HTTP client")?;

    let result = match &cli.command {
        Command::Show {
            dictionary,
            feature_index,
            tab,
        } => show(&source, dictionary, *feature_index, tab).await,
        Command::Custom {
            dictionary,
            feature_index,
            text,
            json,
        } => custom(&source, dictionary, *feature_index, text, *json).await,
        Command::Interactive {
            dictionary,
            feature_index,
        } => interactive(&source, dictionary, *feature_index).await,
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}
