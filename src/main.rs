use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

use report::FoldOptions;
use source::{JsonReportSource, RecordSource, SourceRegistry};
use types::Report;

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

mod cache;
mod config;
mod debug_log;
mod merge;
mod report;
mod source;
mod summary;
mod types;
mod utils;
mod watcher;

#[derive(Parser)]
#[command(name = "chatfold")]
#[command(version)]
#[command(disable_help_subcommand = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Use comma-separated number formatting
    #[arg(long, global = true)]
    number_comma: bool,

    /// Use human-readable number formatting (k, m, b, t)
    #[arg(short = 'H', long, global = true)]
    number_human: bool,

    /// Locale for number formatting (en, de, fr, es, it, ja, ko, zh)
    #[arg(long, global = true)]
    locale: Option<String>,

    /// Number of decimal places for human-readable formatting
    #[arg(long, global = true)]
    decimal_places: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge per-conversation records that belong to the same person
    Merge(MergeArgs),
    /// Print a merged report as a table
    Summary(SummaryArgs),
    /// Keep an output report merged while the input file changes
    Watch(WatchArgs),
    /// Manage configuration
    Config(ConfigArgs),
}

#[derive(Args)]
struct MergeArgs {
    /// Report written by the extractor
    input: PathBuf,

    /// Write the merged report here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[command(flatten)]
    style: OutputStyleArgs,

    /// Keep only the N busiest chats (0 keeps all)
    #[arg(long)]
    top: Option<usize>,

    /// Rebuild the summary without merging records
    #[arg(long, default_value_t = false)]
    no_merge: bool,
}

#[derive(Args)]
struct SummaryArgs {
    /// Report written by the extractor
    input: PathBuf,

    /// Keep only the N busiest chats (0 keeps all)
    #[arg(long)]
    top: Option<usize>,
}

#[derive(Args)]
struct WatchArgs {
    /// Report written by the extractor
    input: PathBuf,

    /// Where to keep the merged report
    #[arg(short, long)]
    output: PathBuf,

    #[command(flatten)]
    style: OutputStyleArgs,

    /// Keep only the N busiest chats (0 keeps all)
    #[arg(long)]
    top: Option<usize>,
}

/// JSON layout flags; without either the `[output] pretty` setting applies.
#[derive(Args, Default)]
struct OutputStyleArgs {
    /// Pretty-print JSON
    #[arg(long, default_value_t = false, conflicts_with = "compact")]
    pretty: bool,

    /// Write JSON on a single line
    #[arg(long, default_value_t = false)]
    compact: bool,
}

impl OutputStyleArgs {
    fn resolve(&self, config: &config::Config) -> bool {
        if self.pretty {
            true
        } else if self.compact {
            false
        } else {
            config.output.pretty
        }
    }
}

#[derive(Args)]
struct ConfigArgs {
    #[command(subcommand)]
    subcommand: ConfigSubcommands,
}

#[derive(Subcommand)]
enum ConfigSubcommands {
    /// Create default configuration file
    Init {
        #[arg(long, default_value_t = false)]
        overwrite: bool,
    },
    /// Show current configuration
    Show,
    /// Set configuration value
    Set {
        /// Configuration key (merge-enabled, top, pretty, number-comma, number-human, locale, decimal-places)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() {
    debug_log::init();

    let cli = Cli::parse();

    // Load config file to get defaults
    let config = config::Config::load().unwrap_or(None).unwrap_or_default();

    let format_options = number_format_options(&config, &cli);

    match cli.command {
        Commands::Merge(args) => {
            if let Err(e) = run_merge(args, &config).await {
                eprintln!("Error merging report: {e:#}");
                std::process::exit(1);
            }
        }
        Commands::Summary(args) => {
            if let Err(e) = run_summary(args, &config, &format_options).await {
                eprintln!("Error summarizing report: {e:#}");
                std::process::exit(1);
            }
        }
        Commands::Watch(args) => {
            if let Err(e) = run_watch(args, &config).await {
                eprintln!("Error watching report: {e:#}");
                std::process::exit(1);
            }
        }
        Commands::Config(config_args) => {
            handle_config_subcommand(config_args).await;
        }
    }
}

/// Start from the configured formatting and apply CLI overrides.
fn number_format_options(config: &config::Config, cli: &Cli) -> utils::NumberFormatOptions {
    let mut options = config.number_format_options();
    options.use_comma |= cli.number_comma;
    options.use_human |= cli.number_human;
    if let Some(locale) = &cli.locale {
        options.locale = locale.clone();
    }
    if let Some(decimal_places) = cli.decimal_places {
        options.decimal_places = decimal_places;
    }
    options
}

pub fn create_source_registry(input: &Path) -> SourceRegistry {
    let mut registry = SourceRegistry::new();
    registry.register(JsonReportSource::new(input));
    registry
}

async fn load_input(input: &Path) -> Result<Report> {
    let registry = create_source_registry(input);
    if registry.available_sources().is_empty() {
        anyhow::bail!("Report file not found: {}", input.display());
    }
    registry.load_combined().await
}

fn fold_options(config: &config::Config, top: Option<usize>, no_merge: bool) -> FoldOptions {
    let mut options = config.fold_options();
    if let Some(top) = top {
        options.top = top;
    }
    if no_merge {
        options.merge = false;
    }
    options
}

async fn run_merge(args: MergeArgs, config: &config::Config) -> Result<()> {
    let input = load_input(&args.input).await?;
    let options = fold_options(config, args.top, args.no_merge);
    let pretty = args.style.resolve(config);

    let folded = tokio::task::spawn_blocking(move || report::fold_report(input, &options))
        .await
        .context("Merge pass panicked")?;

    match args.output {
        Some(path) => {
            report::write_report(&folded, &path, pretty)?;
            eprintln!(
                "Wrote {} chats to {}",
                folded.chats.len(),
                path.display()
            );
        }
        None => println!("{}", report::to_json(&folded, pretty)?),
    }

    Ok(())
}

async fn run_summary(
    args: SummaryArgs,
    config: &config::Config,
    format_options: &utils::NumberFormatOptions,
) -> Result<()> {
    let input = load_input(&args.input).await?;
    let options = fold_options(config, args.top, false);

    let folded = tokio::task::spawn_blocking(move || report::fold_report(input, &options))
        .await
        .context("Merge pass panicked")?;

    print!("{}", summary::render_summary(&folded, format_options));
    Ok(())
}

async fn run_watch(args: WatchArgs, config: &config::Config) -> Result<()> {
    let options = fold_options(config, args.top, false);
    let pretty = args.style.resolve(config);

    let mut file_watcher =
        watcher::ReportWatcher::new(&args.input).context("Error setting up file watcher")?;
    let mut session = watcher::WatchSession::new(args.input.clone(), options);

    let mut updates = session.dispatcher().get_update_receiver();
    let output = args.output.clone();
    tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let outcome = updates.borrow_and_update().clone();
            let Some(outcome) = outcome else {
                continue;
            };
            match report::write_report(&outcome.report, &output, pretty) {
                Ok(()) => eprintln!(
                    "Wrote {} chats to {} (pass {})",
                    outcome.report.chats.len(),
                    output.display(),
                    outcome.generation
                ),
                Err(e) => eprintln!("Error writing merged report: {e:#}"),
            }
        }
    });

    if let Err(e) = session.refresh().await {
        eprintln!("Initial load skipped: {e:#}");
    }
    if session.dispatcher().latest_generation() == 0 {
        eprintln!("Waiting for a readable report before the first merge");
    }
    eprintln!(
        "Watching {} (Ctrl+C to stop)",
        JsonReportSource::new(&args.input).display_name()
    );

    loop {
        tokio::select! {
            event = file_watcher.recv() => {
                let Some(event) = event else {
                    break;
                };
                session.handle_watcher_event(event).await?;
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    Ok(())
}

async fn handle_config_subcommand(config_args: ConfigArgs) {
    match config_args.subcommand {
        ConfigSubcommands::Init { overwrite } => {
            if let Err(e) = config::create_default_config(overwrite) {
                eprintln!("Error creating config: {e:#}");
                std::process::exit(1);
            }
        }
        ConfigSubcommands::Show => {
            if let Err(e) = config::show_config() {
                eprintln!("Error showing config: {e:#}");
                std::process::exit(1);
            }
        }
        ConfigSubcommands::Set { key, value } => {
            if let Err(e) = config::set_config_value(&key, &value) {
                eprintln!("Error setting config: {e:#}");
                std::process::exit(1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_flags_override_config() {
        let config = config::Config::default();

        let options = fold_options(&config, None, false);
        assert!(options.merge);
        assert_eq!(options.top, 20);

        let options = fold_options(&config, Some(0), true);
        assert!(!options.merge);
        assert_eq!(options.top, 0);
    }

    #[test]
    fn number_format_flags_override_config() {
        let mut config = config::Config::default();
        config.formatting.locale = "de".to_string();
        config.formatting.decimal_places = 3;

        let cli = Cli::try_parse_from(["chatfold", "summary", "in.json"]).expect("parse");
        let options = number_format_options(&config, &cli);
        assert_eq!(options.locale, "de");
        assert_eq!(options.decimal_places, 3);
        assert!(!options.use_comma);

        let cli = Cli::try_parse_from([
            "chatfold", "summary", "in.json", "--number-comma", "--locale", "fr",
            "--decimal-places", "1",
        ])
        .expect("parse");
        let options = number_format_options(&config, &cli);
        assert!(options.use_comma);
        assert!(!options.use_human);
        assert_eq!(options.locale, "fr");
        assert_eq!(options.decimal_places, 1);
    }

    #[test]
    fn cli_parses_merge_arguments() {
        let cli = Cli::try_parse_from([
            "chatfold", "merge", "in.json", "--output", "out.json", "--top", "5", "--no-merge",
        ])
        .expect("parse");
        match cli.command {
            Commands::Merge(args) => {
                assert_eq!(args.input, PathBuf::from("in.json"));
                assert_eq!(args.output, Some(PathBuf::from("out.json")));
                assert_eq!(args.top, Some(5));
                assert!(args.no_merge);
                assert!(!args.style.pretty);
                assert!(!args.style.compact);
            }
            _ => panic!("expected merge subcommand"),
        }

        assert!(Cli::try_parse_from(["chatfold", "watch", "in.json"]).is_err());
        assert!(
            Cli::try_parse_from(["chatfold", "merge", "in.json", "--pretty", "--compact"])
                .is_err()
        );
    }

    #[tokio::test]
    async fn missing_input_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = load_input(&dir.path().join("absent.json"))
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("Report file not found"));
    }

    #[tokio::test]
    async fn merge_command_writes_folded_report() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("report.json");
        let output = dir.path().join("merged.json");
        std::fs::write(
            &input,
            r#"{"chats":[
                {"chat_id":1,"label":"Jane","handles":["jane@example.com"],
                 "totals":{"sent":3,"received":2,"total":5}},
                {"chat_id":2,"label":"jane@example.com","handles":["JANE@example.com"],
                 "totals":{"sent":1,"received":1,"total":2}}
            ]}"#,
        )
        .expect("write input");

        let args = MergeArgs {
            input,
            output: Some(output.clone()),
            style: OutputStyleArgs::default(),
            top: None,
            no_merge: false,
        };
        run_merge(args, &config::Config::default())
            .await
            .expect("merge");

        let merged = report::read_report(&output).expect("read output");
        assert_eq!(merged.chats.len(), 1);
        assert_eq!(merged.chats[0].totals.total, 7);
        assert_eq!(merged.chats[0].merged_from, vec![1, 2]);
        assert!(merged.chats[0].chat_id < 0);
        assert_eq!(merged.summary.totals.total, 7);
    }

    fn parse_merge(args: &[&str]) -> MergeArgs {
        let cli = Cli::try_parse_from(["chatfold", "merge"].iter().chain(args).copied()).expect("parse");
        match cli.command {
            Commands::Merge(args) => args,
            _ => panic!("expected merge subcommand"),
        }
    }

    #[tokio::test]
    async fn layout_flags_override_configured_pretty_output() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("report.json");
        let output = dir.path().join("merged.json");
        std::fs::write(
            &input,
            r#"{"chats":[{"chat_id":1,"label":"Jane","totals":{"sent":1,"received":1,"total":2}}]}"#,
        )
        .expect("write input");
        let input = input.to_string_lossy().into_owned();
        let out = output.to_string_lossy().into_owned();

        let mut pretty_config = config::Config::default();
        pretty_config.output.pretty = true;
        let mut compact_config = config::Config::default();
        compact_config.output.pretty = false;

        run_merge(parse_merge(&[&input, "-o", &out, "--compact"]), &pretty_config)
            .await
            .expect("compact merge");
        let text = std::fs::read_to_string(&output).expect("read output");
        assert_eq!(text.lines().count(), 1);

        run_merge(parse_merge(&[&input, "-o", &out, "--pretty"]), &compact_config)
            .await
            .expect("pretty merge");
        let text = std::fs::read_to_string(&output).expect("read output");
        assert!(text.lines().count() > 1);

        run_merge(parse_merge(&[&input, "-o", &out]), &compact_config)
            .await
            .expect("configured merge");
        let text = std::fs::read_to_string(&output).expect("read output");
        assert_eq!(text.lines().count(), 1);
    }
}
