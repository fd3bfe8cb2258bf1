use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use reportqa::classifier::{builtin_examples, load_examples_csv, train};
use reportqa::{
    filter_min_severity, load_document, load_rules, render, resolve_model, write_output, Language, ModelChoice,
    OutputFormat, RuleEngine, Severity, TrainingOptions,
};

const DEFAULT_MODEL_PATH: &str = "models/subjectivity.json";

#[derive(Parser)]
#[command(name = "reportqa")]
#[command(about = "Check business reports against configurable quality rules")]
struct Cli {
    /// More log output (debug level)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only warnings and errors in the log
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run every enabled check over a document
    Analyze(AnalyzeArgs),
    /// Train the subjectivity classifier and save the artifact
    Train(TrainArgs),
    /// Print the effective rule configuration as YAML
    ShowConfig(ShowConfigArgs),
}

#[derive(Args)]
struct AnalyzeArgs {
    /// Document to check: parser segments (.json) or plain text
    #[arg(short, long)]
    input: PathBuf,

    /// Rule files (YAML), applied in order over the built-in rules
    #[arg(short, long)]
    config: Vec<PathBuf>,

    /// Subjectivity model artifact (default: models/subjectivity.json when present)
    #[arg(long)]
    model: Option<PathBuf>,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value = "table")]
    format: OutputFormat,

    /// Output file path (stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Hide findings below this severity: info, warning or critical
    #[arg(long, default_value = "info")]
    min_severity: Severity,

    /// Whole-run timeout; checks still running are reported as skipped
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Treat every segment as this language instead of detecting it
    #[arg(long)]
    language: Option<Language>,
}

#[derive(Args)]
struct TrainArgs {
    /// Labelled examples with `text` and `label` columns (default: built-in corpus)
    #[arg(long)]
    csv: Option<PathBuf>,

    #[arg(long, default_value = DEFAULT_MODEL_PATH)]
    out: PathBuf,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    #[arg(long, default_value_t = 2000)]
    max_features: usize,
}

#[derive(Args)]
struct ShowConfigArgs {
    /// Rule files (YAML), applied in order over the built-in rules
    #[arg(short, long)]
    config: Vec<PathBuf>,

    /// Print only this language's rule set
    #[arg(long)]
    language: Option<Language>,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Command::Analyze(args) => analyze(args),
        Command::Train(args) => train_model(args),
        Command::ShowConfig(args) => show_config(args),
    };

    if let Err(e) = result {
        eprintln!("❌ {e:#}");
        std::process::exit(1);
    }
}

/// Logs go to stderr so that stdout stays clean for reports. `RUST_LOG` wins over
/// the -v / -q flags.
fn init_logging(verbose: bool, quiet: bool) {
    let level = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn analyze(args: AnalyzeArgs) -> Result<()> {
    info!("🦀 ReportQA");

    let mut config = load_rules(&args.config)?;
    if args.config.is_empty() {
        info!("📋 Using built-in rules");
    }
    if let Some(ms) = args.timeout_ms {
        config.engine.run_timeout_ms = Some(ms);
    }

    let document = load_document(&args.input, args.language)?;
    info!("📄 Processing: {}", args.input.display());

    let engine = RuleEngine::new(config)?;
    let engine = match resolve_model(args.model.as_deref(), Path::new(DEFAULT_MODEL_PATH))? {
        ModelChoice::Artifact(path) => engine.with_model_path(path),
        ModelChoice::InMemory(model) => engine.with_model(model),
    };

    let mut run = engine.analyze(&document)?;
    run.findings = filter_min_severity(&run.findings, args.min_severity);

    write_output(&render(&run, args.format)?, args.output.as_deref())?;
    if let Some(path) = &args.output {
        info!("💾 Results saved to: {}", path.display());
    }
    info!("✅ {}", run.summary());
    Ok(())
}

fn train_model(args: TrainArgs) -> Result<()> {
    let examples = match &args.csv {
        Some(path) => {
            info!("📁 Loading training examples from: {}", path.display());
            load_examples_csv(path)?
        }
        None => builtin_examples(),
    };

    let options = TrainingOptions {
        seed: args.seed,
        max_features: args.max_features,
        ..TrainingOptions::default()
    };
    let model = train(&examples, &options)?;
    model.save(&args.out)?;

    info!(
        "💾 Model {} ({} features, {} examples) saved to: {}",
        model.version(),
        model.feature_count(),
        examples.len(),
        args.out.display()
    );
    Ok(())
}

fn show_config(args: ShowConfigArgs) -> Result<()> {
    let config = load_rules(&args.config)?;
    let yaml = match args.language {
        Some(language) => {
            let rules = config
                .rules_for(language)
                .ok_or_else(|| anyhow!("no rule set for language '{language}'"))?;
            serde_yaml::to_string(rules)?
        }
        None => config.to_yaml()?,
    };
    print!("{yaml}");
    Ok(())
}
