use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use serde_json::json;
use std::{
    num::NonZeroUsize,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing_subscriber::EnvFilter;
use wordhoard::{
    BuildConfig, BuildReport, ConfigOverrides, Dictionary, DictionarySnapshot, EncodingMode,
    MembershipStrategy,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Root directory to build the dictionary from
    root: Option<PathBuf>,

    /// Write the dictionary snapshot to this file
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Number of word workers draining the line channel
    #[arg(short = 'j', long)]
    workers: Option<NonZeroUsize>,

    /// Number of threads reading files
    #[arg(long)]
    readers: Option<NonZeroUsize>,

    /// How unique words are detected (exact|bloom)
    #[arg(long, value_parser = ["exact", "bloom"])]
    strategy: Option<String>,

    /// Number of distinct words the bloom filter is sized for
    #[arg(long)]
    expected_words: Option<usize>,

    /// Target false positive rate of the bloom filter
    #[arg(long)]
    false_positive_rate: Option<f64>,

    /// File extensions to include (e.g. txt,md)
    #[arg(short = 'e', long)]
    extensions: Option<String>,

    /// Patterns to ignore (glob format)
    #[arg(short, long)]
    ignore: Vec<String>,

    /// How to handle invalid UTF-8 sequences (failfast|lossy)
    #[arg(long, value_parser = ["failfast", "lossy"])]
    encoding: Option<String>,

    /// Configuration file to load on top of the default locations
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Print every unique word, sorted
    #[arg(long)]
    words: bool,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,

    /// Log level when RUST_LOG is not set (error|warn|info|debug|trace)
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    /// Collects the flags that were actually given
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            root_path: self.root.clone(),
            worker_count: self.workers,
            reader_threads: self.readers,
            membership: self.strategy.as_deref().map(|s| match s {
                "exact" => MembershipStrategy::Exact,
                _ => MembershipStrategy::Bloom,
            }),
            expected_words: self.expected_words,
            false_positive_rate: self.false_positive_rate,
            file_extensions: self.extensions.as_ref().map(|e| {
                e.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
            }),
            ignore_patterns: self.ignore.clone(),
            encoding_mode: self.encoding.as_deref().map(|s| match s {
                "failfast" => EncodingMode::FailFast,
                _ => EncodingMode::Lossy,
            }),
            log_level: self.log_level.clone(),
            ..ConfigOverrides::default()
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = BuildConfig::load_from(cli.config.as_deref())
        .context("Failed to load configuration")?
        .merge_with_cli(cli.overrides());
    config.validate()?;

    init_tracing(&config.log_level);

    let root = config.root_path.clone();
    let dict = Dictionary::new(config)?;
    let report = dict
        .build_from_dir(&root)
        .with_context(|| format!("Failed to build dictionary from {}", root.display()))?;
    let snapshot = dict.snapshot()?;

    if let Some(output) = &cli.output {
        snapshot
            .save_to(output)
            .with_context(|| format!("Failed to write snapshot to {}", output.display()))?;
    }

    if cli.json {
        print_json(
            &root,
            dict.strategy(),
            &report,
            &snapshot,
            cli.output.as_deref(),
            cli.words,
        )?;
    } else {
        if cli.words {
            print_words(&snapshot);
        }
        print_summary(&root, dict.strategy(), &report, cli.output.as_deref());
    }
    Ok(())
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn strategy_name(strategy: MembershipStrategy) -> &'static str {
    match strategy {
        MembershipStrategy::Exact => "exact",
        MembershipStrategy::Bloom => "bloom",
    }
}

fn sorted_words(snapshot: &DictionarySnapshot) -> Vec<&str> {
    let mut words: Vec<&str> = snapshot.unique_words.iter().map(String::as_str).collect();
    words.sort_unstable();
    words
}

fn print_words(snapshot: &DictionarySnapshot) {
    for word in sorted_words(snapshot) {
        println!("{}", word);
    }
}

fn print_summary(
    root: &Path,
    strategy: MembershipStrategy,
    report: &BuildReport,
    output: Option<&Path>,
) {
    println!(
        "\nBuilt dictionary from {}",
        root.display().to_string().blue()
    );
    println!("Strategy: {}", strategy_name(strategy));
    println!(
        "Files: {} read, {} discovered",
        report.files_read.to_string().green(),
        report.files_discovered
    );
    println!("Lines: {}", report.lines_read);
    println!("Words: {}", report.total_words.to_string().green());
    println!("Unique words: {}", report.unique_words.to_string().green());

    if !report.skipped.is_empty() {
        println!("Skipped: {}", report.skipped.len().to_string().yellow());
        for entry in &report.skipped {
            println!("  {:?}: {}", entry.kind, entry.message.yellow());
        }
    }

    // Sub-millisecond precision is noise in a summary
    let elapsed = Duration::from_millis(report.elapsed.as_millis() as u64);
    println!("Elapsed: {}", humantime::format_duration(elapsed));

    if let Some(output) = output {
        println!("Saved snapshot to {}", output.display().to_string().blue());
    }
}

fn print_json(
    root: &Path,
    strategy: MembershipStrategy,
    report: &BuildReport,
    snapshot: &DictionarySnapshot,
    output: Option<&Path>,
    include_words: bool,
) -> Result<()> {
    let skipped: Vec<_> = report
        .skipped
        .iter()
        .map(|entry| {
            json!({
                "path": entry.path.as_ref().map(|p| p.display().to_string()),
                "kind": format!("{:?}", entry.kind),
                "message": entry.message,
            })
        })
        .collect();

    let mut summary = json!({
        "root": root.display().to_string(),
        "strategy": strategy_name(strategy),
        "files_discovered": report.files_discovered,
        "files_read": report.files_read,
        "lines_read": report.lines_read,
        "bytes_read": report.bytes_read,
        "total_words": report.total_words,
        "unique_words": report.unique_words,
        "skipped": skipped,
        "elapsed_ms": report.elapsed.as_millis() as u64,
        "output": output.map(|p| p.display().to_string()),
    });
    if include_words {
        summary["words"] = json!(sorted_words(snapshot));
    }

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
