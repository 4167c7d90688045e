//! thumbgen CLI - Parallel Batch Thumbnail Generator
//!
//! Scales every image in a source directory into an output directory using
//! a fixed number of worker threads.

use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use console::style;
use tracing::{debug, info};

use thumbgen::{Config, ExecutionSummary, ImageFormat, Partition, RunConfig, ThumbgenError};

/// Single-dash spellings accepted for compatibility with older scripts
const LEGACY_FLAGS: [&str; 3] = ["src", "out", "th"];

/// thumbgen - Parallel Batch Thumbnail Generator
#[derive(Parser, Debug)]
#[command(
    name = "thumbgen",
    version,
    about = "Generate scaled-down thumbnails for a directory of images in parallel",
    long_about = "thumbgen scales every JPG, PNG and BMP image in a source directory by a fixed \
                  ratio and writes the thumbnails to an output directory. The output directory \
                  is emptied first. Work is split evenly across a fixed number of worker threads."
)]
struct Cli {
    /// Source directory containing the images
    #[arg(short = 's', long = "source", visible_alias = "src", value_name = "DIR")]
    source: PathBuf,

    /// Output directory (emptied before thumbnails are written)
    #[arg(short = 'o', long = "output", visible_alias = "out", value_name = "DIR")]
    output: PathBuf,

    /// Number of worker threads [default: 3]
    #[arg(
        short = 't',
        long = "thread",
        visible_alias = "th",
        value_name = "COUNT",
        allow_hyphen_values = true
    )]
    thread: Option<String>,

    /// Configuration file path (TOML or YAML)
    #[arg(short, long, value_name = "FILE", env = "THUMBGEN_CONFIG")]
    config: Option<PathBuf>,

    /// Scale ratio, greater than 0 and at most 1 [default: 0.08]
    #[arg(short, long, value_name = "RATIO")]
    ratio: Option<f64>,

    /// Output encoding [default: jpg]
    #[arg(short, long, value_enum, value_name = "FORMAT")]
    format: Option<CliImageFormat>,

    /// JPEG quality (1-100) [default: 90]
    #[arg(short, long, value_name = "QUALITY")]
    quality: Option<u8>,

    /// Show the partition plan without processing or touching the output directory
    #[arg(long)]
    dry_run: bool,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short = 'Q', long, conflicts_with = "verbose")]
    quiet: bool,
}

/// CLI-compatible image format enum
#[derive(Clone, Copy, Debug, ValueEnum)]
enum CliImageFormat {
    Jpg,
    Png,
    Bmp,
}

impl From<CliImageFormat> for ImageFormat {
    fn from(format: CliImageFormat) -> Self {
        match format {
            CliImageFormat::Jpg => ImageFormat::Jpeg,
            CliImageFormat::Png => ImageFormat::Png,
            CliImageFormat::Bmp => ImageFormat::Bmp,
        }
    }
}

/// Rewrite `-src`, `-out` and `-th` (with or without `=value`) into their
/// double-dash forms so clap sees ordinary long options
fn normalize_legacy_flags<I>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    args.into_iter()
        .map(|arg| {
            let Some(rest) = arg.strip_prefix('-') else {
                return arg;
            };
            if rest.starts_with('-') {
                return arg;
            }

            let name = rest.split('=').next().unwrap_or(rest);
            if LEGACY_FLAGS.contains(&name) {
                format!("-{}", arg)
            } else {
                arg
            }
        })
        .collect()
}

/// Parse the worker count given on the command line
fn parse_thread_count(value: &str) -> thumbgen::Result<usize> {
    let count = value.trim().parse::<usize>().map_err(|_| {
        ThumbgenError::config(format!(
            "Thread count must be a positive integer, got '{}'",
            value
        ))
    })?;

    if count == 0 {
        return Err(ThumbgenError::config("Thread count must be at least 1"));
    }

    Ok(count)
}

fn main() {
    let cli = Cli::parse_from(normalize_legacy_flags(std::env::args()));

    if let Err(e) = run(cli) {
        eprintln!("{}: {:#}", style("Error").red().bold(), e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = build_settings(&cli)?;
    thumbgen::init_logging(&settings.logging)?;

    let run_config = RunConfig::new(cli.source.clone(), cli.output.clone(), settings)?;
    info!("Source: {:?}", run_config.source_dir);
    info!("Output: {:?}", run_config.output_dir);
    debug!("Scale: {:?}", run_config.settings.scale);

    let partitions = thumbgen::plan(&run_config)?;
    let total: usize = partitions.iter().map(Partition::len).sum();

    if cli.dry_run {
        print_plan(&run_config, &partitions, total);
        return Ok(());
    }

    if !cli.json {
        println!("Started to generate thumbnail for {} images", total);
    }

    let summary = thumbgen::execute_plan(&run_config, partitions)?;
    print_summary(&summary, total, cli.json)
}

/// Resolve settings: CLI flag, then config file, then built-in default
fn build_settings(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            let config = Config::from_file(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            debug!("Loaded configuration from {:?}", path);
            config
        }
        None => Config::default(),
    };

    if let Some(thread) = &cli.thread {
        config.processing.threads = parse_thread_count(thread)?;
    }
    if let Some(ratio) = cli.ratio {
        config.scale.ratio = ratio;
    }
    if let Some(format) = cli.format {
        config.scale.format = format.into();
    }
    if let Some(quality) = cli.quality {
        config.scale.quality = quality;
    }

    if cli.quiet {
        config.logging.level = "error".to_string();
    } else if cli.verbose {
        config.logging.level = "debug".to_string();
    }

    Ok(config)
}

fn print_plan(run_config: &RunConfig, partitions: &[Partition], total: usize) {
    println!(
        "{} images would be processed by {} workers into {}",
        style(total).bold(),
        run_config.threads(),
        run_config.output_dir.display()
    );

    for partition in partitions {
        println!(
            "{} ({} images)",
            style(format!("Partition {}", partition.index())).cyan().bold(),
            partition.len()
        );
        for image in partition.images() {
            println!("  {}", image.path.display());
        }
    }
}

fn print_summary(summary: &ExecutionSummary, total: usize, json_output: bool) -> anyhow::Result<()> {
    if json_output {
        let report = serde_json::to_string_pretty(&summary.report())
            .context("Failed to serialize summary")?;
        println!("{}", report);
        return Ok(());
    }

    println!(
        "Total time taken to generate thumbnails of {} images is {:.1} seconds",
        total,
        summary.elapsed.as_secs_f64()
    );
    println!("  {}: {}", style("Succeeded").green(), summary.succeeded);
    if summary.failed > 0 {
        println!("  {}: {}", style("Failed").red(), summary.failed);
        for (i, failure) in summary.failures().enumerate() {
            println!(
                "  {}: {}: {}",
                i + 1,
                failure.image.path.display(),
                failure.error.user_message()
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use thumbgen::config::DEFAULT_THREAD_COUNT;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_normalize_legacy_flags() {
        let normalized = normalize_legacy_flags(args(&[
            "thumbgen", "-src", "in", "-out=thumbs", "-th", "4", "-v", "--json",
        ]));
        assert_eq!(
            normalized,
            args(&["thumbgen", "--src", "in", "--out=thumbs", "--th", "4", "-v", "--json"])
        );
    }

    #[test]
    fn test_normalize_leaves_values_alone() {
        let normalized = normalize_legacy_flags(args(&["thumbgen", "--source", "-th-dir", "-s", "x"]));
        assert_eq!(normalized, args(&["thumbgen", "--source", "-th-dir", "-s", "x"]));
    }

    #[test]
    fn test_cli_accepts_all_spellings() {
        let cli = Cli::parse_from(normalize_legacy_flags(args(&[
            "thumbgen", "-src", "a", "-out", "b", "-th", "5",
        ])));
        assert_eq!(cli.source, PathBuf::from("a"));
        assert_eq!(cli.output, PathBuf::from("b"));
        assert_eq!(cli.thread.as_deref(), Some("5"));

        let cli = Cli::parse_from(args(&["thumbgen", "--source", "a", "--output", "b"]));
        assert!(cli.thread.is_none());

        let cli = Cli::parse_from(args(&["thumbgen", "-s", "a", "-o", "b", "-t", "2"]));
        assert_eq!(cli.thread.as_deref(), Some("2"));
    }

    #[test]
    fn test_missing_required_option_is_rejected() {
        assert!(Cli::try_parse_from(args(&["thumbgen", "--output", "b"])).is_err());
        assert!(Cli::try_parse_from(args(&["thumbgen", "--source", "a"])).is_err());
    }

    #[test]
    fn test_parse_thread_count() {
        assert_eq!(parse_thread_count("4").unwrap(), 4);
        assert_eq!(parse_thread_count(" 2 ").unwrap(), 2);
        assert!(matches!(
            parse_thread_count("abc"),
            Err(ThumbgenError::InvalidConfiguration { .. })
        ));
        assert!(matches!(
            parse_thread_count("0"),
            Err(ThumbgenError::InvalidConfiguration { .. })
        ));
        assert!(parse_thread_count("-1").is_err());
    }

    #[test]
    fn test_settings_precedence() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("thumbgen.toml");
        std::fs::write(
            &file,
            "[processing]\nthreads = 6\n\n[scale]\nratio = 0.5\nformat = \"png\"\n",
        )
        .unwrap();

        let config_arg = file.to_string_lossy().into_owned();
        let cli = Cli::parse_from(args(&[
            "thumbgen", "-s", "a", "-o", "b", "-c", &config_arg, "-t", "2",
        ]));
        let settings = build_settings(&cli).unwrap();
        assert_eq!(settings.processing.threads, 2);
        assert_eq!(settings.scale.ratio, 0.5);
        assert_eq!(settings.scale.format, ImageFormat::Png);

        let cli = Cli::parse_from(args(&["thumbgen", "-s", "a", "-o", "b"]));
        let settings = build_settings(&cli).unwrap();
        assert_eq!(settings.processing.threads, DEFAULT_THREAD_COUNT);
    }

    #[test]
    fn test_verbosity_overrides_level() {
        let cli = Cli::parse_from(args(&["thumbgen", "-s", "a", "-o", "b", "-Q"]));
        assert_eq!(build_settings(&cli).unwrap().logging.level, "error");

        let cli = Cli::parse_from(args(&["thumbgen", "-s", "a", "-o", "b", "-v"]));
        assert_eq!(build_settings(&cli).unwrap().logging.level, "debug");
    }
}
