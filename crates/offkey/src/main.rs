mod config;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use config::PipelineConfig;
use std::path::{Path, PathBuf};
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Anomaly-detection pipeline for MIDI corpora
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Config file (default: ./offkey.toml, then the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract the feature vector from a single MIDI file
    Extract {
        /// Path to a .mid/.midi file
        input: PathBuf,
        /// Where to write the feature-vector artifact (.json)
        output: PathBuf,
    },

    /// Report the most-used key names of a MIDI file
    Keys {
        /// Path to a .mid/.midi file
        input: PathBuf,
    },

    /// Stage a corpus: flat, whitespace-normalized copies of all MIDI
    /// files under a source tree
    Stage {
        /// Root directory to collect MIDI files from
        source: PathBuf,
        /// Destination directory (default: the configured staging dir)
        dest: Option<PathBuf>,
    },

    /// Build the corpus matrix from a directory of MIDI files
    Build {
        /// Directory of MIDI files (default: the configured staging dir)
        input_dir: Option<PathBuf>,
        /// Where to write the matrix artifact (.json; default:
        /// corpus.json under the configured artifacts dir)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = PipelineConfig::load_from(cli.config.as_deref())?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Command::Extract { input, output } => cmd_extract(&input, &output),
        Command::Keys { input } => cmd_keys(&input),
        Command::Stage { source, dest } => {
            cmd_stage(&source, &dest.unwrap_or(config.staging_dir))
        }
        Command::Build { input_dir, output } => {
            let input = input_dir.unwrap_or_else(|| config.staging_dir.clone());
            let output = output.unwrap_or_else(|| config.artifacts_dir.join("corpus.json"));
            cmd_build(&input, &output)
        }
    }
}

fn require_midi_file(path: &Path) -> Result<()> {
    let is_midi = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("mid") || ext.eq_ignore_ascii_case("midi"))
        .unwrap_or(false);
    if !is_midi {
        bail!(
            "{} is not a MIDI file (expected a .mid or .midi extension)",
            path.display()
        );
    }
    if !path.is_file() {
        bail!("{} does not exist", path.display());
    }
    Ok(())
}

fn require_json_target(path: &Path) -> Result<()> {
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if !is_json {
        bail!(
            "{} is not a valid artifact path (expected a .json extension)",
            path.display()
        );
    }
    Ok(())
}

fn require_directory(path: &Path) -> Result<()> {
    if !path.is_dir() {
        bail!("{} is not a directory", path.display());
    }
    Ok(())
}

fn cmd_extract(input: &Path, output: &Path) -> Result<()> {
    require_midi_file(input)?;
    require_json_target(output)?;

    let vector = midi_features::extract(input)
        .with_context(|| format!("extracting features from {}", input.display()))?;

    let json = serde_json::to_string_pretty(&vector)?;
    std::fs::write(output, json)
        .with_context(|| format!("writing artifact {}", output.display()))?;

    println!("wrote feature vector to {}", output.display());
    Ok(())
}

fn cmd_keys(input: &Path) -> Result<()> {
    require_midi_file(input)?;

    let track = midi_features::MidiTrack::from_path(input)
        .with_context(|| format!("parsing {}", input.display()))?;

    match midi_features::key_usage(&track) {
        Some(report) => {
            println!("most used key: {}", report.most_used);
            match report.second_most_used {
                Some(second) => println!("second most used key: {second}"),
                None => println!("second most used key: (single pitch)"),
            }
        }
        None => println!("{} has no notes", input.display()),
    }
    Ok(())
}

fn cmd_stage(source: &Path, dest: &Path) -> Result<()> {
    require_directory(source)?;

    let report = corpus::stage(source, dest)
        .with_context(|| format!("staging {} into {}", source.display(), dest.display()))?;

    println!("staged {} files into {}", report.copied, dest.display());
    Ok(())
}

fn cmd_build(input_dir: &Path, output: &Path) -> Result<()> {
    require_directory(input_dir)?;
    require_json_target(output)?;

    let (matrix, report) = corpus::build(input_dir)
        .with_context(|| format!("building corpus from {}", input_dir.display()))?;

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }
    matrix
        .save(output)
        .with_context(|| format!("writing artifact {}", output.display()))?;

    if matrix.is_empty() {
        warn!("corpus matrix has no rows: nothing to train or infer on");
    }

    println!(
        "{} files processed, {} skipped; wrote {} rows to {}",
        report.processed,
        report.skipped(),
        matrix.row_count(),
        output.display()
    );
    Ok(())
}
