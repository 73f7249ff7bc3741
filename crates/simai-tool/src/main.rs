// simai-tool: normalize, shift and inspect simai chart text.

mod files;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use simai_model::time::{measure_to_second, quantise, second_to_measure};
use simai_model::{Chart, SimaiConfig, SimaiDecoder, SimaiEncoder};

#[derive(Parser, Debug)]
#[command(name = "simai-tool", about = "Parse and re-export simai charts")]
struct Args {
    /// Log parse and export details.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON settings file for the parser and exporter.
    #[arg(long, global = true, env = "SIMAI_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a chart and write it back in canonical form.
    Normalize {
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Move every note and tempo change by a number of measures.
    Shift {
        input: PathBuf,
        /// Offset in measures; may be negative.
        #[arg(long, allow_hyphen_values = true)]
        by: f64,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Convert between measure positions and seconds using the chart's tempo changes.
    Time {
        input: PathBuf,
        #[arg(long, conflicts_with = "seconds", required_unless_present = "seconds")]
        measure: Option<f64>,
        #[arg(long)]
        seconds: Option<f64>,
        /// Snap a converted measure to this many divisions per measure.
        #[arg(long)]
        grid: Option<u32>,
    },
    /// Print the parsed chart as JSON.
    Dump { input: PathBuf },
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn decode_file(decoder: &SimaiDecoder, input: &Path) -> Result<Chart> {
    let content = files::read_chart_file(input)?;
    let chart = decoder
        .decode_str(&content)
        .with_context(|| format!("Failed to parse {}", input.display()))?;
    info!(
        "Loaded {} notes from {}",
        chart.note_count(),
        input.display()
    );
    Ok(chart)
}

fn run(args: Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => files::load_config(path)?,
        None => SimaiConfig::default(),
    };
    let decoder = SimaiDecoder::with_options(config.parse);
    let encoder = SimaiEncoder::with_options(config.export);

    match args.command {
        Command::Normalize { input, output } => {
            let chart = decode_file(&decoder, &input)?;
            let text = encoder.encode(&chart).context("Failed to export chart")?;
            files::write_output(output, &text)?;
        }
        Command::Shift { input, by, output } => {
            let mut chart = decode_file(&decoder, &input)?;
            chart.shift(by);
            let text = encoder.encode(&chart).context("Failed to export chart")?;
            files::write_output(output, &text)?;
        }
        Command::Time {
            input,
            measure,
            seconds,
            grid,
        } => {
            let chart = decode_file(&decoder, &input)?;
            let breakpoints = chart.tempo_breakpoints();
            match (measure, seconds) {
                (Some(measure), _) => {
                    let seconds = measure_to_second(measure, &breakpoints)?;
                    println!("{seconds:.4}");
                }
                (None, Some(seconds)) => {
                    let mut measure = second_to_measure(seconds, &breakpoints)?;
                    if let Some(grid) = grid {
                        measure = quantise(measure, grid)?;
                    }
                    println!("{measure:.4}");
                }
                (None, None) => anyhow::bail!("Either --measure or --seconds is required"),
            }
        }
        Command::Dump { input } => {
            let chart = decode_file(&decoder, &input)?;
            let json = serde_json::to_string_pretty(&chart)?;
            files::write_output(None::<PathBuf>, &json)?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    run(args)
}
