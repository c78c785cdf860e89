use clap::{Parser, Subcommand};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

use figcheck::config::{CompareOptions, parse_summary_format};
use figcheck::hashes::compute_hash;
use figcheck::render::plot_series;
use figcheck::runner::Runner;

/// figcheck - Image-based regression testing for rendered figures
#[derive(Parser, Debug)]
#[command(
    name = "figcheck",
    about = "Compare rendered figures against image baselines and hash libraries",
    after_help = "ENVIRONMENT VARIABLES:\n\
        FIGCHECK_BASELINE        Default baseline spec (dirs/URLs, comma-separated)\n\
        FIGCHECK_RESULTS_PATH    Default results directory\n\
        FIGCHECK_TOLERANCE       Default RMS tolerance\n\
        FIGCHECK_FETCH_TIMEOUT   Remote fetch timeout in seconds"
)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compare rendered test images against the configured baselines
    Compare {
        /// Test images as ID=PATH pairs (e.g. "test.test_lines=out/lines.png")
        #[arg(required = true, value_name = "ID=PATH")]
        tests: Vec<String>,

        /// Baseline sources: directories and/or base URLs, comma-separated,
        /// tried in order
        #[arg(short, long, env = "FIGCHECK_BASELINE")]
        baseline: Option<String>,

        /// Baseline filename override (default: derived from the test id)
        #[arg(long)]
        filename: Option<String>,

        /// Maximum allowed RMS deviation
        #[arg(short, long, env = "FIGCHECK_TOLERANCE")]
        tolerance: Option<f64>,

        /// Hash library to verify against
        #[arg(long)]
        hash_library: Option<PathBuf>,

        /// Write rendered images to this directory instead of comparing
        #[arg(long)]
        generate_path: Option<PathBuf>,

        /// Write a hash library for this run to the given path
        #[arg(long)]
        generate_hash_library: Option<PathBuf>,

        /// Directory for per-test result artifacts
        #[arg(
            short,
            long,
            env = "FIGCHECK_RESULTS_PATH",
            default_value = "./figcheck_results"
        )]
        results_path: PathBuf,

        /// Keep result artifacts for passing tests too
        #[arg(long)]
        results_always: bool,

        /// Summary documents to generate: html, json, or html,json
        #[arg(long, value_name = "FORMAT")]
        summary: Option<String>,

        /// Timeout in seconds for each remote baseline fetch
        #[arg(long, env = "FIGCHECK_FETCH_TIMEOUT", default_value = "30")]
        fetch_timeout: u64,
    },

    /// Render the built-in deterministic line plot of a data series
    Render {
        /// Comma-separated series values (e.g. "1,2,3")
        #[arg(short, long, default_value = "1,2,3")]
        series: String,

        /// Output PNG path
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Print the content hash of image files
    Hash {
        /// Image files to hash
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(success) => {
            if success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<bool, Box<dyn Error>> {
    match args.command {
        Commands::Compare {
            tests,
            baseline,
            filename,
            tolerance,
            hash_library,
            generate_path,
            generate_hash_library,
            results_path,
            results_always,
            summary,
            fetch_timeout,
        } => {
            let mut options = CompareOptions::default()
                .results_dir(results_path)
                .results_always(results_always)
                .fetch_timeout(fetch_timeout);

            if let Some(spec) = baseline {
                options = options.baseline_spec(&spec);
            }
            if let Some(name) = filename {
                options = options.filename(name);
            }
            if let Some(value) = tolerance {
                options = options.tolerance(value);
            }
            if let Some(path) = hash_library {
                options = options.hash_library(path);
            }
            if let Some(path) = generate_path {
                options = options.generate_dir(path);
            }
            if let Some(path) = generate_hash_library {
                options = options.generate_hash_library(path);
            }
            if let Some(spec) = &summary {
                options = options.summary(
                    parse_summary_format(spec)
                        .ok_or_else(|| format!("invalid summary format: {:?}", spec))?,
                );
            }

            let mut runner = Runner::new(options)?;

            for entry in &tests {
                let (id, path) = entry
                    .split_once('=')
                    .ok_or_else(|| format!("expected ID=PATH, got {:?}", entry))?;
                let record = runner.compare_test(id, path.as_ref())?;
                match &record.message {
                    Some(message) => {
                        println!("{} ({})\n{}", record.test_id, record.status, message)
                    }
                    None => println!("{} ({})", record.test_id, record.status),
                }
            }

            let summary = runner.finalize()?;
            Ok(summary.overall_success())
        }

        Commands::Render { series, out } => {
            let values = parse_series(&series)?;
            let png = plot_series(&values).to_png()?;
            if let Some(dir) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir)?;
            }
            std::fs::write(&out, png)?;
            println!("Rendered {} points to {}", values.len(), out.display());
            Ok(true)
        }

        Commands::Hash { images } => {
            for path in &images {
                let bytes = std::fs::read(path)?;
                println!("{}  {}", compute_hash(&bytes), path.display());
            }
            Ok(true)
        }
    }
}

fn parse_series(spec: &str) -> Result<Vec<f64>, Box<dyn Error>> {
    spec.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<f64>()
                .map_err(|e| format!("invalid series value {:?}: {}", part, e).into())
        })
        .collect()
}
