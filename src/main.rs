use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use stand_yield_estimator::{
    analysis::BatchStatistics,
    io::{self, yield_rows, YieldRow},
    models::Polygon,
    visualization::{print_batch_report, print_polygon_summary, print_statistics_table},
    ControlMap, Estimator, EstimatorConfig,
};

#[derive(Parser)]
#[command(
    name = "stand-estimator",
    about = "Stand Yield Estimator - per-species utilization and volume yields for forest polygons",
    version,
    author
)]
struct Cli {
    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate yields for every polygon of an input file
    Estimate {
        /// Path to input file (CSV, JSON, or Excel)
        #[arg(short, long)]
        input: PathBuf,

        /// Control (coefficient) file in JSON
        #[arg(short, long)]
        control: Option<PathBuf>,

        /// Run configuration in TOML
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write the yield table here (CSV, JSON, or Excel)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Check every polygon against the validation rules without estimating
    Validate {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        control: Option<PathBuf>,

        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Estimate a batch and display stand-level statistics
    Summary {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        control: Option<PathBuf>,

        #[arg(long)]
        config: Option<PathBuf>,

        /// Confidence level for the intervals (0.0-1.0)
        #[arg(long, default_value = "0.95")]
        confidence: f64,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr).compact())
        .init();
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

fn load_polygons(path: &Path) -> Result<Vec<Polygon>> {
    let ext = extension(path);
    let polygons = match ext.as_str() {
        "csv" => io::read_csv(path)?,
        "json" => io::read_json(path)?,
        "xlsx" | "xls" => io::read_excel(path)?,
        _ => anyhow::bail!("Unsupported file format: .{ext}. Use .csv, .json, or .xlsx"),
    };
    Ok(polygons)
}

fn write_yields(rows: &[YieldRow], path: &Path, pretty: bool) -> Result<()> {
    let ext = extension(path);
    match ext.as_str() {
        "csv" => io::write_csv(rows, path)?,
        "json" => io::write_json(rows, path, pretty)?,
        "xlsx" => io::write_excel(rows, path)?,
        _ => anyhow::bail!("Unsupported output format: .{ext}"),
    }
    Ok(())
}

/// Load the run configuration and the control map it points at; the
/// command-line control path wins over the configured one.
fn load_setup(control: Option<PathBuf>, config: Option<PathBuf>) -> Result<(ControlMap, EstimatorConfig)> {
    let config = match config {
        Some(path) => EstimatorConfig::from_file(&path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => EstimatorConfig::default(),
    };
    let Some(control_path) = control.or_else(|| config.control_file.clone()) else {
        anyhow::bail!("No control file given. Use --control or set control_file in the config");
    };
    let control = ControlMap::load_json(&control_path)
        .with_context(|| format!("reading control file {}", control_path.display()))?;
    Ok((control, config))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Estimate {
            input,
            control,
            config,
            output,
            pretty,
        } => {
            let (control, config) = load_setup(control, config)?;
            println!(
                "\n{}",
                format!("Stand Yield Estimation: {}", input.display())
                    .bold()
                    .cyan()
            );

            let polygons = load_polygons(&input)?;
            println!("  Loaded {} polygons", polygons.len());

            let report = Estimator::new(&control, &config).process_batch(&polygons)?;
            for polygon in &report.processed {
                print_polygon_summary(polygon);
            }
            print_batch_report(&report);

            if let Some(output) = output {
                let rows: Vec<YieldRow> = report.processed.iter().flat_map(yield_rows).collect();
                write_yields(&rows, &output, pretty)?;
                println!(
                    "{} Wrote {} yield rows -> {}",
                    "Success:".green().bold(),
                    rows.len(),
                    output.display()
                );
            }
        }

        Commands::Validate {
            input,
            control,
            config,
        } => {
            let (control, config) = load_setup(control, config)?;
            let polygons = load_polygons(&input)?;
            let estimator = Estimator::new(&control, &config);

            println!("\n{}", "Validation".bold().cyan());
            println!("{}", "=".repeat(40));
            let mut failed = 0;
            for polygon in &polygons {
                match estimator.validate_polygon(polygon) {
                    Ok((_, mode)) => println!("  {} {} ({mode})", "ok".green(), polygon.id),
                    Err(e) if e.is_fatal() => return Err(e.into()),
                    Err(e) => {
                        failed += 1;
                        println!("  {} {}: {e}", "invalid".red(), polygon.id);
                    }
                }
            }
            if failed > 0 {
                anyhow::bail!("{failed} of {} polygons failed validation", polygons.len());
            }
            println!("{} All {} polygons valid", "Success:".green().bold(), polygons.len());
        }

        Commands::Summary {
            input,
            control,
            config,
            confidence,
        } => {
            let (control, config) = load_setup(control, config)?;
            let polygons = load_polygons(&input)?;
            let report = Estimator::new(&control, &config).process_batch(&polygons)?;

            print_batch_report(&report);
            match BatchStatistics::compute(&report.processed, confidence) {
                Ok(stats) => print_statistics_table(&stats),
                Err(e) => {
                    eprintln!("{}: {e}", "Warning".yellow());
                }
            }
        }
    }

    Ok(())
}
