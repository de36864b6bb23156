//! VoltGuard CLI - circuit voltage-drop and ampacity checks from the command line.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process;
use voltguard::compliance::SystemDropReport;
use voltguard::ucs::AdapterRegistry;
use voltguard::{
    load_circuits, BatchReport, CalculationResult, CheckReport, CircuitRecord, EngineConfig,
    SizingResult, SweepStrategy, VoltGuardCore, MAX_SWEEP_VARIANTS,
};

#[derive(Parser)]
#[command(name = "voltguard")]
#[command(about = "Circuit voltage-drop, ampacity and compliance checker", long_about = None)]
#[command(version)]
struct Cli {
    /// Engine configuration file (JSON)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate every circuit in a JSON file
    Check {
        /// Circuit file: one record, an array, or {"circuits": [...]}
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,

        /// Exit with error code if any circuit is non-compliant or undersized
        #[arg(long)]
        fail_on_noncompliant: bool,

        /// Also report the combined drop of all circuits as one series run
        #[arg(long)]
        combined: bool,
    },

    /// Find the smallest adequate conductor for each circuit
    Size {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,
    },

    /// What-if sweep over conductor sizes or lengths for one circuit
    Sweep {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Circuit to sweep (required when the file holds several)
        #[arg(long, value_name = "ID")]
        circuit: Option<String>,

        /// Comma-separated conductor sizes, e.g. "12 AWG,10 AWG,8 AWG"
        #[arg(long, value_delimiter = ',')]
        sizes: Vec<String>,

        /// Evenly spaced lengths in metres, both ends included
        #[arg(
            long,
            num_args = 3,
            value_names = ["START", "END", "STEPS"],
            conflicts_with = "sizes"
        )]
        length_range: Option<Vec<f64>>,

        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,
    },

    /// List available analysis views
    Views {
        /// Show field renames for each view
        #[arg(short, long)]
        verbose: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output for scripts and CI
    Json,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let exit_code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    };

    process::exit(exit_code);
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<i32> {
    if let Commands::Views { verbose } = cli.command {
        handle_views(verbose);
        return Ok(0);
    }

    let core = build_core(cli.config.as_deref())?;
    match cli.command {
        Commands::Check {
            file,
            format,
            fail_on_noncompliant,
            combined,
        } => handle_check(&core, &file, format, fail_on_noncompliant, combined),
        Commands::Size { file, format } => handle_size(&core, &file, format),
        Commands::Sweep {
            file,
            circuit,
            sizes,
            length_range,
            format,
        } => {
            let strategy = sweep_strategy(sizes, length_range)?;
            handle_sweep(&core, &file, circuit.as_deref(), strategy, format)
        }
        Commands::Views { .. } => Ok(0),
    }
}

fn build_core(config: Option<&Path>) -> Result<VoltGuardCore> {
    let config = match config {
        Some(path) => EngineConfig::load_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    Ok(VoltGuardCore::new(config))
}

fn read_circuits(file: &Path) -> Result<Vec<CircuitRecord>> {
    let circuits = load_circuits(file)
        .with_context(|| format!("Failed to read circuits from {}", file.display()))?;
    if circuits.is_empty() {
        bail!("{} contains no circuits", file.display());
    }
    tracing::debug!("Loaded {} circuit(s) from {}", circuits.len(), file.display());
    Ok(circuits)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).context("Failed to serialize output")?);
    Ok(())
}

fn handle_check(
    core: &VoltGuardCore,
    file: &Path,
    format: OutputFormat,
    fail_on_noncompliant: bool,
    combined: bool,
) -> Result<i32> {
    let circuits = read_circuits(file)?;
    let report = core.check_circuits(&circuits);
    let system = if combined {
        Some(core.system_drop(&circuits).context("Combined drop needs every circuit to evaluate")?)
    } else {
        None
    };

    match format {
        OutputFormat::Human => output_check_human(file, &report, system.as_ref()),
        OutputFormat::Json => print_json(&serde_json::json!({
            "file": file.display().to_string(),
            "circuits": report.circuits,
            "stats": report.stats,
            "combined": system,
        }))?,
    }

    if fail_on_noncompliant && report.has_problems() {
        return Ok(1);
    }
    Ok(0)
}

fn output_result_human(result: &CalculationResult) {
    println!(
        "  Voltage drop:   {:.2} V ({:.2}%), limit {:.1}%  [{}]",
        result.voltage_drop_v,
        result.voltage_drop_percent,
        result.max_allowed_drop_percent,
        result.compliance
    );
    println!("  Receiving end:  {:.2} V", result.receiving_end_voltage_v);
    println!(
        "  Ampacity:       {:.1} A vs {:.1} A required  [{}]",
        result.wire_rating.ampacity,
        result.comparison_current_a,
        if result.wire_rating.is_adequate { "adequate" } else { "inadequate" }
    );
    println!(
        "  Power loss:     {:.1} W (resistive {:.1} W, reactive {:.1} W)",
        result.power_loss.total_w, result.power_loss.resistive_w, result.power_loss.reactive_w
    );
}

fn output_check_human(file: &Path, report: &CheckReport, system: Option<&SystemDropReport>) {
    println!("\nFile: {}", file.display());
    println!("{}", "─".repeat(60));

    for check in &report.circuits {
        println!("\nCircuit: {}", check.circuit_id);
        match (&check.result, &check.error) {
            (Some(result), _) => {
                println!("  Conductor:      {}", result.conductor_size);
                output_result_human(result);
                println!("  Recommendations:");
                for line in &result.recommendations {
                    println!("    - {}", line);
                }
            }
            (None, Some(error)) => println!("  Error: {}", error),
            (None, None) => println!("  Not evaluated"),
        }
    }

    if let Some(system) = system {
        println!("\n  Combined run:");
        for segment in &system.segments {
            println!("    {:<16} {:.2}%", segment.circuit_id, segment.voltage_drop_percent);
        }
        println!(
            "    Total {:.2}% of {:.1}% allowed  [{}]",
            system.total_drop_percent, system.max_allowed_percent, system.compliance
        );
    }

    let stats = &report.stats;
    println!("\n  Summary:");
    println!("    Circuits:      {}", stats.total);
    println!("    Compliant:     {}", stats.compliant);
    println!("    Non-compliant: {}", stats.non_compliant);
    println!("    Undersized:    {}", stats.ampacity_inadequate);
    println!("    Failed:        {}", stats.failed);
}

fn handle_size(core: &VoltGuardCore, file: &Path, format: OutputFormat) -> Result<i32> {
    let circuits = read_circuits(file)?;
    let mut sizings: Vec<SizingResult> = Vec::new();
    let mut failed = false;

    for circuit in &circuits {
        match core.minimum_conductor_size(circuit) {
            Ok(sizing) => sizings.push(sizing),
            Err(e) => {
                eprintln!("Error: circuit {}: {}", circuit.id, e);
                failed = true;
            }
        }
    }

    match format {
        OutputFormat::Human => {
            println!("\nFile: {}", file.display());
            println!("{}", "─".repeat(60));
            for sizing in &sizings {
                let marker = if sizing.needs_change() { "change" } else { "ok" };
                println!(
                    "  {:<16} {:>12} -> {:<12} {:.2}%  [{}]",
                    sizing.circuit_id,
                    sizing.current_size,
                    sizing.recommended_size,
                    sizing.result.voltage_drop_percent,
                    marker
                );
            }
        }
        OutputFormat::Json => print_json(&sizings)?,
    }

    Ok(if failed { 1 } else { 0 })
}

fn sweep_strategy(
    sizes: Vec<String>,
    length_range: Option<Vec<f64>>,
) -> Result<SweepStrategy> {
    match (sizes.is_empty(), length_range) {
        (false, None) => Ok(SweepStrategy::ConductorSizes(
            sizes.into_iter().map(|s| s.trim().to_string()).collect(),
        )),
        (true, Some(range)) => {
            let &[start_m, end_m, steps] = range.as_slice() else {
                bail!("--length-range takes START END STEPS");
            };
            if steps < 0.0 || steps.fract() != 0.0 {
                bail!("STEPS must be a whole number, got {}", steps);
            }
            if steps > MAX_SWEEP_VARIANTS as f64 {
                bail!("STEPS must be at most {}, got {}", MAX_SWEEP_VARIANTS, steps);
            }
            Ok(SweepStrategy::LengthRange {
                start_m,
                end_m,
                steps: steps as usize,
            })
        }
        (true, None) => bail!("Pick a sweep with --sizes or --length-range"),
        (false, Some(_)) => bail!("--sizes and --length-range cannot be combined"),
    }
}

fn pick_circuit(circuits: Vec<CircuitRecord>, id: Option<&str>) -> Result<CircuitRecord> {
    match id {
        Some(id) => circuits
            .into_iter()
            .find(|c| c.id == id)
            .with_context(|| format!("No circuit with id {}", id)),
        None if circuits.len() == 1 => Ok(circuits.into_iter().next().context("No circuits")?),
        None => bail!("File holds {} circuits; pick one with --circuit", circuits.len()),
    }
}

fn handle_sweep(
    core: &VoltGuardCore,
    file: &Path,
    circuit_id: Option<&str>,
    strategy: SweepStrategy,
    format: OutputFormat,
) -> Result<i32> {
    let circuit = pick_circuit(read_circuits(file)?, circuit_id)?;
    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;

    let show_progress = matches!(format, OutputFormat::Human);
    let report = runtime.block_on(core.sweep(
        &circuit,
        &strategy,
        |done, total| {
            if show_progress {
                eprintln!("[{}/{}]", done, total);
            }
        },
        |result| tracing::debug!("Variant {} finished", result.label),
    ))?;

    match format {
        OutputFormat::Human => output_sweep_human(&circuit, &report),
        OutputFormat::Json => print_json(&report)?,
    }

    Ok(if report.failed_job_ids.is_empty() { 0 } else { 1 })
}

fn output_sweep_human(circuit: &CircuitRecord, report: &BatchReport) {
    println!("\nSweep: {} ({} variant(s))", circuit.id, report.total_jobs);
    println!("{}", "─".repeat(60));
    for r in &report.results {
        println!(
            "  {:<12} {:>7.2} V {:>6.2}%  {:<14} {}",
            r.label,
            r.result.voltage_drop_v,
            r.result.voltage_drop_percent,
            r.result.compliance.to_string(),
            if r.result.wire_rating.is_adequate { "adequate" } else { "inadequate" }
        );
    }
    for job_id in &report.failed_job_ids {
        println!("  variant #{} failed", job_id);
    }
    match &report.best_compliant {
        Some(best) => println!("\n  Best compliant: {}", best.label),
        None => println!("\n  No compliant variant"),
    }
}

fn handle_views(verbose: bool) {
    println!("Available analysis views:\n");

    let registry = AdapterRegistry::new();
    for adapter in registry.adapters() {
        println!("  {}", adapter.view());
        println!("    {}", adapter.description());
        if verbose {
            for (canonical, view_name) in adapter.renames() {
                println!("      {} -> {}", canonical, view_name);
            }
        }
        println!();
    }
}
