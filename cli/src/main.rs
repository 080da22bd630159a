//! hospital-sim: run a hospital simulation from an input file
//!
//! Prints one line per patient (`id admitted_at total service wait`) to
//! stdout. Logs go to stderr.

use clap::Parser;
use hospital_sim_core::{load, report, Simulation, SimulationOptions, TracingSink};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "hospital-sim", version, about = "Discrete-event hospital simulator")]
struct Args {
    /// Input file (plain token format, or JSON with a .json extension)
    input: PathBuf,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Also print per-stage utilization
    #[arg(long)]
    stats: bool,

    /// Log every simulation event to stderr
    #[arg(short, long)]
    verbose: bool,

    /// Abort after this many events
    #[arg(long, value_name = "N")]
    max_events: Option<usize>,
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            return ExitCode::FAILURE;
        }
        // --help and --version
        Err(e) => e.exit(),
    };

    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = load(&args.input)?;
    tracing::info!(
        patients = config.patients.len(),
        input = %args.input.display(),
        "configuration loaded"
    );

    let options = SimulationOptions {
        max_events: args.max_events,
    };
    let mut sim = Simulation::with_options(&config, options)?;
    if args.verbose {
        sim.add_sink(Box::new(TracingSink));
    }

    let summary = sim.run()?;
    tracing::info!(
        events = summary.events_processed,
        final_time = summary.final_time,
        discharged = summary.discharged,
        "simulation finished"
    );

    let patients = report::patient_reports(&sim);
    let stages = args.stats.then(|| report::stage_summaries(&sim));

    if args.json {
        let output = serde_json::json!({
            "summary": summary,
            "patients": patients,
            "stages": stages,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    for line in &patients {
        println!("{}", line);
    }
    if let Some(stages) = stages {
        println!();
        for stage in &stages {
            println!("{}", stage);
        }
    }
    Ok(())
}
