//! Lattice scenario runner
//!
//! Usage: `lattice-sim <scenario.json> [ticks] [--events <out.json>] [--save <world.json>]`

use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use lattice_sim::{Error, Scenario, Simulation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const USAGE: &str =
    "usage: lattice-sim <scenario.json> [ticks] [--events <out.json>] [--save <world.json>]";

struct Args {
    scenario: PathBuf,
    ticks: Option<u64>,
    events: Option<PathBuf>,
    save: Option<PathBuf>,
}

fn parse_args() -> Option<Args> {
    let mut args = env::args().skip(1);
    let mut scenario = None;
    let mut ticks = None;
    let mut events = None;
    let mut save = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--events" => events = Some(PathBuf::from(args.next()?)),
            "--save" => save = Some(PathBuf::from(args.next()?)),
            "-h" | "--help" => return None,
            _ if scenario.is_none() => scenario = Some(PathBuf::from(arg)),
            _ if ticks.is_none() => ticks = Some(arg.parse().ok()?),
            _ => return None,
        }
    }

    Some(Args {
        scenario: scenario?,
        ticks,
        events,
        save,
    })
}

fn write_json(path: &Path, value: &impl serde::Serialize) -> Result<(), Error> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn run(args: Args) -> Result<(), Error> {
    let scenario = Scenario::load(&args.scenario)?;
    let ticks = args.ticks.unwrap_or(scenario.ticks);
    let mut sim = Simulation::from_scenario(&scenario)?;

    println!("Lattice Simulation");
    println!("==================");
    println!();
    println!(
        "Scenario: {}",
        scenario.name.as_deref().unwrap_or("unnamed")
    );
    println!("Running {} ticks...", ticks);

    let summary = sim.run(ticks);
    let snapshot = sim.snapshot();

    println!();
    println!("Simulation complete:");
    println!("  Frame: {}", summary.frame);
    println!("  Values forwarded: {}", summary.forwarded);
    println!("  Module faults: {}", summary.faults);
    println!("  Events: {}", sim.timeline().len());
    println!();
    for controller in &snapshot.controllers {
        println!(
            "  Controller {}: {:?}, {} casings, {} ticks",
            controller.pos,
            controller.state,
            controller.casings.len(),
            controller.ticks
        );
    }
    for log in sim.probe_logs() {
        let values: Vec<String> = log.readings.iter().map(|r| r.value.to_string()).collect();
        println!("  Probe {} {}: [{}]", log.pos, log.face, values.join(", "));
    }

    if let Some(path) = &args.events {
        write_json(path, &sim.timeline())?;
        println!();
        println!("Events written to {}", path.display());
    }
    if let Some(path) = &args.save {
        write_json(path, &sim.save()?)?;
        println!("World saved to {}", path.display());
    }

    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lattice_sim=info,lattice_machine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let Some(args) = parse_args() else {
        eprintln!("{USAGE}");
        return ExitCode::from(2);
    };

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "simulation failed");
            ExitCode::FAILURE
        }
    }
}
