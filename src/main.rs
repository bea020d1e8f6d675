use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use corridor_sim::{ClosestVertex, EndReason, Simulation, SimulationConfig};

/// Runs a corridor traversal simulation and writes its metrics log.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Path to the JSON simulation configuration.
    config: PathBuf,
    /// Where to write the CSV metrics log.
    #[arg(short, long, default_value = "metrics.csv")]
    output: PathBuf,
    /// Real-time pacing factor for live viewers polling the engine;
    /// 0 runs as fast as possible. Has no effect on simulated results.
    #[arg(long, default_value_t = 0.0)]
    playback: f64,
    /// Stop after this many steps even if vehicles remain.
    #[arg(long)]
    max_steps: Option<usize>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = SimulationConfig::from_file(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let mut sim = Simulation::new(&config, &ClosestVertex).context("building simulation")?;

    let mut steps = 0usize;
    while !sim.is_finished() {
        sim.step().context("simulation step failed")?;
        steps += 1;
        if args.max_steps.is_some_and(|max| steps >= max) {
            break;
        }
        if args.playback > 0.0 {
            std::thread::sleep(Duration::from_secs_f64(config.time_step / args.playback));
        }
    }

    let file = File::create(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;
    sim.metrics()
        .write_csv(&mut BufWriter::new(file))
        .context("writing metrics log")?;

    let exited = sim
        .iter_vehicles()
        .filter(|v| v.end_reason() == Some(EndReason::ReachedExit))
        .count();
    println!(
        "{} steps, {} vehicles ({} reached the exit); log written to {}",
        steps,
        sim.iter_vehicles().count(),
        exited,
        args.output.display()
    );
    Ok(())
}
