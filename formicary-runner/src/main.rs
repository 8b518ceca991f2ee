//! Headless host: runs the foraging simulation at a fixed framerate and
//! streams world snapshots to stdout as JSON lines.

use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use hdrhistogram::Histogram;

use formicary_config::load_config;
use formicary_simulation::Simulation;

#[derive(Parser, Debug)]
#[command(author, version, about = "Ant-colony foraging simulation runner")]
struct Args {
    /// Path to the simulation configuration file
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Stop after this many ticks; runs until interrupted by default
    #[arg(short, long)]
    ticks: Option<u64>,

    /// Emit a snapshot line every N ticks; 0 disables snapshot output
    #[arg(short, long, default_value_t = 1)]
    snapshot_every: u64,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let config = match load_config(&args.config) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("failed to load config {}: {}", args.config.display(), err);
            process::exit(1);
        }
    };
    let framerate = config.framerate;

    let mut sim = match Simulation::new(config) {
        Ok(sim) => sim,
        Err(err) => {
            eprintln!("failed to start simulation: {}", err);
            process::exit(1);
        }
    };

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        if let Err(err) = ctrlc::set_handler(move || running.store(false, Ordering::SeqCst)) {
            log::warn!("could not install interrupt handler: {}", err);
        }
    }

    log::info!("running at {} ticks per second", framerate);

    let frame_duration = Duration::from_secs_f64(1.0 / f64::from(framerate));
    let sleeper = spin_sleep::SpinSleeper::default();
    let mut step_micros =
        Histogram::<u64>::new(3).expect("histogram with default bounds is valid");

    // The first tick gets the nominal frame delta; later ticks use the
    // measured duration of the previous frame.
    let mut delta = frame_duration.as_secs_f32();

    while running.load(Ordering::SeqCst) {
        if let Some(limit) = args.ticks {
            if sim.tick() >= limit {
                break;
            }
        }
        let frame_start = Instant::now();

        sim.step(delta);
        let step_elapsed = frame_start.elapsed();
        let _ = step_micros.record(step_elapsed.as_micros() as u64);

        if args.snapshot_every > 0 && sim.tick() % args.snapshot_every == 0 {
            match serde_json::to_string(&sim.snapshot()) {
                Ok(line) => println!("{}", line),
                Err(err) => log::error!("snapshot serialization failed: {}", err),
            }
        }

        let elapsed = frame_start.elapsed();
        if elapsed < frame_duration {
            sleeper.sleep(frame_duration - elapsed);
        } else {
            log::warn!(
                "frame over budget: {:?} > {:?} at tick {}",
                elapsed,
                frame_duration,
                sim.tick()
            );
        }
        delta = frame_start.elapsed().as_secs_f32();
    }

    report(&step_micros, &sim);
}

fn report(step_micros: &Histogram<u64>, sim: &Simulation) {
    log::info!(
        "finished: {} ticks, {:.1}s simulated, {} food delivered",
        sim.tick(),
        sim.elapsed_seconds(),
        sim.delivered()
    );
    if step_micros.is_empty() {
        return;
    }
    log::info!(
        "step time: mean {:.0}us, p50 {}us, p99 {}us, max {}us",
        step_micros.mean(),
        step_micros.value_at_quantile(0.50),
        step_micros.value_at_quantile(0.99),
        step_micros.max()
    );
}
