//! Run a bench.
//!
//! With `--ticks N` the clock is stepped synchronously and watched ports are
//! printed after every tick. Without it the bench free-runs on the ticker
//! thread until Ctrl+C or a loop halts it, printing watched ports whenever
//! they change.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Args;
use modsim_config::SimConfig;
use modsim_core::{Circuit, Simulation};

use super::common::{Watch, build_bench, format_watches, resolve_watches};

#[derive(Args)]
pub struct RunArgs {
    /// Bench file (TOML)
    #[arg(value_name = "BENCH")]
    bench: PathBuf,

    /// Step the clock this many times, then exit
    #[arg(short, long)]
    ticks: Option<u64>,

    /// Port to print, as LABEL.PORT (repeatable)
    #[arg(short, long, value_name = "LABEL.PORT")]
    watch: Vec<String>,

    /// Pause between ticks when free-running, in microseconds
    #[arg(long, value_name = "US")]
    interval_us: Option<u64>,
}

pub fn run(args: RunArgs, config: &SimConfig) -> anyhow::Result<()> {
    let (bench, circuit) = build_bench(&args.bench, config)?;
    let watches = resolve_watches(&circuit, &args.watch)?;
    println!(
        "Running '{}': {} modules, {} links",
        bench.name,
        circuit.module_count(),
        circuit.link_count()
    );

    match args.ticks {
        Some(ticks) => run_ticks(circuit, &watches, ticks),
        None => {
            let interval = args
                .interval_us
                .map_or_else(|| config.tick_interval(), Duration::from_micros);
            free_run(circuit, &watches, interval)
        }
    }
}

fn run_ticks(mut circuit: Circuit, watches: &[Watch], ticks: u64) -> anyhow::Result<()> {
    println!("tick 0: {}", format_watches(&circuit, watches));
    for _ in 0..ticks {
        circuit.step()?;
        tracing::trace!("tick {}", circuit.ticks());
        println!("tick {}: {}", circuit.ticks(), format_watches(&circuit, watches));
    }
    Ok(())
}

fn free_run(circuit: Circuit, watches: &[Watch], interval: Duration) -> anyhow::Result<()> {
    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupted);
    ctrlc::set_handler(move || {
        println!("\nStopping...");
        flag.store(true, Ordering::SeqCst);
    })?;

    let mut sim = Simulation::new(circuit);
    sim.set_tick_interval(interval);
    println!("Tick every {interval:?}. Press Ctrl+C to stop...\n");
    sim.start();

    let mut last = String::new();
    while sim.is_running() && !interrupted.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(50));
        let circuit = sim.lock();
        let line = format_watches(&circuit, watches);
        if !watches.is_empty() && line != last {
            println!("tick {}: {}", circuit.ticks(), line);
            last = line;
        }
    }
    sim.stop();

    let mut circuit = sim.lock();
    if let Some(err) = circuit.take_notice() {
        tracing::error!("ticker halted: {err}");
        anyhow::bail!("simulation halted after {} ticks: {err}", circuit.ticks());
    }
    tracing::info!("ticker stopped after {} ticks", circuit.ticks());
    println!("Stopped after {} ticks", circuit.ticks());
    Ok(())
}
