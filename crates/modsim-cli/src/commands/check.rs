//! Build a bench and report on it.

use std::path::PathBuf;

use clap::Args;
use modsim_config::{Bench, SimConfig};
use modsim_core::PortId;

use super::common::build_bench;

#[derive(Args)]
pub struct CheckArgs {
    /// Bench file (TOML)
    #[arg(value_name = "BENCH")]
    bench: PathBuf,

    /// List every module and link
    #[arg(short, long)]
    verbose: bool,

    /// Write the built circuit back out as a normalized bench
    #[arg(long, value_name = "FILE")]
    save: Option<PathBuf>,
}

pub fn run(args: CheckArgs, config: &SimConfig) -> anyhow::Result<()> {
    let (bench, circuit) = build_bench(&args.bench, config)?;

    println!("{}", bench.name);
    println!("{}", "=".repeat(bench.name.len()));
    if let Some(description) = &bench.description {
        println!("{description}");
    }
    println!();
    println!("  Modules: {}", circuit.module_count());
    println!("  Links:   {}", circuit.link_count());
    println!("  Clocks:  {}", circuit.roots().len());

    if args.verbose {
        println!();
        for (id, module) in circuit.modules() {
            println!("  {:>4}  {:12}  {}", id.index(), module.name(), module.label());
        }
        println!();
        for link in circuit.links() {
            let end = |id: PortId| {
                let label = circuit.module(id.module).map_or("?", |m| m.label());
                let port = circuit.port(id).map_or("?", |p| p.name());
                format!("{label}.{port}")
            };
            println!("  {} -> {}", end(link.source), end(link.target));
        }
    }

    if let Some(path) = &args.save {
        Bench::capture(bench.name.clone(), &circuit).save(path)?;
        println!();
        println!("Saved to {}", path.display());
    }

    println!();
    println!("OK");
    Ok(())
}
