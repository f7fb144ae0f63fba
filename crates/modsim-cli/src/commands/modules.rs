//! Module type listing.

#![allow(clippy::print_literal)] // Table headers use literal strings intentionally

use clap::Args;
use modsim_core::{Module, ModuleKind};

use super::common::role_label;

#[derive(Args)]
pub struct ModulesArgs {
    /// Show the ports of one module type
    #[arg(value_name = "TYPE")]
    kind: Option<String>,
}

pub fn run(args: ModulesArgs) -> anyhow::Result<()> {
    let Some(kind) = &args.kind else {
        println!("Available Modules");
        println!("=================");
        println!();
        for name in ModuleKind::NAMES {
            let ports = Module::from_name(name).map_or(0, |m| m.ports().len());
            println!("  {name:12}  {ports:2} ports");
        }
        println!();
        println!("Use 'modsim modules <TYPE>' for port details.");
        return Ok(());
    };

    let module = Module::from_name(kind).ok_or_else(|| anyhow::anyhow!("Unknown module type: {kind}"))?;

    println!("{}", module.name());
    println!("{}", "=".repeat(module.name().len()));
    println!();
    if module.is_cycle_breaking() {
        println!("Stores state: breaks combinational loops.");
    }
    if module.is_autonomous() {
        println!("Clock source: advanced on every tick.");
    }
    println!();
    println!("  {:>3}  {:18}  {:5}  {:8}  {}", "#", "Port", "Dir", "Kind", "Initial");
    println!("  {:>3}  {:18}  {:5}  {:8}  {}", "-", "----", "---", "----", "-------");
    for (i, port) in module.ports().iter().enumerate() {
        println!(
            "  {:>3}  {:18}  {:5}  {:8}  {}",
            i,
            port.name(),
            role_label(port.role()),
            format!("{:?}", port.kind()),
            port.value()
        );
    }
    Ok(())
}
