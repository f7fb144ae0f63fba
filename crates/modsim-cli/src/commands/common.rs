//! Shared helpers for CLI commands.

use std::path::Path;

use anyhow::Context;
use modsim_config::{Bench, SimConfig};
use modsim_core::{Circuit, PortId, PortRole};

/// Loads a bench file and builds it with the configured history depth.
pub fn build_bench(path: &Path, config: &SimConfig) -> anyhow::Result<(Bench, Circuit)> {
    let bench = Bench::load(path)?;
    let circuit = bench
        .build_into(config.new_circuit())
        .with_context(|| format!("building bench '{}'", bench.name))?;
    tracing::info!(
        "loaded bench '{}' from {}: {} modules, {} links",
        bench.name,
        path.display(),
        circuit.module_count(),
        circuit.link_count()
    );
    Ok((bench, circuit))
}

/// A port being printed, as `label.Port name`.
pub struct Watch {
    pub name: String,
    pub port: PortId,
}

/// Resolves `label.Port name` watch specs against a circuit.
pub fn resolve_watches(circuit: &Circuit, specs: &[String]) -> anyhow::Result<Vec<Watch>> {
    specs
        .iter()
        .map(|spec| {
            let (label, port) = spec
                .split_once('.')
                .ok_or_else(|| anyhow::anyhow!("bad watch '{spec}', expected LABEL.PORT"))?;
            let port = circuit
                .find_port(label, port)
                .ok_or_else(|| anyhow::anyhow!("no port '{port}' on module '{label}'"))?;
            Ok(Watch {
                name: spec.clone(),
                port,
            })
        })
        .collect()
}

/// `name=value` for every watch, space-separated.
pub fn format_watches(circuit: &Circuit, watches: &[Watch]) -> String {
    watches
        .iter()
        .map(|w| {
            let value = circuit.value(w.port).map_or_else(|| "-".to_string(), |v| v.to_string());
            format!("{}={}", w.name, value)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Short direction label for a port role.
pub fn role_label(role: PortRole) -> &'static str {
    match role {
        PortRole::Input { .. } => "in",
        PortRole::Output => "out",
        PortRole::Bidir { .. } => "bidir",
    }
}
