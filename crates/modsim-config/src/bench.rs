//! Bench files: a circuit described in TOML.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use modsim_core::{Circuit, DataMap, LinkPath, Module, ModuleId, PortId};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A circuit stored as modules and labelled links.
///
/// Links name their ends as `label.Port name`. Direction is negotiated when
/// the bench is built, so either order works for fixed-direction ports; for
/// two undecided bidirectional ports `from` drives `to`.
///
/// # TOML Format
///
/// ```toml
/// name = "accumulator"
///
/// [[modules]]
/// label = "clk"
/// kind = "clock"
///
/// [[modules]]
/// label = "acc"
/// kind = "register"
/// x = 120.0
/// y = 40.0
/// [modules.data]
/// latched_value = "0011"
///
/// [[links]]
/// from = "clk.Phase 1"
/// to = "acc.Control in"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Bench {
    /// Name of the bench.
    pub name: String,

    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Modules in creation order.
    #[serde(default)]
    pub modules: Vec<ModuleSpec>,

    /// Links in creation order.
    #[serde(default)]
    pub links: Vec<LinkSpec>,
}

/// One module of a bench.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ModuleSpec {
    /// Unique label, used by link endpoints.
    pub label: String,

    /// Module type name, as accepted by [`Module::from_name`].
    pub kind: String,

    /// Horizontal position.
    #[serde(default)]
    pub x: f64,

    /// Vertical position.
    #[serde(default)]
    pub y: f64,

    /// Persistent module state, as read by the module's `data_in`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: DataMap,
}

impl ModuleSpec {
    /// A module at the origin with no data.
    pub fn new(label: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            kind: kind.into(),
            ..Self::default()
        }
    }

    /// Sets one data entry.
    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

/// One link of a bench.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct LinkSpec {
    /// Driving end, `label.Port name`.
    pub from: String,

    /// Driven end, `label.Port name`.
    pub to: String,

    /// Wire route points.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<[f64; 2]>,
}

impl LinkSpec {
    /// A link with no route.
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            path: Vec::new(),
        }
    }
}

impl Bench {
    /// Create an empty bench.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Add a module.
    #[must_use]
    pub fn with_module(mut self, module: ModuleSpec) -> Self {
        self.modules.push(module);
        self
    }

    /// Add a link.
    #[must_use]
    pub fn with_link(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.links.push(LinkSpec::new(from, to));
        self
    }

    /// Load a bench from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml(&content)
    }

    /// Load a bench from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Convert the bench to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Save the bench to a TOML file, creating the parent directory.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }
        std::fs::write(path, self.to_toml()?).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Builds the bench into a new circuit with the default history depth.
    pub fn build(&self) -> Result<Circuit, ConfigError> {
        self.build_into(Circuit::new())
    }

    /// Builds the bench into `circuit`.
    ///
    /// Modules are built with their data already loaded, then links are
    /// created and the data is loaded once more, all under one deferral guard
    /// so each touched module propagates once the whole bench is in place.
    /// The history is cleared afterwards; a freshly loaded bench has nothing
    /// to undo.
    pub fn build_into(&self, mut circuit: Circuit) -> Result<Circuit, ConfigError> {
        circuit.begin_defer();
        let populated = self.populate(&mut circuit);
        let flushed = circuit.end_defer();
        populated?;
        flushed?;
        circuit.clear_history();
        Ok(circuit)
    }

    fn populate(&self, circuit: &mut Circuit) -> Result<(), ConfigError> {
        let mut labels: HashMap<&str, ModuleId> = HashMap::new();
        for spec in &self.modules {
            if labels.contains_key(spec.label.as_str()) {
                return Err(ConfigError::DuplicateLabel(spec.label.clone()));
            }
            let module = Module::from_name(&spec.kind)
                .ok_or_else(|| ConfigError::UnknownModule(spec.kind.clone()))?
                .with_label(&spec.label)
                .at(spec.x, spec.y)
                .with_data(&spec.data)?;
            labels.insert(spec.label.as_str(), circuit.add_module(module));
        }

        for link in &self.links {
            let from = resolve(circuit, &labels, &link.from)?;
            let to = resolve(circuit, &labels, &link.to)?;
            let path = LinkPath::new(link.path.iter().map(|[x, y]| (*x, *y)).collect());
            let id = circuit
                .create_link(from, to, path)
                .map_err(|source| ConfigError::Link {
                    from: link.from.clone(),
                    to: link.to.clone(),
                    source,
                })?;
            if let Some(target) = circuit.link(id).map(|l| l.target) {
                circuit.propagate(target.module)?;
            }
        }

        // Latches with an unlinked control follow their data input, so the
        // first load can be overwritten while settling. Load again now that
        // the clock wiring is in place.
        for spec in self.modules.iter().filter(|m| !m.data.is_empty()) {
            if let Some(&id) = labels.get(spec.label.as_str()) {
                circuit.load_module_data(id, &spec.data)?;
            }
        }
        Ok(())
    }

    /// Describes a circuit as a bench.
    ///
    /// Modules keep their labels where those are unique and non-empty;
    /// the rest are named after their type and ID.
    pub fn capture(name: impl Into<String>, circuit: &Circuit) -> Self {
        // Usable labels are reserved first so generated ones cannot take them.
        let mut used: HashSet<String> = HashSet::new();
        let mut kept: HashSet<ModuleId> = HashSet::new();
        for (id, module) in circuit.modules() {
            let label = module.label();
            if !label.is_empty() && !label.contains('.') && used.insert(label.to_string()) {
                kept.insert(id);
            }
        }

        let mut labels: HashMap<ModuleId, String> = HashMap::new();
        let mut modules = Vec::new();
        for (id, module) in circuit.modules() {
            let label = if kept.contains(&id) {
                module.label().to_string()
            } else {
                let mut n = id.index();
                loop {
                    let candidate = format!("{}{n}", module.name());
                    if used.insert(candidate.clone()) {
                        break candidate;
                    }
                    n += 1;
                }
            };
            labels.insert(id, label.clone());
            let (x, y) = module.position();
            modules.push(ModuleSpec {
                label,
                kind: module.name().to_string(),
                x,
                y,
                data: module.data_out(),
            });
        }

        let endpoint = |port: PortId| -> Option<String> {
            let label = labels.get(&port.module)?;
            let name = circuit.port(port)?.name();
            Some(format!("{label}.{name}"))
        };
        let links = circuit
            .links()
            .filter_map(|l| {
                Some(LinkSpec {
                    from: endpoint(l.source)?,
                    to: endpoint(l.target)?,
                    path: l.path.points.iter().map(|&(x, y)| [x, y]).collect(),
                })
            })
            .collect();

        Self {
            name: name.into(),
            description: None,
            modules,
            links,
        }
    }
}

fn resolve(circuit: &Circuit, labels: &HashMap<&str, ModuleId>, endpoint: &str) -> Result<PortId, ConfigError> {
    let (label, port) = endpoint
        .split_once('.')
        .ok_or_else(|| ConfigError::BadEndpoint(endpoint.to_string()))?;
    let unknown = || ConfigError::UnknownPort {
        module: label.to_string(),
        port: port.to_string(),
    };
    let id = *labels.get(label).ok_or_else(unknown)?;
    let index = circuit.module(id).and_then(|m| m.port_index(port)).ok_or_else(unknown)?;
    Ok(PortId::new(id, index))
}
