/**
 * serializer.rs
 * Experiment ⇄ JSON dictionary
 *
 * Format:
 * ```json
 * {
 *   "name": "exp",
 *   "backend": "kube",
 *   "portrange": "7000-8999",
 *   "duplicateServices": "reject",
 *   "addressPrefix": "SYMPH",
 *   "processGroups": [{"name": "g", "pod": {...}, "processes": [...]}],
 *   "processes": [{"name": "solo", "pod": {...}, ...}]
 * }
 * ```
 *
 * Compile results (`exposedServices`, `boundServices`, `compiled`) are only
 * written once produced.
 */

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::address::DEFAULT_ADDRESS_PREFIX;
use crate::backend::BackendKind;
use crate::errors::Result;
use crate::experiment::{DuplicateServicePolicy, Experiment, Process, ProcessGroup};
use crate::kube::service::Service;
use crate::port::PortPool;

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExperimentDict {
    name: String,
    #[serde(default)]
    backend: BackendKind,
    #[serde(rename = "portrange")]
    port_range: PortPool,
    #[serde(default)]
    duplicate_services: DuplicateServicePolicy,
    #[serde(default = "default_prefix")]
    address_prefix: String,
    #[serde(default)]
    process_groups: Vec<ProcessGroup>,
    #[serde(default)]
    processes: Vec<Process>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    exposed_services: BTreeMap<String, Service>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    bound_services: BTreeMap<String, Service>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    compiled: bool,
}

fn default_prefix() -> String {
    DEFAULT_ADDRESS_PREFIX.to_string()
}

impl Experiment {
    /// Serialize the experiment, port pool included
    pub fn dump_dict(&self) -> Result<Value> {
        let dict = ExperimentDict {
            name: self.name.clone(),
            backend: self.backend,
            port_range: self.port_pool.clone(),
            duplicate_services: self.duplicate_services,
            address_prefix: self.address_prefix.clone(),
            process_groups: self.process_groups.clone(),
            processes: self.processes.clone(),
            exposed_services: self.exposed_services.clone(),
            bound_services: self.bound_services.clone(),
            compiled: self.compiled,
        };
        Ok(serde_json::to_value(dict)?)
    }

    /// Rebuild an experiment from [`dump_dict`](Self::dump_dict) output
    ///
    /// Names go through the same validation as interactive registration.
    ///
    /// # Errors
    /// `MalformedPoolEncoding` for a bad `portrange`, `InvalidName` /
    /// `DuplicateName` for a bad hierarchy.
    pub fn load_dict(value: Value) -> Result<Self> {
        let dict: ExperimentDict = serde_json::from_value(value)?;

        let mut experiment = Experiment::new(&dict.name)?;
        experiment.set_backend(dict.backend);
        experiment.set_address_prefix(&dict.address_prefix)?;
        experiment.set_duplicate_services(dict.duplicate_services);

        for group in dict.process_groups {
            experiment.add_process_group(group.validated()?)?;
        }
        for process in dict.processes {
            experiment.add_process(process.validated()?)?;
        }

        experiment.port_pool = dict.port_range;
        experiment.exposed_services = dict.exposed_services;
        experiment.bound_services = dict.bound_services;
        experiment.compiled = dict.compiled;

        Ok(experiment)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.dump_dict()?)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Self::load_dict(serde_json::from_str(json)?)
    }
}
