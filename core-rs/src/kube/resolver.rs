/**
 * resolver.rs
 * Service declaration resolver
 *
 * Single pass over every process (group members first, then standalone)
 * records each exposed or bound declaration in one table keyed by service
 * name, so a name resolves to exactly one Service whatever its kind.
 * Then, for the surviving declarations only:
 * 1. Reserve explicitly requested ports
 * 2. Allocate the lowest free port to every unset entry (exposed first,
 *    each kind in name order)
 * 3. Label the owning pod `service-<name>: expose|bind`
 *
 * Nothing on the experiment changes until the whole pass succeeded.
 */

use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::errors::{KxError, Result};
use crate::experiment::{DuplicateServicePolicy, Experiment, Process};
use crate::kube::service::{service_label, Service, ServiceKind};
use crate::port::PortAllocator;

/// Pod owning a process's declarations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    Group(usize),
    Standalone(usize),
}

#[derive(Debug, Clone)]
struct Declaration {
    kind: ServiceKind,
    port: Option<u16>,
    unit: Unit,
    unit_name: String,
    process: String,
}

struct DeclarationTable {
    policy: DuplicateServicePolicy,
    entries: BTreeMap<String, Declaration>,
}

impl DeclarationTable {
    fn new(policy: DuplicateServicePolicy) -> Self {
        DeclarationTable {
            policy,
            entries: BTreeMap::new(),
        }
    }

    fn record(&mut self, name: &str, declaration: Declaration) -> Result<()> {
        if let Some(previous) = self.entries.get(name) {
            match self.policy {
                DuplicateServicePolicy::Reject => {
                    return Err(KxError::DuplicateService {
                        name: name.to_string(),
                        first: previous.process.clone(),
                        second: declaration.process,
                    });
                }
                DuplicateServicePolicy::Overwrite => {
                    warn!(
                        service = name,
                        replaced = %previous.process,
                        replaced_kind = ?previous.kind,
                        by = %declaration.process,
                        kind = ?declaration.kind,
                        "service declared twice, later declaration wins"
                    );
                }
            }
        }
        self.entries.insert(name.to_string(), declaration);
        Ok(())
    }

    fn of_kind(&self, kind: ServiceKind) -> impl Iterator<Item = (&String, &Declaration)> {
        self.entries.iter().filter(move |(_, d)| d.kind == kind)
    }
}

/// Services of both kinds plus the labels their owning pods receive
struct Resolution {
    exposed: BTreeMap<String, Service>,
    bound: BTreeMap<String, Service>,
    labels: Vec<(Unit, String, &'static str)>,
}

impl DeclarationTable {
    fn resolve(&self, allocator: &mut PortAllocator<'_>) -> Result<Resolution> {
        for declaration in self.entries.values() {
            if let Some(port) = declaration.port {
                allocator.reserve(port);
            }
        }

        let mut resolution = Resolution {
            exposed: BTreeMap::new(),
            bound: BTreeMap::new(),
            labels: Vec::new(),
        };

        for kind in [ServiceKind::Exposed, ServiceKind::Bound] {
            for (name, declaration) in self.of_kind(kind) {
                let port = match declaration.port {
                    Some(port) => port,
                    None => allocator.allocate()?,
                };
                debug!(service = %name, port, kind = ?kind, "service resolved");

                let service = Service::new(name, port, kind, &declaration.unit_name);
                match kind {
                    ServiceKind::Exposed => resolution.exposed.insert(name.clone(), service),
                    ServiceKind::Bound => resolution.bound.insert(name.clone(), service),
                };
                resolution
                    .labels
                    .push((declaration.unit, service_label(name), kind.label_value()));
            }
        }

        Ok(resolution)
    }
}

/// Run the declare phase against `experiment`
pub(crate) fn declare_services(experiment: &mut Experiment) -> Result<()> {
    let mut table = DeclarationTable::new(experiment.duplicate_services());

    for (unit, unit_name, process) in units(experiment) {
        let process_id = match unit {
            Unit::Group(_) => format!("{}/{}", unit_name, process.name()),
            Unit::Standalone(_) => process.name().to_string(),
        };

        for (kind, services) in [
            (ServiceKind::Exposed, process.exposed_services()),
            (ServiceKind::Bound, process.bound_services()),
        ] {
            for (name, port) in services {
                table.record(
                    name,
                    Declaration {
                        kind,
                        port: *port,
                        unit,
                        unit_name: unit_name.to_string(),
                        process: process_id.clone(),
                    },
                )?;
            }
        }
    }

    let mut pool = experiment.port_pool().clone();
    let resolution = {
        let mut allocator = PortAllocator::new(experiment.name(), &mut pool);
        table.resolve(&mut allocator)?
    };

    // Check every owning pod before touching any of them
    for (unit, _, _) in &resolution.labels {
        if let Unit::Standalone(idx) = unit {
            let process = &experiment.processes[*idx];
            if process.pod().is_none() {
                return Err(KxError::ValidationError(format!(
                    "standalone process {} has no pod to label",
                    process.name()
                )));
            }
        }
    }

    for (unit, key, value) in resolution.labels {
        let pod = match unit {
            Unit::Group(idx) => Some(experiment.process_groups[idx].pod_mut()),
            Unit::Standalone(idx) => experiment.processes[idx].pod_mut(),
        };
        if let Some(pod) = pod {
            pod.add_label(&key, value);
        }
    }

    experiment.port_pool = pool;
    experiment.exposed_services = resolution.exposed;
    experiment.bound_services = resolution.bound;
    Ok(())
}

/// Every process with the pod that owns it
fn units(experiment: &Experiment) -> Vec<(Unit, &str, &Process)> {
    let grouped = experiment
        .list_process_groups()
        .iter()
        .enumerate()
        .flat_map(|(idx, group)| {
            group
                .list_processes()
                .iter()
                .map(move |p| (Unit::Group(idx), group.name(), p))
        });
    let standalone = experiment
        .list_processes()
        .iter()
        .enumerate()
        .map(|(idx, p)| (Unit::Standalone(idx), p.name(), p));

    grouped.chain(standalone).collect()
}
