//! Experiment hierarchy: groups, processes and the compile entry point

mod group;
mod process;
mod serializer;

pub use group::ProcessGroup;
pub use process::{Process, ProcessConfig, ServiceMap};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::address::{validate_prefix, DEFAULT_ADDRESS_PREFIX};
use crate::backend::{backend_for, BackendKind, ManifestComponent};
use crate::errors::{KxError, Result};
use crate::kube::service::Service;
use crate::naming::sanitize_name;
use crate::port::{PortPool, PortRange};

/// What to do when two processes declare the same service name
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateServicePolicy {
    /// Fail the compile with `DuplicateService`
    #[default]
    Reject,
    /// Later declaration wins, with a warning
    Overwrite,
}

/// Root of the object graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Experiment {
    pub(crate) name: String,
    pub(crate) backend: BackendKind,
    pub(crate) port_pool: PortPool,
    pub(crate) duplicate_services: DuplicateServicePolicy,
    pub(crate) address_prefix: String,
    pub(crate) process_groups: Vec<ProcessGroup>,
    pub(crate) processes: Vec<Process>,
    pub(crate) exposed_services: BTreeMap<String, Service>,
    pub(crate) bound_services: BTreeMap<String, Service>,
    pub(crate) compiled: bool,
}

impl Experiment {
    /// New experiment over the default 7000-8999 pool
    pub fn new(name: &str) -> Result<Self> {
        Ok(Experiment {
            name: sanitize_name(name)?,
            backend: BackendKind::default(),
            port_pool: PortPool::from_range(PortRange::default()),
            duplicate_services: DuplicateServicePolicy::default(),
            address_prefix: DEFAULT_ADDRESS_PREFIX.to_string(),
            process_groups: Vec::new(),
            processes: Vec::new(),
            exposed_services: BTreeMap::new(),
            bound_services: BTreeMap::new(),
            compiled: false,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    pub fn set_backend(&mut self, backend: BackendKind) {
        self.backend = backend;
    }

    pub fn port_pool(&self) -> &PortPool {
        &self.port_pool
    }

    /// Replace the pool with one contiguous range
    ///
    /// # Errors
    /// `ValidationError` when `start` is above `end`.
    pub fn set_port_range(&mut self, range: PortRange) -> Result<()> {
        if range.start > range.end {
            return Err(KxError::ValidationError(format!(
                "port range {}-{} has start above end",
                range.start, range.end
            )));
        }
        self.port_pool = PortPool::from_range(range);
        Ok(())
    }

    pub fn set_port_pool(&mut self, pool: PortPool) {
        self.port_pool = pool;
    }

    pub fn duplicate_services(&self) -> DuplicateServicePolicy {
        self.duplicate_services
    }

    pub fn set_duplicate_services(&mut self, policy: DuplicateServicePolicy) {
        self.duplicate_services = policy;
    }

    pub fn address_prefix(&self) -> &str {
        &self.address_prefix
    }

    pub fn set_address_prefix(&mut self, prefix: &str) -> Result<()> {
        validate_prefix(prefix)?;
        self.address_prefix = prefix.to_string();
        Ok(())
    }

    /// Groups and standalone processes both name a Pod, so they share one namespace
    fn ensure_unit_name_free(&self, name: &str) -> Result<()> {
        let taken = self.process_groups.iter().any(|g| g.name() == name)
            || self.processes.iter().any(|p| p.name() == name);
        if taken {
            return Err(KxError::DuplicateName(format!(
                "{} already names a group or process in experiment {}",
                name, self.name
            )));
        }
        Ok(())
    }

    pub fn new_process_group(&mut self, name: &str) -> Result<&mut ProcessGroup> {
        self.add_process_group(ProcessGroup::new(name)?)
    }

    pub fn add_process_group(&mut self, group: ProcessGroup) -> Result<&mut ProcessGroup> {
        self.ensure_unit_name_free(group.name())?;
        self.process_groups.push(group);
        let last = self.process_groups.len() - 1;
        Ok(&mut self.process_groups[last])
    }

    /// Register a standalone process with its own pod
    pub fn new_process(&mut self, config: ProcessConfig) -> Result<&mut Process> {
        self.add_process(Process::standalone(config)?)
    }

    pub fn add_process(&mut self, process: Process) -> Result<&mut Process> {
        if !process.is_standalone() {
            return Err(KxError::ValidationError(format!(
                "process {} has no pod; create it with Process::standalone",
                process.name()
            )));
        }
        self.ensure_unit_name_free(process.name())?;
        self.processes.push(process);
        let last = self.processes.len() - 1;
        Ok(&mut self.processes[last])
    }

    pub fn get_process_group(&self, name: &str) -> Option<&ProcessGroup> {
        self.process_groups.iter().find(|g| g.name() == name)
    }

    pub fn get_process_group_mut(&mut self, name: &str) -> Option<&mut ProcessGroup> {
        self.process_groups.iter_mut().find(|g| g.name() == name)
    }

    /// Look up a member process by group and name
    pub fn group_process_mut(&mut self, group: &str, process: &str) -> Result<&mut Process> {
        let group_ref = self
            .process_groups
            .iter_mut()
            .find(|g| g.name() == group)
            .ok_or_else(|| KxError::GroupNotFound(group.to_string()))?;
        group_ref.get_process_mut(process).ok_or_else(|| {
            KxError::ValidationError(format!("no process {} in group {}", process, group))
        })
    }

    pub fn get_process(&self, name: &str) -> Option<&Process> {
        self.processes.iter().find(|p| p.name() == name)
    }

    pub fn get_process_mut(&mut self, name: &str) -> Option<&mut Process> {
        self.processes.iter_mut().find(|p| p.name() == name)
    }

    /// Standalone processes in registration order
    pub fn list_processes(&self) -> &[Process] {
        &self.processes
    }

    /// Groups in registration order
    pub fn list_process_groups(&self) -> &[ProcessGroup] {
        &self.process_groups
    }

    /// Group members (group by group), then standalone processes
    pub fn list_all_processes(&self) -> Vec<&Process> {
        self.process_groups
            .iter()
            .flat_map(|g| g.list_processes().iter())
            .chain(self.processes.iter())
            .collect()
    }

    pub(crate) fn all_processes_mut(&mut self) -> impl Iterator<Item = &mut Process> {
        self.process_groups
            .iter_mut()
            .flat_map(|g| g.processes_mut())
            .chain(self.processes.iter_mut())
    }

    /// Exposed services resolved by the last compile
    pub fn exposed_services(&self) -> &BTreeMap<String, Service> {
        &self.exposed_services
    }

    /// Bound services resolved by the last compile
    pub fn bound_services(&self) -> &BTreeMap<String, Service> {
        &self.bound_services
    }

    pub fn is_compiled(&self) -> bool {
        self.compiled
    }

    /// Compile with the configured backend into one multi-document manifest
    ///
    /// On error nothing is changed and the experiment can be fixed and
    /// compiled again.
    pub fn compile(&mut self) -> Result<String> {
        backend_for(self.backend).compile(self)
    }

    /// Compile and keep the named components instead of concatenating them
    pub fn compile_components(&mut self) -> Result<Vec<ManifestComponent>> {
        backend_for(self.backend).compile_components(self)
    }
}
