//! Named set of processes deployed together in one Pod

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::errors::{KxError, Result};
use crate::experiment::process::{Process, ProcessConfig};
use crate::kube::container::ImagePullPolicy;
use crate::kube::pod::{PodDescriptor, RestartPolicy, Toleration, Volume};
use crate::naming::{sanitize_name, strip_repository_name};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessGroup {
    name: String,
    pod: PodDescriptor,
    #[serde(default)]
    processes: Vec<Process>,
}

impl ProcessGroup {
    pub fn new(name: &str) -> Result<Self> {
        let name = sanitize_name(name)?;
        Ok(ProcessGroup {
            pod: PodDescriptor::new(&name),
            name,
            processes: Vec::new(),
        })
    }

    pub(crate) fn validated(mut self) -> Result<Self> {
        self.name = sanitize_name(&self.name)?;
        self.pod.check_owner(&self.name)?;
        let members = std::mem::take(&mut self.processes);
        for process in members {
            self.add_process(process.validated()?)?;
        }
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pod(&self) -> &PodDescriptor {
        &self.pod
    }

    pub fn pod_mut(&mut self) -> &mut PodDescriptor {
        &mut self.pod
    }

    /// Register a new member process
    pub fn new_process(&mut self, config: ProcessConfig) -> Result<&mut Process> {
        self.add_process(Process::new(config)?)
    }

    /// Register an existing process; it gives up any pod of its own
    pub fn add_process(&mut self, mut process: Process) -> Result<&mut Process> {
        if self.get_process(process.name()).is_some() {
            return Err(KxError::DuplicateName(format!(
                "process {} already exists in group {}",
                process.name(),
                self.name
            )));
        }
        process.detach_pod();
        self.processes.push(process);
        let last = self.processes.len() - 1;
        Ok(&mut self.processes[last])
    }

    pub fn get_process(&self, name: &str) -> Option<&Process> {
        self.processes.iter().find(|p| p.name() == name)
    }

    pub fn get_process_mut(&mut self, name: &str) -> Option<&mut Process> {
        self.processes.iter_mut().find(|p| p.name() == name)
    }

    /// Members in registration order
    pub fn list_processes(&self) -> &[Process] {
        &self.processes
    }

    pub(crate) fn processes_mut(&mut self) -> impl Iterator<Item = &mut Process> {
        self.processes.iter_mut()
    }

    // Pod level

    pub fn add_label(&mut self, key: &str, value: &str) {
        self.pod.add_label(key, value);
    }

    pub fn add_labels<I, K, V>(&mut self, labels: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.pod.add_labels(labels);
    }

    pub fn restart_policy(&mut self, policy: RestartPolicy) {
        self.pod.set_restart_policy(policy);
    }

    pub fn node_selector(&mut self, key: &str, value: &str) {
        self.pod.node_selector(key, value);
    }

    pub fn add_toleration(&mut self, toleration: Toleration) {
        self.pod.add_toleration(toleration);
    }

    // Batch methods

    /// Attach `volume` to the pod and mount it in every current member
    pub fn mount_volume(&mut self, volume: Volume, mount_path: &str) -> Result<()> {
        let name = self.pod.add_volume(volume)?;
        for process in &mut self.processes {
            process.add_volume_mount(&name, mount_path);
        }
        Ok(())
    }

    /// Attach `volume` to the pod and mount it in one member
    pub fn mount_volume_on(&mut self, process: &str, volume: Volume, mount_path: &str) -> Result<()> {
        let member = self
            .processes
            .iter_mut()
            .find(|p| p.name() == process)
            .ok_or_else(|| {
                KxError::ValidationError(format!("no process {} in group {}", process, self.name))
            })?;
        let name = self.pod.add_volume(volume)?;
        member.add_volume_mount(&name, mount_path);
        Ok(())
    }

    /// Volume name defaults to the server, sanitized
    pub fn mount_nfs(
        &mut self,
        server: &str,
        path: &str,
        mount_path: &str,
        name: Option<&str>,
    ) -> Result<()> {
        let name = name.unwrap_or(server);
        self.mount_volume(Volume::nfs(name, server, path), mount_path)
    }

    pub fn mount_secret(
        &mut self,
        secret_name: &str,
        mount_path: &str,
        default_mode: Option<u32>,
        name: Option<&str>,
    ) -> Result<()> {
        let name = name.unwrap_or(secret_name);
        self.mount_volume(Volume::secret(name, secret_name, default_mode), mount_path)
    }

    pub fn mount_git_repo(
        &mut self,
        repository: &str,
        revision: Option<&str>,
        mount_path: &str,
        name: Option<&str>,
    ) -> Result<()> {
        let name = name
            .map(str::to_string)
            .unwrap_or_else(|| strip_repository_name(repository));
        self.mount_volume(Volume::git_repo(&name, repository, revision), mount_path)
    }

    pub fn mount_host_path(
        &mut self,
        path: &str,
        mount_path: &str,
        hostpath_type: &str,
        name: Option<&str>,
    ) -> Result<()> {
        let name = name.unwrap_or_else(|| path.rsplit('/').next().unwrap_or(path));
        self.mount_volume(Volume::host_path(name, path, hostpath_type), mount_path)
    }

    pub fn mount_empty_dir(&mut self, name: &str, use_memory: bool, mount_path: &str) -> Result<()> {
        self.mount_volume(Volume::empty_dir(name, use_memory), mount_path)
    }

    /// Memory-backed /dev/shm for every member
    pub fn mount_shared_memory(&mut self, name: Option<&str>) -> Result<()> {
        self.mount_empty_dir(name.unwrap_or("devshm"), true, "/dev/shm")
    }

    pub fn image_pull_policy(&mut self, policy: ImagePullPolicy) {
        for process in &mut self.processes {
            process.set_image_pull_policy(policy);
        }
    }

    pub fn set_env(&mut self, name: &str, value: &str) {
        for process in &mut self.processes {
            process.set_env(name, value);
        }
    }

    pub fn set_envs(&mut self, envs: &BTreeMap<String, String>) {
        for process in &mut self.processes {
            process.set_envs(envs);
        }
    }

    /// Render the group as one Pod, one container per member
    pub fn render(&self) -> Result<String> {
        let members: Vec<&Process> = self.processes.iter().collect();
        self.pod.render(&members)
    }
}
