//! Leaf unit of work: one container in a rendered Pod

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

use crate::errors::{KxError, Result};
use crate::kube::container::ImagePullPolicy;
use crate::kube::pod::{PodDescriptor, Volume, VolumeMount};
use crate::naming::sanitize_name;

/// Declared services: name → explicit port, or `None` to allocate one
pub type ServiceMap = BTreeMap<String, Option<u16>>;

/// User-facing description of a process
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessConfig {
    pub name: String,
    #[serde(default)]
    pub image: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,
    #[serde(default)]
    pub exposed_services: ServiceMap,
    #[serde(default)]
    pub bound_services: ServiceMap,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Process {
    #[serde(flatten)]
    config: ProcessConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    volume_mounts: Vec<VolumeMount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image_pull_policy: Option<ImagePullPolicy>,
    /// Own pod when standalone; grouped processes share their group's pod
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pod: Option<PodDescriptor>,
}

impl Process {
    /// Build a grouped process, sanitizing its name and service names
    pub fn new(config: ProcessConfig) -> Result<Self> {
        Process {
            config,
            volume_mounts: Vec::new(),
            image_pull_policy: None,
            pod: None,
        }
        .validated()
    }

    /// Build a standalone process with a pod of its own
    pub fn standalone(config: ProcessConfig) -> Result<Self> {
        let mut process = Process::new(config)?;
        process.pod = Some(PodDescriptor::new(process.name()));
        Ok(process)
    }

    /// Re-run name sanitization; idempotent for already-valid names
    ///
    /// An own pod must carry the process name.
    pub(crate) fn validated(mut self) -> Result<Self> {
        self.config.name = sanitize_name(&self.config.name)?;
        self.config.exposed_services = sanitize_services(&self.config.exposed_services)?;
        self.config.bound_services = sanitize_services(&self.config.bound_services)?;
        if let Some(pod) = &self.pod {
            pod.check_owner(&self.config.name)?;
        }
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn image(&self) -> &str {
        &self.config.image
    }

    pub fn command(&self) -> &[String] {
        &self.config.command
    }

    pub fn args(&self) -> &[String] {
        &self.config.args
    }

    pub fn working_dir(&self) -> Option<&str> {
        self.config.working_dir.as_deref()
    }

    pub fn exposed_services(&self) -> &ServiceMap {
        &self.config.exposed_services
    }

    pub fn bound_services(&self) -> &ServiceMap {
        &self.config.bound_services
    }

    /// Declare an externally reachable service
    pub fn expose(&mut self, service: &str, port: Option<u16>) -> Result<()> {
        let service = sanitize_name(service)?;
        self.config.exposed_services.insert(service, port);
        Ok(())
    }

    /// Declare a cluster-internal service
    pub fn bind(&mut self, service: &str, port: Option<u16>) -> Result<()> {
        let service = sanitize_name(service)?;
        self.config.bound_services.insert(service, port);
        Ok(())
    }

    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.config.env
    }

    pub fn set_env(&mut self, name: &str, value: &str) {
        self.config.env.insert(name.to_string(), value.to_string());
    }

    pub fn set_envs(&mut self, envs: &BTreeMap<String, String>) {
        for (name, value) in envs {
            self.set_env(name, value);
        }
    }

    /// Merge discovered addresses into the environment
    ///
    /// A variable the user already set to a different value is kept and
    /// reported. Returns the number of such collisions.
    pub(crate) fn merge_address_env(&mut self, discovered: &BTreeMap<String, String>) -> usize {
        let mut collisions = 0;

        for (name, value) in discovered {
            match self.config.env.get(name) {
                Some(existing) if existing != value => {
                    warn!(
                        process = %self.config.name,
                        variable = %name,
                        kept = %existing,
                        discovered = %value,
                        "explicit env var shadows discovered address"
                    );
                    collisions += 1;
                }
                _ => {
                    self.config.env.insert(name.clone(), value.clone());
                }
            }
        }

        collisions
    }

    pub fn volume_mounts(&self) -> &[VolumeMount] {
        &self.volume_mounts
    }

    pub(crate) fn add_volume_mount(&mut self, name: &str, mount_path: &str) {
        let mount = VolumeMount {
            name: name.to_string(),
            mount_path: mount_path.to_string(),
        };
        if !self.volume_mounts.contains(&mount) {
            self.volume_mounts.push(mount);
        }
    }

    /// Attach a volume to a standalone process's pod and mount it
    ///
    /// # Errors
    /// Grouped processes share their group's pod; mount through
    /// [`ProcessGroup::mount_volume_on`](crate::experiment::ProcessGroup::mount_volume_on).
    pub fn mount_volume(&mut self, volume: Volume, mount_path: &str) -> Result<()> {
        let pod = self.pod.as_mut().ok_or_else(|| {
            KxError::ValidationError(format!(
                "process {} is grouped; mount volumes through its group",
                self.config.name
            ))
        })?;
        let name = pod.add_volume(volume)?;
        self.add_volume_mount(&name, mount_path);
        Ok(())
    }

    pub fn image_pull_policy(&self) -> Option<ImagePullPolicy> {
        self.image_pull_policy
    }

    pub fn set_image_pull_policy(&mut self, policy: ImagePullPolicy) {
        self.image_pull_policy = Some(policy);
    }

    pub fn is_standalone(&self) -> bool {
        self.pod.is_some()
    }

    pub fn pod(&self) -> Option<&PodDescriptor> {
        self.pod.as_ref()
    }

    pub fn pod_mut(&mut self) -> Option<&mut PodDescriptor> {
        self.pod.as_mut()
    }

    pub(crate) fn detach_pod(&mut self) {
        self.pod = None;
    }

    /// Render a standalone process as its own Pod
    pub fn render(&self) -> Result<String> {
        match &self.pod {
            Some(pod) => pod.render(&[self]),
            None => Err(KxError::ValidationError(format!(
                "process {} is grouped; render its group instead",
                self.config.name
            ))),
        }
    }
}

fn sanitize_services(services: &ServiceMap) -> Result<ServiceMap> {
    let mut sanitized = ServiceMap::new();
    for (name, port) in services {
        let clean = sanitize_name(name)?;
        if sanitized.insert(clean.clone(), *port).is_some() {
            return Err(KxError::DuplicateName(format!(
                "service {} declared twice after sanitizing",
                clean
            )));
        }
    }
    Ok(sanitized)
}
