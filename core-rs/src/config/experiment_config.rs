/**
 * experiment_config.rs
 * Parser for experiment description files (YAML format)
 *
 * Format:
 * ```yaml
 * apiVersion: kubexp/v1
 * kind: Experiment
 * metadata:
 *   name: cartpole
 * spec:
 *   portRange: 7000-8999
 *   duplicateServices: reject
 *   groups:
 *     - name: learners
 *       restartPolicy: Never
 *       processes:
 *         - name: learner
 *           image: rl/learner:1.2
 *           exposedServices: {tensorboard: null}
 *   processes:
 *     - name: replay
 *       image: rl/replay:1.2
 *       boundServices: {replay: 7100}
 * ```
 */

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::backend::BackendKind;
use crate::errors::{KxError, Result};
use crate::experiment::{DuplicateServicePolicy, Experiment, ProcessConfig};
use crate::kube::pod::{RestartPolicy, Toleration, Volume};
use crate::port::PortPool;

pub const API_VERSION: &str = "kubexp/v1";
pub const KIND: &str = "Experiment";

/// File looked up by [`ExperimentConfig::load_from_dir`]
pub const CONFIG_FILE_NAME: &str = "experiment.yaml";

/// Experiment description file structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentConfig {
    pub api_version: String,
    pub kind: String,
    pub metadata: Metadata,
    pub spec: Spec,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Metadata {
    pub name: String,
}

/// Experiment specification
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Spec {
    #[serde(default)]
    pub backend: BackendKind,
    /// Compact `low-high,...` encoding; 7000-8999 when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port_range: Option<String>,
    #[serde(default)]
    pub duplicate_services: DuplicateServicePolicy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_prefix: Option<String>,
    #[serde(default)]
    pub groups: Vec<GroupConfig>,
    #[serde(default)]
    pub processes: Vec<StandaloneConfig>,
}

/// Pod-level settings shared by groups and standalone processes
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PodConfig {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart_policy: Option<RestartPolicy>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub node_selector: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tolerations: Vec<Toleration>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<MountConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MountConfig {
    #[serde(flatten)]
    pub volume: Volume,
    pub mount_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GroupConfig {
    pub name: String,
    #[serde(flatten)]
    pub pod: PodConfig,
    /// Set on every member
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub processes: Vec<ProcessConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StandaloneConfig {
    #[serde(flatten)]
    pub process: ProcessConfig,
    #[serde(flatten)]
    pub pod: PodConfig,
}

impl ExperimentConfig {
    /// Load an experiment description from `path`
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(KxError::FileNotFound(path.to_string_lossy().to_string()));
        }

        let content = fs::read_to_string(path)?;
        let config: ExperimentConfig = serde_yaml::from_str(&content)?;

        config.validate()?;

        info!(
            experiment = %config.metadata.name,
            path = %path.display(),
            "loaded experiment config"
        );
        Ok(config)
    }

    /// Load `experiment.yaml` from a directory
    pub fn load_from_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        Self::load(dir.as_ref().join(CONFIG_FILE_NAME))
    }

    /// Check apiVersion, kind and required fields
    pub fn validate(&self) -> Result<()> {
        if self.api_version != API_VERSION {
            return Err(KxError::ValidationError(format!(
                "Invalid apiVersion: expected '{}', got '{}'",
                API_VERSION, self.api_version
            )));
        }

        if self.kind != KIND {
            return Err(KxError::ValidationError(format!(
                "Invalid kind: expected '{}', got '{}'",
                KIND, self.kind
            )));
        }

        if self.metadata.name.is_empty() {
            return Err(KxError::ValidationError(
                "metadata.name cannot be empty".to_string(),
            ));
        }

        for group in &self.spec.groups {
            if group.processes.is_empty() {
                return Err(KxError::ValidationError(format!(
                    "group {} has no processes",
                    group.name
                )));
            }
        }

        Ok(())
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        fs::write(path.as_ref(), yaml)?;
        Ok(())
    }

    pub fn new(name: &str) -> Self {
        ExperimentConfig {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: Metadata {
                name: name.to_string(),
            },
            spec: Spec::default(),
        }
    }

    /// Build the experiment graph this file describes
    pub fn build(&self) -> Result<Experiment> {
        self.validate()?;
        let spec = &self.spec;

        let mut experiment = Experiment::new(&self.metadata.name)?;
        experiment.set_backend(spec.backend);
        experiment.set_duplicate_services(spec.duplicate_services);
        if let Some(range) = &spec.port_range {
            experiment.set_port_pool(PortPool::decode(range)?);
        }
        if let Some(prefix) = &spec.address_prefix {
            experiment.set_address_prefix(prefix)?;
        }

        for group_config in &spec.groups {
            let group = experiment.new_process_group(&group_config.name)?;
            for process in &group_config.processes {
                group.new_process(process.clone())?;
            }
            apply_pod_config(group.pod_mut(), &group_config.pod);
            for mount in &group_config.pod.volumes {
                group.mount_volume(mount.volume.clone(), &mount.mount_path)?;
            }
            if !group_config.env.is_empty() {
                group.set_envs(&group_config.env);
            }
        }

        for standalone in &spec.processes {
            let process = experiment.new_process(standalone.process.clone())?;
            if let Some(pod) = process.pod_mut() {
                apply_pod_config(pod, &standalone.pod);
            }
            for mount in &standalone.pod.volumes {
                process.mount_volume(mount.volume.clone(), &mount.mount_path)?;
            }
        }

        Ok(experiment)
    }
}

fn apply_pod_config(pod: &mut crate::kube::pod::PodDescriptor, config: &PodConfig) {
    pod.add_labels(config.labels.clone());
    if let Some(policy) = config.restart_policy {
        pod.set_restart_policy(policy);
    }
    for (key, value) in &config.node_selector {
        pod.node_selector(key, value);
    }
    for toleration in &config.tolerations {
        pod.add_toleration(toleration.clone());
    }
}
