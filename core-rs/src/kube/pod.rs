/**
 * pod.rs
 * Shared deployment unit descriptor (one Pod per group or standalone process)
 *
 * Rendered format:
 * ```yaml
 * apiVersion: v1
 * kind: Pod
 * metadata:
 *   name: learner
 *   labels:
 *     service-replay: bind
 * spec:
 *   restartPolicy: Never
 *   volumes: [...]
 *   containers: [...]
 * ```
 */

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::errors::{KxError, Result};
use crate::experiment::Process;
use crate::kube::container::ContainerManifest;
use crate::naming::{check_valid_dns, sanitize_name};

/// Pod restart policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RestartPolicy {
    Always,
    OnFailure,
    Never,
}

/// Node taint toleration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toleration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect: Option<String>,
}

/// Pod volume
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    pub name: String,
    #[serde(flatten)]
    pub source: VolumeSource,
}

/// Where a volume's content comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VolumeSource {
    Nfs {
        server: String,
        path: String,
    },
    HostPath {
        path: String,
        #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
        hostpath_type: String,
    },
    EmptyDir {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        medium: Option<String>,
    },
    Secret {
        #[serde(rename = "secretName")]
        secret_name: String,
        #[serde(rename = "defaultMode", default, skip_serializing_if = "Option::is_none")]
        default_mode: Option<u32>,
    },
    GitRepo {
        repository: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        revision: Option<String>,
    },
}

impl Volume {
    pub fn nfs(name: &str, server: &str, path: &str) -> Self {
        Volume {
            name: name.to_string(),
            source: VolumeSource::Nfs {
                server: server.to_string(),
                path: path.to_string(),
            },
        }
    }

    pub fn host_path(name: &str, path: &str, hostpath_type: &str) -> Self {
        Volume {
            name: name.to_string(),
            source: VolumeSource::HostPath {
                path: path.to_string(),
                hostpath_type: hostpath_type.to_string(),
            },
        }
    }

    /// Scratch volume; `use_memory` backs it with tmpfs
    pub fn empty_dir(name: &str, use_memory: bool) -> Self {
        Volume {
            name: name.to_string(),
            source: VolumeSource::EmptyDir {
                medium: use_memory.then(|| "Memory".to_string()),
            },
        }
    }

    pub fn secret(name: &str, secret_name: &str, default_mode: Option<u32>) -> Self {
        Volume {
            name: name.to_string(),
            source: VolumeSource::Secret {
                secret_name: secret_name.to_string(),
                default_mode,
            },
        }
    }

    pub fn git_repo(name: &str, repository: &str, revision: Option<&str>) -> Self {
        Volume {
            name: name.to_string(),
            source: VolumeSource::GitRepo {
                repository: repository.to_string(),
                revision: revision.map(str::to_string),
            },
        }
    }
}

/// Volume mounted into a container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeMount {
    pub name: String,
    pub mount_path: String,
}

/// Labels, volumes and scheduling hints shared by every container of a unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodDescriptor {
    name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    restart_policy: Option<RestartPolicy>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    node_selector: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tolerations: Vec<Toleration>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    volumes: Vec<Volume>,
}

impl PodDescriptor {
    pub fn new(name: &str) -> Self {
        PodDescriptor {
            name: name.to_string(),
            labels: BTreeMap::new(),
            restart_policy: None,
            node_selector: BTreeMap::new(),
            tolerations: Vec::new(),
            volumes: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn labels(&self) -> &BTreeMap<String, String> {
        &self.labels
    }

    pub fn add_label(&mut self, key: &str, value: &str) {
        self.labels.insert(key.to_string(), value.to_string());
    }

    pub fn add_labels<I, K, V>(&mut self, labels: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in labels {
            self.labels.insert(key.into(), value.into());
        }
    }

    pub fn restart_policy(&self) -> Option<RestartPolicy> {
        self.restart_policy
    }

    pub fn set_restart_policy(&mut self, policy: RestartPolicy) {
        self.restart_policy = Some(policy);
    }

    pub fn node_selector(&mut self, key: &str, value: &str) {
        self.node_selector.insert(key.to_string(), value.to_string());
    }

    pub fn add_toleration(&mut self, toleration: Toleration) {
        if !self.tolerations.contains(&toleration) {
            self.tolerations.push(toleration);
        }
    }

    pub fn volumes(&self) -> &[Volume] {
        &self.volumes
    }

    /// Add a volume unless one with the same name is already attached
    ///
    /// The volume name is sanitized like every other manifest identifier;
    /// the name it was attached under is returned for mounting.
    pub fn add_volume(&mut self, mut volume: Volume) -> Result<String> {
        volume.name = sanitize_name(&volume.name)?;
        let name = volume.name.clone();
        if !self.volumes.iter().any(|v| v.name == volume.name) {
            self.volumes.push(volume);
        }
        Ok(name)
    }

    /// Check a descriptor read back from a dump against the unit owning it
    pub(crate) fn check_owner(&self, owner: &str) -> Result<()> {
        check_valid_dns(&self.name)?;
        if self.name != owner {
            return Err(KxError::ValidationError(format!(
                "pod {} does not match its unit {}",
                self.name, owner
            )));
        }
        for volume in &self.volumes {
            check_valid_dns(&volume.name)?;
        }
        Ok(())
    }

    /// Render this unit as a Pod holding one container per process
    pub fn render(&self, processes: &[&Process]) -> Result<String> {
        let manifest = PodManifest {
            api_version: "v1",
            kind: "Pod",
            metadata: PodMetadata {
                name: self.name.clone(),
                labels: self.labels.clone(),
            },
            spec: PodSpec {
                restart_policy: self.restart_policy,
                node_selector: self.node_selector.clone(),
                tolerations: self.tolerations.clone(),
                volumes: self.volumes.clone(),
                containers: processes
                    .iter()
                    .map(|p| ContainerManifest::from_process(p))
                    .collect(),
            },
        };

        Ok(serde_yaml::to_string(&manifest)?)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PodManifest {
    api_version: &'static str,
    kind: &'static str,
    metadata: PodMetadata,
    spec: PodSpec,
}

#[derive(Serialize)]
struct PodMetadata {
    name: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    labels: BTreeMap<String, String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PodSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    restart_policy: Option<RestartPolicy>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    node_selector: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tolerations: Vec<Toleration>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    volumes: Vec<Volume>,
    containers: Vec<ContainerManifest>,
}
