//! Container entry of a rendered Pod

use serde::{Deserialize, Serialize};

use crate::experiment::Process;
use crate::kube::pod::VolumeMount;

/// When the kubelet pulls the container image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImagePullPolicy {
    Always,
    IfNotPresent,
    Never,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerManifest {
    pub name: String,
    pub image: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub volume_mounts: Vec<VolumeMount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_pull_policy: Option<ImagePullPolicy>,
}

impl ContainerManifest {
    /// Env is emitted sorted by variable name
    pub fn from_process(process: &Process) -> Self {
        ContainerManifest {
            name: process.name().to_string(),
            image: process.image().to_string(),
            command: process.command().to_vec(),
            args: process.args().to_vec(),
            working_dir: process.working_dir().map(str::to_string),
            env: process
                .env()
                .iter()
                .map(|(name, value)| EnvVar {
                    name: name.clone(),
                    value: value.clone(),
                })
                .collect(),
            volume_mounts: process.volume_mounts().to_vec(),
            image_pull_policy: process.image_pull_policy(),
        }
    }
}
