/**
 * service.rs
 * Resolved network services and their Service manifests
 *
 * - Exposed: reachable from outside the cluster (type LoadBalancer)
 * - Bound: cluster-internal discovery only (type ClusterIP)
 *
 * Each Service selects the pods labelled `service-<name>: expose|bind`.
 */

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::errors::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    Exposed,
    Bound,
}

impl ServiceKind {
    /// Pod label value marking the declaring unit
    pub fn label_value(&self) -> &'static str {
        match self {
            ServiceKind::Exposed => "expose",
            ServiceKind::Bound => "bind",
        }
    }

    /// Prefix of the manifest component key
    pub fn component_prefix(&self) -> &'static str {
        match self {
            ServiceKind::Exposed => "exposed-service",
            ServiceKind::Bound => "bound-service",
        }
    }

    fn service_type(&self) -> &'static str {
        match self {
            ServiceKind::Exposed => "LoadBalancer",
            ServiceKind::Bound => "ClusterIP",
        }
    }
}

/// Label key shared by a service's selector and its declaring pods
pub fn service_label(name: &str) -> String {
    format!("service-{}", name)
}

/// A service resolved to a concrete port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    pub port: u16,
    pub kind: ServiceKind,
    /// Pod that declared the service
    pub unit: String,
}

impl Service {
    pub fn new(name: &str, port: u16, kind: ServiceKind, unit: &str) -> Self {
        Service {
            name: name.to_string(),
            port,
            kind,
            unit: unit.to_string(),
        }
    }

    /// DNS name other processes resolve this service by
    pub fn host(&self) -> &str {
        &self.name
    }

    pub fn render(&self) -> Result<String> {
        let selector: BTreeMap<String, String> = [(
            service_label(&self.name),
            self.kind.label_value().to_string(),
        )]
        .into_iter()
        .collect();

        let manifest = ServiceManifest {
            api_version: "v1",
            kind: "Service",
            metadata: ServiceMetadata {
                name: self.name.clone(),
                labels: selector.clone(),
            },
            spec: ServiceSpec {
                service_type: self.kind.service_type(),
                selector,
                ports: vec![ServicePort {
                    name: self.name.clone(),
                    port: self.port,
                    target_port: self.port,
                    protocol: "TCP",
                }],
            },
        };

        Ok(serde_yaml::to_string(&manifest)?)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ServiceManifest {
    api_version: &'static str,
    kind: &'static str,
    metadata: ServiceMetadata,
    spec: ServiceSpec,
}

#[derive(Serialize)]
struct ServiceMetadata {
    name: String,
    labels: BTreeMap<String, String>,
}

#[derive(Serialize)]
struct ServiceSpec {
    #[serde(rename = "type")]
    service_type: &'static str,
    selector: BTreeMap<String, String>,
    ports: Vec<ServicePort>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ServicePort {
    name: String,
    port: u16,
    target_port: u16,
    protocol: &'static str,
}
