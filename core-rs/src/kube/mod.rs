//! Cluster-manifest backend
//!
//! Output order is a compatibility contract: exposed services, bound
//! services, process groups, standalone processes.

pub mod container;
pub mod pod;
mod resolver;
pub mod service;

pub use container::{ContainerManifest, ImagePullPolicy};
pub use pod::{PodDescriptor, RestartPolicy, Toleration, Volume, VolumeMount, VolumeSource};
pub use service::{service_label, Service, ServiceKind};

use tracing::debug;

use crate::address::AddressBook;
use crate::backend::{Backend, BackendKind, ManifestComponent};
use crate::errors::Result;
use crate::experiment::Experiment;

pub struct KubeBackend;

impl Backend for KubeBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Kube
    }

    fn declare_services(&self, experiment: &mut Experiment) -> Result<()> {
        resolver::declare_services(experiment)
    }

    fn assign_addresses(&self, experiment: &mut Experiment) -> Result<()> {
        let mut address_book = AddressBook::new(experiment.address_prefix());

        for (name, service) in experiment.exposed_services() {
            address_book.add_entry(service.host(), name, service.port);
        }
        for (name, service) in experiment.bound_services() {
            address_book.add_entry(service.host(), name, service.port);
        }

        let env = address_book.dump();
        let mut collisions = 0;
        for process in experiment.all_processes_mut() {
            collisions += process.merge_address_env(&env);
        }

        debug!(
            experiment = experiment.name(),
            variables = env.len(),
            collisions,
            "addresses assigned"
        );
        Ok(())
    }

    fn render(&self, experiment: &Experiment) -> Result<Vec<ManifestComponent>> {
        let mut components = Vec::new();

        for service in experiment
            .exposed_services()
            .values()
            .chain(experiment.bound_services().values())
        {
            components.push(ManifestComponent {
                key: format!("{}-{}", service.kind.component_prefix(), service.name),
                body: service.render()?,
            });
        }

        for group in experiment.list_process_groups() {
            components.push(ManifestComponent {
                key: format!("process-group-{}", group.name()),
                body: group.render()?,
            });
        }

        for process in experiment.list_processes() {
            components.push(ManifestComponent {
                key: format!("process-{}", process.name()),
                body: process.render()?,
            });
        }

        Ok(components)
    }
}
