//! Backend seam: declare services → assign addresses → render
//!
//! Every backend runs the same two-phase protocol; only the manifest format
//! differs. `compile` stages all work on a copy of the experiment and commits
//! it only when every phase succeeded.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::{KxError, Result};
use crate::experiment::Experiment;
use crate::kube::KubeBackend;

/// Marker preceding every component in the concatenated document
pub const DOCUMENT_SEPARATOR: &str = "---\n";

/// Deployment target chosen when the experiment is created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Kube,
}

/// One named document of the compiled output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestComponent {
    /// e.g. `exposed-service-web`, `process-group-g`, `process-solo`
    pub key: String,
    pub body: String,
}

pub trait Backend {
    fn kind(&self) -> BackendKind;

    /// Phase 1: resolve every declared service to a port
    fn declare_services(&self, experiment: &mut Experiment) -> Result<()>;

    /// Phase 2: publish resolved addresses into every process's env
    fn assign_addresses(&self, experiment: &mut Experiment) -> Result<()>;

    /// Components in output order
    fn render(&self, experiment: &Experiment) -> Result<Vec<ManifestComponent>>;

    fn compile_components(&self, experiment: &mut Experiment) -> Result<Vec<ManifestComponent>> {
        if experiment.is_compiled() {
            return Err(KxError::AlreadyCompiled(experiment.name().to_string()));
        }

        let mut staged = experiment.clone();
        info!(experiment = staged.name(), backend = ?self.kind(), "compiling experiment");

        self.declare_services(&mut staged)?;
        self.assign_addresses(&mut staged)?;
        let components = self.render(&staged)?;

        staged.compiled = true;
        *experiment = staged;

        info!(
            experiment = experiment.name(),
            components = components.len(),
            "experiment compiled"
        );
        Ok(components)
    }

    fn compile(&self, experiment: &mut Experiment) -> Result<String> {
        let components = self.compile_components(experiment)?;
        Ok(concatenate(&components))
    }
}

/// Join components, each preceded by [`DOCUMENT_SEPARATOR`]
pub fn concatenate(components: &[ManifestComponent]) -> String {
    components
        .iter()
        .map(|c| format!("{}{}", DOCUMENT_SEPARATOR, c.body))
        .collect()
}

pub fn backend_for(kind: BackendKind) -> Box<dyn Backend> {
    match kind {
        BackendKind::Kube => Box::new(KubeBackend),
    }
}
