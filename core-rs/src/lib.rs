//! # kubexp - experiment compiler
//!
//! Turns a description of a distributed experiment (named processes, grouped
//! into pods) into a deterministic, conflict-free set of cluster manifests.
//!
//! ## Pipeline
//!
//! ```text
//!  ExperimentConfig (YAML) ──build──▶ Experiment
//!                                        │
//!                     ┌──────────────────┼──────────────────┐
//!                     ▼                  ▼                  ▼
//!              declare services   assign addresses       render
//!              (ports, labels)    (env of every proc)   (Service/Pod)
//!                     └──────────────────┴──────────────────┘
//!                                        │
//!                                        ▼
//!                        "---\n<doc>---\n<doc>..." manifest
//! ```
//!
//! ## Example
//!
//! ```
//! use kubexp_core::{Experiment, ProcessConfig, PortRange};
//!
//! let mut exp = Experiment::new("demo").unwrap();
//! exp.set_port_range(PortRange { start: 7000, end: 7001 }).unwrap();
//!
//! let group = exp.new_process_group("g").unwrap();
//! group.new_process(ProcessConfig { name: "p1".into(), ..Default::default() })
//!     .unwrap()
//!     .expose("web", None)
//!     .unwrap();
//!
//! let manifest = exp.compile().unwrap();
//! assert!(manifest.starts_with("---\n"));
//! assert_eq!(exp.exposed_services()["web"].port, 7000);
//! ```

pub mod address;
pub mod backend;
pub mod config;
pub mod errors;
pub mod experiment;
pub mod kube;
pub mod logging;
pub mod naming;
pub mod port;

pub use address::AddressBook;
pub use backend::{Backend, BackendKind, ManifestComponent};
pub use config::ExperimentConfig;
pub use errors::KxError;
pub use experiment::{DuplicateServicePolicy, Experiment, Process, ProcessConfig, ProcessGroup};
pub use kube::{KubeBackend, Service, ServiceKind};
pub use port::{PortPool, PortRange};

/// Crate version, reported by `kubexp --version`
///
/// Not written into experiment dumps.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
