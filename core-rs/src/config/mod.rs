/**
 * config module
 * Experiment description files (YAML)
 */

pub mod experiment_config;

pub use experiment_config::{
    ExperimentConfig, GroupConfig, Metadata, MountConfig, PodConfig, Spec, StandaloneConfig,
    API_VERSION, CONFIG_FILE_NAME, KIND,
};
