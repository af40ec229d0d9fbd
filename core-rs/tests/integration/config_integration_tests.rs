//! Integration tests for experiment description files
//!
//! Tests the path a CLI user takes:
//! - YAML description on disk
//! - Build and compile
//! - JSON state dump and reload

use kubexp_core::config::CONFIG_FILE_NAME;
use kubexp_core::{Experiment, ExperimentConfig, KxError};
use std::fs;
use tempfile::TempDir;

const DESCRIPTION: &str = r#"
apiVersion: kubexp/v1
kind: Experiment
metadata:
  name: Ray_Tune
spec:
  portRange: 7000-7001,7500-7500
  groups:
    - name: head
      restartPolicy: Never
      volumes:
        - name: results
          nfs:
            server: nfs.local
            path: /exports/results
          mountPath: /results
      processes:
        - name: scheduler
          image: ray/head:2.0
          exposedServices:
            dashboard: null
        - name: gcs
          image: ray/head:2.0
          boundServices:
            gcs: 7500
  processes:
    - name: worker
      image: ray/worker:2.0
      env:
        RAY_ROLE: worker
"#;

fn write_description(dir: &TempDir) {
    fs::write(dir.path().join(CONFIG_FILE_NAME), DESCRIPTION).unwrap();
}

#[test]
fn test_description_to_manifest() {
    let temp_dir = TempDir::new().unwrap();
    write_description(&temp_dir);

    // 1. Load and build
    let config = ExperimentConfig::load_from_dir(temp_dir.path()).unwrap();
    let mut exp = config.build().unwrap();
    assert_eq!(exp.name(), "ray-tune");
    assert_eq!(exp.port_pool().len(), 3);

    // 2. Compile
    let manifest = exp.compile().unwrap();
    assert_eq!(exp.exposed_services()["dashboard"].port, 7000);
    assert_eq!(exp.bound_services()["gcs"].port, 7500);
    assert_eq!(exp.port_pool().encode(), "7001-7001");

    // 3. Standalone worker keeps its own env and learns both addresses
    let worker = exp.get_process("worker").unwrap();
    assert_eq!(worker.env()["RAY_ROLE"], "worker");
    assert_eq!(worker.env()["SYMPH_DASHBOARD_ADDR"], "dashboard:7000");
    assert_eq!(worker.env()["SYMPH_GCS_ADDR"], "gcs:7500");

    // 4. Group pod carries the NFS volume, every member mounts it
    let documents: Vec<serde_yaml::Value> = manifest
        .split("---\n")
        .skip(1)
        .map(|doc| serde_yaml::from_str(doc).unwrap())
        .collect();
    assert_eq!(documents.len(), 4);

    let head = &documents[2];
    assert_eq!(head["metadata"]["name"], "head");
    assert_eq!(head["spec"]["volumes"][0]["nfs"]["server"], "nfs.local");
    let containers = head["spec"]["containers"].as_sequence().unwrap();
    assert_eq!(containers.len(), 2);
    for container in containers {
        assert_eq!(container["volumeMounts"][0]["mountPath"], "/results");
    }
}

#[test]
fn test_compiled_state_survives_json_dump() {
    let temp_dir = TempDir::new().unwrap();
    write_description(&temp_dir);

    let mut exp = ExperimentConfig::load_from_dir(temp_dir.path())
        .unwrap()
        .build()
        .unwrap();
    exp.compile().unwrap();

    let state_path = temp_dir.path().join("state.json");
    fs::write(&state_path, exp.to_json().unwrap()).unwrap();

    let restored = Experiment::from_json(&fs::read_to_string(&state_path).unwrap()).unwrap();
    assert_eq!(restored, exp);
    assert!(restored.is_compiled());
    assert_eq!(restored.port_pool().encode(), "7001-7001");

    let mut restored = restored;
    assert!(matches!(restored.compile(), Err(KxError::AlreadyCompiled(_))));
}

#[test]
fn test_invalid_description_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let broken = DESCRIPTION.replace("kind: Experiment", "kind: Project");
    fs::write(temp_dir.path().join(CONFIG_FILE_NAME), broken).unwrap();

    let err = ExperimentConfig::load_from_dir(temp_dir.path()).unwrap_err();
    assert!(matches!(err, KxError::ValidationError(_)));
}

#[test]
fn test_unit_name_shared_between_groups_and_processes() {
    let clash = DESCRIPTION.replace("- name: worker", "- name: head");
    let config: ExperimentConfig = serde_yaml::from_str(&clash).unwrap();

    assert!(matches!(config.build(), Err(KxError::DuplicateName(_))));
}
