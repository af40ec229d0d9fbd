//! Manifest Order Contract Tests
//!
//! Consumers split the compiled document on the separator and read
//! components by position. These tests pin that layout.

use kubexp_core::{Experiment, ProcessConfig, PortRange};

fn process(name: &str) -> ProcessConfig {
    ProcessConfig {
        name: name.to_string(),
        image: "busybox".to_string(),
        ..Default::default()
    }
}

fn layered_experiment() -> Experiment {
    let mut exp = Experiment::new("order").unwrap();
    exp.set_port_range(PortRange {
        start: 7000,
        end: 7100,
    })
    .unwrap();

    // Declared deliberately out of output order
    exp.new_process(process("solo")).unwrap().bind("cache", None).unwrap();
    let group = exp.new_process_group("workers").unwrap();
    group.new_process(process("w1")).unwrap().expose("dashboard", None).unwrap();
    group.new_process(process("w2")).unwrap().bind("queue", None).unwrap();
    exp.new_process_group("idle").unwrap();

    exp
}

/// WHY: Order is exposed services, bound services, groups, standalone processes
/// BREAKS: Any consumer that reads components by position
#[test]
fn components_follow_fixed_order() {
    let mut exp = layered_experiment();
    let keys: Vec<String> = exp
        .compile_components()
        .unwrap()
        .into_iter()
        .map(|c| c.key)
        .collect();

    assert_eq!(
        keys,
        vec![
            "exposed-service-dashboard",
            "bound-service-cache",
            "bound-service-queue",
            "process-group-workers",
            "process-group-idle",
            "process-solo",
        ]
    );
}

/// WHY: Every component starts with its own separator line
/// REASON: Multi-document YAML needs `---` between documents
#[test]
fn every_component_is_prefixed_by_separator() {
    let mut exp = layered_experiment();
    let manifest = exp.compile().unwrap();

    let documents: Vec<&str> = manifest.split("---\n").collect();
    assert_eq!(documents[0], "", "manifest must start with a separator");
    assert_eq!(documents.len() - 1, 6);

    let kinds: Vec<String> = documents[1..]
        .iter()
        .map(|doc| {
            let value: serde_yaml::Value = serde_yaml::from_str(doc).unwrap();
            value["kind"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(kinds, vec!["Service", "Service", "Service", "Pod", "Pod", "Pod"]);
}

/// WHY: Identical inputs compile to byte-identical manifests
/// BREAKS: Diff-based deploys and reproducible experiments
#[test]
fn compile_is_deterministic() {
    let first = layered_experiment().compile().unwrap();
    let second = layered_experiment().compile().unwrap();
    assert_eq!(first, second);
}
