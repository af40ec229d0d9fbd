//! Integration tests for the compile lifecycle
//!
//! Tests an experiment end to end:
//! - Declaration and port resolution
//! - Address propagation
//! - Rendering
//! - Persisting and reloading compiled state

use kubexp_core::{DuplicateServicePolicy, Experiment, KxError, PortRange, ProcessConfig};

fn process(name: &str) -> ProcessConfig {
    ProcessConfig {
        name: name.to_string(),
        image: "busybox".to_string(),
        ..Default::default()
    }
}

/// Group `g` with p1 exposing `web` (unset) and p2 binding `db` on 7000
fn two_port_experiment() -> Experiment {
    let mut exp = Experiment::new("exp").unwrap();
    exp.set_port_range(PortRange {
        start: 7000,
        end: 7001,
    })
    .unwrap();

    let group = exp.new_process_group("g").unwrap();
    group.new_process(process("p1")).unwrap().expose("web", None).unwrap();
    group.new_process(process("p2")).unwrap().bind("db", Some(7000)).unwrap();
    exp
}

#[test]
fn test_complete_compile_lifecycle() {
    let mut exp = two_port_experiment();

    let manifest = exp.compile().unwrap();

    // 1. Explicit port kept, unset port gets the next free one
    assert_eq!(exp.bound_services()["db"].port, 7000);
    assert_eq!(exp.exposed_services()["web"].port, 7001);
    assert!(exp.port_pool().is_empty());
    assert!(exp.is_compiled());

    // 2. Every member sees both services
    let group = exp.get_process_group("g").unwrap();
    for name in ["p1", "p2"] {
        let env = group.get_process(name).unwrap().env();
        assert_eq!(env["SYMPH_DB_HOST"], "db");
        assert_eq!(env["SYMPH_DB_PORT"], "7000");
        assert_eq!(env["SYMPH_DB_ADDR"], "db:7000");
        assert_eq!(env["SYMPH_WEB_HOST"], "web");
        assert_eq!(env["SYMPH_WEB_PORT"], "7001");
        assert_eq!(env["SYMPH_WEB_ADDR"], "web:7001");
    }

    // 3. Pod carries both service labels
    assert_eq!(group.pod().labels()["service-web"], "expose");
    assert_eq!(group.pod().labels()["service-db"], "bind");

    // 4. Manifest holds two services then one pod
    let documents: Vec<&str> = manifest.split("---\n").skip(1).collect();
    assert_eq!(documents.len(), 3);
    assert!(documents[0].contains("LoadBalancer"));
    assert!(documents[1].contains("ClusterIP"));
    assert!(documents[2].contains("kind: Pod"));
}

#[test]
fn test_addresses_reach_processes_without_services() {
    let mut exp = two_port_experiment();
    exp.new_process(process("observer")).unwrap();

    exp.compile().unwrap();

    let observer = exp.get_process("observer").unwrap();
    assert!(observer.exposed_services().is_empty());
    assert!(observer.bound_services().is_empty());
    assert_eq!(observer.env()["SYMPH_WEB_ADDR"], "web:7001");
    assert_eq!(observer.env()["SYMPH_DB_ADDR"], "db:7000");
}

#[test]
fn test_explicit_port_is_kept_and_removed_from_pool() {
    let mut exp = Experiment::new("explicit").unwrap();
    exp.set_port_range(PortRange {
        start: 1000,
        end: 2000,
    })
    .unwrap();
    exp.new_process(process("api"))
        .unwrap()
        .expose("api", Some(1234))
        .unwrap();
    exp.new_process(process("worker"))
        .unwrap()
        .bind("jobs", None)
        .unwrap();

    exp.compile().unwrap();

    assert_eq!(exp.exposed_services()["api"].port, 1234);
    assert_eq!(exp.bound_services()["jobs"].port, 1000);
    assert!(!exp.port_pool().contains(1234));
    assert!(!exp.port_pool().contains(1000));
    assert_eq!(exp.port_pool().len(), 1001 - 2);
}

#[test]
fn test_exhaustion_aborts_and_allows_retry() {
    let mut exp = Experiment::new("tight").unwrap();
    exp.set_port_range(PortRange {
        start: 7000,
        end: 7000,
    })
    .unwrap();
    let p = exp.new_process(process("p")).unwrap();
    p.expose("one", None).unwrap();
    p.expose("two", None).unwrap();
    let before = exp.dump_dict().unwrap();

    // 1. Pool of one cannot serve two services
    match exp.compile() {
        Err(KxError::ExhaustedPool { experiment }) => assert_eq!(experiment, "tight"),
        other => panic!("Expected ExhaustedPool, got {:?}", other),
    }

    // 2. Nothing changed
    assert_eq!(exp.dump_dict().unwrap(), before);
    assert!(!exp.is_compiled());
    assert!(exp.get_process("p").unwrap().pod().unwrap().labels().is_empty());

    // 3. Widen and compile again
    exp.set_port_range(PortRange {
        start: 7000,
        end: 7001,
    })
    .unwrap();
    exp.compile().unwrap();
    assert_eq!(exp.exposed_services()["one"].port, 7000);
    assert_eq!(exp.exposed_services()["two"].port, 7001);
}

#[test]
fn test_compile_twice_is_rejected() {
    let mut exp = two_port_experiment();
    exp.compile().unwrap();
    let after_first = exp.dump_dict().unwrap();

    assert!(matches!(exp.compile(), Err(KxError::AlreadyCompiled(_))));
    assert_eq!(exp.dump_dict().unwrap(), after_first);
}

#[test]
fn test_duplicate_service_policy() {
    let build = |policy| {
        let mut exp = Experiment::new("dup").unwrap();
        exp.set_duplicate_services(policy);
        exp.new_process(process("a")).unwrap().expose("api", None).unwrap();
        exp.new_process(process("b")).unwrap().expose("api", None).unwrap();
        exp
    };

    let mut rejecting = build(DuplicateServicePolicy::Reject);
    assert!(matches!(
        rejecting.compile(),
        Err(KxError::DuplicateService { .. })
    ));

    let mut overwriting = build(DuplicateServicePolicy::Overwrite);
    overwriting.compile().unwrap();
    assert_eq!(overwriting.exposed_services().len(), 1);
    assert_eq!(overwriting.exposed_services()["api"].unit, "b");
}

#[test]
fn test_service_name_shared_by_expose_and_bind() {
    let build = |policy| {
        let mut exp = Experiment::new("cross").unwrap();
        exp.set_duplicate_services(policy);
        exp.new_process(process("a")).unwrap().expose("rpc", None).unwrap();
        exp.new_process(process("b")).unwrap().bind("rpc", None).unwrap();
        exp
    };

    // 1. Rejected before anything is rendered
    let mut rejecting = build(DuplicateServicePolicy::Reject);
    assert!(matches!(
        rejecting.compile(),
        Err(KxError::DuplicateService { .. })
    ));
    assert!(!rejecting.is_compiled());

    // 2. Overwrite renders exactly one Service named rpc
    let mut overwriting = build(DuplicateServicePolicy::Overwrite);
    let manifest = overwriting.compile().unwrap();
    assert_eq!(manifest.matches("kind: Service").count(), 1);
    assert_eq!(overwriting.bound_services()["rpc"].unit, "b");
    assert!(overwriting.exposed_services().is_empty());
}

#[test]
fn test_user_env_wins_over_discovered_address() {
    let mut exp = two_port_experiment();
    exp.group_process_mut("g", "p1")
        .unwrap()
        .set_env("SYMPH_DB_HOST", "db.internal");

    exp.compile().unwrap();

    let p1 = exp.get_process_group("g").unwrap().get_process("p1").unwrap();
    assert_eq!(p1.env()["SYMPH_DB_HOST"], "db.internal");
    assert_eq!(p1.env()["SYMPH_DB_PORT"], "7000");
}

#[test]
fn test_dump_load_dump_is_idempotent() {
    let mut exp = two_port_experiment();
    exp.new_process(process("observer")).unwrap();

    // Before and after compile
    for _ in 0..2 {
        let first = exp.dump_dict().unwrap();
        let reloaded = Experiment::load_dict(first.clone()).unwrap();
        assert_eq!(reloaded.dump_dict().unwrap(), first);
        assert_eq!(reloaded, exp);

        if !exp.is_compiled() {
            exp.compile().unwrap();
        }
    }

    let json = exp.to_json().unwrap();
    assert!(json.contains("\"portrange\": \"\""));
    let restored = Experiment::from_json(&json).unwrap();
    assert!(restored.is_compiled());
    assert_eq!(restored.exposed_services()["web"].port, 7001);
}
