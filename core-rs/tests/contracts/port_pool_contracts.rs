//! Port Pool Contract Tests
//!
//! These tests pin the persisted `portrange` format and the allocation order.
//! Both are read back by previously written experiment dumps, so changing
//! either silently reassigns ports.

use std::collections::BTreeSet;

use kubexp_core::port::codec::{decode, encode};
use kubexp_core::{KxError, PortPool, PortRange};
use proptest::prelude::*;

/// WHY: Both bounds of an interval are inclusive
/// REASON: The encoder writes "low-high" with high being a member
/// BREAKS: Every round trip drops the last port of each run if decode is exclusive
#[test]
fn decode_is_inclusive_on_both_ends() {
    let ports = decode("7000-7002").unwrap();
    assert_eq!(ports.into_iter().collect::<Vec<_>>(), vec![7000, 7001, 7002]);

    let single = decode("8080-8080").unwrap();
    assert_eq!(single.len(), 1);
}

/// WHY: Intervals are maximal and ascending
/// REASON: One canonical string per set keeps dumps diffable
#[test]
fn encode_is_compact_and_canonical() {
    let ports: BTreeSet<u16> = [1, 2, 3, 4, 6, 7].into_iter().collect();
    assert_eq!(encode(&ports), "1-4,6-7");
    assert_eq!(decode("1-4,6-7").unwrap(), ports);

    // Insertion order of the input is irrelevant
    let shuffled: BTreeSet<u16> = [7, 1, 4, 6, 2, 3].into_iter().collect();
    assert_eq!(encode(&shuffled), "1-4,6-7");
}

/// WHY: Allocation is lowest-free-first
/// REASON: Identical inputs must compile to identical manifests
/// BREAKS: Reproducible deployments if allocation becomes unordered
#[test]
fn allocation_is_ascending_and_skips_reserved() {
    let mut pool = PortPool::from_range(PortRange {
        start: 7000,
        end: 7005,
    });
    pool.reserve(7002);

    let allocated: Vec<u16> = (0..3).map(|_| pool.allocate("exp").unwrap()).collect();
    assert_eq!(allocated, vec![7000, 7001, 7003]);
}

/// WHY: Exhaustion is an error, not a panic or a wrap-around
#[test]
fn exhausted_pool_reports_experiment_and_stays_empty() {
    let mut pool = PortPool::from_ports(std::iter::empty::<u16>());

    for _ in 0..2 {
        match pool.allocate("starved") {
            Err(KxError::ExhaustedPool { experiment }) => assert_eq!(experiment, "starved"),
            other => panic!("Expected ExhaustedPool, got {:?}", other),
        }
    }
    assert!(pool.is_empty());
    assert_eq!(pool.encode(), "");
}

proptest! {
    /// decode(encode(S)) == S for any port set
    #[test]
    fn codec_round_trip(ports in proptest::collection::btree_set(any::<u16>(), 0..200)) {
        let encoded = encode(&ports);
        prop_assert_eq!(decode(&encoded).unwrap(), ports);
    }

    /// Encoded intervals never touch or overlap
    #[test]
    fn encoded_intervals_are_maximal(ports in proptest::collection::btree_set(0u16..512, 1..100)) {
        let encoded = encode(&ports);
        let bounds: Vec<(u32, u32)> = encoded
            .split(',')
            .map(|token| {
                let (low, high) = token.split_once('-').unwrap();
                (low.parse().unwrap(), high.parse().unwrap())
            })
            .collect();

        for pair in bounds.windows(2) {
            prop_assert!(pair[0].1 + 1 < pair[1].0, "{:?} could be merged", pair);
        }
    }
}
