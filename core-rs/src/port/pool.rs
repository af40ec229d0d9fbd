/**
 * pool.rs
 * Free-port pool owned by an experiment
 *
 * Allocation strategy:
 * - Explicitly requested ports are reserved (removed) first
 * - Remaining services get the lowest free port, ascending
 * - Identical inputs always produce identical assignments
 *
 * Example:
 * - Pool 7000-7005, 7002 reserved
 * - allocate() → 7000, 7001, 7003
 */

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

use crate::errors::{KxError, Result};
use crate::port::codec;

/// First port of the default pool
pub const DEFAULT_PORT_START: u16 = 7000;

/// Last port of the default pool (inclusive)
pub const DEFAULT_PORT_END: u16 = 8999;

/// Inclusive port range an experiment starts from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRange {
    pub start: u16,
    pub end: u16,
}

impl PortRange {
    /// Check if port is within this range
    pub fn contains(&self, port: u16) -> bool {
        port >= self.start && port <= self.end
    }
}

impl Default for PortRange {
    fn default() -> Self {
        PortRange {
            start: DEFAULT_PORT_START,
            end: DEFAULT_PORT_END,
        }
    }
}

/// Set of ports still free for allocation
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PortPool {
    free: BTreeSet<u16>,
}

impl PortPool {
    /// Pool holding every port of `range`
    pub fn from_range(range: PortRange) -> Self {
        PortPool {
            free: (range.start..=range.end).collect(),
        }
    }

    /// Pool holding exactly `ports`
    pub fn from_ports<I: IntoIterator<Item = u16>>(ports: I) -> Self {
        PortPool {
            free: ports.into_iter().collect(),
        }
    }

    /// Parse a persisted `"low-high,..."` description
    pub fn decode(description: &str) -> Result<Self> {
        Ok(PortPool {
            free: codec::decode(description)?,
        })
    }

    /// Persisted `"low-high,..."` description
    pub fn encode(&self) -> String {
        codec::encode(&self.free)
    }

    /// Remove `port` from the pool
    ///
    /// No-op when the port was never free.
    pub fn reserve(&mut self, port: u16) {
        if self.free.remove(&port) {
            debug!(port, "reserved explicit port");
        }
    }

    /// Take the smallest free port
    ///
    /// # Errors
    /// Returns `ExhaustedPool` naming `experiment` when nothing is left; the
    /// pool stays empty.
    pub fn allocate(&mut self, experiment: &str) -> Result<u16> {
        self.free.pop_first().ok_or_else(|| KxError::ExhaustedPool {
            experiment: experiment.to_string(),
        })
    }

    pub fn contains(&self, port: u16) -> bool {
        self.free.contains(&port)
    }

    pub fn len(&self) -> usize {
        self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.free.is_empty()
    }

    /// Free ports, ascending
    pub fn ports(&self) -> &BTreeSet<u16> {
        &self.free
    }
}

impl Serialize for PortPool {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for PortPool {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let description = String::deserialize(deserializer)?;
        PortPool::decode(&description).map_err(serde::de::Error::custom)
    }
}

/// Allocator bound to one experiment's pool for the duration of a compile
pub struct PortAllocator<'a> {
    experiment: &'a str,
    pool: &'a mut PortPool,
}

impl<'a> PortAllocator<'a> {
    pub fn new(experiment: &'a str, pool: &'a mut PortPool) -> Self {
        PortAllocator { experiment, pool }
    }

    pub fn reserve(&mut self, port: u16) {
        self.pool.reserve(port);
    }

    pub fn allocate(&mut self) -> Result<u16> {
        let port = self.pool.allocate(self.experiment)?;
        debug!(experiment = self.experiment, port, "allocated port");
        Ok(port)
    }
}
