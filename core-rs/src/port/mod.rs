/**
 * port module
 * Port pool persistence and deterministic allocation
 */

pub mod codec;
pub mod pool;

pub use pool::{PortAllocator, PortPool, PortRange, DEFAULT_PORT_END, DEFAULT_PORT_START};
