/**
 * codec.rs
 * Compact interval encoding for port sets
 *
 * Format: "low-high,low-high,..."
 * - Both bounds inclusive
 * - Intervals ascending, disjoint and maximal
 * - A single port p is written "p-p"
 * - The empty set is written ""
 *
 * Example: {1,2,3,4,6,7} <=> "1-4,6-7"
 */

use std::collections::BTreeSet;

use crate::errors::{KxError, Result};

/// Encode a port set as compact inclusive intervals
pub fn encode(ports: &BTreeSet<u16>) -> String {
    let mut tokens = Vec::new();
    let mut run: Option<(u16, u16)> = None;

    for &port in ports {
        run = match run {
            Some((low, high)) if high.checked_add(1) == Some(port) => Some((low, port)),
            Some((low, high)) => {
                tokens.push(format!("{}-{}", low, high));
                Some((port, port))
            }
            None => Some((port, port)),
        };
    }

    if let Some((low, high)) = run {
        tokens.push(format!("{}-{}", low, high));
    }

    tokens.join(",")
}

/// Decode compact inclusive intervals back into a port set
///
/// # Errors
/// Returns `MalformedPoolEncoding` when a token is not `low-high`, a bound is
/// not a port number, or `low > high`.
pub fn decode(description: &str) -> Result<BTreeSet<u16>> {
    let mut ports = BTreeSet::new();
    let description = description.trim();

    if description.is_empty() {
        return Ok(ports);
    }

    for token in description.split(',') {
        let (low, high) = token.trim().split_once('-').ok_or_else(|| {
            KxError::MalformedPoolEncoding(format!("expected low-high, got '{}'", token))
        })?;
        let low = parse_bound(low, token)?;
        let high = parse_bound(high, token)?;

        if low > high {
            return Err(KxError::MalformedPoolEncoding(format!(
                "interval '{}' has low bound above high bound",
                token
            )));
        }

        ports.extend(low..=high);
    }

    Ok(ports)
}

fn parse_bound(bound: &str, token: &str) -> Result<u16> {
    bound.trim().parse::<u16>().map_err(|e| {
        KxError::MalformedPoolEncoding(format!("bad bound '{}' in '{}': {}", bound, token, e))
    })
}
