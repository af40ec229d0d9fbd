/**
 * address module
 * Service discovery through environment variables
 *
 * Every registered service produces three variables:
 * - <PREFIX>_<KEY>_HOST = owner
 * - <PREFIX>_<KEY>_PORT = port
 * - <PREFIX>_<KEY>_ADDR = owner:port
 *
 * KEY is the service key upper-cased with '-' mapped to '_'.
 */

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::{KxError, Result};

/// Prefix used when the experiment does not configure one
pub const DEFAULT_ADDRESS_PREFIX: &str = "SYMPH";

static PREFIX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z_][A-Z0-9_]*$").unwrap());

/// Fail unless `prefix` can start an environment variable name
pub fn validate_prefix(prefix: &str) -> Result<()> {
    if prefix.is_empty() || PREFIX_RE.is_match(prefix) {
        Ok(())
    } else {
        Err(KxError::ValidationError(format!(
            "address prefix '{}' must match [A-Z_][A-Z0-9_]*",
            prefix
        )))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressEntry {
    pub owner: String,
    pub key: String,
    pub port: u16,
}

/// Accumulates resolvable addresses and exports them as env vars
#[derive(Debug, Clone)]
pub struct AddressBook {
    prefix: String,
    entries: Vec<AddressEntry>,
}

impl AddressBook {
    pub fn new(prefix: &str) -> Self {
        AddressBook {
            prefix: prefix.to_string(),
            entries: Vec::new(),
        }
    }

    pub fn add_entry(&mut self, owner: &str, key: &str, port: u16) {
        self.entries.push(AddressEntry {
            owner: owner.to_string(),
            key: key.to_string(),
            port,
        });
    }

    pub fn entries(&self) -> &[AddressEntry] {
        &self.entries
    }

    /// Flatten all entries into env var name → value
    ///
    /// A later entry for the same key replaces an earlier one.
    pub fn dump(&self) -> BTreeMap<String, String> {
        let mut env = BTreeMap::new();

        for entry in &self.entries {
            let base = self.env_base(&entry.key);
            env.insert(format!("{}_HOST", base), entry.owner.clone());
            env.insert(format!("{}_PORT", base), entry.port.to_string());
            env.insert(
                format!("{}_ADDR", base),
                format!("{}:{}", entry.owner, entry.port),
            );
        }

        env
    }

    fn env_base(&self, key: &str) -> String {
        let key = key.to_uppercase().replace('-', "_");
        if self.prefix.is_empty() {
            key
        } else {
            format!("{}_{}", self.prefix, key)
        }
    }
}

impl Default for AddressBook {
    fn default() -> Self {
        AddressBook::new(DEFAULT_ADDRESS_PREFIX)
    }
}
