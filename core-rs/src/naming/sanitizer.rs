//! Name normalization and DNS-1123 label validation
//!
//! Every experiment, group, process and service name ends up as a manifest
//! identifier (pod name, container name, service name, label key), so all of
//! them go through [`sanitize_name`] at registration time.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use crate::errors::{KxError, Result};

static DNS_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").unwrap());

/// Longest name the cluster accepts for a DNS label
pub const MAX_NAME_LEN: usize = 63;

/// Lowercase `name` and map ` `, `_` and `.` to `-`, then validate it
///
/// A warning is logged when the name had to be rewritten.
///
/// # Examples
///
/// ```
/// use kubexp_core::naming::sanitize_name;
///
/// assert_eq!(sanitize_name("My_Learner.0").unwrap(), "my-learner-0");
/// assert!(sanitize_name("-bad").is_err());
/// ```
pub fn sanitize_name(name: &str) -> Result<String> {
    let sanitized: String = name
        .to_lowercase()
        .chars()
        .map(|c| match c {
            ' ' | '_' | '.' => '-',
            other => other,
        })
        .collect();

    if sanitized != name {
        warn!(original = name, sanitized = %sanitized, "name rewritten");
    }

    check_valid_dns(&sanitized)?;
    Ok(sanitized)
}

/// Fail unless `name` is a valid DNS label
pub fn check_valid_dns(name: &str) -> Result<()> {
    if name.len() > MAX_NAME_LEN {
        return Err(KxError::InvalidName(format!(
            "{} is longer than {} characters",
            name, MAX_NAME_LEN
        )));
    }

    if !DNS_LABEL.is_match(name) {
        return Err(KxError::InvalidName(format!(
            "{} must be a valid DNS name with only lower-case letters, 0-9 and hyphen",
            name
        )));
    }

    Ok(())
}

/// Repository name of a git url: the text between the last `/` and `.git`
pub fn strip_repository_name(git_repo_url: &str) -> String {
    let tail = match git_repo_url.rfind('/') {
        Some(idx) => &git_repo_url[idx + 1..],
        None => git_repo_url,
    };
    let stem = match tail.rfind(".git") {
        Some(idx) => &tail[..idx],
        None => tail,
    };
    stem.to_lowercase()
}
