/**
 * naming module
 * DNS-safe identifiers for every manifest object
 */

pub mod sanitizer;

pub use sanitizer::{check_valid_dns, sanitize_name, strip_repository_name, MAX_NAME_LEN};
