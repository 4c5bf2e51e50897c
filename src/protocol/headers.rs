//! Header bag helpers.
//!
//! Header bags are `BTreeMap<String, String>` with lowercase keys, so a
//! request-level `Accept` overrides a connector-level `accept` and lookups are
//! case-insensitive.
//!
//! # Examples
//!
//! ```
//! use courier_http::protocol::{format_basic_auth, format_token_auth};
//!
//! assert_eq!(format_token_auth("Bearer", "abc"), "Bearer abc");
//! assert_eq!(format_basic_auth("user", "pass"), "Basic dXNlcjpwYXNz");
//! ```

use base64::Engine;
use std::collections::BTreeMap;

/// Lowercase and trim a header name.
#[inline]
pub fn normalize_header_name(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

/// `Authorization` value for a token scheme. An empty prefix sends the bare token.
pub fn format_token_auth(prefix: &str, token: &str) -> String {
    if prefix.is_empty() {
        token.to_string()
    } else {
        format!("{} {}", prefix, token)
    }
}

/// `Authorization` value for HTTP basic auth.
pub fn format_basic_auth(username: &str, password: &str) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(format!("{}:{}", username, password));
    format!("Basic {}", encoded)
}

/// Copy every header of `overrides` into `base`, normalizing names.
pub fn merge_headers(base: &mut BTreeMap<String, String>, overrides: &BTreeMap<String, String>) {
    for (name, value) in overrides {
        base.insert(normalize_header_name(name), value.clone());
    }
}

/// Case-insensitive access on a header bag.
pub trait HeaderMapExt {
    fn get_header(&self, name: &str) -> Option<&str>;
    fn set_header(&mut self, name: &str, value: impl Into<String>);
    fn remove_header(&mut self, name: &str) -> Option<String>;
}

impl HeaderMapExt for BTreeMap<String, String> {
    fn get_header(&self, name: &str) -> Option<&str> {
        self.get(&normalize_header_name(name)).map(String::as_str)
    }

    fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.insert(normalize_header_name(name), value.into());
    }

    fn remove_header(&mut self, name: &str) -> Option<String> {
        self.remove(&normalize_header_name(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_header_name() {
        assert_eq!(normalize_header_name(" Content-Type "), "content-type");
    }

    #[test]
    fn test_format_token_auth() {
        assert_eq!(format_token_auth("Bearer", "t0k"), "Bearer t0k");
        assert_eq!(format_token_auth("", "t0k"), "t0k");
    }

    #[test]
    fn test_format_basic_auth() {
        assert_eq!(format_basic_auth("aladdin", "opensesame"), "Basic YWxhZGRpbjpvcGVuc2VzYW1l");
    }

    #[test]
    fn test_merge_headers_overrides_case_insensitively() {
        let mut base = BTreeMap::new();
        base.set_header("Accept", "text/html");
        let mut overrides = BTreeMap::new();
        overrides.insert("ACCEPT".to_string(), "application/json".to_string());

        merge_headers(&mut base, &overrides);
        assert_eq!(base.len(), 1);
        assert_eq!(base.get_header("accept"), Some("application/json"));
    }

    #[test]
    fn test_remove_header() {
        let mut headers = BTreeMap::new();
        headers.set_header("X-Trace", "1");
        assert_eq!(headers.remove_header("x-trace"), Some("1".to_string()));
        assert!(headers.is_empty());
    }
}
