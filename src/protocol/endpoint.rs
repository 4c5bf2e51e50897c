//! Endpoint template and base URL resolution.
//!
//! Endpoints are relative paths such as `/users/{id}` joined onto the
//! connector's base URL. An endpoint that is already an absolute `http(s)` URL
//! is used as-is.
//!
//! # Examples
//!
//! ```
//! use courier_http::protocol::{resolve_url, substitute_path_params};
//! use std::collections::BTreeMap;
//!
//! let mut params = BTreeMap::new();
//! params.insert("id".to_string(), "42".to_string());
//!
//! let path = substitute_path_params("/users/{id}", &params).unwrap();
//! let url = resolve_url("https://api.example.com/v1/", &path).unwrap();
//! assert_eq!(url, "https://api.example.com/v1/users/42");
//! ```

use crate::error::{Error, Result};
use std::collections::BTreeMap;

/// Replace every `{name}` placeholder with its path parameter.
///
/// Each value is percent-encoded as a single path segment, so `/`, `?` and `#`
/// inside a value cannot change the URL's path or query.
///
/// # Errors
///
/// Returns [`Error::Configuration`] for a placeholder without a value, an
/// unterminated `{`, or a value of `.` or `..`.
pub fn substitute_path_params(template: &str, params: &BTreeMap<String, String>) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after.find('}').ok_or_else(|| {
            Error::Configuration(format!("unterminated placeholder in endpoint '{}'", template))
        })?;
        let name = after[..end].trim();
        let value = params.get(name).ok_or_else(|| {
            Error::Configuration(format!(
                "endpoint '{}' has no value for placeholder '{}'",
                template, name
            ))
        })?;
        out.push_str(&encode_path_segment(name, value)?);
        rest = &after[end + 1..];
    }
    out.push_str(rest);

    Ok(out)
}

/// Join `endpoint` onto `base_url` and validate the result.
///
/// # Errors
///
/// Returns [`Error::Configuration`] when a relative endpoint has no base URL
/// to join onto, or the joined URL does not parse.
pub fn resolve_url(base_url: &str, endpoint: &str) -> Result<String> {
    let candidate = if is_absolute(endpoint) {
        endpoint.to_string()
    } else if base_url.trim().is_empty() {
        return Err(Error::Configuration(format!(
            "relative endpoint '{}' needs a connector base URL",
            endpoint
        )));
    } else if endpoint.is_empty() {
        base_url.to_string()
    } else {
        format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    };

    ::url::Url::parse(&candidate)
        .map(|url| url.to_string())
        .map_err(|e| Error::Configuration(format!("invalid URL '{}': {}", candidate, e)))
}

/// Percent-encode `value` with the `url` crate's path-segment rules.
fn encode_path_segment(name: &str, value: &str) -> Result<String> {
    if value == "." || value == ".." {
        return Err(Error::Configuration(format!(
            "path parameter '{}' cannot be a dot segment",
            name
        )));
    }

    let mut scratch = ::url::Url::parse("http://segment.invalid/")
        .map_err(|e| Error::Configuration(format!("cannot encode path parameter '{}': {}", name, e)))?;
    scratch
        .path_segments_mut()
        .map_err(|_| Error::Configuration(format!("cannot encode path parameter '{}'", name)))?
        .pop_if_empty()
        .push(value);

    Ok(scratch.path().trim_start_matches('/').to_string())
}

fn is_absolute(endpoint: &str) -> bool {
    let lower = endpoint.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_substitute_multiple_placeholders() {
        let path = substitute_path_params(
            "/orgs/{org}/repos/{ repo }",
            &params(&[("org", "rust-lang"), ("repo", "cargo")]),
        )
        .unwrap();
        assert_eq!(path, "/orgs/rust-lang/repos/cargo");
    }

    #[test]
    fn test_substitute_encodes_values_as_one_segment() {
        let path = substitute_path_params(
            "/users/{id}/files/{file}",
            &params(&[("id", "1?admin=true"), ("file", "a/b#frag")]),
        )
        .unwrap();
        assert_eq!(path, "/users/1%3Fadmin=true/files/a%2Fb%23frag");

        let url = resolve_url("https://api.test/v1", &path).unwrap();
        let parsed = ::url::Url::parse(&url).unwrap();
        assert_eq!(parsed.query(), None);
        assert_eq!(parsed.path_segments().map(|s| s.count()), Some(5));
    }

    #[test]
    fn test_substitute_rejects_dot_segments() {
        for value in [".", ".."] {
            let err = substitute_path_params("/users/{id}", &params(&[("id", value)])).unwrap_err();
            assert!(matches!(err, Error::Configuration(_)));
        }
        assert_eq!(
            substitute_path_params("/files/{name}", &params(&[("name", "v1..2")])).unwrap(),
            "/files/v1..2"
        );
    }

    #[test]
    fn test_substitute_missing_param() {
        let err = substitute_path_params("/users/{id}", &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_substitute_unterminated() {
        assert!(substitute_path_params("/users/{id", &params(&[("id", "1")])).is_err());
    }

    #[test]
    fn test_resolve_joins_slashes() {
        assert_eq!(
            resolve_url("https://api.test/", "/users").unwrap(),
            "https://api.test/users"
        );
        assert_eq!(
            resolve_url("https://api.test", "users").unwrap(),
            "https://api.test/users"
        );
    }

    #[test]
    fn test_resolve_absolute_endpoint_ignores_base() {
        assert_eq!(
            resolve_url("https://api.test", "https://other.test/ping").unwrap(),
            "https://other.test/ping"
        );
    }

    #[test]
    fn test_resolve_requires_base_for_relative() {
        assert!(matches!(
            resolve_url("", "/users"),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_resolve_rejects_garbage() {
        assert!(resolve_url("not a url", "/users").is_err());
    }
}
