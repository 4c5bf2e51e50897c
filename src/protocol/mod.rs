//! HTTP protocol helpers shared by requests, authenticators and senders.
//!
//! - **[headers]** - header names, header map normalization, auth header values
//! - **[endpoint]** - endpoint templates and base URL resolution

pub mod headers;
pub mod endpoint;

pub use headers::{
    format_basic_auth, format_token_auth, merge_headers, normalize_header_name, HeaderMapExt,
};
pub use endpoint::{resolve_url, substitute_path_params};

/// Well-known header names (lowercase, the form stored in header bags).
pub mod constants {
    pub const AUTHORIZATION: &str = "authorization";
    pub const CONTENT_TYPE: &str = "content-type";
    pub const ACCEPT: &str = "accept";
    pub const USER_AGENT: &str = "user-agent";
    pub const RETRY_AFTER: &str = "retry-after";

    pub const MIME_JSON: &str = "application/json";
    pub const MIME_FORM: &str = "application/x-www-form-urlencoded";
    pub const MIME_TEXT: &str = "text/plain";
    pub const MIME_OCTET_STREAM: &str = "application/octet-stream";
}
