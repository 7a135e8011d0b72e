//! HTTP status descriptions.
//!
//! Fixed table of the codes a reconnaissance report cares about. Anything not
//! listed is reported as "Unknown Status".

use std::collections::HashMap;
use std::sync::LazyLock;

/// Description used for codes missing from the table.
pub const UNKNOWN_STATUS: &str = "Unknown Status";

static STATUS_DESCRIPTIONS: LazyLock<HashMap<u16, &'static str>> = LazyLock::new(|| {
    let mut m = HashMap::new();

    m.insert(200, "OK");
    m.insert(201, "Created");
    m.insert(204, "No Content");
    m.insert(301, "Moved Permanently");
    m.insert(302, "Found");
    m.insert(304, "Not Modified");
    m.insert(307, "Temporary Redirect");
    m.insert(308, "Permanent Redirect");
    m.insert(400, "Bad Request");
    m.insert(401, "Unauthorized");
    m.insert(403, "Forbidden");
    m.insert(404, "Not Found");
    m.insert(405, "Method Not Allowed");
    m.insert(429, "Too Many Requests");
    m.insert(500, "Internal Server Error");
    m.insert(502, "Bad Gateway");
    m.insert(503, "Service Unavailable");
    m.insert(504, "Gateway Timeout");

    m
});

/// Human description of an HTTP status code.
pub fn describe_status(code: u16) -> &'static str {
    STATUS_DESCRIPTIONS.get(&code).copied().unwrap_or(UNKNOWN_STATUS)
}
