//! CORS headers for the webhook endpoint.

use actix_web::middleware::DefaultHeaders;

pub const ALLOW_ORIGIN: &str = "*";
pub const ALLOW_METHODS: &str = "POST, GET, OPTIONS";
pub const ALLOW_HEADERS: &str = "Content-Type, X-Bagibagi-Token";

/// Permissive CORS headers added to every response.
///
/// Preflight is answered by the webhook handler itself, so the headers must
/// be present unconditionally rather than only on requests carrying `Origin`.
pub fn cors_headers() -> DefaultHeaders {
    DefaultHeaders::new()
        .add(("Access-Control-Allow-Origin", ALLOW_ORIGIN))
        .add(("Access-Control-Allow-Methods", ALLOW_METHODS))
        .add(("Access-Control-Allow-Headers", ALLOW_HEADERS))
}
