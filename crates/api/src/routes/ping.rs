//! Liveness endpoint.

/// GET /ping: answers `pong` while the server accepts requests.
pub async fn ping() -> &'static str {
    "pong"
}
