use axum::http::{header, HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

pub const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";

const PREFLIGHT_MAX_AGE_SECS: u64 = 86400;

/// CORS for the browser front end. `origins` is a comma-separated list.
pub fn create_cors_layer(origins: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            header::ORIGIN,
            HeaderName::from_static("x-requested-with"),
        ])
        .expose_headers([
            header::CONTENT_LENGTH,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-request-id"),
        ])
        .max_age(std::time::Duration::from_secs(PREFLIGHT_MAX_AGE_SECS));

    match parse_origins(origins) {
        Some(allowed) => layer.allow_origin(allowed).allow_credentials(true),
        // Credentials cannot be combined with a wildcard origin.
        None => layer.allow_origin(AllowOrigin::any()),
    }
}

fn parse_origins(origins: &str) -> Option<AllowOrigin> {
    let origins: Vec<HeaderValue> = origins
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => {
                tracing::debug!("CORS: Allowing origin: {}", origin);
                Some(value)
            }
            Err(e) => {
                tracing::warn!("CORS: Invalid origin '{}': {}", origin, e);
                None
            }
        })
        .collect();

    if origins.is_empty() {
        tracing::warn!(
            "CORS: No valid origins configured, using permissive settings for development"
        );
        None
    } else {
        tracing::info!("CORS: Configured with {} allowed origin(s)", origins.len());
        Some(AllowOrigin::list(origins))
    }
}
