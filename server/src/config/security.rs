use axum::http::{header, HeaderName, HeaderValue};
use axum::Router;
use tower_http::set_header::SetResponseHeaderLayer;

const PERMISSIONS_POLICY: HeaderName = HeaderName::from_static("permissions-policy");

const NOSNIFF: &str = "nosniff";
const DENY: &str = "DENY";
const XSS_BLOCK: &str = "1; mode=block";
const HSTS_VALUE: &str = "max-age=31536000; includeSubDomains";
const CSP_API_VALUE: &str = "default-src 'none'; frame-ancestors 'none'";
const REFERRER_POLICY_VALUE: &str = "strict-origin-when-cross-origin";
const PERMISSIONS_POLICY_VALUE: &str = "geolocation=(), microphone=(), camera=()";

/// Add the API's security headers to every response. HSTS is only sent
/// when `include_hsts` is set (HTTPS deployments).
pub fn apply_security_headers<S>(router: Router<S>, include_hsts: bool) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let headers = [
        (header::X_CONTENT_TYPE_OPTIONS, NOSNIFF),
        (header::X_FRAME_OPTIONS, DENY),
        (header::X_XSS_PROTECTION, XSS_BLOCK),
        (header::CONTENT_SECURITY_POLICY, CSP_API_VALUE),
        (header::REFERRER_POLICY, REFERRER_POLICY_VALUE),
        (PERMISSIONS_POLICY, PERMISSIONS_POLICY_VALUE),
    ];

    let mut router = headers.into_iter().fold(router, |router, (name, value)| {
        router.layer(SetResponseHeaderLayer::overriding(
            name,
            HeaderValue::from_static(value),
        ))
    });

    if include_hsts {
        tracing::info!("Security: HSTS header enabled (production mode)");
        router = router.layer(SetResponseHeaderLayer::overriding(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static(HSTS_VALUE),
        ));
    } else {
        tracing::info!("Security: HSTS header disabled (development mode)");
    }

    router
}
