/// Request context and access logging
///
/// Every request gets a [`RequestContext`] in its extensions holding a fresh
/// request id and the resolved client IP. The id is echoed back in the
/// `x-request-id` header and one access log line is written per request.
///
/// The client IP is taken from `CF-Connecting-IP`, then the first
/// `X-Forwarded-For` entry, then the socket peer address, falling back
/// to `-`.

use axum::{
    extract::{ConnectInfo, Request},
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use councilhours_shared::auth::middleware::AuthContext;
use std::net::SocketAddr;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub request_id: String,
    pub client_ip: String,
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Resolves the client address from proxy headers or the peer address
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(ip) = header_value(headers, "cf-connecting-ip") {
        return ip.to_string();
    }

    if let Some(ip) = header_value(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return ip.to_string();
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub async fn request_context(mut req: Request, next: Next) -> Response {
    let started = Instant::now();
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let context = RequestContext {
        request_id: Uuid::new_v4().to_string(),
        client_ip: client_ip(req.headers(), peer),
    };
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let span = tracing::info_span!(
        "request",
        request_id = %context.request_id,
        client_ip = %context.client_ip,
    );
    req.extensions_mut().insert(context.clone());

    let mut response = next.run(req).instrument(span.clone()).await;

    // Set by the auth layer on authenticated routes
    let member_id = response
        .extensions()
        .get::<AuthContext>()
        .map(|auth| auth.member_id.to_string())
        .unwrap_or_else(|| "-".to_string());

    span.in_scope(|| {
        tracing::info!(
            method = %method,
            path = %path,
            status = response.status().as_u16(),
            member_id = %member_id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request completed"
        );
    });

    if let Ok(value) = HeaderValue::from_str(&context.request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, routing::get, Extension, Router};
    use tower::ServiceExt;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(*value));
        }
        map
    }

    #[test]
    fn test_client_ip_precedence() {
        let peer: Option<SocketAddr> = Some("10.0.0.9:5555".parse().unwrap());

        assert_eq!(
            client_ip(
                &headers(&[
                    ("cf-connecting-ip", "203.0.113.7"),
                    ("x-forwarded-for", "198.51.100.1")
                ]),
                peer
            ),
            "203.0.113.7"
        );
        assert_eq!(
            client_ip(
                &headers(&[("x-forwarded-for", " 198.51.100.1 , 10.0.0.1")]),
                peer
            ),
            "198.51.100.1"
        );
        assert_eq!(client_ip(&HeaderMap::new(), peer), "10.0.0.9");
        assert_eq!(client_ip(&HeaderMap::new(), None), "-");
        assert_eq!(client_ip(&headers(&[("x-forwarded-for", " ")]), None), "-");
    }

    #[tokio::test]
    async fn test_context_inserted_and_request_id_echoed() {
        async fn handler(Extension(ctx): Extension<RequestContext>) -> String {
            format!("{}|{}", ctx.request_id, ctx.client_ip)
        }

        let app = Router::new()
            .route("/", get(handler))
            .layer(axum::middleware::from_fn(request_context));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header("x-forwarded-for", "198.51.100.1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let request_id = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(Uuid::parse_str(&request_id).is_ok());

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(
            String::from_utf8(body.to_vec()).unwrap(),
            format!("{}|198.51.100.1", request_id)
        );
    }
}
