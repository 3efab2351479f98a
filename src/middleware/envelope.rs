//! Response envelope, correlation ID, and security header middleware.
//!
//! The outermost layer of the stack. It wraps the full request lifecycle:
//!
//! 1. At entry it extracts or generates an `X-Request-Id` (UUIDv4) and seeds
//!    a [`RequestContext`] in request extensions for inner layers and
//!    handlers.
//! 2. On the way out it rewrites every 4xx/5xx body into the single
//!    [`ErrorEnvelope`] shape, regardless of which component produced the
//!    failure - our own error type, the rate limiter, an Axum extractor
//!    rejection, or a framework-generated 404.
//! 3. It unconditionally attaches the correlation ID and the security
//!    headers to every response, short-circuited denials included.
//!
//! Clients can provide their own `X-Request-Id` for cross-service
//! correlation; otherwise one is generated.

use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::header::{self, HeaderValue};
use axum::http::{Request, Response};
use tower::{Layer, Service};
use tracing::debug;
use uuid::Uuid;

use crate::error::{ErrorContext, ErrorDetail, ErrorEnvelope, fallback_for_status};
use crate::middleware::identity::ClientIdentity;

/// Header name for the request correlation ID.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// The API serves JSON only; nothing may be embedded, framed, or loaded.
const CSP_VALUE: &str = "default-src 'none'; frame-ancestors 'none'; base-uri 'none'";

/// Fallback header value when request ID parsing fails.
static UNKNOWN_REQUEST_ID: HeaderValue = HeaderValue::from_static("unknown");

/// Per-request correlation state, created at middleware entry and discarded
/// at request end. Never persisted.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
    pub route: String,
    /// Filled in by the rate-limit middleware once resolved.
    pub identity: Option<ClientIdentity>,
}

/// Envelope and security header layer for the Tower middleware stack.
#[derive(Debug, Clone, Copy)]
pub struct EnvelopeLayer {
    csp_report_only: bool,
}

impl EnvelopeLayer {
    pub fn new(csp_report_only: bool) -> Self {
        Self { csp_report_only }
    }
}

impl<S> Layer<S> for EnvelopeLayer {
    type Service = EnvelopeService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        EnvelopeService {
            inner,
            csp_report_only: self.csp_report_only,
        }
    }
}

/// Envelope and security header service wrapper.
#[derive(Clone)]
pub struct EnvelopeService<S> {
    inner: S,
    csp_report_only: bool,
}

impl<S> Service<Request<Body>> for EnvelopeService<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let request_id = extract_or_generate_request_id(&req);
        let csp_report_only = self.csp_report_only;

        // Expose the ID to inner layers and handlers.
        req.headers_mut().insert(
            REQUEST_ID_HEADER,
            request_id
                .parse()
                .unwrap_or_else(|_| UNKNOWN_REQUEST_ID.clone()),
        );
        let route = req.uri().path().to_string();
        req.extensions_mut().insert(RequestContext {
            request_id: request_id.clone(),
            route,
            identity: None,
        });
        debug!(request_id = %request_id, "Processing request");

        let mut inner = self.inner.clone();

        Box::pin(async move {
            let response = inner.call(req).await?;

            let mut response = if response.status().is_client_error()
                || response.status().is_server_error()
            {
                normalize_error_body(response, &request_id)
            } else {
                response
            };

            let headers = response.headers_mut();
            headers.insert(
                REQUEST_ID_HEADER,
                request_id
                    .parse()
                    .unwrap_or_else(|_| UNKNOWN_REQUEST_ID.clone()),
            );
            headers.insert(
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            );
            headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
            headers.insert(header::REFERRER_POLICY, HeaderValue::from_static("no-referrer"));
            let csp_header = if csp_report_only {
                header::CONTENT_SECURITY_POLICY_REPORT_ONLY
            } else {
                header::CONTENT_SECURITY_POLICY
            };
            headers.insert(csp_header, HeaderValue::from_static(CSP_VALUE));

            Ok(response)
        })
    }
}

/// Replace an error response's body with the standard envelope.
///
/// The `code`/`message` come from the [`ErrorContext`] extension when a
/// component attached one, and are otherwise derived from the status code so
/// framework-generated errors (extractor rejections, 404s, the streaming
/// body-limit 413) normalize too. Status and headers (`Retry-After`
/// included) are preserved.
fn normalize_error_body(response: Response<Body>, request_id: &str) -> Response<Body> {
    let (mut parts, _discarded_body) = response.into_parts();

    let (code, message) = match parts.extensions.get::<ErrorContext>() {
        Some(context) => (context.code.to_string(), context.message.to_string()),
        None => {
            let (code, message) = fallback_for_status(parts.status);
            (code.to_string(), message.to_string())
        }
    };

    let envelope = ErrorEnvelope {
        error: ErrorDetail { code, message },
        request_id: request_id.to_string(),
    };

    let body = serde_json::to_vec(&envelope).unwrap_or_else(|_| {
        br#"{"error":{"code":"internal_fault","message":"Internal server error."},"request_id":""}"#
            .to_vec()
    });

    parts.headers.remove(header::CONTENT_LENGTH);
    parts
        .headers
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));

    Response::from_parts(parts, Body::from(body))
}

/// Extract the caller-provided request ID, or generate a fresh UUIDv4.
fn extract_or_generate_request_id<B>(req: &Request<B>) -> String {
    if let Some(header_value) = req.headers().get(REQUEST_ID_HEADER)
        && let Ok(value) = header_value.to_str()
        && !value.is_empty()
    {
        return value.to_string();
    }

    Uuid::new_v4().to_string()
}
