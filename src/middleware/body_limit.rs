//! Declared-length body size guard.
//!
//! Rejects requests whose `Content-Length` already exceeds the configured cap
//! before a single body byte is read. This is only the fast path: a missing
//! or lying `Content-Length` is caught while streaming by Axum's
//! `DefaultBodyLimit`, installed on the router next to this layer; the
//! envelope middleware normalizes that 413 into the standard error body.
//!
//! A body of exactly the cap is accepted; cap + 1 is rejected.

use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{Request, Response, header};
use axum::response::IntoResponse;
use tower::{Layer, Service};
use tracing::debug;

use crate::error::AppError;

/// Body size guard layer for the Tower middleware stack.
#[derive(Debug, Clone, Copy)]
pub struct BodyLimitLayer {
    max_bytes: usize,
}

impl BodyLimitLayer {
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }
}

impl<S> Layer<S> for BodyLimitLayer {
    type Service = BodyLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        BodyLimitService {
            inner,
            max_bytes: self.max_bytes,
        }
    }
}

/// Body size guard service wrapper.
#[derive(Debug, Clone)]
pub struct BodyLimitService<S> {
    inner: S,
    max_bytes: usize,
}

impl<S> Service<Request<Body>> for BodyLimitService<S>
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

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let max_bytes = self.max_bytes;
        let declared = declared_content_length(&req);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            if let Some(length) = declared
                && length > max_bytes as u64
            {
                let route = req.uri().path();
                debug!(
                    declared_bytes = length,
                    max_bytes, route, "Declared body length exceeds cap"
                );
                crate::metrics::record_payload_too_large(route);
                return Ok(AppError::PayloadTooLarge.into_response());
            }

            inner.call(req).await
        })
    }
}

/// Parsed `Content-Length`, if present and well-formed. Malformed values are
/// left for hyper to reject.
fn declared_content_length(req: &Request<Body>) -> Option<u64> {
    req.headers()
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}
