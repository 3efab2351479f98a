//! Rate limiting middleware over fixed-window counters.
//!
//! Resolves the client identity, consults the shared [`RateLimiter`] for the
//! request's route, and either forwards to the inner service or answers 429
//! with a `Retry-After` header. The handler is only ever invoked on the
//! `Allow` path.
//!
//! Routes without configured limits (e.g. `/health`) and CORS preflights pass
//! through without touching the counter store.

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::response::IntoResponse;
use tower::{Layer, Service};
use tracing::warn;

use crate::error::AppError;
use crate::limiter::{Decision, RateLimiter};
use crate::middleware::envelope::RequestContext;
use crate::middleware::identity::resolve_client_identity;

/// Rate limiting layer for the Tower middleware stack.
#[derive(Clone)]
pub struct RateLimitLayer {
    limiter: Arc<RateLimiter>,
    trust_proxy_headers: bool,
}

impl RateLimitLayer {
    pub fn new(limiter: Arc<RateLimiter>, trust_proxy_headers: bool) -> Self {
        Self {
            limiter,
            trust_proxy_headers,
        }
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            limiter: self.limiter.clone(),
            trust_proxy_headers: self.trust_proxy_headers,
        }
    }
}

/// Rate limiting service wrapper.
#[derive(Clone)]
pub struct RateLimitService<S> {
    inner: S,
    limiter: Arc<RateLimiter>,
    trust_proxy_headers: bool,
}

impl<S> Service<Request<Body>> for RateLimitService<S>
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
        let mut inner = self.inner.clone();
        let route = req.uri().path().to_string();

        // Preflights and unlimited routes never consume quota.
        if req.method() == Method::OPTIONS || !self.limiter.limits_route(&route) {
            return Box::pin(async move { inner.call(req).await });
        }

        let identity = resolve_client_identity(&req, self.trust_proxy_headers);
        if let Some(context) = req.extensions_mut().get_mut::<RequestContext>() {
            context.identity = Some(identity.clone());
        }

        let decision = self.limiter.check(identity.as_str(), &route);

        Box::pin(async move {
            match decision {
                Decision::Allow => {
                    crate::metrics::record_admitted(&route);
                    inner.call(req).await
                }
                Decision::Deny { retry_after } => {
                    let retry_after_secs = retry_after.as_secs().max(1);
                    warn!(
                        identity = %identity,
                        route,
                        retry_after_secs,
                        "Rate limit exceeded"
                    );
                    crate::metrics::record_rate_limited(&route);
                    Ok(AppError::RateLimited { retry_after_secs }.into_response())
                }
            }
        })
    }
}
