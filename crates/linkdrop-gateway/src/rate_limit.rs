use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use tracing::warn;

use crate::error::AppError;

/// At most `requests` per client IP within `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub requests: u32,
    pub window: Duration,
}

impl RateLimit {
    /// Every `/api` request.
    pub const GENERAL: Self = Self::new(100, Duration::from_secs(15 * 60));
    /// Everything under `/api/upload`.
    pub const UPLOAD: Self = Self::new(10, Duration::from_secs(60 * 60));
    /// Everything under `/api/url`.
    pub const URL: Self = Self::new(50, Duration::from_secs(5 * 60));

    pub const fn new(requests: u32, window: Duration) -> Self {
        Self { requests, window }
    }

    /// A bucket of `requests` tokens, refilled evenly over `window`.
    fn quota(&self) -> Option<Quota> {
        let burst = NonZeroU32::new(self.requests)?;
        Quota::with_period(self.window / self.requests).map(|quota| quota.allow_burst(burst))
    }
}

/// Per-client token buckets for one group of routes.
#[derive(Clone)]
pub struct ClientLimiter {
    name: &'static str,
    limiter: Arc<DefaultKeyedRateLimiter<IpAddr>>,
}

impl ClientLimiter {
    /// `None` when the limit allows nothing or has a zero window.
    pub fn new(name: &'static str, limit: RateLimit) -> Option<Self> {
        let quota = limit.quota()?;
        Some(Self {
            name,
            limiter: Arc::new(RateLimiter::keyed(quota)),
        })
    }

    pub fn check(&self, client: IpAddr) -> bool {
        self.limiter.check_key(&client).is_ok()
    }
}

pub async fn rate_limit(
    State(limiter): State<ClientLimiter>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let client = client_ip(&request);
    if !limiter.check(client) {
        warn!(limiter = limiter.name, %client, "rate limit exceeded");
        return Err(AppError::RateLimited(format!(
            "too many {} requests, try again later",
            limiter.name
        )));
    }
    Ok(next.run(request).await)
}

/// Peer address of the connection. Requests without one share a bucket.
fn client_ip(request: &Request) -> IpAddr {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}
