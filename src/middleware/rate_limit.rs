//! IP-keyed fixed-window request limiting.
//!
//! Every route group wraps its own [`RateLimiter`], so counters for
//! `/api/login` and `/api/classes` never interfere with each other.

use std::num::NonZeroUsize;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use actix_web::body::EitherBody;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, HttpRequest, ResponseError};
use futures_util::future::{ok, LocalBoxFuture, Ready};
use log::{debug, info, warn};
use lru::LruCache;
use parking_lot::Mutex;

use crate::config::RateLimitPolicy;
use crate::errors::AppError;

const FORWARDED_FOR: &str = "x-forwarded-for";
const REMOTE_ADDR: &str = "remote-addr";

/// Outcome of counting one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted { remaining: u32 },
    Rejected { retry_after: Duration },
}

#[derive(Debug, Clone, Copy)]
struct WindowEntry {
    hits: u32,
    started_at: Instant,
}

/// Hit counters per client address, bounded by the policy capacity
pub struct FixedWindowLimiter {
    policy: RateLimitPolicy,
    entries: Mutex<LruCache<String, WindowEntry>>,
}

impl FixedWindowLimiter {
    pub fn new(policy: RateLimitPolicy) -> Self {
        let capacity = NonZeroUsize::new(policy.capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            policy,
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    pub fn check(&self, ip: &str) -> Admission {
        self.check_at(ip, Instant::now())
    }

    /// Counts a hit for `ip` at `now`.
    ///
    /// The window starts with the first hit and is never extended by later
    /// ones; once it has fully elapsed the counter starts over.
    pub fn check_at(&self, ip: &str, now: Instant) -> Admission {
        let max_hits = self.policy.max_hits;
        let mut entries = self.entries.lock();

        if let Some(entry) = entries.get_mut(ip) {
            let elapsed = now.saturating_duration_since(entry.started_at);
            if elapsed < self.policy.window {
                if entry.hits >= max_hits {
                    return Admission::Rejected {
                        retry_after: self.policy.window - elapsed,
                    };
                }
                entry.hits += 1;
                return Admission::Admitted {
                    remaining: max_hits - entry.hits,
                };
            }
        }

        if max_hits == 0 {
            return Admission::Rejected {
                retry_after: self.policy.window,
            };
        }

        entries.put(
            ip.to_string(),
            WindowEntry {
                hits: 1,
                started_at: now,
            },
        );
        Admission::Admitted {
            remaining: max_hits - 1,
        }
    }

    /// Number of addresses currently tracked
    pub fn tracked(&self) -> usize {
        self.entries.lock().len()
    }
}

/// Client address: first `X-Forwarded-For` entry, then `Remote-Addr`, then the socket peer
pub fn client_ip(req: &HttpRequest) -> Option<String> {
    let headers = req.headers();

    let forwarded = headers
        .get(FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(ip) = forwarded {
        return Some(ip.to_string());
    }

    let remote = headers
        .get(REMOTE_ADDR)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(ip) = remote {
        return Some(ip.to_string());
    }

    req.peer_addr().map(|addr| addr.ip().to_string())
}

/// Whole seconds a client should wait, never zero
fn retry_after_secs(wait: Duration) -> u64 {
    let secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
    secs.max(1)
}

pub struct RateLimiter {
    name: &'static str,
    limiter: Arc<FixedWindowLimiter>,
}

impl RateLimiter {
    /// `name` only labels log lines; state lives in the shared limiter
    pub fn new(name: &'static str, limiter: Arc<FixedWindowLimiter>) -> Self {
        Self { name, limiter }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimiter
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RateLimiterMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(RateLimiterMiddleware {
            service: Rc::new(service),
            name: self.name,
            limiter: self.limiter.clone(),
        })
    }
}

pub struct RateLimiterMiddleware<S> {
    service: Rc<S>,
    name: &'static str,
    limiter: Arc<FixedWindowLimiter>,
}

impl<S, B> Service<ServiceRequest> for RateLimiterMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let admission = match client_ip(req.request()) {
            Some(ip) => {
                let admission = self.limiter.check(&ip);
                if let Admission::Rejected { .. } = admission {
                    info!("Rate limit '{}' exceeded for {} on {}", self.name, ip, req.path());
                }
                admission
            }
            None => {
                warn!("Rejecting request to {} without a client address", req.path());
                Admission::Rejected {
                    retry_after: self.limiter.policy().window,
                }
            }
        };

        match admission {
            Admission::Admitted { remaining } => {
                debug!("Rate limit '{}': {} hits left", self.name, remaining);
                let fut = self.service.call(req);
                Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) })
            }
            Admission::Rejected { retry_after } => {
                let response = AppError::TooManyRequests(retry_after_secs(retry_after)).error_response();
                Box::pin(async move { Ok(req.into_response(response).map_into_right_body()) })
            }
        }
    }
}
