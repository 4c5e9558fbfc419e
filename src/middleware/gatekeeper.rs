//! Edge check in front of every non-public path.
//!
//! A request without a session token, or whose token fails verification,
//! is redirected to the login page. Verdicts are cached per token for a
//! short time so bursts of requests hit the verifier once.

use std::num::NonZeroUsize;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use actix_web::body::EitherBody;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::LOCATION;
use actix_web::{Error, HttpResponse};
use async_trait::async_trait;
use futures_util::future::{ok, LocalBoxFuture, Ready};
use log::{debug, info, warn};
use lru::LruCache;
use parking_lot::Mutex;
use thiserror::Error;

use crate::auth::{bearer_token, JwtKeys, TOKEN_COOKIE};
use crate::config::GatekeeperConfig;

const VERIFY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("Token verification request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Decides whether a session token is still good
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenVerifier {
    async fn verify(&self, token: &str) -> Result<bool, VerifyError>;
}

pub type SharedVerifier = Arc<dyn TokenVerifier + Send + Sync>;

/// Asks a remote endpoint, passing the token as the session cookie
pub struct HttpTokenVerifier {
    client: reqwest::Client,
    verify_url: String,
}

impl HttpTokenVerifier {
    pub fn new(verify_url: impl Into<String>) -> Result<Self, VerifyError> {
        let client = reqwest::Client::builder().timeout(VERIFY_TIMEOUT).build()?;
        Ok(Self {
            client,
            verify_url: verify_url.into(),
        })
    }
}

#[async_trait]
impl TokenVerifier for HttpTokenVerifier {
    async fn verify(&self, token: &str) -> Result<bool, VerifyError> {
        let response = self
            .client
            .get(&self.verify_url)
            .header(reqwest::header::COOKIE, format!("{}={}", TOKEN_COOKIE, token))
            .send()
            .await?;

        debug!("Token verification answered {}", response.status());
        Ok(response.status() == reqwest::StatusCode::OK)
    }
}

/// Checks signature and expiry in-process
pub struct LocalTokenVerifier {
    keys: JwtKeys,
}

impl LocalTokenVerifier {
    pub fn new(keys: JwtKeys) -> Self {
        Self { keys }
    }
}

#[async_trait]
impl TokenVerifier for LocalTokenVerifier {
    async fn verify(&self, token: &str) -> Result<bool, VerifyError> {
        Ok(self.keys.decode(token).is_some())
    }
}

#[derive(Debug, Clone, Copy)]
struct CachedVerdict {
    valid: bool,
    recorded_at: Instant,
}

/// Recent verification results keyed by token
pub struct TokenCache {
    ttl: Duration,
    entries: Mutex<LruCache<String, CachedVerdict>>,
}

impl TokenCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            ttl,
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn get(&self, token: &str) -> Option<bool> {
        self.get_at(token, Instant::now())
    }

    /// Verdict recorded less than `ttl` before `now`; stale entries are dropped
    pub fn get_at(&self, token: &str, now: Instant) -> Option<bool> {
        let mut entries = self.entries.lock();
        let verdict = *entries.get(token)?;

        if now.saturating_duration_since(verdict.recorded_at) < self.ttl {
            Some(verdict.valid)
        } else {
            entries.pop(token);
            None
        }
    }

    pub fn insert(&self, token: &str, valid: bool) {
        self.insert_at(token, valid, Instant::now());
    }

    pub fn insert_at(&self, token: &str, valid: bool, now: Instant) {
        self.entries.lock().put(
            token.to_string(),
            CachedVerdict {
                valid,
                recorded_at: now,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

pub struct Gatekeeper {
    public_paths: Rc<Vec<String>>,
    login_path: Rc<str>,
    cache: Arc<TokenCache>,
    verifier: SharedVerifier,
}

impl Gatekeeper {
    /// `cache` and `verifier` are shared across workers, build them once
    pub fn new(config: &GatekeeperConfig, cache: Arc<TokenCache>, verifier: SharedVerifier) -> Self {
        Self {
            public_paths: Rc::new(config.public_paths.clone()),
            login_path: Rc::from(config.login_path.as_str()),
            cache,
            verifier,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for Gatekeeper
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = GatekeeperMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(GatekeeperMiddleware {
            service: Rc::new(service),
            public_paths: self.public_paths.clone(),
            login_path: self.login_path.clone(),
            cache: self.cache.clone(),
            verifier: self.verifier.clone(),
        })
    }
}

pub struct GatekeeperMiddleware<S> {
    service: Rc<S>,
    public_paths: Rc<Vec<String>>,
    login_path: Rc<str>,
    cache: Arc<TokenCache>,
    verifier: SharedVerifier,
}

impl<S> GatekeeperMiddleware<S> {
    fn is_public(&self, path: &str) -> bool {
        self.public_paths.iter().any(|p| p == path)
    }
}

fn redirect<B>(req: ServiceRequest, login_path: &str) -> ServiceResponse<EitherBody<B>> {
    let response = HttpResponse::TemporaryRedirect()
        .insert_header((LOCATION, login_path))
        .finish();
    req.into_response(response).map_into_right_body()
}

impl<S, B> Service<ServiceRequest> for GatekeeperMiddleware<S>
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
        if self.is_public(req.path()) {
            let fut = self.service.call(req);
            return Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) });
        }

        let token = req
            .cookie(TOKEN_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .or_else(|| bearer_token(req.request()).map(str::to_string));

        let login_path = self.login_path.clone();
        let Some(token) = token else {
            info!("No session token on {}, redirecting to {}", req.path(), login_path);
            return Box::pin(async move { Ok(redirect(req, &login_path)) });
        };

        let service = self.service.clone();
        let cache = self.cache.clone();
        let verifier = self.verifier.clone();

        Box::pin(async move {
            let valid = match cache.get(&token) {
                Some(valid) => valid,
                None => match verifier.verify(&token).await {
                    Ok(valid) => {
                        cache.insert(&token, valid);
                        valid
                    }
                    Err(e) => {
                        warn!("Could not verify session token: {}", e);
                        false
                    }
                },
            };

            if valid {
                service.call(req).await.map(ServiceResponse::map_into_left_body)
            } else {
                info!("Invalid session token on {}, redirecting to {}", req.path(), login_path);
                Ok(redirect(req, &login_path))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use actix_web::cookie::Cookie;
    use actix_web::http::StatusCode;
    use actix_web::{test as actix_test, web, App};

    use super::*;

    fn config() -> GatekeeperConfig {
        GatekeeperConfig {
            enabled: true,
            cache_ttl: Duration::from_secs(60),
            cache_capacity: 100,
            verify_url: None,
            login_path: "/login".to_string(),
            public_paths: vec!["/health".to_string(), "/api/login".to_string()],
        }
    }

    #[test]
    fn test_cache_entries_expire_after_ttl() {
        let cache = TokenCache::new(Duration::from_secs(60), 10);
        let start = Instant::now();

        cache.insert_at("t", true, start);
        assert_eq!(cache.get_at("t", start + Duration::from_secs(59)), Some(true));
        assert_eq!(cache.get_at("t", start + Duration::from_secs(60)), None);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_cache_is_bounded() {
        let cache = TokenCache::new(Duration::from_secs(60), 2);
        cache.insert("a", true);
        cache.insert("b", false);
        cache.insert("c", true);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), Some(false));
    }

    #[actix_web::test]
    async fn test_local_verifier_checks_signature() {
        let keys = JwtKeys::new("gate-secret", 1);
        let verifier = LocalTokenVerifier::new(keys);
        assert!(!verifier.verify("not-a-jwt").await.unwrap());
    }

    /// Stands in for the remote verify endpoint: 200 only for the `good` session cookie
    async fn verify_endpoint(req: actix_web::HttpRequest) -> HttpResponse {
        match req.cookie(TOKEN_COOKIE) {
            Some(cookie) if cookie.value() == "good" => HttpResponse::Ok().finish(),
            Some(_) => HttpResponse::Unauthorized().finish(),
            None => HttpResponse::NotFound().finish(),
        }
    }

    #[actix_web::test]
    async fn test_http_verifier_sends_token_cookie() {
        let server = actix_web::HttpServer::new(|| {
            App::new().route("/api/verify-token", web::get().to(verify_endpoint))
        })
        .workers(1)
        .bind(("127.0.0.1", 0))
        .unwrap();
        let addr = server.addrs()[0];
        let server = server.run();
        let handle = server.handle();
        actix_web::rt::spawn(server);

        let verifier = HttpTokenVerifier::new(format!("http://{}/api/verify-token", addr)).unwrap();
        assert!(verifier.verify("good").await.unwrap());
        assert!(!verifier.verify("expired").await.unwrap());

        let missing = HttpTokenVerifier::new(format!("http://{}/elsewhere", addr)).unwrap();
        assert!(!missing.verify("good").await.unwrap());

        handle.stop(false).await;
    }

    #[actix_web::test]
    async fn test_http_verifier_reports_unreachable_endpoint() {
        let verifier = HttpTokenVerifier::new("http://127.0.0.1:1/api/verify-token").unwrap();
        assert!(matches!(
            verifier.verify("good").await,
            Err(VerifyError::Transport(_))
        ));
    }

    async fn call_with(
        verifier: MockTokenVerifier,
        requests: Vec<actix_test::TestRequest>,
    ) -> Vec<(StatusCode, Option<String>)> {
        let cache = Arc::new(TokenCache::new(Duration::from_secs(60), 100));
        let app = actix_test::init_service(
            App::new()
                .wrap(Gatekeeper::new(&config(), cache, Arc::new(verifier)))
                .route("/health", web::get().to(HttpResponse::Ok))
                .route("/api/classes", web::get().to(HttpResponse::Ok)),
        )
        .await;

        let mut results = Vec::new();
        for req in requests {
            let res = actix_test::call_service(&app, req.to_request()).await;
            let location = res
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(String::from);
            results.push((res.status(), location));
        }
        results
    }

    #[actix_web::test]
    async fn test_public_paths_pass_without_token() {
        let mut verifier = MockTokenVerifier::new();
        verifier.expect_verify().never();

        let results = call_with(verifier, vec![actix_test::TestRequest::get().uri("/health")]).await;
        assert_eq!(results[0].0, StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_missing_token_redirects_to_login() {
        let mut verifier = MockTokenVerifier::new();
        verifier.expect_verify().never();

        let results = call_with(verifier, vec![actix_test::TestRequest::get().uri("/api/classes")]).await;
        assert_eq!(results[0], (StatusCode::TEMPORARY_REDIRECT, Some("/login".to_string())));
    }

    #[actix_web::test]
    async fn test_valid_verdict_is_reused() {
        let mut verifier = MockTokenVerifier::new();
        verifier
            .expect_verify()
            .withf(|token| token == "good")
            .times(1)
            .returning(|_| Ok(true));

        let request = || {
            actix_test::TestRequest::get()
                .uri("/api/classes")
                .cookie(Cookie::new(TOKEN_COOKIE, "good"))
        };
        let results = call_with(verifier, vec![request(), request()]).await;
        assert!(results.iter().all(|(status, _)| *status == StatusCode::OK));
    }

    #[actix_web::test]
    async fn test_invalid_verdict_redirects_and_is_cached() {
        let mut verifier = MockTokenVerifier::new();
        verifier.expect_verify().times(1).returning(|_| Ok(false));

        let request = || {
            actix_test::TestRequest::get()
                .uri("/api/classes")
                .cookie(Cookie::new(TOKEN_COOKIE, "stale"))
        };
        let results = call_with(verifier, vec![request(), request()]).await;
        assert!(results
            .iter()
            .all(|(status, _)| *status == StatusCode::TEMPORARY_REDIRECT));
    }

    #[actix_web::test]
    async fn test_verifier_failure_is_not_cached() {
        let mut verifier = MockTokenVerifier::new();
        let mut calls = 0;
        verifier.expect_verify().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                let err = reqwest::Client::new().get("not a url").build().unwrap_err();
                Err(VerifyError::Transport(err))
            } else {
                Ok(true)
            }
        });

        let request = || {
            actix_test::TestRequest::get()
                .uri("/api/classes")
                .cookie(Cookie::new(TOKEN_COOKIE, "flaky"))
        };
        let results = call_with(verifier, vec![request(), request()]).await;
        assert_eq!(results[0].0, StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(results[1].0, StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_bearer_header_is_accepted() {
        let mut verifier = MockTokenVerifier::new();
        verifier
            .expect_verify()
            .withf(|token| token == "from-header")
            .times(1)
            .returning(|_| Ok(true));

        let results = call_with(
            verifier,
            vec![actix_test::TestRequest::get()
                .uri("/api/classes")
                .insert_header(("Authorization", "Bearer from-header"))],
        )
        .await;
        assert_eq!(results[0].0, StatusCode::OK);
    }
}
