use std::rc::Rc;
use std::time::Instant;

use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::Error;
use futures_util::future::{ok, LocalBoxFuture, Ready};
use log::{debug, warn};

use super::rate_limit::client_ip;

/// Logs each request and the status it produced, with timing
pub struct RequestLogger {
    enable_debug_logging: bool,
}

impl RequestLogger {
    pub fn new(enable_debug_logging: bool) -> Self {
        Self { enable_debug_logging }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequestLogger
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = RequestLoggerMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(RequestLoggerMiddleware {
            service: Rc::new(service),
            enable_debug_logging: self.enable_debug_logging,
        })
    }
}

pub struct RequestLoggerMiddleware<S> {
    service: Rc<S>,
    enable_debug_logging: bool,
}

impl<S, B> Service<ServiceRequest> for RequestLoggerMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();

        if !self.enable_debug_logging {
            return Box::pin(service.call(req));
        }

        let path = req.path().to_owned();
        let method = req.method().clone();
        let client = client_ip(req.request()).unwrap_or_else(|| "-".to_string());
        let started = Instant::now();

        debug!("Processing request: {} {} from {}", method, path, client);

        Box::pin(async move {
            let res = service.call(req).await?;
            let elapsed = started.elapsed().as_millis();
            if res.status().is_server_error() {
                warn!("Response: {} {} - status: {} in {}ms", method, path, res.status(), elapsed);
            } else {
                debug!("Response: {} {} - status: {} in {}ms", method, path, res.status(), elapsed);
            }
            Ok(res)
        })
    }
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test as actix_test, web, App, HttpResponse};

    use super::*;

    #[actix_web::test]
    async fn test_passes_responses_through() {
        for enabled in [true, false] {
            let app = actix_test::init_service(
                App::new()
                    .wrap(RequestLogger::new(enabled))
                    .route("/", web::get().to(HttpResponse::Accepted)),
            )
            .await;

            let req = actix_test::TestRequest::get().uri("/").to_request();
            let res = actix_test::call_service(&app, req).await;
            assert_eq!(res.status(), StatusCode::ACCEPTED);
        }
    }
}
