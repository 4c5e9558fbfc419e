use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use serde_json::json;

use crate::{
    auth::{AuthUser, TOKEN_COOKIE},
    config::AuthConfig,
    errors::AppError,
    models::{LoginDto, RegisterUserDto},
    services::AuthServiceTrait,
    types::Result,
};

use super::AuthServiceType;

const CLIENT_SECRET_HEADER: &str = "X-Secret-Token";

/// Login and registration forms must present the shared client secret when one is configured
fn check_client_secret(req: &HttpRequest, config: &AuthConfig) -> Result<()> {
    let Some(expected) = config.client_secret.as_deref() else {
        return Ok(());
    };

    let presented = req
        .headers()
        .get(CLIENT_SECRET_HEADER)
        .and_then(|v| v.to_str().ok());
    match presented {
        Some(secret) if secret == expected => Ok(()),
        _ => Err(AppError::Unauthorized("Invalid client secret".to_string())),
    }
}

/// Register route handler
pub async fn register_handler(
    req: HttpRequest,
    dto: web::Json<RegisterUserDto>,
    service: web::Data<AuthServiceType>,
    config: web::Data<AuthConfig>,
) -> Result<impl Responder> {
    check_client_secret(&req, &config)?;

    let id = service.register(dto.into_inner()).await?;
    Ok(HttpResponse::Created().json(json!({
        "insertedId": id,
        "message": "User registered successfully",
    })))
}

/// Login route handler, answers with the token and also sets it as the session cookie
pub async fn login_handler(
    req: HttpRequest,
    dto: web::Json<LoginDto>,
    service: web::Data<AuthServiceType>,
    config: web::Data<AuthConfig>,
) -> Result<impl Responder> {
    check_client_secret(&req, &config)?;

    let outcome = service.login(dto.into_inner()).await?;
    let cookie = Cookie::build(TOKEN_COOKIE, outcome.token.clone())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::days(config.cookie_max_age_days))
        .finish();

    Ok(HttpResponse::Ok().cookie(cookie).json(json!({
        "token": outcome.token,
        "user": outcome.user,
    })))
}

/// Verify token route handler, reads the session cookie
pub async fn verify_token_handler(
    req: HttpRequest,
    service: web::Data<AuthServiceType>,
) -> Result<impl Responder> {
    let cookie = req
        .cookie(TOKEN_COOKIE)
        .ok_or_else(|| AppError::NotFound("No token found".to_string()))?;

    let claims = service.verify(cookie.value())?;
    Ok(HttpResponse::Ok().json(json!({ "user": claims })))
}

/// Current user profile route handler
pub async fn profile_handler(
    user: AuthUser,
    service: web::Data<AuthServiceType>,
) -> Result<impl Responder> {
    let profile = service.profile(&user.id()).await?;
    Ok(HttpResponse::Ok().json(profile))
}

#[cfg(test)]
mod tests {
    use actix_web::test as actix_test;

    use super::*;

    fn config(client_secret: Option<&str>) -> AuthConfig {
        AuthConfig {
            jwt_secret: "secret".into(),
            token_ttl_hours: 24,
            cookie_max_age_days: 7,
            client_secret: client_secret.map(String::from),
        }
    }

    #[test]
    fn test_client_secret_only_checked_when_configured() {
        let req = actix_test::TestRequest::default().to_http_request();
        assert!(check_client_secret(&req, &config(None)).is_ok());
        assert!(matches!(
            check_client_secret(&req, &config(Some("s3cret"))),
            Err(AppError::Unauthorized(_))
        ));

        let req = actix_test::TestRequest::default()
            .insert_header((CLIENT_SECRET_HEADER, "s3cret"))
            .to_http_request();
        assert!(check_client_secret(&req, &config(Some("s3cret"))).is_ok());
    }
}
