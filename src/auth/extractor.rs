use actix_web::{dev::Payload, http::header::AUTHORIZATION, web, FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};
use uuid::Uuid;

use super::{Claims, JwtKeys};
use crate::{errors::AppError, models::Role};

/// Caller identity decoded from the `Authorization: Bearer` header
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub claims: Claims,
}

/// Token part of an `Authorization: Bearer <token>` header
pub fn bearer_token(req: &HttpRequest) -> Option<&str> {
    let header = req.headers().get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = header.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

impl AuthUser {
    fn from_http_request(req: &HttpRequest) -> Result<Self, AppError> {
        let keys = req
            .app_data::<web::Data<JwtKeys>>()
            .ok_or_else(|| AppError::Internal("Token keys are not configured".to_string()))?;

        let token = bearer_token(req)
            .ok_or_else(|| AppError::Unauthorized("Unauthorized request".to_string()))?;

        let claims = keys
            .decode(token)
            .ok_or_else(|| AppError::Unauthorized("Invalid token".to_string()))?;

        Ok(AuthUser { claims })
    }

    pub fn id(&self) -> Uuid {
        self.claims.id
    }

    pub fn role(&self) -> Role {
        self.claims.role
    }

    pub fn is_admin(&self) -> bool {
        self.claims.role == Role::Admin
    }

    /// True when `user_id` names the caller
    pub fn is_self(&self, user_id: &str) -> bool {
        Uuid::parse_str(user_id.trim())
            .map(|id| id == self.claims.id)
            .unwrap_or(false)
    }

    pub fn is_staff(&self) -> bool {
        matches!(self.claims.role, Role::Admin | Role::Professor)
    }

    /// Fails with 403 unless `user_id` is the caller or the caller is staff
    pub fn require_self_or_staff(&self, user_id: &str) -> Result<(), AppError> {
        if self.is_self(user_id) || self.is_staff() {
            Ok(())
        } else {
            Err(AppError::Forbidden("You can only act on your own record".to_string()))
        }
    }

    /// Fails with 403 unless the caller holds one of the roles
    pub fn require_role(&self, allowed: &[Role]) -> Result<(), AppError> {
        if allowed.contains(&self.claims.role) {
            return Ok(());
        }

        let roles = allowed
            .iter()
            .map(|role| format!("{}s", role))
            .collect::<Vec<_>>()
            .join(" or ");
        Err(AppError::Forbidden(format!("{} only", roles)))
    }
}

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Self::from_http_request(req))
    }
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test as actix_test, App, HttpResponse, Responder};
    use chrono::Utc;

    use super::*;

    const SECRET: &str = "extractor-secret";

    fn token_for(role: Role) -> (Uuid, String) {
        let keys = JwtKeys::new(SECRET, 1);
        let now = Utc::now().timestamp();
        let id = Uuid::new_v4();
        let claims = Claims {
            id,
            email: "someone@example.com".into(),
            role,
            usertype: "Normal".into(),
            iat: now,
            exp: now + 600,
        };
        (id, keys.encode(&claims).unwrap())
    }

    async fn admin_only(user: AuthUser) -> Result<impl Responder, AppError> {
        user.require_role(&[Role::Admin])?;
        Ok(HttpResponse::Ok().body(user.id().to_string()))
    }

    #[actix_web::test]
    async fn test_role_gate() {
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(JwtKeys::new(SECRET, 1)))
                .route("/admin", web::get().to(admin_only)),
        )
        .await;

        let req = actix_test::TestRequest::get().uri("/admin").to_request();
        let res = actix_test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let req = actix_test::TestRequest::get()
            .uri("/admin")
            .insert_header((AUTHORIZATION, "Bearer garbage"))
            .to_request();
        let res = actix_test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let (_, student) = token_for(Role::Student);
        let req = actix_test::TestRequest::get()
            .uri("/admin")
            .insert_header((AUTHORIZATION, format!("Bearer {}", student)))
            .to_request();
        let res = actix_test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);

        let (id, admin) = token_for(Role::Admin);
        let req = actix_test::TestRequest::get()
            .uri("/admin")
            .insert_header((AUTHORIZATION, format!("Bearer {}", admin)))
            .to_request();
        let body = actix_test::call_and_read_body(&app, req).await;
        assert_eq!(body, id.to_string().as_bytes());
    }

    #[test]
    fn test_forbidden_message_lists_roles() {
        let user = AuthUser {
            claims: Claims {
                id: Uuid::new_v4(),
                email: "s@example.com".into(),
                role: Role::Student,
                usertype: "Normal".into(),
                iat: 0,
                exp: 0,
            },
        };
        let err = user.require_role(&[Role::Admin, Role::Professor]).unwrap_err();
        assert_eq!(err.to_string(), "Forbidden: Admins or Professors only");
        assert!(user.is_self(&user.id().to_string()));
        assert!(!user.is_self("someone-else"));
        assert!(user.require_self_or_staff(&user.id().to_string()).is_ok());
        assert!(user.require_self_or_staff(&Uuid::new_v4().to_string()).is_err());
    }

    #[test]
    fn test_bearer_token_parsing() {
        let req = actix_test::TestRequest::default()
            .insert_header((AUTHORIZATION, "bearer abc.def"))
            .to_http_request();
        assert_eq!(bearer_token(&req), Some("abc.def"));

        let req = actix_test::TestRequest::default()
            .insert_header((AUTHORIZATION, "Basic abc"))
            .to_http_request();
        assert_eq!(bearer_token(&req), None);
    }
}
