use crate::error::{AppError, AppResult};
use crate::utils::{JwtService, ROLE_ADMIN};
use actix_web::http::Method;
use actix_web::{
    Error, HttpMessage, HttpRequest,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use futures_util::future::LocalBoxFuture;
use std::future::{Ready, ready};

/// Caller identity taken from a verified access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i64,
    pub role: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

// Which paths skip authentication and which need the admin role
struct PathRules {
    exact_public: Vec<&'static str>,
    prefix_public: Vec<&'static str>,
    admin_prefix: &'static str,
}

impl PathRules {
    fn new() -> Self {
        Self {
            exact_public: vec!["/swagger-ui", "/swagger-ui/", "/api-docs/openapi.json"],
            prefix_public: vec!["/swagger-ui/", "/api-docs/"],
            admin_prefix: "/api/v1/admin",
        }
    }

    fn is_public_path(&self, path: &str) -> bool {
        if self.exact_public.contains(&path) {
            return true;
        }
        self.prefix_public
            .iter()
            .any(|&prefix| path.starts_with(prefix))
    }

    fn is_admin_path(&self, path: &str) -> bool {
        path == self.admin_prefix
            || path
                .strip_prefix(self.admin_prefix)
                .is_some_and(|rest| rest.starts_with('/'))
    }
}

pub struct AuthMiddleware {
    jwt_service: JwtService,
}

impl AuthMiddleware {
    pub fn new(jwt_service: JwtService) -> Self {
        Self { jwt_service }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service,
            jwt_service: self.jwt_service.clone(),
            rules: PathRules::new(),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
    jwt_service: JwtService,
    rules: PathRules,
}

impl<S> AuthMiddlewareService<S> {
    fn authenticate(&self, req: &ServiceRequest) -> AppResult<AuthUser> {
        let token = req
            .headers()
            .get("Authorization")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| AppError::AuthError("Missing access token".to_string()))?;

        let claims = self
            .jwt_service
            .verify_access_token(token)
            .map_err(|_| AppError::AuthError("Invalid access token".to_string()))?;
        let id = claims
            .sub
            .parse::<i64>()
            .map_err(|_| AppError::AuthError("Invalid token subject".to_string()))?;

        let user = AuthUser {
            id,
            role: claims.role,
        };
        if self.rules.is_admin_path(req.path()) && !user.is_admin() {
            return Err(AppError::Forbidden);
        }
        Ok(user)
    }
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // CORS preflight never carries credentials
        if req.method() == Method::OPTIONS || self.rules.is_public_path(req.path()) {
            let fut = self.service.call(req);
            return Box::pin(fut);
        }

        match self.authenticate(&req) {
            Ok(user) => {
                req.extensions_mut().insert(user);
                let fut = self.service.call(req);
                Box::pin(fut)
            }
            Err(error) => Box::pin(async move { Err(error.into()) }),
        }
    }
}

/// Caller injected by [`AuthMiddleware`]; missing only on public routes.
pub fn current_user(req: &HttpRequest) -> AppResult<AuthUser> {
    req.extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| AppError::AuthError("Missing access token".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::ROLE_PLAYER;
    use actix_web::{App, HttpResponse, http::StatusCode, test as actix_test, web};

    async fn whoami(req: HttpRequest) -> HttpResponse {
        match current_user(&req) {
            Ok(user) => HttpResponse::Ok().body(format!("{}:{}", user.id, user.role)),
            Err(_) => HttpResponse::Ok().body("anonymous"),
        }
    }

    fn jwt() -> JwtService {
        JwtService::new("middleware-secret", 600)
    }

    #[test]
    fn test_path_rules() {
        let rules = PathRules::new();
        assert!(rules.is_public_path("/api-docs/openapi.json"));
        assert!(rules.is_public_path("/swagger-ui/index.html"));
        assert!(!rules.is_public_path("/api/v1/products"));
        assert!(rules.is_admin_path("/api/v1/admin/products"));
        assert!(!rules.is_admin_path("/api/v1/administrators"));
    }

    #[actix_web::test]
    async fn test_admin_routes_require_admin_role() {
        let jwt = jwt();
        let app = actix_test::init_service(
            App::new()
                .wrap(AuthMiddleware::new(jwt.clone()))
                .route("/api/v1/wallet", web::get().to(whoami))
                .route("/api/v1/admin/products", web::get().to(whoami)),
        )
        .await;

        let player = jwt.generate_access_token(5, ROLE_PLAYER).unwrap();
        let admin = jwt.generate_access_token(1, ROLE_ADMIN).unwrap();

        let req = actix_test::TestRequest::get()
            .uri("/api/v1/wallet")
            .insert_header(("Authorization", format!("Bearer {player}")))
            .to_request();
        let body = actix_test::call_and_read_body(&app, req).await;
        assert_eq!(body, "5:player");

        let req = actix_test::TestRequest::get()
            .uri("/api/v1/admin/products")
            .insert_header(("Authorization", format!("Bearer {player}")))
            .to_request();
        let err = actix_test::try_call_service(&app, req).await.unwrap_err();
        assert_eq!(err.as_response_error().status_code(), StatusCode::FORBIDDEN);

        let req = actix_test::TestRequest::get()
            .uri("/api/v1/admin/products")
            .insert_header(("Authorization", format!("Bearer {admin}")))
            .to_request();
        let body = actix_test::call_and_read_body(&app, req).await;
        assert_eq!(body, "1:admin");
    }

    #[actix_web::test]
    async fn test_missing_token_is_unauthorized() {
        let app = actix_test::init_service(
            App::new()
                .wrap(AuthMiddleware::new(jwt()))
                .route("/api/v1/wallet", web::get().to(whoami)),
        )
        .await;

        let req = actix_test::TestRequest::get().uri("/api/v1/wallet").to_request();
        let err = actix_test::try_call_service(&app, req).await.unwrap_err();
        assert_eq!(
            err.as_response_error().status_code(),
            StatusCode::UNAUTHORIZED
        );
    }
}
