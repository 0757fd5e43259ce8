use crate::middlewares::current_user;
use crate::models::*;
use crate::services::{PlayService, WalletService};
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};

#[utoipa::path(
    get,
    path = "/wallet",
    tag = "wallet",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Real and demo balances", body = WalletResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn get_wallet(
    service: web::Data<WalletService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user = current_user(&req)?;
    match service.get_wallet(user.id).await {
        Ok(wallet) => Ok(HttpResponse::Ok().json(ApiResponse::success(wallet))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/wallet/demo/reset",
    tag = "wallet",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Demo balance refilled", body = WalletResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn reset_demo_balance(
    service: web::Data<WalletService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user = current_user(&req)?;
    match service.reset_demo_balance(user.id).await {
        Ok(wallet) => Ok(HttpResponse::Ok().json(ApiResponse::success(wallet))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/draws",
    tag = "wallet",
    params(
        ("page" = Option<u32>, Query, description = "Page number (default 1)"),
        ("per_page" = Option<u32>, Query, description = "Page size (default 20)")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Play history, newest first", body = DrawRecordPage),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_draws(
    service: web::Data<PlayService>,
    req: HttpRequest,
    query: web::Query<DrawRecordQuery>,
) -> Result<HttpResponse> {
    let user = current_user(&req)?;
    match service.list_draws(user.id, &query.into_inner()).await {
        Ok(page) => Ok(HttpResponse::Ok().json(ApiResponse::success(page))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn wallet_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/wallet")
            .route("", web::get().to(get_wallet))
            .route("/demo/reset", web::post().to(reset_demo_balance)),
    )
    .route("/draws", web::get().to(list_draws));
}
