use crate::engine::PayoutPreset;
use crate::error::AppResult;
use crate::middlewares::current_user;
use crate::models::*;
use crate::services::{ConfigService, LedgerService};
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};

use super::ledger;

#[utoipa::path(
    get,
    path = "/admin/products",
    tag = "admin",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "All products with items", body = [ProductDetail]),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn list_products(service: web::Data<ConfigService>) -> Result<HttpResponse> {
    match service.list_products().await {
        Ok(list) => Ok(HttpResponse::Ok().json(ApiResponse::success(list))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/products",
    tag = "admin",
    request_body = CreateProductRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Product created", body = ProductWriteResponse),
        (status = 400, description = "Invalid or unsafe configuration")
    )
)]
pub async fn create_product(
    service: web::Data<ConfigService>,
    req: HttpRequest,
    body: web::Json<CreateProductRequest>,
) -> Result<HttpResponse> {
    let admin = current_user(&req)?;
    match service.create_product(admin.id, body.into_inner()).await {
        Ok(result) => Ok(HttpResponse::Ok().json(ApiResponse::success(result))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/products/{id}",
    tag = "admin",
    params(
        ("id" = i64, Path, description = "Product ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Product configuration", body = ProductDetail),
        (status = 404, description = "Unknown product")
    )
)]
pub async fn get_product(
    service: web::Data<ConfigService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match service.get_product(path.into_inner()).await {
        Ok(product) => Ok(HttpResponse::Ok().json(ApiResponse::success(product))),
        Err(e) => Ok(e.error_response()),
    }
}

/// Partial update. With `auto_adjust` an unsafe probability / RTP pair is
/// corrected instead of rejected and the corrections are returned.
#[utoipa::path(
    put,
    path = "/admin/products/{id}",
    tag = "admin",
    params(
        ("id" = i64, Path, description = "Product ID")
    ),
    request_body = UpdateProductRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Product updated", body = ProductWriteResponse),
        (status = 400, description = "Invalid or unsafe configuration"),
        (status = 404, description = "Unknown product")
    )
)]
pub async fn update_product(
    service: web::Data<ConfigService>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<UpdateProductRequest>,
) -> Result<HttpResponse> {
    let admin = current_user(&req)?;
    match service
        .update_product(admin.id, path.into_inner(), body.into_inner())
        .await
    {
        Ok(result) => Ok(HttpResponse::Ok().json(ApiResponse::success(result))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/products/{id}/preset",
    tag = "admin",
    params(
        ("id" = i64, Path, description = "Product ID")
    ),
    request_body = ApplyPresetRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Preset applied", body = ProductWriteResponse),
        (status = 400, description = "Unknown category")
    )
)]
pub async fn apply_preset(
    service: web::Data<ConfigService>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<ApplyPresetRequest>,
) -> Result<HttpResponse> {
    let admin = current_user(&req)?;
    match service
        .apply_preset(admin.id, path.into_inner(), &body.category)
        .await
    {
        Ok(result) => Ok(HttpResponse::Ok().json(ApiResponse::success(result))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/products/{id}/items",
    tag = "admin",
    params(
        ("id" = i64, Path, description = "Product ID")
    ),
    request_body = CreateRewardItemRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Item added", body = RewardItemResponse),
        (status = 400, description = "Invalid item")
    )
)]
pub async fn add_item(
    service: web::Data<ConfigService>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<CreateRewardItemRequest>,
) -> Result<HttpResponse> {
    let admin = current_user(&req)?;
    match service
        .add_item(admin.id, path.into_inner(), body.into_inner())
        .await
    {
        Ok(item) => Ok(HttpResponse::Ok().json(ApiResponse::success(item))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/admin/products/{id}/items/{item_id}/weight",
    tag = "admin",
    params(
        ("id" = i64, Path, description = "Product ID"),
        ("item_id" = i64, Path, description = "Item ID")
    ),
    request_body = UpdateWeightRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Weight updated", body = RewardItemResponse),
        (status = 400, description = "Invalid weight"),
        (status = 404, description = "Unknown item")
    )
)]
pub async fn set_item_weight(
    service: web::Data<ConfigService>,
    req: HttpRequest,
    path: web::Path<(i64, i64)>,
    body: web::Json<UpdateWeightRequest>,
) -> Result<HttpResponse> {
    let admin = current_user(&req)?;
    let (product_id, item_id) = path.into_inner();
    match service
        .set_item_weight(admin.id, product_id, item_id, body.weight)
        .await
    {
        Ok(item) => Ok(HttpResponse::Ok().json(ApiResponse::success(item))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/products/{id}/items/{item_id}/deactivate",
    tag = "admin",
    params(
        ("id" = i64, Path, description = "Product ID"),
        ("item_id" = i64, Path, description = "Item ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Item deactivated", body = RewardItemResponse),
        (status = 404, description = "Unknown item")
    )
)]
pub async fn deactivate_item(
    service: web::Data<ConfigService>,
    req: HttpRequest,
    path: web::Path<(i64, i64)>,
) -> Result<HttpResponse> {
    let admin = current_user(&req)?;
    let (product_id, item_id) = path.into_inner();
    match service.deactivate_item(admin.id, product_id, item_id).await {
        Ok(item) => Ok(HttpResponse::Ok().json(ApiResponse::success(item))),
        Err(e) => Ok(e.error_response()),
    }
}

/// Monte-Carlo preview; never touches stored ledgers or balances.
#[utoipa::path(
    post,
    path = "/admin/products/{id}/simulate",
    tag = "admin",
    params(
        ("id" = i64, Path, description = "Product ID")
    ),
    request_body = SimulateRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Simulation report", body = SimulationResponse),
        (status = 400, description = "Invalid play count or configuration"),
        (status = 503, description = "Product cannot be drawn")
    )
)]
pub async fn simulate(
    config_service: web::Data<ConfigService>,
    ledger_service: web::Data<LedgerService>,
    path: web::Path<i64>,
    body: web::Json<SimulateRequest>,
) -> Result<HttpResponse> {
    match run_simulation(&config_service, &ledger_service, path.into_inner(), body.into_inner())
        .await
    {
        Ok(report) => Ok(HttpResponse::Ok().json(ApiResponse::success(report))),
        Err(e) => Ok(e.error_response()),
    }
}

async fn run_simulation(
    config_service: &ConfigService,
    ledger_service: &LedgerService,
    product_id: i64,
    body: SimulateRequest,
) -> AppResult<SimulationResponse> {
    let start = if body.from_today {
        let snapshot = config_service.snapshot(product_id).await?;
        let (period, _) = ledger_service
            .current_period(&snapshot.product, ledger_service.today())
            .await?;
        Some(period)
    } else {
        None
    };
    config_service.simulate(product_id, body, start).await
}

#[utoipa::path(
    post,
    path = "/admin/payout/check",
    tag = "admin",
    request_body = SafetyCheckRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Safety verdict and suggested fix", body = SafetyCheckResponse)
    )
)]
pub async fn check_safety(
    service: web::Data<ConfigService>,
    body: web::Json<SafetyCheckRequest>,
) -> Result<HttpResponse> {
    match service.check_safety(&body) {
        Ok(result) => Ok(HttpResponse::Ok().json(ApiResponse::success(result))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/payout/presets",
    tag = "admin",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Named safe presets", body = [PayoutPreset])
    )
)]
pub async fn list_presets(service: web::Data<ConfigService>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(ApiResponse::success(service.presets())))
}

pub fn admin_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .route("/products", web::get().to(list_products))
            .route("/products", web::post().to(create_product))
            .route("/products/{id}", web::get().to(get_product))
            .route("/products/{id}", web::put().to(update_product))
            .route("/products/{id}/preset", web::post().to(apply_preset))
            .route("/products/{id}/items", web::post().to(add_item))
            .route(
                "/products/{id}/items/{item_id}/weight",
                web::put().to(set_item_weight),
            )
            .route(
                "/products/{id}/items/{item_id}/deactivate",
                web::post().to(deactivate_item),
            )
            .route("/products/{id}/simulate", web::post().to(simulate))
            .route("/payout/check", web::post().to(check_safety))
            .route("/payout/presets", web::get().to(list_presets))
            .configure(ledger::ledger_routes),
    );
}
