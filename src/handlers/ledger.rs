use crate::models::*;
use crate::services::LedgerService;
use actix_web::{HttpResponse, ResponseError, Result, web};

#[utoipa::path(
    get,
    path = "/admin/ledger",
    tag = "ledger",
    params(
        ("date" = Option<String>, Query, description = "Business day YYYY-MM-DD (default today)")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "All products of the day with totals", body = DailySummaryResponse)
    )
)]
pub async fn daily_summary(
    service: web::Data<LedgerService>,
    query: web::Query<LedgerQuery>,
) -> Result<HttpResponse> {
    match service.daily_summary(query.date).await {
        Ok(summary) => Ok(HttpResponse::Ok().json(ApiResponse::success(summary))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/ledger/{product_id}",
    tag = "ledger",
    params(
        ("product_id" = i64, Path, description = "Product ID"),
        ("date" = Option<String>, Query, description = "Business day YYYY-MM-DD (default today)")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Ledger period", body = LedgerPeriodResponse),
        (status = 404, description = "Unknown product")
    )
)]
pub async fn get_period(
    service: web::Data<LedgerService>,
    path: web::Path<i64>,
    query: web::Query<LedgerQuery>,
) -> Result<HttpResponse> {
    match service.get_period(path.into_inner(), query.date).await {
        Ok(period) => Ok(HttpResponse::Ok().json(ApiResponse::success(period))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/ledger/{product_id}/reset",
    tag = "ledger",
    params(
        ("product_id" = i64, Path, description = "Product ID"),
        ("date" = Option<String>, Query, description = "Business day YYYY-MM-DD (default today)")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Totals zeroed, goal and budget kept", body = LedgerPeriodResponse),
        (status = 404, description = "Unknown product"),
        (status = 409, description = "Concurrent plays kept winning, retry")
    )
)]
pub async fn reset_period(
    service: web::Data<LedgerService>,
    path: web::Path<i64>,
    query: web::Query<LedgerQuery>,
) -> Result<HttpResponse> {
    match service.reset_period(path.into_inner(), query.date).await {
        Ok(period) => Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
            period,
            "Ledger period reset",
        ))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/admin/ledger/{product_id}/targets",
    tag = "ledger",
    params(
        ("product_id" = i64, Path, description = "Product ID"),
        ("date" = Option<String>, Query, description = "Business day YYYY-MM-DD (default today)")
    ),
    request_body = LedgerTargetsRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Targets updated", body = LedgerPeriodResponse),
        (status = 400, description = "Negative goal or budget")
    )
)]
pub async fn set_targets(
    service: web::Data<LedgerService>,
    path: web::Path<i64>,
    query: web::Query<LedgerQuery>,
    body: web::Json<LedgerTargetsRequest>,
) -> Result<HttpResponse> {
    match service
        .set_targets(
            path.into_inner(),
            query.date,
            body.profit_goal_cents,
            body.daily_prize_budget_cents,
        )
        .await
    {
        Ok(period) => Ok(HttpResponse::Ok().json(ApiResponse::success(period))),
        Err(e) => Ok(e.error_response()),
    }
}

/// Registered inside the `/admin` scope.
pub fn ledger_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/ledger", web::get().to(daily_summary))
        .route("/ledger/{product_id}", web::get().to(get_period))
        .route("/ledger/{product_id}/reset", web::post().to(reset_period))
        .route("/ledger/{product_id}/targets", web::put().to(set_targets));
}
