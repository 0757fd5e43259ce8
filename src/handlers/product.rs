use crate::middlewares::current_user;
use crate::models::*;
use crate::services::{ConfigService, PlayService};
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};

#[utoipa::path(
    get,
    path = "/products",
    tag = "products",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Active products", body = [ProductSummary]),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_products(service: web::Data<ConfigService>) -> Result<HttpResponse> {
    match service.list_catalog().await {
        Ok(list) => Ok(HttpResponse::Ok().json(ApiResponse::success(list))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/products/{id}",
    tag = "products",
    params(
        ("id" = i64, Path, description = "Product ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Product with its prizes", body = ProductSummary),
        (status = 404, description = "Unknown or inactive product")
    )
)]
pub async fn get_product(
    service: web::Data<ConfigService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match service.get_catalog_product(path.into_inner()).await {
        Ok(product) => Ok(HttpResponse::Ok().json(ApiResponse::success(product))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/products/{id}/play",
    tag = "products",
    params(
        ("id" = i64, Path, description = "Product ID")
    ),
    request_body = PlayRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Play resolved", body = PlayResponse),
        (status = 402, description = "Insufficient balance"),
        (status = 404, description = "Unknown or inactive product"),
        (status = 409, description = "Ledger contention, retry"),
        (status = 503, description = "Product temporarily unavailable")
    )
)]
/// Buy one play: debit, draw, record and pay out in one transaction.
pub async fn play(
    service: web::Data<PlayService>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<PlayRequest>,
) -> Result<HttpResponse> {
    let user = current_user(&req)?;
    match service.play(user.id, path.into_inner(), body.mode).await {
        Ok(result) => Ok(HttpResponse::Ok().json(ApiResponse::success(result))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn product_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/products")
            .route("", web::get().to(list_products))
            .route("/{id}", web::get().to(get_product))
            .route("/{id}/play", web::post().to(play)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DrawConfig;
    use crate::entities::product_entity as products;
    use actix_web::{App, test as actix_test};
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[actix_web::test]
    async fn test_catalog_is_wrapped_in_response_envelope() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<products::Model>::new()])
            .into_connection();
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(ConfigService::new(db, &DrawConfig::default())))
                .configure(product_config),
        )
        .await;

        let req = actix_test::TestRequest::get().uri("/products").to_request();
        let body: serde_json::Value = actix_test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, serde_json::json!({ "success": true, "data": [] }));
    }
}
