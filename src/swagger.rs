use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::engine::{
    Adjustment, AutoAdjustment, CeilingKind, ConfigField, DrawDiagnostic, DrawOutcome,
    LedgerPeriod, Mode, PayoutPreset, ProductCategory, ProductConfig, SimulationReport,
    WeightedItem,
};
use crate::handlers;
use crate::models::*;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            )
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::product::list_products,
        handlers::product::get_product,
        handlers::product::play,
        handlers::wallet::get_wallet,
        handlers::wallet::reset_demo_balance,
        handlers::wallet::list_draws,
        handlers::admin::list_products,
        handlers::admin::create_product,
        handlers::admin::get_product,
        handlers::admin::update_product,
        handlers::admin::apply_preset,
        handlers::admin::add_item,
        handlers::admin::set_item_weight,
        handlers::admin::deactivate_item,
        handlers::admin::simulate,
        handlers::admin::check_safety,
        handlers::admin::list_presets,
        handlers::ledger::daily_summary,
        handlers::ledger::get_period,
        handlers::ledger::reset_period,
        handlers::ledger::set_targets,
    ),
    components(
        schemas(
            ApiError,
            Mode,
            ProductConfig,
            WeightedItem,
            DrawOutcome,
            DrawDiagnostic,
            CeilingKind,
            LedgerPeriod,
            ConfigField,
            Adjustment,
            AutoAdjustment,
            ProductCategory,
            PayoutPreset,
            SimulationReport,
            PrizeView,
            ProductSummary,
            ProductDetail,
            RewardItemResponse,
            CreateProductRequest,
            UpdateProductRequest,
            ApplyPresetRequest,
            ProductWriteResponse,
            CreateRewardItemRequest,
            UpdateWeightRequest,
            SafetyCheckRequest,
            SafetyCheckResponse,
            PlayRequest,
            PlayResponse,
            DrawRecordResponse,
            DrawRecordPage,
            WalletResponse,
            LedgerPeriodResponse,
            DailySummaryResponse,
            LedgerTargetsRequest,
            SimulateRequest,
            SimulationResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "products", description = "Product catalog and plays"),
        (name = "wallet", description = "Balances and draw history"),
        (name = "admin", description = "Product, prize pool and payout administration"),
        (name = "ledger", description = "Daily profit ledger"),
    ),
    info(
        title = "Reward Draw API",
        version = "1.0.0",
        description = "Scratch card and chest draw REST API documentation"
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}
