use std::collections::HashMap;
use std::sync::Arc;

use actix_web::web;
use chrono::Utc;
use parking_lot::RwLock;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;

use crate::config::DrawConfig;
use crate::engine::{
    Adjustment, ConfigField, DrawEngine, EngineError, LedgerPeriod, PayoutPolicy, PayoutPreset,
    ProductCategory, ProductConfig, ScenarioSimulator, WeightedItem, WeightedItemPool,
};
use crate::entities::{
    config_change_entity as changes, product_entity as products, reward_item_entity as items,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    CreateProductRequest, CreateRewardItemRequest, ProductDetail, ProductSummary,
    ProductWriteResponse, RewardItemResponse, SafetyCheckRequest, SafetyCheckResponse,
    SimulateRequest, SimulationResponse, UpdateProductRequest,
};

/// Everything a play needs to know about a product, built once per
/// configuration version.
#[derive(Debug, Clone)]
pub struct ProductSnapshot {
    pub product: products::Model,
    pub items: Vec<items::Model>,
    pub config: ProductConfig,
    pub pool: WeightedItemPool,
}

impl ProductSnapshot {
    /// Stored items that fail validation make the product undrawable
    /// rather than silently dropping them.
    pub fn build(product: products::Model, items: Vec<items::Model>) -> AppResult<Self> {
        let pool = WeightedItemPool::from_items(items.iter().cloned().map(WeightedItem::from))
            .map_err(|e| EngineError::Configuration {
                product_id: product.id,
                reason: e.to_string(),
            })?;
        Ok(Self {
            config: product.to_config(),
            product,
            items,
            pool,
        })
    }

    pub fn effective_items(&self) -> impl Iterator<Item = &WeightedItem> {
        self.pool.effective_items()
    }

    pub fn total_weight(&self) -> i64 {
        self.pool.total_weight()
    }

    pub fn item_name(&self, item_id: i64) -> Option<&str> {
        self.pool.get(item_id).map(|i| i.name.as_str())
    }

    /// A product without drawable items must not be sold: a losing roll
    /// never looks at the pool and would charge for an impossible draw.
    pub fn ensure_playable(&self) -> AppResult<()> {
        if !self.pool.is_playable() {
            return Err(EngineError::Configuration {
                product_id: self.product.id,
                reason: "no active reward item with a positive weight".into(),
            }
            .into());
        }
        Ok(())
    }
}

/// Snapshot cache. `generation` moves on every invalidation so a load that
/// raced with an admin write is not cached.
#[derive(Clone, Default)]
struct SnapshotCache {
    inner: Arc<RwLock<CacheState>>,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<i64, Arc<ProductSnapshot>>,
    generation: u64,
}

impl SnapshotCache {
    fn get(&self, product_id: i64) -> Option<Arc<ProductSnapshot>> {
        self.inner.read().entries.get(&product_id).cloned()
    }

    fn generation(&self) -> u64 {
        self.inner.read().generation
    }

    /// Store a snapshot loaded after `generation` was read; a no-op if
    /// anything was invalidated since.
    fn insert_if_current(
        &self,
        product_id: i64,
        snapshot: Arc<ProductSnapshot>,
        generation: u64,
    ) -> bool {
        let mut state = self.inner.write();
        if state.generation != generation {
            return false;
        }
        state.entries.insert(product_id, snapshot);
        true
    }

    fn invalidate(&self, product_id: i64) {
        let mut state = self.inner.write();
        state.generation += 1;
        state.entries.remove(&product_id);
    }
}

/// Product and reward item configuration, with a per-process read cache
/// that every admin write invalidates.
#[derive(Clone)]
pub struct ConfigService {
    pool: DatabaseConnection,
    cache: SnapshotCache,
    simulator: ScenarioSimulator,
    max_simulation_plays: u64,
}

impl ConfigService {
    pub fn new(pool: DatabaseConnection, config: &DrawConfig) -> Self {
        Self {
            pool,
            cache: SnapshotCache::default(),
            simulator: ScenarioSimulator::new(DrawEngine::new(config.settings())),
            max_simulation_plays: config.max_simulation_plays,
        }
    }

    /// Cached snapshot of a product, loaded on first use.
    pub async fn snapshot(&self, product_id: i64) -> AppResult<Arc<ProductSnapshot>> {
        if let Some(snapshot) = self.cache.get(product_id) {
            return Ok(snapshot);
        }

        let generation = self.cache.generation();
        let product = self.find_product(product_id).await?;
        let item_list = self.load_items(&self.pool, product_id).await?;
        let snapshot = Arc::new(ProductSnapshot::build(product, item_list)?);
        self.cache
            .insert_if_current(product_id, snapshot.clone(), generation);
        Ok(snapshot)
    }

    pub fn invalidate(&self, product_id: i64) {
        self.cache.invalidate(product_id);
    }

    /// Active products for the player catalog.
    pub async fn list_catalog(&self) -> AppResult<Vec<ProductSummary>> {
        let product_list = products::Entity::find()
            .filter(products::Column::IsActive.eq(true))
            .order_by_asc(products::Column::Id)
            .all(&self.pool)
            .await?;

        let mut list = Vec::with_capacity(product_list.len());
        for product in product_list {
            let snapshot = match self.snapshot(product.id).await {
                Ok(snapshot) => snapshot,
                Err(AppError::ConfigurationError(reason)) => {
                    log::warn!("Product {} left out of the catalog: {}", product.id, reason);
                    continue;
                }
                Err(e) => return Err(e),
            };
            if snapshot.pool.is_playable() {
                list.push(ProductSummary::new(&snapshot.product, &snapshot.items));
            }
        }
        Ok(list)
    }

    /// Inactive and unplayable products are hidden from players.
    pub async fn get_catalog_product(&self, product_id: i64) -> AppResult<ProductSummary> {
        let snapshot = self.snapshot(product_id).await?;
        if !snapshot.product.is_active || !snapshot.pool.is_playable() {
            return Err(AppError::NotFound(format!("Product {product_id}")));
        }
        Ok(ProductSummary::new(&snapshot.product, &snapshot.items))
    }

    pub async fn list_products(&self) -> AppResult<Vec<ProductDetail>> {
        let product_list = products::Entity::find()
            .order_by_asc(products::Column::Id)
            .all(&self.pool)
            .await?;
        let item_list = items::Entity::find()
            .order_by_asc(items::Column::Id)
            .all(&self.pool)
            .await?;

        let mut grouped: HashMap<i64, Vec<items::Model>> = HashMap::new();
        for item in item_list {
            grouped.entry(item.product_id).or_default().push(item);
        }
        Ok(product_list
            .into_iter()
            .map(|p| {
                let product_items = grouped.remove(&p.id).unwrap_or_default();
                ProductDetail::new(p, product_items)
            })
            .collect())
    }

    pub async fn get_product(&self, product_id: i64) -> AppResult<ProductDetail> {
        let product = self.find_product(product_id).await?;
        let item_list = self.load_items(&self.pool, product_id).await?;
        Ok(ProductDetail::new(product, item_list))
    }

    pub async fn create_product(
        &self,
        actor_id: i64,
        req: CreateProductRequest,
    ) -> AppResult<ProductWriteResponse> {
        let name = req.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::ValidationError("Product name is required".into()));
        }
        let goal = req.daily_profit_goal_cents.unwrap_or(0);
        let budget = req.daily_prize_budget_cents.unwrap_or(0);
        check_targets(goal, budget)?;

        let category = req
            .category
            .as_deref()
            .map(str::parse::<ProductCategory>)
            .transpose()?;
        let preset = category.map(PayoutPolicy::recommended_defaults);
        let win_probability_bp = req
            .win_probability_bp
            .or(preset.map(|p| p.win_probability_bp))
            .ok_or_else(|| {
                AppError::ValidationError("win_probability_bp is required without a category".into())
            })?;
        let target_rtp_bp = req
            .target_rtp_bp
            .or(preset.map(|p| p.target_rtp_bp))
            .ok_or_else(|| {
                AppError::ValidationError("target_rtp_bp is required without a category".into())
            })?;

        let changed = if req.target_rtp_bp.is_some() {
            ConfigField::TargetRtp
        } else {
            ConfigField::WinProbability
        };
        let (config, adjustments) = settle(
            ProductConfig {
                product_id: 0,
                unit_price_cents: req.unit_price_cents,
                win_probability_bp,
                target_rtp_bp,
                rtp_enabled: req.rtp_enabled.unwrap_or(true),
            },
            changed,
            req.auto_adjust,
        )?;

        if products::Entity::find()
            .filter(products::Column::Name.eq(name.as_str()))
            .one(&self.pool)
            .await?
            .is_some()
        {
            return Err(AppError::ValidationError(format!(
                "Product name already exists: {name}"
            )));
        }

        let txn = self.pool.begin().await?;
        let created = products::ActiveModel {
            name: Set(name),
            category: Set(category.map(|c| c.as_str().to_string())),
            unit_price_cents: Set(config.unit_price_cents),
            win_probability_bp: Set(config.win_probability_bp),
            target_rtp_bp: Set(config.target_rtp_bp),
            rtp_enabled: Set(config.rtp_enabled),
            is_active: Set(req.is_active.unwrap_or(true)),
            daily_profit_goal_cents: Set(goal),
            daily_prize_budget_cents: Set(budget),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        record_change(&txn, created.id, actor_id, "create_product", None::<&()>, Some(&created))
            .await?;
        txn.commit().await?;

        log::info!("Product {} created by admin {}", created.id, actor_id);
        Ok(ProductWriteResponse {
            product: ProductDetail::new(created, Vec::new()),
            adjustments,
        })
    }

    pub async fn update_product(
        &self,
        actor_id: i64,
        product_id: i64,
        req: UpdateProductRequest,
    ) -> AppResult<ProductWriteResponse> {
        let before = self.find_product(product_id).await?;
        let goal = req
            .daily_profit_goal_cents
            .unwrap_or(before.daily_profit_goal_cents);
        let budget = req
            .daily_prize_budget_cents
            .unwrap_or(before.daily_prize_budget_cents);
        check_targets(goal, budget)?;

        let (config, adjustments) = settle(
            ProductConfig {
                product_id,
                unit_price_cents: req.unit_price_cents.unwrap_or(before.unit_price_cents),
                win_probability_bp: req.win_probability_bp.unwrap_or(before.win_probability_bp),
                target_rtp_bp: req.target_rtp_bp.unwrap_or(before.target_rtp_bp),
                rtp_enabled: req.rtp_enabled.unwrap_or(before.rtp_enabled),
            },
            req.changed_field(),
            req.auto_adjust,
        )?;

        let mut am = before.clone().into_active_model();
        if let Some(name) = req.name.as_deref().map(str::trim) {
            if name.is_empty() {
                return Err(AppError::ValidationError("Product name is required".into()));
            }
            am.name = Set(name.to_string());
        }
        am.unit_price_cents = Set(config.unit_price_cents);
        am.win_probability_bp = Set(config.win_probability_bp);
        am.target_rtp_bp = Set(config.target_rtp_bp);
        am.rtp_enabled = Set(config.rtp_enabled);
        if let Some(active) = req.is_active {
            am.is_active = Set(active);
        }
        am.daily_profit_goal_cents = Set(goal);
        am.daily_prize_budget_cents = Set(budget);
        am.updated_at = Set(Some(Utc::now()));

        let updated = self
            .write_product(actor_id, "update_product", &before, am)
            .await?;
        let item_list = self.load_items(&self.pool, product_id).await?;
        Ok(ProductWriteResponse {
            product: ProductDetail::new(updated, item_list),
            adjustments,
        })
    }

    /// Overwrite win probability and RTP with a named preset.
    pub async fn apply_preset(
        &self,
        actor_id: i64,
        product_id: i64,
        category: &str,
    ) -> AppResult<ProductWriteResponse> {
        let category: ProductCategory = category.parse()?;
        let preset = PayoutPolicy::recommended_defaults(category);
        let before = self.find_product(product_id).await?;

        let mut config = before.to_config();
        config.win_probability_bp = preset.win_probability_bp;
        config.target_rtp_bp = preset.target_rtp_bp;
        PayoutPolicy::validate(&config)?;

        let mut am = before.clone().into_active_model();
        am.category = Set(Some(category.as_str().to_string()));
        am.win_probability_bp = Set(preset.win_probability_bp);
        am.target_rtp_bp = Set(preset.target_rtp_bp);
        am.updated_at = Set(Some(Utc::now()));

        let updated = self
            .write_product(actor_id, "apply_preset", &before, am)
            .await?;
        let item_list = self.load_items(&self.pool, product_id).await?;
        Ok(ProductWriteResponse {
            product: ProductDetail::new(updated, item_list),
            adjustments: Vec::new(),
        })
    }

    pub fn presets(&self) -> Vec<PayoutPreset> {
        PayoutPolicy::presets().to_vec()
    }

    /// Safety verdict for a probability / RTP pair without writing anything.
    pub fn check_safety(&self, req: &SafetyCheckRequest) -> AppResult<SafetyCheckResponse> {
        let config = ProductConfig {
            product_id: 0,
            // price does not take part in the safety rule
            unit_price_cents: 1,
            win_probability_bp: req.win_probability_bp,
            target_rtp_bp: req.target_rtp_bp,
            rtp_enabled: true,
        };
        let violation = PayoutPolicy::validate(&config).err().map(|e| e.to_string());
        let suggestion = if violation.is_some() {
            let changed = req.changed_field.unwrap_or(ConfigField::WinProbability);
            PayoutPolicy::auto_adjust(&config, changed).ok()
        } else {
            None
        };
        Ok(SafetyCheckResponse {
            safe: violation.is_none(),
            max_rtp_bp: PayoutPolicy::max_rtp_for(req.win_probability_bp),
            violation,
            suggestion,
        })
    }

    pub async fn add_item(
        &self,
        actor_id: i64,
        product_id: i64,
        req: CreateRewardItemRequest,
    ) -> AppResult<RewardItemResponse> {
        let product = self.find_product(product_id).await?;
        let name = req.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::ValidationError("Item name is required".into()));
        }
        WeightedItem {
            id: 0,
            name: name.clone(),
            weight: req.weight,
            min_quantity: req.min_quantity,
            max_quantity: req.max_quantity,
            value_cents: req.value_cents,
            active: true,
        }
        .validate()?;

        let txn = self.pool.begin().await?;
        let created = items::ActiveModel {
            product_id: Set(product.id),
            name: Set(name),
            weight: Set(req.weight),
            min_quantity: Set(req.min_quantity),
            max_quantity: Set(req.max_quantity),
            value_cents: Set(req.value_cents),
            is_active: Set(true),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        record_change(&txn, product_id, actor_id, "add_item", None::<&()>, Some(&created)).await?;
        txn.commit().await?;

        self.invalidate(product_id);
        Ok(created.into())
    }

    pub async fn set_item_weight(
        &self,
        actor_id: i64,
        product_id: i64,
        item_id: i64,
        weight: i32,
    ) -> AppResult<RewardItemResponse> {
        let before = self.find_item(product_id, item_id).await?;
        let mut candidate = WeightedItem::from(before.clone());
        candidate.weight = weight;
        candidate.validate()?;

        let mut am = before.clone().into_active_model();
        am.weight = Set(weight);
        am.updated_at = Set(Some(Utc::now()));
        let updated = self.write_item(actor_id, "set_item_weight", &before, am).await?;
        Ok(updated.into())
    }

    /// Items are never deleted so past draw records stay resolvable.
    pub async fn deactivate_item(
        &self,
        actor_id: i64,
        product_id: i64,
        item_id: i64,
    ) -> AppResult<RewardItemResponse> {
        let before = self.find_item(product_id, item_id).await?;
        let mut am = before.clone().into_active_model();
        am.is_active = Set(false);
        am.updated_at = Set(Some(Utc::now()));
        let updated = self.write_item(actor_id, "deactivate_item", &before, am).await?;

        let snapshot = self.snapshot(product_id).await?;
        if snapshot.product.is_active && snapshot.total_weight() == 0 {
            log::warn!(
                "Product {} has no drawable items left after deactivating item {}; it is off sale",
                product_id,
                item_id
            );
        }
        Ok(updated.into())
    }

    /// Run the scenario simulator on a blocking thread. `start` seeds the
    /// run with an existing period; the copy is discarded afterwards.
    pub async fn simulate(
        &self,
        product_id: i64,
        req: SimulateRequest,
        start: Option<LedgerPeriod>,
    ) -> AppResult<SimulationResponse> {
        if req.n_plays == 0 || req.n_plays > self.max_simulation_plays {
            return Err(AppError::ValidationError(format!(
                "n_plays must be between 1 and {}",
                self.max_simulation_plays
            )));
        }

        let snapshot = self.snapshot(product_id).await?;
        let mut config = snapshot.config.clone();
        if let Some(win) = req.win_probability_bp {
            config.win_probability_bp = win;
        }
        if let Some(rtp) = req.target_rtp_bp {
            config.target_rtp_bp = rtp;
        }
        if let Some(enabled) = req.rtp_enabled {
            config.rtp_enabled = enabled;
        }
        PayoutPolicy::validate(&config)?;

        let seed = req.seed.unwrap_or_else(rand::random);
        let simulator = self.simulator;
        let n_plays = req.n_plays;
        let run_config = config.clone();
        let report = web::block(move || {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            match start {
                Some(period) => {
                    simulator.simulate_from(&run_config, &snapshot.pool, period, n_plays, &mut rng)
                }
                None => simulator.simulate(&run_config, &snapshot.pool, n_plays, &mut rng),
            }
        })
        .await
        .map_err(|e| AppError::InternalError(format!("Simulation task failed: {e}")))??;

        log::info!(
            "Simulated {} plays of product {}: win rate {:.2}%, RTP {:.2}%",
            n_plays,
            product_id,
            report.realized_win_rate_pct,
            report.realized_rtp_pct
        );
        Ok(SimulationResponse {
            config,
            seed,
            report,
        })
    }

    // -----------------------------
    // internal helpers
    // -----------------------------

    async fn find_product(&self, product_id: i64) -> AppResult<products::Model> {
        products::Entity::find_by_id(product_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Product {product_id}")))
    }

    async fn find_item(&self, product_id: i64, item_id: i64) -> AppResult<items::Model> {
        items::Entity::find_by_id(item_id)
            .filter(items::Column::ProductId.eq(product_id))
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Item {item_id} of product {product_id}")))
    }

    async fn load_items<C: ConnectionTrait>(
        &self,
        conn: &C,
        product_id: i64,
    ) -> AppResult<Vec<items::Model>> {
        Ok(items::Entity::find()
            .filter(items::Column::ProductId.eq(product_id))
            .order_by_asc(items::Column::Id)
            .all(conn)
            .await?)
    }

    async fn write_product(
        &self,
        actor_id: i64,
        action: &str,
        before: &products::Model,
        am: products::ActiveModel,
    ) -> AppResult<products::Model> {
        let txn = self.pool.begin().await?;
        let updated = am.update(&txn).await?;
        record_change(&txn, before.id, actor_id, action, Some(before), Some(&updated)).await?;
        txn.commit().await?;

        self.invalidate(before.id);
        log::info!("Product {} {} by admin {}", before.id, action, actor_id);
        Ok(updated)
    }

    async fn write_item(
        &self,
        actor_id: i64,
        action: &str,
        before: &items::Model,
        am: items::ActiveModel,
    ) -> AppResult<items::Model> {
        let txn = self.pool.begin().await?;
        let updated = am.update(&txn).await?;
        record_change(
            &txn,
            before.product_id,
            actor_id,
            action,
            Some(before),
            Some(&updated),
        )
        .await?;
        txn.commit().await?;

        self.invalidate(before.product_id);
        Ok(updated)
    }
}

/// Validate a configuration, auto-adjusting it first when asked to.
fn settle(
    config: ProductConfig,
    changed: ConfigField,
    auto_adjust: bool,
) -> AppResult<(ProductConfig, Vec<Adjustment>)> {
    if !auto_adjust {
        PayoutPolicy::validate(&config)?;
        return Ok((config, Vec::new()));
    }
    let adjusted = PayoutPolicy::auto_adjust(&config, changed)?;
    PayoutPolicy::validate(&adjusted.config)?;
    if !adjusted.adjustments.is_empty() {
        log::info!(
            "Auto-adjusted product {} configuration: {:?}",
            config.product_id,
            adjusted.adjustments
        );
    }
    Ok((adjusted.config, adjusted.adjustments))
}

fn check_targets(goal_cents: i64, budget_cents: i64) -> AppResult<()> {
    if goal_cents < 0 || budget_cents < 0 {
        return Err(AppError::ValidationError(
            "Profit goal and prize budget must not be negative".into(),
        ));
    }
    Ok(())
}

async fn record_change<C, B, A>(
    conn: &C,
    product_id: i64,
    actor_id: i64,
    action: &str,
    before: Option<&B>,
    after: Option<&A>,
) -> AppResult<()>
where
    C: ConnectionTrait,
    B: Serialize,
    A: Serialize,
{
    changes::ActiveModel {
        product_id: Set(product_id),
        actor_id: Set(actor_id),
        action: Set(action.to_string()),
        before: Set(before.map(serde_json::to_value).transpose()?),
        after: Set(after.map(serde_json::to_value).transpose()?),
        ..Default::default()
    }
    .insert(conn)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn product(win_bp: i32, rtp_bp: i32) -> products::Model {
        products::Model {
            id: 3,
            name: "Baú Ouro".into(),
            category: Some("ouro".into()),
            unit_price_cents: 500,
            win_probability_bp: win_bp,
            target_rtp_bp: rtp_bp,
            rtp_enabled: true,
            is_active: true,
            daily_profit_goal_cents: 0,
            daily_prize_budget_cents: 0,
            created_at: None,
            updated_at: None,
        }
    }

    fn row(id: i64, weight: i32, value: i64) -> items::Model {
        items::Model {
            id,
            product_id: 3,
            name: format!("prize-{id}"),
            weight,
            min_quantity: 1,
            max_quantity: 1,
            value_cents: value,
            is_active: true,
            created_at: None,
            updated_at: None,
        }
    }

    fn service() -> ConfigService {
        ConfigService::new(DatabaseConnection::Disconnected, &DrawConfig::default())
    }

    #[test]
    fn test_snapshot_exposes_effective_pool() {
        let mut hidden = row(3, 5, 900);
        hidden.is_active = false;
        let snapshot = ProductSnapshot::build(
            product(1_000, 3_500),
            vec![row(1, 3, 200), row(2, 0, 10_000), hidden],
        )
        .unwrap();

        assert_eq!(snapshot.total_weight(), 3);
        let ids: Vec<i64> = snapshot.effective_items().map(|i| i.id).collect();
        assert_eq!(ids, vec![1]);
        assert_eq!(snapshot.item_name(2), Some("prize-2"));
        assert_eq!(snapshot.config.win_probability_bp, 1_000);
    }

    #[test]
    fn test_snapshot_with_invalid_item_is_unavailable() {
        // weight without value breaks the pays-on-win rule
        let err = ProductSnapshot::build(product(1_000, 3_500), vec![row(1, 4, 0)]).unwrap_err();
        assert!(matches!(err, AppError::ConfigurationError(_)));
    }

    #[test]
    fn test_snapshot_without_drawable_items_is_not_playable() {
        let mut hidden = row(2, 5, 900);
        hidden.is_active = false;
        let snapshot =
            ProductSnapshot::build(product(1_000, 3_500), vec![row(1, 0, 200), hidden]).unwrap();
        let err = snapshot.ensure_playable().unwrap_err();
        assert!(matches!(err, AppError::ConfigurationError(_)));

        let snapshot = ProductSnapshot::build(product(1_000, 3_500), vec![row(1, 2, 200)]).unwrap();
        assert!(snapshot.ensure_playable().is_ok());
    }

    #[test]
    fn test_cache_drops_load_that_raced_an_invalidation() {
        let cache = SnapshotCache::default();
        let snapshot = Arc::new(
            ProductSnapshot::build(product(1_000, 3_500), vec![row(1, 3, 200)]).unwrap(),
        );

        let generation = cache.generation();
        // an admin write commits while the load is in flight
        cache.invalidate(3);
        assert!(!cache.insert_if_current(3, snapshot.clone(), generation));
        assert!(cache.get(3).is_none());

        let generation = cache.generation();
        assert!(cache.insert_if_current(3, snapshot, generation));
        assert!(cache.get(3).is_some());

        cache.invalidate(3);
        assert!(cache.get(3).is_none());
    }

    #[tokio::test]
    async fn test_catalog_skips_broken_and_unplayable_products() {
        let playable = products::Model {
            id: 1,
            ..product(1_000, 3_500)
        };
        let broken = products::Model {
            id: 2,
            ..product(1_000, 3_500)
        };
        let empty = products::Model {
            id: 3,
            ..product(1_000, 3_500)
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![playable.clone(), broken.clone(), empty.clone()]])
            .append_query_results([vec![playable]])
            .append_query_results([vec![row(10, 3, 200)]])
            .append_query_results([vec![broken]])
            // weight without value
            .append_query_results([vec![row(20, 3, 0)]])
            .append_query_results([vec![empty]])
            .append_query_results([vec![row(30, 0, 200)]])
            .into_connection();
        let svc = ConfigService::new(db, &DrawConfig::default());

        let catalog = svc.list_catalog().await.unwrap();
        let ids: Vec<i64> = catalog.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn test_settle_rejects_unsafe_without_auto_adjust() {
        let config = product(1_000, 5_000).to_config();
        let err = settle(config, ConfigField::TargetRtp, false).unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[test]
    fn test_settle_auto_adjust_reports_changes() {
        // lowering win probability to 5% caps RTP at 20%
        let config = product(500, 4_500).to_config();
        let (config, adjustments) = settle(config, ConfigField::WinProbability, true).unwrap();
        assert_eq!(config.target_rtp_bp, 2_000);
        assert_eq!(adjustments.len(), 1);
        assert_eq!(adjustments[0].field, ConfigField::TargetRtp);
        assert!(PayoutPolicy::is_safe(&config));
    }

    #[test]
    fn test_check_safety_suggests_adjustment() {
        let svc = service();
        let resp = svc
            .check_safety(&SafetyCheckRequest {
                win_probability_bp: 1_000,
                target_rtp_bp: 6_000,
                changed_field: Some(ConfigField::TargetRtp),
            })
            .unwrap();
        assert!(!resp.safe);
        assert_eq!(resp.max_rtp_bp, 4_000);
        assert!(resp.violation.is_some());
        let suggestion = resp.suggestion.unwrap();
        assert_eq!(suggestion.config.win_probability_bp, 1_500);
        assert_eq!(suggestion.config.target_rtp_bp, 6_000);

        let resp = svc
            .check_safety(&SafetyCheckRequest {
                win_probability_bp: 1_500,
                target_rtp_bp: 4_500,
                changed_field: None,
            })
            .unwrap();
        assert!(resp.safe);
        assert!(resp.suggestion.is_none());
    }

    #[test]
    fn test_presets_are_all_safe() {
        let svc = service();
        let presets = svc.presets();
        assert_eq!(presets.len(), ProductCategory::ALL.len());
        for preset in presets {
            let mut config = product(preset.win_probability_bp, preset.target_rtp_bp).to_config();
            config.rtp_enabled = false;
            assert!(PayoutPolicy::validate(&config).is_ok(), "{:?}", preset.category);
        }
    }

    #[test]
    fn test_check_targets_rejects_negative() {
        assert!(check_targets(0, 0).is_ok());
        assert!(check_targets(-1, 0).is_err());
        assert!(check_targets(0, -5).is_err());
    }
}
