use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::error::{EngineError, EngineResult};
use super::{BP_SCALE, ProductConfig};

/// Hard ceiling for any RTP, whatever the win probability.
pub const RTP_HARD_CAP_BP: i32 = 7_000;
/// RTP may not exceed this multiple of the win probability.
pub const RTP_WIN_MULTIPLIER: i32 = 4;

/// Field an administrator changed, driving which field `auto_adjust` touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConfigField {
    WinProbability,
    TargetRtp,
}

/// A change `auto_adjust` made on behalf of the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Adjustment {
    pub field: ConfigField,
    pub from_bp: i32,
    pub to_bp: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct AutoAdjustment {
    pub config: ProductConfig,
    pub adjustments: Vec<Adjustment>,
}

/// Preset families offered for one-click configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProductCategory {
    Pix,
    Sorte,
    Ouro,
    Diamante,
    Premium,
}

impl ProductCategory {
    pub const ALL: [ProductCategory; 5] = [
        ProductCategory::Pix,
        ProductCategory::Sorte,
        ProductCategory::Ouro,
        ProductCategory::Diamante,
        ProductCategory::Premium,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProductCategory::Pix => "pix",
            ProductCategory::Sorte => "sorte",
            ProductCategory::Ouro => "ouro",
            ProductCategory::Diamante => "diamante",
            ProductCategory::Premium => "premium",
        }
    }
}

impl FromStr for ProductCategory {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProductCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s.trim().to_ascii_lowercase())
            .ok_or_else(|| EngineError::validation(format!("unknown product category: {s}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PayoutPreset {
    pub category: ProductCategory,
    pub win_probability_bp: i32,
    pub target_rtp_bp: i32,
}

const PRESETS: [PayoutPreset; 5] = [
    PayoutPreset {
        category: ProductCategory::Pix,
        win_probability_bp: 1_500,
        target_rtp_bp: 4_500,
    },
    PayoutPreset {
        category: ProductCategory::Sorte,
        win_probability_bp: 2_000,
        target_rtp_bp: 5_500,
    },
    PayoutPreset {
        category: ProductCategory::Ouro,
        win_probability_bp: 1_000,
        target_rtp_bp: 3_500,
    },
    PayoutPreset {
        category: ProductCategory::Diamante,
        win_probability_bp: 800,
        target_rtp_bp: 3_000,
    },
    PayoutPreset {
        category: ProductCategory::Premium,
        win_probability_bp: 500,
        target_rtp_bp: 2_000,
    },
];

/// Safety rules binding win probability and RTP together.
pub struct PayoutPolicy;

impl PayoutPolicy {
    /// `min(win × 4, 70%)`
    pub fn max_rtp_for(win_probability_bp: i32) -> i32 {
        win_probability_bp
            .saturating_mul(RTP_WIN_MULTIPLIER)
            .min(RTP_HARD_CAP_BP)
    }

    pub fn is_safe(config: &ProductConfig) -> bool {
        config.target_rtp_bp <= Self::max_rtp_for(config.win_probability_bp)
    }

    /// Range checks plus the safety rule. Unsafe input is reported, never
    /// clamped.
    pub fn validate(config: &ProductConfig) -> EngineResult<()> {
        if config.unit_price_cents <= 0 {
            return Err(EngineError::validation("unit price must be positive"));
        }
        check_bp("win probability", config.win_probability_bp)?;
        check_bp("target RTP", config.target_rtp_bp)?;
        if !Self::is_safe(config) {
            return Err(EngineError::validation(format!(
                "unsafe configuration: target RTP {}bp exceeds the maximum of {}bp for a win probability of {}bp",
                config.target_rtp_bp,
                Self::max_rtp_for(config.win_probability_bp),
                config.win_probability_bp
            )));
        }
        Ok(())
    }

    /// Recompute the field the admin did not touch so the config becomes
    /// safe. Payout shares are only ever lowered here.
    pub fn auto_adjust(config: &ProductConfig, changed: ConfigField) -> EngineResult<AutoAdjustment> {
        check_bp("win probability", config.win_probability_bp)?;
        check_bp("target RTP", config.target_rtp_bp)?;

        let mut adjusted = config.clone();
        let mut adjustments = Vec::new();

        match changed {
            ConfigField::WinProbability => {
                let max = Self::max_rtp_for(adjusted.win_probability_bp);
                if adjusted.target_rtp_bp > max {
                    adjustments.push(Adjustment {
                        field: ConfigField::TargetRtp,
                        from_bp: adjusted.target_rtp_bp,
                        to_bp: max,
                    });
                    adjusted.target_rtp_bp = max;
                }
            }
            ConfigField::TargetRtp => {
                if adjusted.target_rtp_bp > RTP_HARD_CAP_BP {
                    adjustments.push(Adjustment {
                        field: ConfigField::TargetRtp,
                        from_bp: adjusted.target_rtp_bp,
                        to_bp: RTP_HARD_CAP_BP,
                    });
                    adjusted.target_rtp_bp = RTP_HARD_CAP_BP;
                }
                let min_win = div_ceil(adjusted.target_rtp_bp, RTP_WIN_MULTIPLIER);
                if adjusted.win_probability_bp < min_win {
                    adjustments.push(Adjustment {
                        field: ConfigField::WinProbability,
                        from_bp: adjusted.win_probability_bp,
                        to_bp: min_win,
                    });
                    adjusted.win_probability_bp = min_win;
                }
            }
        }

        debug_assert!(Self::is_safe(&adjusted));
        Ok(AutoAdjustment {
            config: adjusted,
            adjustments,
        })
    }

    pub fn recommended_defaults(category: ProductCategory) -> PayoutPreset {
        PRESETS
            .into_iter()
            .find(|p| p.category == category)
            .unwrap_or(PRESETS[0])
    }

    pub fn presets() -> &'static [PayoutPreset] {
        &PRESETS
    }
}

fn check_bp(name: &str, bp: i32) -> EngineResult<()> {
    if bp <= 0 || bp as i64 > BP_SCALE {
        return Err(EngineError::validation(format!(
            "{name} must be within (0, {BP_SCALE}] bp, got {bp}"
        )));
    }
    Ok(())
}

fn div_ceil(a: i32, b: i32) -> i32 {
    (a + b - 1) / b
}

#[cfg(test)]
pub(crate) fn config(win_bp: i32, rtp_bp: i32) -> ProductConfig {
    ProductConfig {
        product_id: 1,
        unit_price_cents: 100,
        win_probability_bp: win_bp,
        target_rtp_bp: rtp_bp,
        rtp_enabled: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_rtp_for() {
        assert_eq!(PayoutPolicy::max_rtp_for(1_000), 4_000);
        assert_eq!(PayoutPolicy::max_rtp_for(500), 2_000);
        assert_eq!(PayoutPolicy::max_rtp_for(2_000), 7_000);
        assert_eq!(PayoutPolicy::max_rtp_for(10_000), 7_000);
    }

    #[test]
    fn test_lowering_win_probability_lowers_rtp() {
        let cfg = config(1_000, 3_000);
        assert!(PayoutPolicy::is_safe(&cfg));

        let lowered = ProductConfig {
            win_probability_bp: 500,
            ..cfg
        };
        assert_eq!(PayoutPolicy::max_rtp_for(500), 2_000);
        assert!(!PayoutPolicy::is_safe(&lowered));
        assert!(PayoutPolicy::validate(&lowered).is_err());

        let result = PayoutPolicy::auto_adjust(&lowered, ConfigField::WinProbability).unwrap();
        assert_eq!(result.config.target_rtp_bp, 2_000);
        assert_eq!(result.config.win_probability_bp, 500);
        assert_eq!(
            result.adjustments,
            vec![Adjustment {
                field: ConfigField::TargetRtp,
                from_bp: 3_000,
                to_bp: 2_000,
            }]
        );
        assert!(PayoutPolicy::is_safe(&result.config));
    }

    #[test]
    fn test_raising_win_probability_never_raises_rtp() {
        let cfg = config(2_500, 3_000);
        let result = PayoutPolicy::auto_adjust(&cfg, ConfigField::WinProbability).unwrap();
        assert_eq!(result.config.target_rtp_bp, 3_000);
        assert!(result.adjustments.is_empty());
    }

    #[test]
    fn test_raising_rtp_raises_win_probability() {
        let cfg = config(1_000, 6_000);
        let result = PayoutPolicy::auto_adjust(&cfg, ConfigField::TargetRtp).unwrap();
        assert_eq!(result.config.win_probability_bp, 1_500);
        assert_eq!(result.config.target_rtp_bp, 6_000);
        assert!(PayoutPolicy::is_safe(&result.config));

        let capped = PayoutPolicy::auto_adjust(&config(1_000, 9_000), ConfigField::TargetRtp)
            .unwrap();
        assert_eq!(capped.config.target_rtp_bp, RTP_HARD_CAP_BP);
        assert_eq!(capped.config.win_probability_bp, 1_750);
        assert_eq!(capped.adjustments.len(), 2);
    }

    #[test]
    fn test_auto_adjust_always_safe() {
        for win in (1..=10_000).step_by(37) {
            for rtp in (1..=10_000).step_by(53) {
                let cfg = config(win, rtp);
                for field in [ConfigField::WinProbability, ConfigField::TargetRtp] {
                    let adjusted = PayoutPolicy::auto_adjust(&cfg, field).unwrap();
                    assert!(PayoutPolicy::is_safe(&adjusted.config), "{win}/{rtp} {field:?}");
                    assert!(adjusted.config.target_rtp_bp <= cfg.target_rtp_bp);
                }
            }
        }
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        assert!(PayoutPolicy::validate(&config(0, 100)).is_err());
        assert!(PayoutPolicy::validate(&config(10_001, 100)).is_err());
        assert!(PayoutPolicy::validate(&config(1_000, 0)).is_err());
        let mut free = config(1_000, 1_000);
        free.unit_price_cents = 0;
        assert!(PayoutPolicy::validate(&free).is_err());
        assert!(PayoutPolicy::validate(&config(1_000, 4_000)).is_ok());
    }

    #[test]
    fn test_presets_are_safe() {
        for category in ProductCategory::ALL {
            let preset = PayoutPolicy::recommended_defaults(category);
            assert_eq!(preset.category, category);
            let cfg = config(preset.win_probability_bp, preset.target_rtp_bp);
            assert!(PayoutPolicy::validate(&cfg).is_ok(), "{category:?}");
        }
        assert_eq!("OURO".parse::<ProductCategory>().unwrap(), ProductCategory::Ouro);
        assert!("bronze".parse::<ProductCategory>().is_err());
    }
}
