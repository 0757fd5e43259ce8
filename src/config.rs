use serde::{Deserialize, Serialize};
use std::env;

use crate::engine::{DEFAULT_RTP_TOLERANCE_BP, DrawSettings};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub draw: DrawConfig,
    #[serde(default)]
    pub wallet: WalletConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expires_in: i64, // seconds
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrawConfig {
    /// Slack above the target RTP before payouts are capped (bp)
    #[serde(default = "default_rtp_tolerance_bp")]
    pub rtp_tolerance_bp: i32,
    /// Attempts at the version-checked ledger update before giving up
    #[serde(default = "default_ledger_max_retries")]
    pub ledger_max_retries: u32,
    /// Offset of the business day from UTC, in minutes
    #[serde(default = "default_period_utc_offset_minutes")]
    pub period_utc_offset_minutes: i32,
    #[serde(default = "default_max_simulation_plays")]
    pub max_simulation_plays: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Demo balance granted to new wallets and on demo reset (cents)
    #[serde(default = "default_demo_initial_balance_cents")]
    pub demo_initial_balance_cents: i64,
}

fn default_rtp_tolerance_bp() -> i32 {
    DEFAULT_RTP_TOLERANCE_BP
}

fn default_ledger_max_retries() -> u32 {
    5
}

fn default_period_utc_offset_minutes() -> i32 {
    -180
}

fn default_max_simulation_plays() -> u64 {
    1_000_000
}

fn default_demo_initial_balance_cents() -> i64 {
    100_000
}

impl Default for DrawConfig {
    fn default() -> Self {
        Self {
            rtp_tolerance_bp: default_rtp_tolerance_bp(),
            ledger_max_retries: default_ledger_max_retries(),
            period_utc_offset_minutes: default_period_utc_offset_minutes(),
            max_simulation_plays: default_max_simulation_plays(),
        }
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            demo_initial_balance_cents: default_demo_initial_balance_cents(),
        }
    }
}

impl DrawConfig {
    pub fn settings(&self) -> DrawSettings {
        DrawSettings {
            rtp_tolerance_bp: self.rtp_tolerance_bp,
        }
    }
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        // without a config file everything comes from the environment
        let config_result = std::fs::read_to_string(&config_path);

        let mut config: Config = match config_result {
            Ok(config_str) => Self::parse(&config_str)?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                fn get_env(name: &str) -> Option<String> {
                    env::var(name).ok()
                }
                fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
                    env::var(name)
                        .ok()
                        .and_then(|v| v.parse::<T>().ok())
                        .unwrap_or(default)
                }

                let database_url = get_env("DATABASE_URL")
                    .ok_or("DATABASE_URL is not set and config.toml was not found")?;

                Config {
                    server: ServerConfig {
                        host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                        port: get_env_parse("SERVER_PORT", 8080u16),
                    },
                    database: DatabaseConfig {
                        url: database_url,
                        max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
                    },
                    jwt: JwtConfig {
                        secret: get_env("JWT_SECRET")
                            .unwrap_or_else(|| "change-me-in-production".to_string()),
                        access_token_expires_in: get_env_parse("JWT_ACCESS_EXPIRES_IN", 7200i64),
                    },
                    draw: DrawConfig::default(),
                    wallet: WalletConfig::default(),
                }
            }
            Err(e) => {
                return Err(format!("failed to read config file {config_path}: {e}").into());
            }
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn parse(config_str: &str) -> Result<Self, Box<dyn std::error::Error>> {
        toml::from_str(config_str).map_err(|e| format!("failed to parse config file: {e}").into())
    }

    /// Environment variables win over file values.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = env::var("SERVER_HOST") {
            self.server.host = v;
        }
        if let Ok(v) = env::var("SERVER_PORT")
            && let Ok(p) = v.parse()
        {
            self.server.port = p;
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = v;
        }
        if let Ok(v) = env::var("DB_MAX_CONNECTIONS")
            && let Ok(mc) = v.parse()
        {
            self.database.max_connections = mc;
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            self.jwt.secret = v;
        }
        if let Ok(v) = env::var("JWT_ACCESS_EXPIRES_IN")
            && let Ok(n) = v.parse()
        {
            self.jwt.access_token_expires_in = n;
        }
        if let Ok(v) = env::var("DRAW_RTP_TOLERANCE_BP")
            && let Ok(n) = v.parse()
        {
            self.draw.rtp_tolerance_bp = n;
        }
        if let Ok(v) = env::var("DRAW_LEDGER_MAX_RETRIES")
            && let Ok(n) = v.parse()
        {
            self.draw.ledger_max_retries = n;
        }
        if let Ok(v) = env::var("DRAW_PERIOD_UTC_OFFSET_MINUTES")
            && let Ok(n) = v.parse()
        {
            self.draw.period_utc_offset_minutes = n;
        }
        if let Ok(v) = env::var("DRAW_MAX_SIMULATION_PLAYS")
            && let Ok(n) = v.parse()
        {
            self.draw.max_simulation_plays = n;
        }
        if let Ok(v) = env::var("WALLET_DEMO_INITIAL_BALANCE_CENTS")
            && let Ok(n) = v.parse()
        {
            self.wallet.demo_initial_balance_cents = n;
        }
    }

    fn validate(&self) -> Result<(), String> {
        if self.draw.rtp_tolerance_bp < 0 {
            return Err("draw.rtp_tolerance_bp must be >= 0".into());
        }
        if self.draw.ledger_max_retries == 0 {
            return Err("draw.ledger_max_retries must be at least 1".into());
        }
        if self.draw.period_utc_offset_minutes.abs() >= 24 * 60 {
            return Err("draw.period_utc_offset_minutes must be within a day".into());
        }
        if self.wallet.demo_initial_balance_cents < 0 {
            return Err("wallet.demo_initial_balance_cents must be >= 0".into());
        }
        Ok(())
    }
}
