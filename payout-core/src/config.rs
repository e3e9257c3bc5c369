//! Configuration management
//!
//! Settings live in `settings.json` inside the payout directory:
//! ```json
//! {
//!   "import": {
//!     "defaultUnitCost": "59000",
//!     "tiktokSettlementPerItem": "83218",
//!     "shopeeSettlementPerItem": "98125",
//!     "decimalSeparator": ".",
//!     "dateSystem": "1900"
//!   }
//! }
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Result;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::SourceFormat;

/// Env var overriding the default unit cost
pub const ENV_DEFAULT_UNIT_COST: &str = "PAYOUT_DEFAULT_UNIT_COST";
/// Env var overriding the settlement-per-item of every marketplace
pub const ENV_SETTLEMENT_PER_ITEM: &str = "PAYOUT_SETTLEMENT_PER_ITEM";

/// Spreadsheet serial date epoch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateSystem {
    /// Windows Excel (serial 1 = 1900-01-01, with the phantom 1900-02-29)
    #[default]
    #[serde(rename = "1900")]
    Excel1900,
    /// Legacy Mac Excel (serial 0 = 1904-01-01)
    #[serde(rename = "1904")]
    Excel1904,
}

/// Cost and parsing parameters for one import
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportConfig {
    /// Buy price given to products first seen in a source without unit cost
    pub default_unit_cost: Decimal,
    /// Expected payout for one unit on TikTok Shop
    pub tiktok_settlement_per_item: Decimal,
    /// Expected payout for one unit on Shopee
    pub shopee_settlement_per_item: Decimal,
    /// Statement amounts at or above this are treated as totals and dropped
    pub max_daily_amount: Decimal,
    /// `.` for `1,234.56`, `,` for `1.234,56`
    pub decimal_separator: char,
    pub date_system: DateSystem,
    /// How many rows to search for a header below a metadata banner
    pub header_scan_rows: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            default_unit_cost: Decimal::new(59_000, 0),
            tiktok_settlement_per_item: Decimal::new(83_218, 0),
            shopee_settlement_per_item: Decimal::new(98_125, 0),
            max_daily_amount: Decimal::new(10_000_000, 0),
            decimal_separator: '.',
            date_system: DateSystem::Excel1900,
            header_scan_rows: 20,
        }
    }
}

impl ImportConfig {
    /// Settlement-per-item used for quantity inference for a source
    pub fn settlement_per_item(&self, format: SourceFormat) -> Decimal {
        match format {
            SourceFormat::TikTokOrders | SourceFormat::TikTokIncome => {
                self.tiktok_settlement_per_item
            }
            SourceFormat::ShopeeIncome | SourceFormat::ShopeeStatement => {
                self.shopee_settlement_per_item
            }
        }
    }

    /// Apply one settlement-per-item to every marketplace
    pub fn with_settlement_per_item(mut self, value: Decimal) -> Self {
        self.tiktok_settlement_per_item = value;
        self.shopee_settlement_per_item = value;
        self
    }

    /// Apply `PAYOUT_*` environment overrides; unparseable values are ignored
    fn apply_env(&mut self) {
        if let Some(cost) = env_decimal(ENV_DEFAULT_UNIT_COST) {
            self.default_unit_cost = cost;
        }
        if let Some(spi) = env_decimal(ENV_SETTLEMENT_PER_ITEM) {
            *self = self.clone().with_settlement_per_item(spi);
        }
    }
}

fn env_decimal(key: &str) -> Option<Decimal> {
    let raw = std::env::var(key).ok()?;
    match Decimal::from_str(raw.trim()) {
        Ok(d) => Some(d),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparseable environment override");
            None
        }
    }
}

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    import: ImportConfig,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Payout configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub import: ImportConfig,
    // Keep unknown keys so saving does not drop them
    _raw_settings: SettingsFile,
}

impl Config {
    /// Load config from the payout directory, then apply env overrides
    pub fn load(payout_dir: &Path) -> Result<Self> {
        let settings_path = payout_dir.join("settings.json");

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!(path = %settings_path.display(), error = %e, "invalid settings.json, using defaults");
                SettingsFile::default()
            })
        } else {
            SettingsFile::default()
        };

        let mut import = raw.import.clone();
        import.apply_env();

        Ok(Self {
            import,
            _raw_settings: raw,
        })
    }

    /// Save config to the payout directory, preserving keys it does not manage
    pub fn save(&self, payout_dir: &Path) -> Result<()> {
        let settings_path = payout_dir.join("settings.json");
        let mut settings = self._raw_settings.clone();
        settings.import = self.import.clone();

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)?;
        Ok(())
    }
}

/// Resolve the payout directory: `PAYOUT_DIR`, else `~/.payout`
pub fn payout_dir() -> Option<PathBuf> {
    match std::env::var("PAYOUT_DIR") {
        Ok(dir) if !dir.is_empty() => Some(PathBuf::from(dir)),
        _ => dirs::home_dir().map(|home| home.join(".payout")),
    }
}
