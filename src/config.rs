//! Configuration management with validation and defaults
//!
//! `GameConfig` is read by every submit and settle call and written only by
//! owner-gated setters. `EngineConfig` bundles it with the randomness
//! parameters and can be loaded from TOML with `WAGER_*` environment overrides.

use crate::common::types::{amount_str, Address};
use crate::errors::{WagerError, WagerResult};
use crate::games::types::{PpvMode, Variant, VariantRules};
use crate::math::{from_bps, WAD};
use crate::randomness::Strategy;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

/// Per-game economic and liveness parameters
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    /// House edge fraction (18-decimal fixed point)
    #[serde(with = "amount_str")]
    pub probability_value: u128,
    /// Share of every played stake minted to the host
    #[serde(with = "amount_str")]
    pub host_fee_share: u128,
    /// Share of every played stake minted to the protocol
    #[serde(with = "amount_str")]
    pub protocol_fee_share: u128,
    /// Floor on the average stake per side and play
    #[serde(with = "amount_str")]
    pub min_entry_amount: u128,
    pub max_entry_count: u32,
    pub batch_resolve_limit: u32,
    /// Blocks after submission (or round pause) before the refund path opens
    pub failure_window_blocks: u64,
    #[serde(default)]
    pub ppv_mode: PpvMode,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            probability_value: from_bps(100), // 1%
            host_fee_share: from_bps(50),
            protocol_fee_share: from_bps(50),
            min_entry_amount: 1,
            max_entry_count: 100,
            batch_resolve_limit: 50,
            failure_window_blocks: 256,
            ppv_mode: PpvMode::Reward,
        }
    }
}

impl GameConfig {
    /// Defaults adjusted to a variant's edge mode and probability floor
    pub fn for_variant<V: Variant>(variant: &V) -> Self {
        let defaults = Self::default();
        Self {
            probability_value: defaults.probability_value.max(variant.min_probability_value()),
            ppv_mode: variant.default_ppv_mode(),
            ..defaults
        }
    }

    /// Validate against a variant's probability floor and edge modes
    pub fn validate(&self, rules: &VariantRules) -> WagerResult<()> {
        if self.probability_value < rules.min_probability_value {
            return Err(WagerError::invalid_config(
                "probability_value",
                format!(
                    "{} is below the floor {}",
                    self.probability_value, rules.min_probability_value
                ),
            ));
        }
        if self.probability_value >= WAD {
            return Err(WagerError::invalid_config("probability_value", "must be below 100%"));
        }
        if self.ppv_mode == PpvMode::Outcome && !rules.outcome_skew {
            return Err(WagerError::invalid_config(
                "ppv_mode",
                "variant cannot take its edge from outcomes",
            ));
        }
        let fees = self
            .host_fee_share
            .checked_add(self.protocol_fee_share)
            .ok_or(WagerError::ArithmeticOverflow)?;
        if fees > WAD {
            return Err(WagerError::invalid_config(
                "host_fee_share + protocol_fee_share",
                "fee shares cannot exceed 100%",
            ));
        }
        if self.min_entry_amount == 0 {
            return Err(WagerError::invalid_config("min_entry_amount", "cannot be zero"));
        }
        if self.max_entry_count == 0 {
            return Err(WagerError::invalid_config("max_entry_count", "cannot be zero"));
        }
        if self.batch_resolve_limit == 0 {
            return Err(WagerError::invalid_config("batch_resolve_limit", "cannot be zero"));
        }
        if self.failure_window_blocks == 0 {
            return Err(WagerError::invalid_config("failure_window_blocks", "cannot be zero"));
        }
        Ok(())
    }
}

/// Randomness strategy selection and per-strategy parameters
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomnessConfig {
    pub strategy: Strategy,
    /// Only address allowed to deliver VRF outputs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vrf_coordinator: Option<Address>,
    /// Hex-encoded schnorrkel public key (32 bytes)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vrf_public_key: Option<String>,
    /// Only address allowed to deliver entropy-service values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entropy_provider: Option<Address>,
}

impl RandomnessConfig {
    pub fn validate(&self) -> WagerResult<()> {
        if let Some(key) = &self.vrf_public_key {
            let bytes = hex::decode(key)
                .map_err(|e| WagerError::invalid_config("vrf_public_key", e.to_string()))?;
            if bytes.len() != 32 {
                return Err(WagerError::invalid_config("vrf_public_key", "must be 32 bytes"));
            }
        }
        match self.strategy {
            Strategy::HashChain => Ok(()),
            Strategy::Vrf if self.vrf_coordinator.is_none() || self.vrf_public_key.is_none() => {
                Err(WagerError::RandomnessNotConfigured(Strategy::Vrf))
            }
            Strategy::EntropyService if self.entropy_provider.is_none() => {
                Err(WagerError::RandomnessNotConfigured(Strategy::EntropyService))
            }
            _ => Ok(()),
        }
    }
}

/// Complete engine configuration
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub game: GameConfig,
    #[serde(default)]
    pub randomness: RandomnessConfig,
}

impl EngineConfig {
    /// Validation that does not depend on a particular variant
    pub fn validate(&self) -> WagerResult<()> {
        self.game.validate(&VariantRules::any())?;
        self.randomness.validate()
    }
}

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    config_path: Option<String>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Set the configuration file path
    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_string_lossy().to_string());
        self
    }

    /// Load configuration from file and environment variables
    pub fn load(&self) -> WagerResult<EngineConfig> {
        let mut config = match self.config_path {
            Some(ref path) => self.load_from_file(path)?,
            None => EngineConfig::default(),
        };

        self.apply_env_overrides(&mut config)?;
        config.validate()?;

        tracing::debug!(
            path = ?self.config_path,
            strategy = %config.randomness.strategy,
            "Loaded engine configuration"
        );
        Ok(config)
    }

    fn load_from_file(&self, path: &str) -> WagerResult<EngineConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| WagerError::ConfigLoad(format!("Failed to read {}: {}", path, e)))?;

        toml::from_str(&content)
            .map_err(|e| WagerError::ConfigLoad(format!("Failed to parse TOML: {}", e)))
    }

    fn apply_env_overrides(&self, config: &mut EngineConfig) -> WagerResult<()> {
        if let Some(value) = env_override::<u128>("WAGER_MIN_ENTRY_AMOUNT")? {
            config.game.min_entry_amount = value;
        }
        if let Some(value) = env_override::<u32>("WAGER_MAX_ENTRY_COUNT")? {
            config.game.max_entry_count = value;
        }
        if let Some(value) = env_override::<u32>("WAGER_BATCH_RESOLVE_LIMIT")? {
            config.game.batch_resolve_limit = value;
        }
        if let Some(value) = env_override::<u64>("WAGER_FAILURE_WINDOW_BLOCKS")? {
            config.game.failure_window_blocks = value;
        }
        if let Ok(raw) = env::var("WAGER_STRATEGY") {
            config.randomness.strategy = raw.parse().map_err(|reason| WagerError::InvalidConfig {
                field: "WAGER_STRATEGY".to_string(),
                reason,
            })?;
        }
        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, config: &EngineConfig, path: &str) -> WagerResult<()> {
        let toml_string = toml::to_string_pretty(config)
            .map_err(|e| WagerError::ConfigSave(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, toml_string)
            .map_err(|e| WagerError::ConfigSave(format!("Failed to write to {}: {}", path, e)))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn env_override<T: std::str::FromStr>(name: &str) -> WagerResult<Option<T>> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map(Some).map_err(|_| WagerError::InvalidConfig {
            field: name.to_string(),
            reason: format!("cannot parse '{}'", raw),
        }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::{Crash, CoinFlip};
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config_is_valid() {
        let config = GameConfig::default();
        assert!(config.validate(&VariantRules::of(&CoinFlip)).is_ok());
        assert_eq!(config.probability_value, WAD / 100);
    }

    #[test]
    fn test_variant_defaults() {
        let crash = GameConfig::for_variant(&Crash);
        assert_eq!(crash.ppv_mode, PpvMode::Outcome);
        assert!(crash.validate(&VariantRules::of(&Crash)).is_ok());

        let flip = GameConfig::for_variant(&CoinFlip);
        assert_eq!(flip.ppv_mode, PpvMode::Reward);
        assert!(flip.validate(&VariantRules::of(&CoinFlip)).is_ok());
    }

    #[test]
    fn test_config_validation() {
        let any = VariantRules::any();

        let mut config = GameConfig::default();
        config.probability_value = from_bps(5);
        assert!(config.validate(&VariantRules::of(&Crash)).is_err());
        assert!(config.validate(&any).is_ok());

        let mut config = GameConfig::default();
        config.probability_value = WAD;
        assert!(config.validate(&any).is_err());
        config.probability_value = WAD - 1;
        assert!(config.validate(&any).is_ok());

        let mut config = GameConfig::default();
        config.host_fee_share = WAD;
        assert!(config.validate(&any).is_err());

        let mut config = GameConfig::default();
        config.batch_resolve_limit = 0;
        assert!(config.validate(&any).is_err());
    }

    #[test]
    fn test_outcome_mode_needs_skewable_variant() {
        let config = GameConfig {
            ppv_mode: PpvMode::Outcome,
            ..GameConfig::default()
        };
        assert!(matches!(
            config.validate(&VariantRules::of(&CoinFlip)),
            Err(WagerError::InvalidConfig { .. })
        ));
        assert!(config.validate(&VariantRules::of(&Crash)).is_ok());
    }

    #[test]
    fn test_randomness_config_requires_parameters() {
        let config = RandomnessConfig {
            strategy: Strategy::Vrf,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(WagerError::RandomnessNotConfigured(Strategy::Vrf)));

        let config = RandomnessConfig {
            strategy: Strategy::EntropyService,
            entropy_provider: Some(Address::from_byte(9)),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_and_load_config() -> WagerResult<()> {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_str().unwrap();

        let mut original = EngineConfig::default();
        original.game.min_entry_amount = 1_000_000_000_000_000_000_000;
        original.randomness = RandomnessConfig {
            strategy: Strategy::EntropyService,
            entropy_provider: Some(Address::from_byte(3)),
            ..Default::default()
        };

        ConfigLoader::new().save(&original, path)?;
        let loaded = ConfigLoader::new().with_path(path).load_from_file(path)?;

        assert_eq!(loaded, original);
        Ok(())
    }

    #[test]
    fn test_load_rejects_garbage() {
        let temp_file = NamedTempFile::new().unwrap();
        std::fs::write(temp_file.path(), "game = 5").unwrap();

        let result = ConfigLoader::new().with_path(temp_file.path()).load();
        assert!(matches!(result, Err(WagerError::ConfigLoad(_))));
    }
}
