use crate::domain::Address;
use crate::engine::{
    LiquiditySanityCheck, PricingAssetRegistry, RegistryError, DEFAULT_SNAPSHOT_PERIOD_SECS,
};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    /// Pricing assets in preference order.
    pub pricing_assets: Vec<Address>,
    /// USD-stable assets; the first keys historical liquidity rows.
    pub usd_stable_assets: Vec<Address>,
    pub snapshot_period_secs: i64,
    pub liquidity_sanity_check: LiquiditySanityCheck,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl From<RegistryError> for ConfigError {
    fn from(err: RegistryError) -> Self {
        ConfigError::InvalidValue("USD_STABLE_ASSETS".to_string(), err.to_string())
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let pricing_assets = parse_address_list(&env_map, "PRICING_ASSETS")?;
        let usd_stable_assets = parse_address_list(&env_map, "USD_STABLE_ASSETS")?;
        if usd_stable_assets.is_empty() {
            return Err(ConfigError::InvalidValue(
                "USD_STABLE_ASSETS".to_string(),
                "must list at least one asset".to_string(),
            ));
        }

        let snapshot_period_secs = env_map
            .get("SNAPSHOT_PERIOD_SECS")
            .map(|s| s.as_str())
            .unwrap_or("86400")
            .parse::<i64>()
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "SNAPSHOT_PERIOD_SECS".to_string(),
                    "must be a positive integer".to_string(),
                )
            })?;

        let liquidity_sanity_check = match env_map
            .get("LIQUIDITY_SANITY_CHECK")
            .map(|s| s.as_str())
            .unwrap_or("sign")
        {
            "sign" => LiquiditySanityCheck::PriorLiquiditySign,
            "non-empty" => LiquiditySanityCheck::NonEmptyPool,
            other => {
                return Err(ConfigError::InvalidValue(
                    "LIQUIDITY_SANITY_CHECK".to_string(),
                    format!("must be sign or non-empty, got {}", other),
                ))
            }
        };

        Ok(Config {
            database_path,
            pricing_assets,
            usd_stable_assets,
            snapshot_period_secs,
            liquidity_sanity_check,
        })
    }

    /// Build the asset registry from the configured lists.
    pub fn registry(&self) -> Result<PricingAssetRegistry, ConfigError> {
        Ok(PricingAssetRegistry::new(
            self.pricing_assets.clone(),
            self.usd_stable_assets.clone(),
        )?)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_path: String::new(),
            pricing_assets: Vec::new(),
            usd_stable_assets: Vec::new(),
            snapshot_period_secs: DEFAULT_SNAPSHOT_PERIOD_SECS,
            liquidity_sanity_check: LiquiditySanityCheck::default(),
        }
    }
}

fn parse_address_list(
    env_map: &HashMap<String, String>,
    key: &str,
) -> Result<Vec<Address>, ConfigError> {
    let raw = env_map
        .get(key)
        .ok_or_else(|| ConfigError::MissingEnv(key.to_string()))?;
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| {
            Address::parse(s).map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const WETH: &str = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2";
    const USDC: &str = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";
    const DAI: &str = "0x6B175474E89094C44Da98b954EedeAC495271d0F";

    fn setup_required_env() -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert("DATABASE_PATH".to_string(), "/tmp/test.db".to_string());
        map.insert(
            "PRICING_ASSETS".to_string(),
            format!("{}, {},{}", WETH, USDC, DAI),
        );
        map.insert("USD_STABLE_ASSETS".to_string(), format!("{},{}", USDC, DAI));
        map
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_env_map(setup_required_env()).unwrap();
        assert_eq!(config.snapshot_period_secs, 86_400);
        assert_eq!(
            config.liquidity_sanity_check,
            LiquiditySanityCheck::PriorLiquiditySign
        );
        assert_eq!(config.pricing_assets.len(), 3);
        assert_eq!(config.pricing_assets[0], Address::parse(WETH).unwrap());
    }

    #[test]
    fn test_registry_from_config() {
        let config = Config::from_env_map(setup_required_env()).unwrap();
        let registry = config.registry().unwrap();
        assert_eq!(registry.primary_usd_stable(), &Address::parse(USDC).unwrap());
        assert!(registry.is_pricing_asset(&Address::parse(WETH).unwrap()));
    }

    #[test]
    fn test_missing_database_path() {
        let mut env_map = setup_required_env();
        env_map.remove("DATABASE_PATH");
        match Config::from_env_map(env_map) {
            Err(ConfigError::MissingEnv(s)) => assert_eq!(s, "DATABASE_PATH"),
            _ => panic!("Expected MissingEnv error"),
        }
    }

    #[test]
    fn test_missing_pricing_assets() {
        let mut env_map = setup_required_env();
        env_map.remove("PRICING_ASSETS");
        match Config::from_env_map(env_map) {
            Err(ConfigError::MissingEnv(s)) => assert_eq!(s, "PRICING_ASSETS"),
            _ => panic!("Expected MissingEnv error"),
        }
    }

    #[test]
    fn test_empty_stable_list() {
        let mut env_map = setup_required_env();
        env_map.insert("USD_STABLE_ASSETS".to_string(), " , ".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "USD_STABLE_ASSETS"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_invalid_address() {
        let mut env_map = setup_required_env();
        env_map.insert("PRICING_ASSETS".to_string(), "0x1234".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "PRICING_ASSETS"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_invalid_snapshot_period() {
        for bad in ["0", "-5", "daily"] {
            let mut env_map = setup_required_env();
            env_map.insert("SNAPSHOT_PERIOD_SECS".to_string(), bad.to_string());
            match Config::from_env_map(env_map) {
                Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "SNAPSHOT_PERIOD_SECS"),
                _ => panic!("Expected InvalidValue error for {}", bad),
            }
        }
    }

    #[test]
    fn test_sanity_check_modes() {
        let mut env_map = setup_required_env();
        env_map.insert("LIQUIDITY_SANITY_CHECK".to_string(), "non-empty".to_string());
        let config = Config::from_env_map(env_map).unwrap();
        assert_eq!(
            config.liquidity_sanity_check,
            LiquiditySanityCheck::NonEmptyPool
        );

        let mut env_map = setup_required_env();
        env_map.insert("LIQUIDITY_SANITY_CHECK".to_string(), "strict".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "LIQUIDITY_SANITY_CHECK"),
            _ => panic!("Expected InvalidValue error"),
        }
    }
}
