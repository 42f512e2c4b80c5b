use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::normalization::currency::RateTable;
use crate::providers::{itad, steam};
use crate::util::env::{env_opt, env_parse};

/// Region whose price is always shown. Output labels (国区) assume it.
pub const HOME_REGION: &str = "CN";
/// Storefront language for the home listing.
pub const HOME_LOCALE: &str = "schinese";
/// Storefront language used for the backfill listing.
pub const BACKFILL_LOCALE: &str = "zh";
/// Storefront language for the comparison listing.
pub const COMPARE_LOCALE: &str = "en";

/// Keys logged (redacted) at startup.
pub const CONFIG_KEYS: &[&str] = &[
    "ITAD_API_KEY",
    "STEAMWEBAPI_KEY",
    "STEAM_COMPARE_REGION",
    "ITAD_BASE_URL",
    "STEAM_STORE_BASE_URL",
    "PRICE_FETCH_TIMEOUT_SECS",
    "RESOLVE_LOOKUP_TIMEOUT_SECS",
    "GALLERY_FETCH_TIMEOUT_SECS",
    "CNY_RATES",
    "TRANSLATE_API_BASE",
    "TRANSLATE_API_KEY",
    "TRANSLATE_MODEL",
];

/// Secondary region shown next to the home price, or disabled via the `NONE` sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompareRegion {
    Disabled,
    Region(String),
}

impl CompareRegion {
    pub fn parse(raw: &str) -> Self {
        let code = raw.trim().to_ascii_uppercase();
        if code.is_empty() || code == "NONE" {
            CompareRegion::Disabled
        } else {
            CompareRegion::Region(code)
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            CompareRegion::Disabled => None,
            CompareRegion::Region(code) => Some(code),
        }
    }
}

impl fmt::Display for CompareRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompareRegion::Disabled => f.write_str("NONE"),
            CompareRegion::Region(code) => f.write_str(code),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TranslatorConfig {
    pub api_base: String,
    pub api_key: Option<String>,
    pub model: String,
}

/// Static configuration, loaded once at startup and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub itad_api_key: Option<String>,
    /// Reserved; the price path does not use it.
    pub steamwebapi_key: Option<String>,
    pub compare_region: CompareRegion,
    pub itad_base_url: String,
    pub steam_base_url: String,
    pub fetch_timeout: Duration,
    pub resolve_lookup_timeout: Duration,
    pub gallery_timeout: Duration,
    pub rates: RateTable,
    pub translator: Option<TranslatorConfig>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            itad_api_key: None,
            steamwebapi_key: None,
            compare_region: CompareRegion::Region("UA".to_string()),
            itad_base_url: itad::provider::DEFAULT_BASE_URL.to_string(),
            steam_base_url: steam::provider::DEFAULT_BASE_URL.to_string(),
            fetch_timeout: Duration::from_secs(20),
            resolve_lookup_timeout: Duration::from_secs(12),
            gallery_timeout: Duration::from_secs(8),
            rates: RateTable::default(),
            translator: None,
        }
    }
}

impl BotConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let itad_base_url = env_opt("ITAD_BASE_URL").unwrap_or(defaults.itad_base_url);
        url::Url::parse(&itad_base_url).context("ITAD_BASE_URL is not a valid URL")?;
        let steam_base_url = env_opt("STEAM_STORE_BASE_URL").unwrap_or(defaults.steam_base_url);
        url::Url::parse(&steam_base_url).context("STEAM_STORE_BASE_URL is not a valid URL")?;

        let rates = match env_opt("CNY_RATES") {
            Some(spec) => RateTable::default()
                .with_overrides(&spec)
                .context("CNY_RATES")?,
            None => defaults.rates,
        };

        let translator = match env_opt("TRANSLATE_API_BASE") {
            Some(api_base) => {
                url::Url::parse(&api_base).context("TRANSLATE_API_BASE is not a valid URL")?;
                Some(TranslatorConfig {
                    api_base,
                    api_key: env_opt("TRANSLATE_API_KEY"),
                    model: env_opt("TRANSLATE_MODEL").unwrap_or_else(|| "gpt-4o-mini".into()),
                })
            }
            None => None,
        };

        Ok(Self {
            itad_api_key: env_opt("ITAD_API_KEY"),
            steamwebapi_key: env_opt("STEAMWEBAPI_KEY"),
            compare_region: env_opt("STEAM_COMPARE_REGION")
                .map(|r| CompareRegion::parse(&r))
                .unwrap_or(defaults.compare_region),
            itad_base_url,
            steam_base_url,
            fetch_timeout: Duration::from_secs(env_parse("PRICE_FETCH_TIMEOUT_SECS", 20u64).max(1)),
            resolve_lookup_timeout: Duration::from_secs(
                env_parse("RESOLVE_LOOKUP_TIMEOUT_SECS", 12u64).max(1),
            ),
            gallery_timeout: Duration::from_secs(
                env_parse("GALLERY_FETCH_TIMEOUT_SECS", 8u64).max(1),
            ),
            rates,
            translator,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compare_region_sentinel_disables() {
        assert_eq!(CompareRegion::parse("none"), CompareRegion::Disabled);
        assert_eq!(CompareRegion::parse(" NONE "), CompareRegion::Disabled);
        assert_eq!(
            CompareRegion::parse("ua"),
            CompareRegion::Region("UA".into())
        );
        assert_eq!(CompareRegion::parse("ar").code(), Some("AR"));
    }

    #[test]
    fn defaults_match_reference_deployment() {
        let cfg = BotConfig::default();
        assert_eq!(cfg.compare_region.code(), Some("UA"));
        assert_eq!(cfg.fetch_timeout, Duration::from_secs(20));
        assert!(cfg.translator.is_none());
    }
}
