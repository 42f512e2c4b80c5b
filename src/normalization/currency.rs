use std::collections::BTreeMap;

use anyhow::{anyhow, Result};

/// Currency every comparison is normalized into.
pub const REFERENCE_CURRENCY: &str = "CNY";

/// Hand-maintained CNY rates. Edit here (or override with `CNY_RATES`) when they drift.
const DEFAULT_CNY_RATES: &[(&str, f64)] = &[
    ("CNY", 1.0),
    ("UAH", 0.17),
    ("USD", 7.11),
    ("JPY", 0.05),
    ("KRW", 0.0053),
    ("EUR", 8.38),
    ("RUB", 0.085),
    ("TRY", 0.17),
];

/// Static rate table mapping an ISO currency code to its value in CNY.
///
/// No network access: the table is built once at startup and shared read-only.
#[derive(Debug, Clone, PartialEq)]
pub struct RateTable {
    rates: BTreeMap<String, f64>,
}

impl Default for RateTable {
    fn default() -> Self {
        Self {
            rates: DEFAULT_CNY_RATES
                .iter()
                .map(|(code, rate)| ((*code).to_string(), *rate))
                .collect(),
        }
    }
}

impl RateTable {
    /// Apply overrides in the `USD=7.2,UAH=0.18` form on top of the defaults.
    pub fn with_overrides(mut self, spec: &str) -> Result<Self> {
        for part in spec.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let (code, rate) = part
                .split_once('=')
                .ok_or_else(|| anyhow!("rate override '{part}' is not CODE=RATE"))?;
            let rate: f64 = rate
                .trim()
                .parse()
                .map_err(|_| anyhow!("rate override '{part}' has a non-numeric rate"))?;
            if !rate.is_finite() || rate <= 0.0 {
                return Err(anyhow!("rate override '{part}' must be positive"));
            }
            self.rates.insert(code.trim().to_ascii_uppercase(), rate);
        }
        Ok(self)
    }

    pub fn rate(&self, currency: &str) -> Option<f64> {
        self.rates
            .get(&currency.trim().to_ascii_uppercase())
            .copied()
            .filter(|r| *r > 0.0)
    }

    /// Convert into CNY, rounded to two decimals.
    ///
    /// Absent amount, absent currency or an unknown code all yield `None`.
    pub fn to_cny(&self, amount: Option<f64>, currency: Option<&str>) -> Option<f64> {
        let amount = amount?;
        let rate = self.rate(currency?)?;
        Some(round2(amount * rate))
    }
}

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Render an amount with a currency-specific symbol, two decimals.
///
/// CNY/UAH/USD get their symbol; anything else is prefixed with its code.
pub fn format_amount(amount: Option<f64>, currency: Option<&str>) -> String {
    let (Some(amount), Some(currency)) = (amount, currency) else {
        return "未知".to_string();
    };
    let symbol = match currency {
        "CNY" => "￥".to_string(),
        "UAH" => "₴".to_string(),
        "USD" => "$".to_string(),
        other => format!("{other} "),
    };
    format!("{symbol}{amount:.2}")
}
