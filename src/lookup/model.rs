use chrono::NaiveDate;
use serde::Serialize;

/// Both id forms of one game. The aggregator id drives history lookups,
/// the store app id drives live per-region prices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalGameId {
    pub store_app_id: u64,
    pub aggregator_id: String,
}

/// One region's price snapshot. `None` means the source had no data, not zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RegionPriceFact {
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub discount_percent: i64,
    pub regular_price: Option<f64>,
}

impl RegionPriceFact {
    pub fn absent() -> Self {
        Self::default()
    }

    pub fn has_price(&self) -> bool {
        self.price.is_some() && self.currency.is_some()
    }
}

/// Best-known historical minimum (3-month bucket, else 1-year, else all-time).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HistoryLowFact {
    pub amount: Option<f64>,
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GameMetadata {
    pub title: Option<String>,
    pub tags: Vec<String>,
    pub release_date: Option<NaiveDate>,
    pub developers: Vec<String>,
    pub review_score: Option<i64>,
    pub aggregator_url: Option<String>,
}

/// Home-locale storefront listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HomeListing {
    pub display_name: Option<String>,
    pub thumbnail_url: Option<String>,
    pub live: RegionPriceFact,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonBlock {
    pub region: String,
    pub fact: RegionPriceFact,
    pub price_cny: Option<f64>,
}

/// Home price minus comparison price, both in CNY.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CrossRegionDelta {
    pub home_cny: f64,
    pub compare_cny: f64,
    pub difference: f64,
    /// Relative to the comparison price.
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedResult {
    pub id: CanonicalGameId,
    pub display_name: String,
    pub thumbnail_url: Option<String>,
    pub home: RegionPriceFact,
    /// Home price came from the storefront because the aggregator had none.
    pub home_backfilled: bool,
    /// Live discount tag on the home price (> 0 only).
    pub live_discount: Option<i64>,
    pub history_low: HistoryLowFact,
    /// Drop from baseline to history low in whole percent; positive means cheaper.
    pub history_drop_percent: Option<i64>,
    /// `None` when comparison is disabled.
    pub comparison: Option<ComparisonBlock>,
    /// `None` when comparison is disabled or a conversion is unavailable.
    pub delta: Option<CrossRegionDelta>,
    pub metadata: GameMetadata,
}
