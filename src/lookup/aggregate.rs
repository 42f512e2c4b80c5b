//! Concurrent fetch, merge and derived fields for one resolved game.

use tracing::{info, warn};

use super::model::{AggregatedResult, ComparisonBlock, CrossRegionDelta, RegionPriceFact};
use super::{resolver, sources, RequestContext};
use crate::config::{BACKFILL_LOCALE, HOME_REGION};
use crate::error::LookupError;
use crate::normalization::currency::{round2, RateTable};

pub const UNKNOWN_GAME: &str = "未知游戏";

/// Whole-percent drop from baseline to the history low.
///
/// The baseline is the regular price when known, else the current price.
/// Positive means the low is below the baseline. Halves round to even.
pub fn history_low_drop(
    current: Option<f64>,
    low: Option<f64>,
    regular: Option<f64>,
) -> Option<i64> {
    let low = low?;
    let baseline = regular
        .filter(|r| *r > 0.0)
        .or_else(|| current.filter(|c| *c > 0.0))?;
    Some(((1.0 - low / baseline) * 100.0).round_ties_even() as i64)
}

pub fn format_drop(drop: Option<i64>) -> String {
    match drop {
        Some(d) if d >= 0 => format!("-{d}%"),
        Some(d) => format!("+{}%", -d),
        None => "未知".to_string(),
    }
}

/// Home minus comparison, both in CNY. `None` unless both convert and the comparison is positive.
pub fn cross_region_delta(
    rates: &RateTable,
    home: &RegionPriceFact,
    compare: &RegionPriceFact,
) -> Option<CrossRegionDelta> {
    let home_cny = rates.to_cny(home.price, home.currency.as_deref())?;
    let compare_cny = rates.to_cny(compare.price, compare.currency.as_deref())?;
    if compare_cny <= 0.0 {
        return None;
    }
    let difference = round2(home_cny - compare_cny);
    Some(CrossRegionDelta {
        home_cny,
        compare_cny,
        difference,
        percent: difference / compare_cny * 100.0,
    })
}

/// Fetch everything known about `app_id` and merge it.
///
/// Home listing, aggregator id + metadata and the comparison price run
/// concurrently; aggregator prices follow once the id is known. A missing
/// aggregator id ends the request, every other gap stays absent.
pub async fn aggregate(
    ctx: &RequestContext<'_>,
    app_id: u64,
) -> Result<AggregatedResult, LookupError> {
    let config = &ctx.bot.config;

    let (listing, canonical, comparison_fact) = tokio::join!(
        sources::fetch_home_listing(ctx, app_id),
        async {
            let id = resolver::canonicalize(ctx, app_id).await?;
            let metadata = sources::fetch_aggregator_metadata(ctx, &id.aggregator_id).await;
            Ok::<_, LookupError>((id, metadata))
        },
        sources::fetch_comparison_price(ctx, app_id, &config.compare_region),
    );
    let (id, metadata) = canonical?;

    let (aggregator_home, history_low) =
        sources::fetch_aggregator_prices(ctx, &id.aggregator_id, HOME_REGION).await;

    let (home, home_backfilled) = if aggregator_home.has_price() {
        (aggregator_home, false)
    } else {
        let live = sources::fetch_storefront_price(ctx, app_id, HOME_REGION, BACKFILL_LOCALE).await;
        if live.has_price() {
            info!(appid = app_id, price = ?live.price, "lookup: home price backfilled from storefront");
        } else {
            warn!(appid = app_id, "lookup: home price unknown from both sources");
        }
        let backfilled = live.has_price();
        (
            RegionPriceFact {
                price: live.price,
                currency: live.currency,
                ..aggregator_home
            },
            backfilled,
        )
    };

    let live_discount = [listing.live.discount_percent, home.discount_percent]
        .into_iter()
        .find(|d| *d > 0);

    let history_drop_percent = history_low_drop(home.price, history_low.amount, home.regular_price);

    let comparison = config.compare_region.code().map(|code| ComparisonBlock {
        region: code.to_string(),
        price_cny: config
            .rates
            .to_cny(comparison_fact.price, comparison_fact.currency.as_deref()),
        fact: comparison_fact,
    });
    let delta = comparison
        .as_ref()
        .and_then(|c| cross_region_delta(&config.rates, &home, &c.fact));

    let display_name = listing
        .display_name
        .or_else(|| metadata.title.clone())
        .unwrap_or_else(|| UNKNOWN_GAME.to_string());

    Ok(AggregatedResult {
        id,
        display_name,
        thumbnail_url: listing.thumbnail_url,
        home,
        home_backfilled,
        live_discount,
        history_low,
        history_drop_percent,
        comparison,
        delta,
        metadata,
    })
}
