//! Chat message for an aggregated lookup.

use std::sync::OnceLock;

use regex::Regex;

use super::aggregate::format_drop;
use super::model::{AggregatedResult, ComparisonBlock, CrossRegionDelta, RegionPriceFact};
use crate::normalization::currency::format_amount;
use crate::normalization::title::store_url;
use crate::reply::{Reply, Segment};

static BRACKETED: OnceLock<Regex> = OnceLock::new();

fn bracketed() -> &'static Regex {
    BRACKETED.get_or_init(|| Regex::new(r"\[.*?\]").expect("static bracket regex"))
}

fn discount_tag(discount: Option<i64>) -> String {
    match discount {
        Some(d) if d > 0 => format!(" -{d}%"),
        _ => String::new(),
    }
}

fn price_text(fact: &RegionPriceFact) -> String {
    format_amount(fact.price, fact.currency.as_deref())
}

pub fn delta_text(delta: Option<&CrossRegionDelta>) -> String {
    match delta {
        Some(d) if d.difference < 0.0 => format!(
            "国区更便宜喵！便宜{:.2}元呢！ ({:.2}%)",
            d.difference.abs(),
            d.percent
        ),
        Some(d) => format!(
            "国区更贵喵，多花{:.2}元呢！ (+{:.2}%)",
            d.difference, d.percent
        ),
        None => "无法获取当前价差".to_string(),
    }
}

fn comparison_text(block: &ComparisonBlock, delta: Option<&CrossRegionDelta>) -> String {
    let cny = block
        .price_cny
        .map(|v| format!(" （￥{v:.2}）"))
        .unwrap_or_default();
    format!(
        "{}区价格: {}{}{}\n\n{}",
        block.region,
        price_text(&block.fact),
        discount_tag(Some(block.fact.discount_percent)),
        cny,
        delta_text(delta)
    )
}

/// Name, prices, history low and the optional comparison block.
pub fn price_block(result: &AggregatedResult) -> String {
    let low_currency = result
        .history_low
        .currency
        .as_deref()
        .or(result.home.currency.as_deref());
    let mut block = format!(
        "{}\n国区价格: {}{}\n史低: {} {}",
        result.display_name,
        price_text(&result.home),
        discount_tag(result.live_discount),
        format_amount(result.history_low.amount, low_currency),
        format_drop(result.history_drop_percent),
    );
    if let Some(comparison) = &result.comparison {
        block.push_str("\n\n");
        block.push_str(&comparison_text(comparison, result.delta.as_ref()));
    }
    bracketed().replace_all(&block, "").into_owned()
}

/// Full reply: leading thumbnail when known, then the text body.
pub fn render(result: &AggregatedResult) -> Reply {
    let mut text = price_block(result);
    text.push('\n');
    if let Some(score) = result.metadata.review_score {
        text.push_str(&format!("好评率: {score}%"));
    }
    text.push_str(&format!(
        "\nsteam商店链接：{}",
        store_url(result.id.store_app_id)
    ));

    let mut segments = Vec::with_capacity(2);
    if let Some(url) = &result.thumbnail_url {
        segments.push(Segment::ImageUrl(url.clone()));
    }
    segments.push(Segment::Text(text));
    Reply { segments }
}
