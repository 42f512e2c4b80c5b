//! Resolution and aggregation pipeline for one user request.
//!
//! Everything in here is request-scoped: a [`RequestContext`] is built per
//! command invocation and threaded through resolver, sources and aggregation.
//! The only shared state is the immutable [`PriceBot`] it borrows.

pub mod aggregate;
pub mod gallery;
pub mod model;
pub mod render;
pub mod resolver;
pub mod sources;

use uuid::Uuid;

use crate::bot::PriceBot;
use crate::reply::ReplySink;

pub use model::{
    AggregatedResult, CanonicalGameId, ComparisonBlock, CrossRegionDelta, GameMetadata,
    HistoryLowFact, HomeListing, RegionPriceFact,
};

pub struct RequestContext<'a> {
    pub bot: &'a PriceBot,
    pub replies: &'a ReplySink,
    pub request_id: Uuid,
}

impl<'a> RequestContext<'a> {
    pub fn new(bot: &'a PriceBot, replies: &'a ReplySink) -> Self {
        Self {
            bot,
            replies,
            request_id: Uuid::new_v4(),
        }
    }

    /// Progress notice shown while the request is still running.
    pub fn notice(&self, text: impl Into<String>) {
        self.replies.text(text);
    }
}
