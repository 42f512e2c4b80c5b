pub mod provider;

pub use provider::{
    ItadAmount, ItadDeal, ItadGameInfo, ItadGamePrices, ItadHistoryLow, ItadProvider,
    ItadSearchHit, STEAM_SHOP_ID,
};
