pub mod provider;

pub use provider::{capsule_variant, AppData, PriceOverview, SteamStoreClient};
