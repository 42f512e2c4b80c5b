pub mod bot;
pub mod config;
pub mod error;
pub mod logging;
pub mod lookup;
pub mod normalization;
pub mod providers;
pub mod reply;

pub mod util {
    pub mod env;
}

pub use bot::PriceBot;
pub use config::BotConfig;
pub use error::{GalleryError, LookupError};
pub use reply::{Reply, ReplySink, Segment};
