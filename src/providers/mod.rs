pub mod itad;
pub mod steam;
pub mod thumbnail;
pub mod translate;
