pub mod currency;
pub mod title;
