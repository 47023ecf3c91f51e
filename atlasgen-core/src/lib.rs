pub mod asset_catalog;
pub mod export;
pub mod pipeline;
pub mod sprite_pack;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
