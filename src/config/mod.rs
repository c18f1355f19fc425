//! Application configuration: types, defaults and loading

pub mod loader;
pub mod types;

pub use loader::{load_config, load_from_env};
pub use types::{default_trade_hubs, AppConfig, AppSettings, EsiConfig};
