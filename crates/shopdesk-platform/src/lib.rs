pub mod config;
pub mod db;
pub mod redis_bus;
pub mod telegram;

pub use config::{AdminConfig, BotConfig, ServiceConfig, parse_chat_ids};
pub use db::PgStore;
pub use redis_bus::{CatalogReloadSignal, RedisBus};
pub use telegram::TelegramGateway;
