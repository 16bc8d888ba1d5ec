use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::ChatId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryResult {
    pub ok: bool,
    pub message_id: Option<i64>,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("bot api request timed out")]
    Timeout,
    #[error("bot api rejected the message: {0}")]
    Rejected(String),
    #[error("bot api transport failure: {0}")]
    Transport(String),
}

/// Client side of the customer-facing chat bot.
#[async_trait]
pub trait BotGateway: Send + Sync {
    /// Acceptance by the bot API, not a read receipt.
    async fn send_message(&self, chat_id: ChatId, text: &str) -> Result<DeliveryResult, GatewayError>;

    /// Sends `text` to every configured admin chat; returns how many accepted it.
    async fn notify_admins(&self, text: &str) -> Result<usize, GatewayError>;

    /// `true` once the bot has been signalled to refetch catalog data.
    async fn trigger_catalog_reload(&self) -> bool;
}
