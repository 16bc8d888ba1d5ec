use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use redis::{AsyncCommands, Client};
use serde::{Deserialize, Serialize};

/// Payload the bot receives on the reload channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogReloadSignal {
    pub requested_at: DateTime<Utc>,
}

/// Publish-only handle; the bot side owns the subscription.
#[derive(Clone)]
pub struct RedisBus {
    client: Client,
}

impl RedisBus {
    /// Validates the URL only. Connections are opened per publish.
    pub fn open(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url).context("REDIS_URL is not a valid redis url")?;
        Ok(Self { client })
    }

    /// Returns how many subscribers received the payload.
    pub async fn publish_json<T: Serialize>(&self, channel: &str, payload: &T) -> Result<i64> {
        let message = serde_json::to_string(payload)?;
        let mut connection = self
            .client
            .get_multiplexed_async_connection()
            .await
            .context("redis is unreachable")?;
        let receivers: i64 = connection.publish(channel, message).await?;
        Ok(receivers)
    }
}
