use std::sync::Arc;

use shopdesk_core::BotGateway;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Publishes the catalog reload hint after catalog writes.
#[derive(Clone)]
pub struct CatalogReloader {
    gateway: Arc<dyn BotGateway>,
}

impl CatalogReloader {
    pub fn new(gateway: Arc<dyn BotGateway>) -> Self {
        Self { gateway }
    }

    /// Fire-and-forget: the signal is sent on a background task so the caller's
    /// response never waits on the bot.
    pub fn signal(&self, reason: &'static str) -> JoinHandle<bool> {
        let gateway = self.gateway.clone();
        tokio::spawn(async move { publish(gateway.as_ref(), reason).await })
    }

    pub async fn reload_now(&self, reason: &'static str) -> bool {
        publish(self.gateway.as_ref(), reason).await
    }
}

async fn publish(gateway: &dyn BotGateway, reason: &'static str) -> bool {
    let accepted = gateway.trigger_catalog_reload().await;
    if accepted {
        info!("catalog reload signalled after {reason}");
    } else {
        warn!("catalog reload signal after {reason} was not accepted");
    }
    accepted
}
