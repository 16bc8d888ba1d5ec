use std::sync::Arc;

use serde::Serialize;
use shopdesk_core::{BotGateway, ChatId};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BroadcastReport {
    pub recipients: usize,
    pub sent: usize,
    pub failed: usize,
}

/// Sends one text to many chats in order. A failed chat is counted and
/// skipped; there is no retry.
#[derive(Clone)]
pub struct Broadcaster {
    gateway: Arc<dyn BotGateway>,
}

impl Broadcaster {
    pub fn new(gateway: Arc<dyn BotGateway>) -> Self {
        Self { gateway }
    }

    pub async fn send(&self, recipients: &[ChatId], text: &str) -> BroadcastReport {
        let mut report = BroadcastReport {
            recipients: recipients.len(),
            ..Default::default()
        };

        for chat_id in recipients {
            match self.gateway.send_message(*chat_id, text).await {
                Ok(result) if result.ok => report.sent += 1,
                Ok(_) => {
                    warn!("bot api did not accept broadcast to chat {chat_id}");
                    report.failed += 1;
                }
                Err(err) => {
                    warn!("broadcast to chat {chat_id} failed: {err}");
                    report.failed += 1;
                }
            }
        }

        info!(
            "broadcast finished: {} sent, {} failed",
            report.sent, report.failed
        );
        report
    }
}
