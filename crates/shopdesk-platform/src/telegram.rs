use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use shopdesk_core::{BotGateway, ChatId, DeliveryResult, GatewayError};
use tracing::{error, info, warn};

use crate::config::BotConfig;
use crate::redis_bus::{CatalogReloadSignal, RedisBus};

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    description: Option<String>,
    result: Option<SentMessage>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: i64,
}

/// Bot API client for outbound messages plus the Redis channel the bot
/// listens on for catalog reloads. The request timeout lives here.
#[derive(Clone)]
pub struct TelegramGateway {
    http: reqwest::Client,
    config: BotConfig,
    bus: RedisBus,
}

impl TelegramGateway {
    pub fn new(config: BotConfig, bus: RedisBus) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config, bus })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.config.api_base, self.config.token)
    }
}

#[async_trait]
impl BotGateway for TelegramGateway {
    async fn send_message(&self, chat_id: ChatId, text: &str) -> Result<DeliveryResult, GatewayError> {
        let response = self
            .http
            .post(self.method_url("sendMessage"))
            .json(&json!({
                "chat_id": chat_id.0,
                "text": text,
                "parse_mode": "HTML",
            }))
            .send()
            .await
            .map_err(transport_error)?;

        let body = response
            .json::<serde_json::Value>()
            .await
            .map_err(transport_error)?;

        interpret_send_response(body)
    }

    async fn notify_admins(&self, text: &str) -> Result<usize, GatewayError> {
        let mut delivered = 0;
        let mut last_error = None;

        for chat_id in &self.config.admin_chat_ids {
            match self.send_message(*chat_id, text).await {
                Ok(_) => delivered += 1,
                Err(err) => {
                    warn!("admin chat {chat_id} did not receive notification: {err}");
                    last_error = Some(err);
                }
            }
        }

        match last_error {
            Some(err) if delivered == 0 => Err(err),
            _ => Ok(delivered),
        }
    }

    async fn trigger_catalog_reload(&self) -> bool {
        let signal = CatalogReloadSignal {
            requested_at: Utc::now(),
        };
        match self
            .bus
            .publish_json(&self.config.reload_channel, &signal)
            .await
        {
            Ok(receivers) => {
                info!(
                    "catalog reload published on {} to {receivers} subscriber(s)",
                    self.config.reload_channel
                );
                true
            }
            Err(err) => {
                error!("failed to publish catalog reload: {err:#}");
                false
            }
        }
    }
}

/// The request URL embeds the bot token, so it is stripped before the error
/// text can reach a log line.
fn transport_error(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Timeout
    } else {
        GatewayError::Transport(err.without_url().to_string())
    }
}

fn interpret_send_response(body: serde_json::Value) -> Result<DeliveryResult, GatewayError> {
    let parsed: ApiResponse = serde_json::from_value(body)
        .map_err(|err| GatewayError::Transport(format!("unexpected bot api response: {err}")))?;

    if !parsed.ok {
        return Err(GatewayError::Rejected(
            parsed
                .description
                .unwrap_or_else(|| "no description".to_string()),
        ));
    }

    Ok(DeliveryResult {
        ok: true,
        message_id: parsed.result.map(|message| message.message_id),
    })
}
