use std::{net::SocketAddr, str::FromStr, time::Duration};

use anyhow::{Context, Result, bail};
use shopdesk_core::{ChatId, Language, StatusPolicy};

const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_BOT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_SESSION_TTL_HOURS: i64 = 12;

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Reads `name` and parses it, falling back to `default` when unset.
fn parse_env<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} has an invalid value `{raw}`")),
        Err(_) => Ok(default),
    }
}

/// Where the admin console listens and what it persists to.
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub redis_url: String,
    pub http_addr: SocketAddr,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: std::env::var("DATABASE_URL").context("DATABASE_URL is required")?,
            db_max_connections: parse_env("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS)?,
            redis_url: std::env::var("REDIS_URL").context("REDIS_URL is required")?,
            http_addr: env_or("HTTP_ADDR", DEFAULT_HTTP_ADDR)
                .parse()
                .context("HTTP_ADDR must be a socket address")?,
        })
    }
}

#[derive(Clone, Debug)]
pub struct BotConfig {
    pub token: String,
    pub api_base: String,
    pub timeout: Duration,
    pub admin_chat_ids: Vec<ChatId>,
    pub reload_channel: String,
}

impl BotConfig {
    pub fn from_env() -> Result<Self> {
        let token =
            std::env::var("TELEGRAM_BOT_TOKEN").context("TELEGRAM_BOT_TOKEN is required")?;
        let api_base = env_or("TELEGRAM_API_BASE", "https://api.telegram.org");

        Ok(Self {
            token,
            api_base: api_base.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(parse_env(
                "BOT_API_TIMEOUT_SECS",
                DEFAULT_BOT_TIMEOUT_SECS,
            )?),
            admin_chat_ids: parse_chat_ids(&env_or("ADMIN_CHAT_IDS", ""))?,
            reload_channel: env_or("CATALOG_RELOAD_CHANNEL", "bot.catalog.reload"),
        })
    }
}

#[derive(Clone, Debug)]
pub struct AdminConfig {
    pub admin_name: String,
    pub session_ttl: chrono::Duration,
    pub default_language: Language,
    pub status_policy: StatusPolicy,
    /// Channel for product announcements and channel-audience posts.
    pub channel_chat_id: Option<ChatId>,
}

impl AdminConfig {
    pub fn from_env() -> Result<Self> {
        let default_language = match std::env::var("DEFAULT_LANGUAGE") {
            Ok(raw) => Language::from_code(&raw)
                .with_context(|| format!("unsupported DEFAULT_LANGUAGE `{raw}`"))?,
            Err(_) => Language::Ru,
        };
        let status_policy = match std::env::var("ORDER_STATUS_POLICY") {
            Ok(raw) => StatusPolicy::from_name(&raw)
                .with_context(|| format!("unsupported ORDER_STATUS_POLICY `{raw}`"))?,
            Err(_) => StatusPolicy::Permissive,
        };
        let channel_chat_id = match std::env::var("TELEGRAM_CHANNEL_ID") {
            Ok(raw) if !raw.trim().is_empty() => Some(ChatId(
                raw.trim()
                    .parse()
                    .with_context(|| format!("invalid TELEGRAM_CHANNEL_ID `{raw}`"))?,
            )),
            _ => None,
        };

        Ok(Self {
            admin_name: env_or("ADMIN_NAME", "AdminUser"),
            session_ttl: chrono::Duration::hours(parse_env(
                "SESSION_TTL_HOURS",
                DEFAULT_SESSION_TTL_HOURS,
            )?),
            default_language,
            status_policy,
            channel_chat_id,
        })
    }
}

pub fn parse_chat_ids(raw: &str) -> Result<Vec<ChatId>> {
    let mut ids = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|part| !part.is_empty()) {
        match part.parse::<i64>() {
            Ok(id) => ids.push(ChatId(id)),
            Err(_) => bail!("invalid chat id `{part}` in ADMIN_CHAT_IDS"),
        }
    }
    Ok(ids)
}
