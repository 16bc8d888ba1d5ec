use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "shopdesk_session";

#[derive(Debug, Clone, Serialize)]
pub struct AdminSession {
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Server-side admin sessions keyed by the token carried in the session cookie.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, AdminSession>>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    pub async fn create(&self, username: &str) -> (Uuid, AdminSession) {
        let now = Utc::now();
        let token = Uuid::new_v4();
        let session = AdminSession {
            username: username.to_string(),
            created_at: now,
            expires_at: now + self.ttl,
        };

        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, existing| existing.expires_at > now);
        sessions.insert(token, session.clone());

        (token, session)
    }

    pub async fn validate(&self, token: Uuid) -> Option<AdminSession> {
        let now = Utc::now();
        let session = self.sessions.read().await.get(&token).cloned()?;
        if session.expires_at > now {
            return Some(session);
        }

        self.sessions.write().await.remove(&token);
        None
    }

    pub async fn revoke(&self, token: Uuid) -> bool {
        self.sessions.write().await.remove(&token).is_some()
    }
}

pub fn session_token(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
}

pub fn session_cookie(token: Uuid, ttl: Duration) -> String {
    format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        ttl.num_seconds().max(0)
    )
}

pub fn expired_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

pub async fn require_session(
    State(sessions): State<SessionStore>,
    mut request: Request,
    next: Next,
) -> Result<Response, (StatusCode, String)> {
    let token = session_token(request.headers())
        .ok_or((StatusCode::UNAUTHORIZED, "login required".to_string()))?;
    let session = sessions
        .validate(token)
        .await
        .ok_or((StatusCode::UNAUTHORIZED, "session expired".to_string()))?;

    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}
