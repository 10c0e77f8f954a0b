use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::error::{CatalogError, CatalogResult};

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct TokenCache {
    client: Client,
    token_url: String,
    ttl: chrono::Duration,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new(client: Client, token_url: impl Into<String>, ttl: Duration) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::minutes(50));
        Self {
            client,
            token_url: token_url.into(),
            ttl,
            cached: Mutex::new(None),
        }
    }

    pub async fn get_token(&self) -> CatalogResult<String> {
        let mut guard = self.cached.lock().await;
        if let Some(token) = guard.as_ref() {
            if Utc::now() < token.expires_at {
                return Ok(token.value.clone());
            }
            debug!("Cached auth token expired at {}", token.expires_at);
        }

        let value = match self.fetch_token().await {
            Ok(v) => v,
            Err(e) => {
                error!("Auth token error: {}", e);
                return Err(e);
            }
        };
        let expires_at = Utc::now() + self.ttl;
        info!("Fetched new auth token (valid until {})", expires_at);
        *guard = Some(CachedToken {
            value: value.clone(),
            expires_at,
        });
        Ok(value)
    }

    pub async fn invalidate(&self, rejected: &str) {
        let mut guard = self.cached.lock().await;
        if guard.as_ref().is_some_and(|t| t.value == rejected) {
            warn!("Invalidating rejected auth token");
            *guard = None;
        }
    }

    async fn fetch_token(&self) -> CatalogResult<String> {
        #[derive(Deserialize)]
        struct TokenResponse {
            token: Option<String>,
        }

        let res = self
            .client
            .get(&self.token_url)
            .send()
            .await
            .map_err(|e| CatalogError::Auth(format!("token request failed: {}", e)))?;
        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| CatalogError::Auth(format!("reading token body failed: {}", e)))?;
        if !status.is_success() {
            return Err(CatalogError::Auth(format!(
                "Failed to fetch auth token: {} {}",
                status, text
            )));
        }

        let parsed: TokenResponse = serde_json::from_str(&text)
            .map_err(|e| CatalogError::Auth(format!("malformed token response: {}", e)))?;
        parsed
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| CatalogError::Auth("token response has no token".to_string()))
    }
}
