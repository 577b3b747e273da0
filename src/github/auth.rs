// src/github/auth.rs
// GitHub App authentication: app JWT -> cached installation tokens

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use parking_lot::Mutex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::PoliceConfig;
use crate::error::{PoliceError, Result};
use crate::http::check_status;

/// Installation tokens are refreshed this long before GitHub expires them
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppClaims {
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

#[derive(Deserialize, Debug)]
struct InstallationTokenResponse {
    token: String,
    expires_at: DateTime<Utc>,
}

pub struct AppCredentials {
    pub app_id: u64,
    key: EncodingKey,
    cache: Mutex<HashMap<u64, (String, DateTime<Utc>)>>,
}

impl AppCredentials {
    pub fn from_pem(app_id: u64, private_key_pem: &str) -> Result<Self> {
        let key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes())?;
        Ok(Self {
            app_id,
            key,
            cache: Mutex::new(HashMap::new()),
        })
    }

    /// Claims for an app JWT issued at `now`; backdated to absorb clock drift
    pub fn claims_at(&self, now: DateTime<Utc>) -> AppClaims {
        AppClaims {
            iat: (now - Duration::seconds(60)).timestamp(),
            exp: (now + Duration::minutes(9)).timestamp(),
            iss: self.app_id.to_string(),
        }
    }

    pub fn app_jwt(&self) -> Result<String> {
        let claims = self.claims_at(Utc::now());
        Ok(jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.key)?)
    }

    fn cached_token(&self, installation_id: u64, now: DateTime<Utc>) -> Option<String> {
        let cache = self.cache.lock();
        cache
            .get(&installation_id)
            .filter(|(_, expires_at)| *expires_at - Duration::seconds(TOKEN_REFRESH_MARGIN_SECS) > now)
            .map(|(token, _)| token.clone())
    }

    /// Installation access token, from cache when still fresh
    pub async fn installation_token(&self, http: &Client, api_base: &str, installation_id: u64) -> Result<String> {
        if let Some(token) = self.cached_token(installation_id, Utc::now()) {
            return Ok(token);
        }

        let url = format!("{}/app/installations/{}/access_tokens", api_base, installation_id);
        let response = http
            .post(&url)
            .bearer_auth(self.app_jwt()?)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await?;
        let issued: InstallationTokenResponse = check_status(response).await?.json().await?;

        debug!(installation_id, expires_at = %issued.expires_at, "Issued installation token");
        self.cache
            .lock()
            .insert(installation_id, (issued.token.clone(), issued.expires_at));
        Ok(issued.token)
    }
}

pub enum GitHubAuth {
    Token(String),
    App(AppCredentials),
}

impl GitHubAuth {
    /// Pick auth from config: a static token wins over App credentials
    pub fn from_config(config: &PoliceConfig) -> Result<Self> {
        if let Some(token) = &config.github_token {
            return Ok(GitHubAuth::Token(token.clone()));
        }
        match (config.app_id, config.private_key.as_deref()) {
            (Some(app_id), Some(pem)) => Ok(GitHubAuth::App(AppCredentials::from_pem(app_id, pem)?)),
            _ => Err(PoliceError::ConfigMissing("GITHUB_TOKEN or APP_ID + PRIVATE_KEY")),
        }
    }

    /// Bearer token to use for a request on behalf of `installation_id`
    pub async fn bearer(&self, http: &Client, api_base: &str, installation_id: Option<u64>) -> Result<String> {
        match self {
            GitHubAuth::Token(token) => Ok(token.clone()),
            GitHubAuth::App(app) => {
                let installation_id = installation_id.ok_or_else(|| {
                    PoliceError::Auth("event has no installation id; cannot act as the App".into())
                })?;
                app.installation_token(http, api_base, installation_id).await
            }
        }
    }
}
