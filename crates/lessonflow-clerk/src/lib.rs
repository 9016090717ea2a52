// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Clerk identity adapter.
//!
//! Reads a user's ban state and bans or unbans through the Clerk backend
//! users API. Errors are returned as-is; callers decide whether to retry.

use std::time::Duration;

use async_trait::async_trait;
use lessonflow_config::LessonflowConfig;
use lessonflow_core::error::LessonflowError;
use lessonflow_core::traits::{IdentityAdapter, PluginAdapter};
use lessonflow_core::types::{AdapterType, HealthStatus, IdentityUser};
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Deserialize;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct ClerkUser {
    id: String,
    #[serde(default)]
    banned: bool,
}

pub struct ClerkIdentity {
    client: reqwest::Client,
    base_url: String,
}

impl ClerkIdentity {
    /// Key resolution order: `identity.secret_key` -> `CLERK_SECRET_KEY` -> error.
    pub fn new(config: &LessonflowConfig) -> Result<Self, LessonflowError> {
        let secret = config
            .identity
            .secret_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var("CLERK_SECRET_KEY").ok().filter(|k| !k.is_empty()))
            .ok_or_else(|| {
                LessonflowError::Config(
                    "no identity secret key: set identity.secret_key or CLERK_SECRET_KEY".into(),
                )
            })?;

        let mut auth = HeaderValue::from_str(&format!("Bearer {secret}"))
            .map_err(|e| LessonflowError::Config(format!("invalid secret key header value: {e}")))?;
        auth.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| LessonflowError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        info!(base_url = %config.identity.base_url, "Clerk identity adapter initialized");
        Ok(Self {
            client,
            base_url: config.identity.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn post_action(&self, user_id: &str, action: &str) -> Result<(), LessonflowError> {
        let url = format!("{}/users/{user_id}/{action}", self.base_url);
        let response = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(request_failed)?;
        check_status(response.status(), user_id)?;
        debug!(user_id, action, "identity action applied");
        Ok(())
    }
}

fn request_failed(e: reqwest::Error) -> LessonflowError {
    LessonflowError::Provider {
        message: format!("identity request failed: {e}"),
        source: Some(Box::new(e)),
    }
}

fn check_status(status: StatusCode, user_id: &str) -> Result<(), LessonflowError> {
    match status {
        s if s.is_success() => Ok(()),
        StatusCode::NOT_FOUND => Err(LessonflowError::not_found("user", user_id)),
        s => Err(LessonflowError::Provider {
            message: format!("identity provider returned {s}"),
            source: None,
        }),
    }
}

#[async_trait]
impl PluginAdapter for ClerkIdentity {
    fn name(&self) -> &str {
        "clerk"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Identity
    }

    async fn health_check(&self) -> Result<HealthStatus, LessonflowError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), LessonflowError> {
        Ok(())
    }
}

#[async_trait]
impl IdentityAdapter for ClerkIdentity {
    async fn get_user(&self, user_id: &str) -> Result<IdentityUser, LessonflowError> {
        let url = format!("{}/users/{user_id}", self.base_url);
        let response = self.client.get(&url).send().await.map_err(request_failed)?;
        check_status(response.status(), user_id)?;
        let user: ClerkUser = response.json().await.map_err(|e| LessonflowError::Provider {
            message: format!("failed to parse identity user: {e}"),
            source: Some(Box::new(e)),
        })?;
        Ok(IdentityUser {
            id: user.id,
            banned: user.banned,
        })
    }

    async fn ban_user(&self, user_id: &str) -> Result<(), LessonflowError> {
        self.post_action(user_id, "ban").await
    }

    async fn unban_user(&self, user_id: &str) -> Result<(), LessonflowError> {
        self.post_action(user_id, "unban").await
    }
}
