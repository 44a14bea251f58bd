//! Confluence-style REST connector.
//!
//! Implements [`RemoteContentApi`] over the `/rest/api/content` endpoints:
//!
//! | Call | Request |
//! |------|---------|
//! | `list_content` | `GET /rest/api/content?spaceKey=..&start=..&limit=..&expand=..` |
//! | `list_children` | `GET /rest/api/content/{id}/child/page?start=..&limit=..` |
//! | `get_content` | `GET /rest/api/content/{id}?expand=..` |
//!
//! # Authentication
//!
//! An already-established browser session is reused: the session value is
//! read from the environment variable named by `remote.session_env` and sent
//! as the `remote.session_cookie_name` cookie on every request. Session
//! refresh is not attempted; an expired session surfaces as HTTP errors.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::config::Config;
use crate::models::{ChildRef, ContentDetail, ContentItem, Listing};
use crate::traits::{ApiError, RemoteContentApi};

pub struct ConfluenceClient {
    base_url: String,
    cookie: String,
    client: reqwest::Client,
}

impl ConfluenceClient {
    /// Build a client from config, taking the session from the environment.
    pub fn from_config(config: &Config) -> Result<Self> {
        let session = config.session_credential()?;
        Self::new(config, &session)
    }

    pub fn new(config: &Config, session: &str) -> Result<Self> {
        let mut builder =
            reqwest::Client::builder().timeout(Duration::from_secs(config.remote.timeout_secs));
        if let Some(ref agent) = config.remote.user_agent {
            builder = builder.user_agent(agent.clone());
        }
        let client = builder.build().context("Failed to build HTTP client")?;

        tracing::info!("session cookie set");
        Ok(Self {
            base_url: config.remote.base_url.trim_end_matches('/').to_string(),
            cookie: format!("{}={}", config.remote.session_cookie_name, session),
            client,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, path);

        let resp = self
            .client
            .get(&url)
            .header(reqwest::header::COOKIE, &self.cookie)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(query)
            .send()
            .await
            .map_err(|e| ApiError::Transport {
                url: url.clone(),
                message: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let text = resp.text().await.map_err(|e| ApiError::Transport {
            url: url.clone(),
            message: e.to_string(),
        })?;

        serde_json::from_str(&text).map_err(|e| ApiError::Decode {
            url,
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl RemoteContentApi for ConfluenceClient {
    async fn list_content(
        &self,
        space_key: &str,
        start: usize,
        limit: usize,
        expand: &str,
    ) -> Result<Listing<ContentItem>, ApiError> {
        let page: Listing<ContentItem> = self
            .get_json(
                "/rest/api/content",
                &[
                    ("spaceKey", space_key.to_string()),
                    ("limit", limit.to_string()),
                    ("expand", expand.to_string()),
                    ("start", start.to_string()),
                ],
            )
            .await?;
        tracing::info!(
            start,
            fetched = page.results.len(),
            "fetched content page for space '{}'",
            space_key
        );
        Ok(page)
    }

    async fn list_children(
        &self,
        id: &str,
        start: usize,
        limit: usize,
    ) -> Result<Listing<ChildRef>, ApiError> {
        let path = format!("/rest/api/content/{}/child/page", uri_encode(id));
        self.get_json(
            &path,
            &[("limit", limit.to_string()), ("start", start.to_string())],
        )
        .await
    }

    async fn get_content(&self, id: &str, expand: &str) -> Result<ContentDetail, ApiError> {
        let path = format!("/rest/api/content/{}", uri_encode(id));
        self.get_json(&path, &[("expand", expand.to_string())])
            .await
    }
}

/// URI-encode a path segment per RFC 3986, leaving only unreserved
/// characters (`A-Z a-z 0-9 - _ . ~`) as-is.
fn uri_encode(s: &str) -> String {
    let mut result = String::new();
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(byte as char);
            }
            _ => {
                result.push_str(&format!("%{:02X}", byte));
            }
        }
    }
    result
}
