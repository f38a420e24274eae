// Copyright 2025 Cosmonic.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Tag listing against an OCI distribution registry.
//!
//! Anonymous pulls on ghcr.io still need a bearer token: the first request
//! answers `401` with a `WWW-Authenticate` challenge naming the token realm.

use crate::infrastructure::constants::REGISTRY_HOST;
use crate::shared::error::{CosmoError, Result};
use backon::{ExponentialBuilder, Retryable};
use reqwest::header::{HeaderMap, LINK, WWW_AUTHENTICATE};
use reqwest::{Response, StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[async_trait::async_trait]
pub trait TagSource: Send + Sync {
    /// Every tag of `repository` (e.g. `cosmonic/cosmonic-control`)
    async fn list_tags(&self, repository: &str) -> Result<Vec<String>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerChallenge {
    pub realm: String,
    pub service: Option<String>,
    pub scope: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TagList {
    #[serde(default)]
    tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
}

pub struct OciRegistryClient {
    http: reqwest::Client,
    base_url: Url,
}

impl OciRegistryClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(&format!("https://{}", REGISTRY_HOST))
    }

    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(registry_error)?;
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("kubectl-cosmo/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(registry_error)?;
        Ok(Self { http, base_url })
    }

    async fn get(&self, url: &Url, token: Option<&str>) -> Result<Response> {
        let send = || async {
            let mut request = self.http.get(url.clone());
            if let Some(token) = token {
                request = request.bearer_auth(token);
            }
            let response = request.send().await?;
            if response.status().is_server_error() {
                response.error_for_status_ref()?;
            }
            Ok::<_, reqwest::Error>(response)
        };

        send.retry(ExponentialBuilder::default().with_max_times(3))
            .when(is_transient)
            .notify(|e: &reqwest::Error, delay| {
                debug!(%url, error = %e, ?delay, "Retrying registry request")
            })
            .await
            .map_err(registry_error)
    }

    async fn fetch_token(&self, challenge: &BearerChallenge) -> Result<String> {
        let mut params = Vec::new();
        if let Some(service) = &challenge.service {
            params.push(("service", service.as_str()));
        }
        if let Some(scope) = &challenge.scope {
            params.push(("scope", scope.as_str()));
        }
        let url = Url::parse_with_params(&challenge.realm, &params).map_err(registry_error)?;

        let response = self.get(&url, None).await?;
        if !response.status().is_success() {
            return Err(CosmoError::Registry(format!(
                "token request to {} returned {}",
                challenge.realm,
                response.status()
            )));
        }

        let body: TokenResponse = response.json().await.map_err(registry_error)?;
        body.token
            .or(body.access_token)
            .ok_or_else(|| CosmoError::Registry("token response carried no token".to_string()))
    }
}

#[async_trait::async_trait]
impl TagSource for OciRegistryClient {
    async fn list_tags(&self, repository: &str) -> Result<Vec<String>> {
        let mut url = self
            .base_url
            .join(&format!("/v2/{}/tags/list", repository))
            .map_err(registry_error)?;
        let mut token: Option<String> = None;
        let mut tags = Vec::new();

        loop {
            let response = self.get(&url, token.as_deref()).await?;

            match response.status() {
                StatusCode::UNAUTHORIZED if token.is_none() => {
                    let challenge = response
                        .headers()
                        .get(WWW_AUTHENTICATE)
                        .and_then(|value| value.to_str().ok())
                        .and_then(parse_bearer_challenge)
                        .ok_or_else(|| {
                            CosmoError::Registry(format!(
                                "{} requires authentication without a bearer challenge",
                                url
                            ))
                        })?;
                    debug!(realm = %challenge.realm, "Fetching anonymous registry token");
                    token = Some(self.fetch_token(&challenge).await?);
                    continue;
                }
                StatusCode::NOT_FOUND => {
                    return Err(CosmoError::NoTags {
                        repository: repository.to_string(),
                    })
                }
                status if !status.is_success() => {
                    return Err(CosmoError::Registry(format!(
                        "listing tags of {} returned {}",
                        repository, status
                    )))
                }
                _ => {}
            }

            let next = next_link(response.headers());
            let page: TagList = response.json().await.map_err(registry_error)?;
            tags.extend(page.tags.unwrap_or_default());

            match next {
                Some(link) => url = self.base_url.join(&link).map_err(registry_error)?,
                None => break,
            }
        }

        debug!(repository, count = tags.len(), "Listed registry tags");
        if tags.is_empty() {
            return Err(CosmoError::NoTags {
                repository: repository.to_string(),
            });
        }
        Ok(tags)
    }
}

fn registry_error(e: impl std::fmt::Display) -> CosmoError {
    CosmoError::Registry(e.to_string())
}

fn is_transient(e: &reqwest::Error) -> bool {
    e.is_connect() || e.is_timeout() || e.status().is_some_and(|s| s.is_server_error())
}

/// Parse `Bearer realm="…",service="…",scope="…"`.
pub fn parse_bearer_challenge(header: &str) -> Option<BearerChallenge> {
    let (scheme, params) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let mut realm = None;
    let mut service = None;
    let mut scope = None;

    for param in split_params(params) {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"').to_string();
        match key.trim().to_ascii_lowercase().as_str() {
            "realm" => realm = Some(value),
            "service" => service = Some(value),
            "scope" => scope = Some(value),
            _ => {}
        }
    }

    Some(BearerChallenge {
        realm: realm?,
        service,
        scope,
    })
}

// Commas inside quoted values (multi-action scopes) do not separate params.
fn split_params(params: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;

    for (i, c) in params.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                parts.push(&params[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&params[start..]);
    parts
}

/// Target of the `rel="next"` entry of a `Link` header
pub fn next_link(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(LINK)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .find_map(|entry| {
            let (target, rest) = entry.trim().split_once(';')?;
            let is_next = rest
                .split(';')
                .any(|attr| attr.trim().replace(' ', "") == "rel=\"next\"");
            is_next.then(|| {
                target
                    .trim()
                    .trim_start_matches('<')
                    .trim_end_matches('>')
                    .to_string()
            })
        })
}
