//! # Common Provider Utilities
//!
//! Shared REST plumbing used by every SCM provider client.
//!
//! This module reduces code duplication by providing:
//! - URL construction with per-segment percent-encoding
//! - Authentication header selection
//! - Status handling (non-2xx → [`ProviderError::Api`], 404 probes → `false`/`None`)
//! - `Link: rel="next"` pagination parsing

use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION, LINK};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::constants::USER_AGENT;
use crate::error::ProviderError;

/// How requests are authenticated
#[derive(Zeroize, ZeroizeOnDrop)]
pub(crate) enum Auth {
    /// Anonymous access
    None,
    /// `Authorization: Bearer <token>`
    Bearer(String),
    /// `Authorization: token <token>` (Gitea)
    Token(String),
    /// `PRIVATE-TOKEN: <token>` (GitLab)
    PrivateToken(String),
    /// HTTP Basic
    Basic { username: String, password: String },
}

impl Auth {
    /// Wrap a resolved token, falling back to anonymous access when it is empty
    pub(crate) fn token_or_none(token: String, wrap: fn(String) -> Auth) -> Auth {
        if token.is_empty() {
            Auth::None
        } else {
            wrap(token)
        }
    }
}

/// Thin REST client bound to one API base URL
pub(crate) struct RestClient {
    http: Client,
    base_url: Url,
    auth: Auth,
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Credentials stay out of logs
        f.debug_struct("RestClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl RestClient {
    /// Build a client for `base_url`
    ///
    /// `insecure` disables TLS certificate verification (self-signed Gitea installs).
    pub(crate) fn new(base_url: &str, auth: Auth, insecure: bool) -> Result<Self, ProviderError> {
        let base_url =
            Url::parse(base_url.trim()).map_err(|e| ProviderError::invalid_url(base_url, e))?;
        if base_url.cannot_be_a_base() {
            return Err(ProviderError::invalid_url(
                base_url.as_str(),
                "URL cannot be used as a base",
            ));
        }

        let http = Client::builder()
            .user_agent(USER_AGENT)
            .danger_accept_invalid_certs(insecure)
            .build()?;

        Ok(Self {
            http,
            base_url,
            auth,
        })
    }

    /// Base URL with `segments` appended, each percent-encoded as a single path segment
    pub(crate) fn url(&self, segments: &[&str]) -> Result<Url, ProviderError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ProviderError::invalid_url(self.base_url.as_str(), "URL cannot be a base"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, url: Url) -> RequestBuilder {
        let request = self.http.get(url).header(ACCEPT, "application/json");
        match &self.auth {
            Auth::None => request,
            Auth::Bearer(token) => request.bearer_auth(token),
            Auth::Token(token) => request.header(AUTHORIZATION, format!("token {token}")),
            Auth::PrivateToken(token) => request.header("PRIVATE-TOKEN", token.as_str()),
            Auth::Basic { username, password } => request.basic_auth(username, Some(password)),
        }
    }

    async fn send(&self, url: Url) -> Result<Response, ProviderError> {
        debug!("GET {}", url);
        Ok(self.request(url).send().await?)
    }

    /// GET `url` and decode the JSON body, returning the response headers alongside
    pub(crate) async fn get_json_with_headers<T: DeserializeOwned>(
        &self,
        url: Url,
    ) -> Result<(T, HeaderMap), ProviderError> {
        let response = check_status(self.send(url).await?).await?;
        let headers = response.headers().clone();
        let body = response.json::<T>().await?;
        Ok((body, headers))
    }

    /// GET `url` and decode the JSON body
    pub(crate) async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ProviderError> {
        self.get_json_with_headers(url).await.map(|(body, _)| body)
    }

    /// GET `url`; a 404 (or an empty 204) yields `None`
    pub(crate) async fn get_optional_json<T: DeserializeOwned>(
        &self,
        url: Url,
    ) -> Result<Option<T>, ProviderError> {
        let response = self.send(url).await?;
        match response.status() {
            StatusCode::NOT_FOUND | StatusCode::NO_CONTENT => Ok(None),
            _ => Ok(Some(check_status(response).await?.json::<T>().await?)),
        }
    }

    /// Probe `url`: 2xx is `true`, 404 is `false`, anything else is an error
    pub(crate) async fn exists(&self, url: Url) -> Result<bool, ProviderError> {
        let response = self.send(url).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        check_status(response).await.map(|_| true)
    }
}

/// Turn non-2xx responses into [`ProviderError::Api`]
async fn check_status(response: Response) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::Api { status, url, body })
}

/// Extract the `rel="next"` target of a `Link` header, resolved against `current`
pub(crate) fn next_link(headers: &HeaderMap, current: &Url) -> Option<Url> {
    let link = headers.get(LINK)?.to_str().ok()?;
    link.split(',').find_map(|part| {
        let mut pieces = part.split(';');
        let target = pieces
            .next()?
            .trim()
            .strip_prefix('<')?
            .strip_suffix('>')?;
        if pieces.any(|param| param.trim() == r#"rel="next""#) {
            current.join(target).ok()
        } else {
            None
        }
    })
}

/// Split a repository path into URL segments, dropping the trailing `/`
pub(crate) fn path_segments(path: &str) -> Vec<&str> {
    path.trim_matches('/').split('/').filter(|s| !s.is_empty()).collect()
}
