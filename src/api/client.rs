//! Authenticated HTTP client for the Stratus REST API.
//!
//! Thin wrapper around a shared `reqwest::Client` that knows the API base
//! URL, the caller's token and the currently selected team. It hands out
//! request builders so callers keep full control over headers and bodies.
//! The extension proxy issues everything under [`TeamScope::Default`]: a
//! child process talks to the account that invoked it, not to whatever team
//! the session switched to elsewhere.

use url::Url;

use crate::auth::Credentials;
use crate::config::Config;

use super::ApiError;

/// Which account context a request is issued under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeamScope {
    /// The user's personal account. No team parameter is sent.
    Default,
    /// The team selected in configuration, when one is set.
    CurrentTeam,
}

/// Authenticated client for the upstream API.
///
/// Cheap to clone; the underlying connection pool is shared.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    token: Option<String>,
    team_id: Option<String>,
}

impl ApiClient {
    /// Creates a client from configuration and credentials.
    ///
    /// # Errors
    /// Returns [`ApiError::InvalidBaseUrl`] when the configured URL does
    /// not parse.
    pub fn new(config: &Config, credentials: &Credentials) -> Result<Self, ApiError> {
        let base_url = Url::parse(&config.api_url).map_err(|source| ApiError::InvalidBaseUrl {
            url: config.api_url.clone(),
            source,
        })?;

        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            token: credentials.token.clone(),
            team_id: config.team.clone(),
        })
    }

    /// Returns the configured API base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Whether a token is attached to outgoing requests.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Starts a request to `path_and_query` with authentication applied.
    ///
    /// `path_and_query` is appended to the base URL, so the request always
    /// targets the configured API host whatever the path looks like. Under
    /// [`TeamScope::CurrentTeam`] the selected team is appended as a
    /// `teamId` query parameter; under [`TeamScope::Default`] the query is
    /// forwarded untouched.
    ///
    /// # Errors
    /// Returns [`ApiError::InvalidRequestPath`] when the path cannot be
    /// appended to the base URL.
    pub fn request(
        &self,
        method: reqwest::Method,
        path_and_query: &str,
        scope: TeamScope,
    ) -> Result<reqwest::RequestBuilder, ApiError> {
        let url = self.request_url(path_and_query, scope)?;
        let mut builder = self.http.request(method, url);

        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }

        Ok(builder)
    }

    /// Builds the absolute URL for `path_and_query` under `scope`.
    ///
    /// The path is concatenated, not resolved as a relative reference. A
    /// reference like `//other.host/x` would re-target the request; appended
    /// to the base it stays a plain path on the API host.
    fn request_url(&self, path_and_query: &str, scope: TeamScope) -> Result<Url, ApiError> {
        let mut raw = self.base_url.as_str().trim_end_matches('/').to_string();
        if !path_and_query.starts_with('/') {
            raw.push('/');
        }
        raw.push_str(path_and_query);

        let mut url = Url::parse(&raw).map_err(|source| ApiError::InvalidRequestPath {
            path: path_and_query.to_string(),
            source,
        })?;

        if scope == TeamScope::CurrentTeam {
            if let Some(team_id) = &self.team_id {
                url.query_pairs_mut().append_pair("teamId", team_id);
            }
        }

        Ok(url)
    }
}
