//! Credential loading.
//!
//! Tokens are issued out of band (web login, CI secrets) and read here
//! from the environment or `~/.stratus/auth.json`. Acquiring or refreshing
//! tokens is not this tool's concern; a missing credential simply makes
//! the session anonymous and lets the API decide what that may do.

use std::fs;
use std::path::PathBuf;

use serde::Deserialize;

use crate::config::stratus_dir;

/// Environment variable carrying an access token, preferred over the file.
pub const TOKEN_ENV: &str = "STRATUS_TOKEN";

/// Stored credentials.
///
/// Deliberately not `Debug`: a token must never end up in log output.
#[derive(Clone, Default, Deserialize)]
pub struct Credentials {
    /// Bearer token for the upstream API, if the user is logged in.
    pub token: Option<String>,
}

/// Returns the auth file path (`~/.stratus/auth.json`).
#[must_use]
pub fn auth_path() -> Option<PathBuf> {
    stratus_dir().map(|d| d.join("auth.json"))
}

/// Loads credentials from the environment, then the auth file.
///
/// A missing file is an anonymous session, not an error. Unreadable or
/// malformed files are logged and treated as anonymous too, so a corrupt
/// auth file degrades to "please log in" instead of a crash.
#[must_use]
pub fn load_credentials() -> Credentials {
    if let Ok(token) = std::env::var(TOKEN_ENV) {
        let token = token.trim();
        if !token.is_empty() {
            return Credentials {
                token: Some(token.to_string()),
            };
        }
    }

    let Some(path) = auth_path() else {
        return Credentials::default();
    };
    if !path.exists() {
        return Credentials::default();
    }

    match fs::read_to_string(&path) {
        Ok(raw) => match serde_json::from_str::<Credentials>(&raw) {
            Ok(credentials) => credentials,
            Err(e) => {
                tracing::warn!("ignoring malformed auth file {}: {}", path.display(), e);
                Credentials::default()
            }
        },
        Err(e) => {
            tracing::warn!("failed to read auth file {}: {}", path.display(), e);
            Credentials::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_auth_file_format() {
        let credentials: Credentials =
            serde_json::from_str(r#"{ "token": "tok_abc123" }"#).unwrap();
        assert_eq!(credentials.token.as_deref(), Some("tok_abc123"));
    }

    #[test]
    fn test_empty_object_is_anonymous() {
        let credentials: Credentials = serde_json::from_str("{}").unwrap();
        assert!(credentials.token.is_none());
    }

    #[test]
    fn test_default_is_anonymous() {
        assert!(Credentials::default().token.is_none());
    }
}
