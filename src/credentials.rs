//! Username/token storage backed by a flat YAML secrets file.
//!
//! The file maps usernames to their secrets, e.g.
//!
//! ```yaml
//! alice:
//!   token: abc123
//! ```
//!
//! Tokens are never fabricated: a token missing from the command line,
//! the file, and the interactive prompt fails the invocation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::errors::CapError;

/// Secrets stored for a single username.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserSecrets {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Manages the username/token pair for one invocation.
///
/// A token supplied at runtime (`set_token`) takes precedence over the
/// on-disk value; `save` persists the whole mapping only on request.
pub struct CredentialsManager {
    username: Option<String>,
    path: PathBuf,
    token_override: Option<String>,
    data: BTreeMap<String, UserSecrets>,
}

impl CredentialsManager {
    /// Read the secrets file if it exists. When no username is given
    /// and the file holds exactly one entry, that entry's username
    /// becomes the default.
    pub fn new(username: Option<&str>, path: &Path) -> Result<Self, CapError> {
        let mut data = BTreeMap::new();
        if path.exists() {
            let raw = fs::read_to_string(path).map_err(|e| {
                CapError::validation(format!(
                    "could not read secrets file {}: {e}",
                    path.display()
                ))
            })?;
            data = serde_yaml::from_str::<Option<BTreeMap<String, UserSecrets>>>(&raw)
                .map_err(|_| {
                    CapError::validation(format!("malformed secrets file: {}", path.display()))
                })?
                .unwrap_or_default();
        }
        let username = match username {
            Some(u) => Some(u.to_string()),
            None if data.len() == 1 => data.keys().next().cloned(),
            None => None,
        };
        Ok(CredentialsManager {
            username,
            path: path.to_path_buf(),
            token_override: None,
            data,
        })
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// The runtime override if set, otherwise the stored token.
    pub fn token(&self) -> Option<String> {
        if let Some(token) = &self.token_override {
            return Some(token.clone());
        }
        let username = self.username.as_deref()?;
        self.data.get(username).and_then(|s| s.token.clone())
    }

    /// Record a token for this invocation and mirror it into the
    /// stored mapping so a later `save` persists it.
    pub fn set_token(&mut self, token: &str) {
        self.token_override = Some(token.to_string());
        if let Some(username) = self.username.clone() {
            self.data.entry(username).or_default().token = Some(token.to_string());
        }
    }

    /// Write the whole mapping back to the secrets file.
    pub fn save(&self) -> Result<(), CapError> {
        let raw = serde_yaml::to_string(&self.data)
            .map_err(|e| CapError::validation(format!("could not serialize secrets: {e}")))?;
        fs::write(&self.path, raw).map_err(|e| {
            CapError::validation(format!(
                "could not write secrets file {}: {e}",
                self.path.display()
            ))
        })?;
        info!(path = %self.path.display(), "saved secrets");
        Ok(())
    }
}

// Redacts like `Display`; tokens must not leak into debug output.
impl fmt::Debug for CredentialsManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialsManager")
            .field("username", &self.username)
            .field("path", &self.path)
            .field("token", &self.token().map(|_| "****"))
            .finish()
    }
}

impl fmt::Display for CredentialsManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let username = self.username.as_deref().unwrap_or("-");
        let token = match self.token() {
            Some(_) => "****",
            None => "-",
        };
        write!(f, "username: {username}, token: {token}")
    }
}

/// Ask for a token on the terminal. Last resort after the command line
/// and the secrets file.
pub fn prompt_token() -> Result<String, CapError> {
    dialoguer::Password::new()
        .with_prompt("Authorization token")
        .allow_empty_password(true)
        .interact()
        .map_err(|e| CapError::validation(format!("token prompt failed: {e}")))
}
