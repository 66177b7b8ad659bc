//! Cookie-store loading. Credential acquisition itself is an external
//! concern; this only reads what the auth provider left on disk.

use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::HarvestError;

/// One browser cookie as persisted by the auth provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CookieStore {
    cookies: Vec<Cookie>,
}

impl CookieStore {
    /// Load the persisted cookie set. A missing file is a fatal
    /// `CredentialMissing`, raised before any network activity.
    pub fn load(path: &Path) -> Result<Self, HarvestError> {
        if !path.exists() {
            return Err(HarvestError::CredentialMissing(path.display().to_string()));
        }

        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read cookie store {}", path.display()))?;
        let cookies = serde_json::from_str(&text)
            .with_context(|| format!("malformed cookie store {}", path.display()))?;

        Ok(Self { cookies })
    }

    pub fn cookies(&self) -> &[Cookie] {
        &self.cookies
    }

    /// Value of a cookie by name, used to promote the session token into
    /// an HTTP header.
    pub fn value_of(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.value.as_str())
    }
}
