//! Service configuration
//!
//! Read once at startup from `~/.catalog/config.toml` (or an explicit path).
//! `${VAR}` references in candidate URLs, usernames, passwords and the local
//! fallback are replaced from the environment, so secrets can live in `.env`.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Deserialize;

use crate::db::{CandidateTarget, ConnectionSupplier, DEFAULT_CONNECT_TIMEOUT, DEFAULT_LOCAL_FALLBACK};

static VAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("static regex"));

/// Name given to a candidate passed with `--database-url` / `DATABASE_URL`
pub const DATABASE_URL_CANDIDATE: &str = "database-url";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config not found at {0:?}")]
    NotFound(PathBuf),

    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config (invalid TOML): {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid bind address '{value}': {source}")]
    InvalidBind {
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },
}

/// Top-level config file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub server: ServerSection,
    pub database: DatabaseSection,
}

/// `[server]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind: String,
    /// Allow any origin instead of localhost only
    pub cors_permissive: bool,
    pub request_timeout_secs: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            cors_permissive: false,
            request_timeout_secs: 30,
        }
    }
}

impl ServerSection {
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind.parse().map_err(|source| ConfigError::InvalidBind {
            value: self.bind.clone(),
            source,
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// `[database]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub connect_timeout_secs: u64,
    pub local_fallback: String,
    /// Tried in this order
    pub candidates: Vec<CandidateTarget>,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT.as_secs(),
            local_fallback: DEFAULT_LOCAL_FALLBACK.to_string(),
            candidates: Vec::new(),
        }
    }
}

impl DatabaseSection {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Put `url` ahead of every configured candidate.
    pub fn prepend_candidate(&mut self, url: impl Into<String>) {
        self.candidates
            .insert(0, CandidateTarget::from_url(DATABASE_URL_CANDIDATE, url));
    }

    pub fn supplier(&self) -> ConnectionSupplier {
        ConnectionSupplier::new(
            self.candidates.clone(),
            self.local_fallback.clone(),
            self.connect_timeout(),
        )
    }
}

impl CatalogConfig {
    /// Default location: `~/.catalog/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".catalog").join("config.toml"))
    }

    /// Load config from `path`, or from the default location.
    ///
    /// An explicit path that doesn't exist is an error. A missing default
    /// file gives the built-in defaults: no candidates, local fallback only.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match Self::default_path() {
                Some(p) => (p, false),
                None => {
                    tracing::warn!("no home directory; using default config");
                    return Ok(Self::default());
                }
            },
        };

        if !path.exists() {
            if explicit {
                return Err(ConfigError::NotFound(path));
            }
            tracing::warn!(path = %path.display(), "config not found; using defaults (local fallback only)");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;

        let config = Self::from_toml_str(&content)?;
        tracing::debug!(
            path = %path.display(),
            candidates = config.database.candidates.len(),
            "loaded config"
        );
        Ok(config)
    }

    /// Parse TOML and expand `${VAR}` from the process environment.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Self::from_toml_str_with(content, |name| std::env::var(name).ok())
    }

    fn from_toml_str_with<F>(content: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config: Self = toml::from_str(content)?;
        config.expand_variables(&lookup);
        config.name_candidates();
        Ok(config)
    }

    fn expand_variables<F>(&mut self, lookup: &F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let db = &mut self.database;
        db.local_fallback = expand_string(&db.local_fallback, lookup);

        for candidate in &mut db.candidates {
            candidate.url = expand_string(&candidate.url, lookup);
            if let Some(username) = &candidate.username {
                candidate.username = Some(expand_string(username, lookup));
            }
            if let Some(password) = &candidate.password {
                candidate.password = Some(expand_string(password, lookup));
            }
        }
    }

    /// Unnamed candidates get `candidate-N` (1-based position).
    fn name_candidates(&mut self) {
        for (i, candidate) in self.database.candidates.iter_mut().enumerate() {
            if candidate.name.trim().is_empty() {
                candidate.name = format!("candidate-{}", i + 1);
            }
        }
    }
}

/// Replace `${VAR}` references; unset variables expand to nothing.
fn expand_string<F>(s: &str, lookup: &F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    VAR_PATTERN
        .replace_all(s, |caps: &Captures| lookup(&caps[1]).unwrap_or_default())
        .into_owned()
}
