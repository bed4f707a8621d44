//! Connection supplier with ordered fallback
//!
//! Candidate targets are tried strictly in configured order, each exactly
//! once per [`ConnectionSupplier::acquire`] call, and the first one that
//! connects wins. When every candidate fails, a single local fallback target
//! (an in-memory SQLite database by default) is tried and bootstrapped with
//! the products table. Only when that fails too does the caller see a
//! [`ConnectionError`], carrying the whole trial history.
//!
//! Nothing is remembered between calls: a second `acquire` starts over at the
//! first candidate. Callers that want to stay on one connection keep the
//! [`AcquiredConnection`] they were given.

use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use sqlx::{AnyConnection, Connection};
use url::Url;

use super::driver::{Driver, UnknownDriver};
use super::schema;

/// Local fallback used when none is configured
pub const DEFAULT_LOCAL_FALLBACK: &str = "sqlite::memory:";

/// Per-attempt connect timeout used when none is configured
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Name given to the local fallback target in logs and trial history
pub const LOCAL_FALLBACK_NAME: &str = "local-fallback";

/// One configured (address, credentials, driver) record
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct CandidateTarget {
    /// Identifier used in logs and trial history
    #[serde(default)]
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Driver identifier, e.g. `postgres`, `mysql`, `sqlite`
    pub driver: String,
}

impl CandidateTarget {
    pub fn new(name: impl Into<String>, url: impl Into<String>, driver: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            username: None,
            password: None,
            driver: driver.into(),
        }
    }

    /// Target whose driver is inferred from the URL scheme.
    ///
    /// An unrecognised scheme leaves the driver empty, which fails the
    /// attempt as an unavailable driver.
    pub fn from_url(name: impl Into<String>, url: impl Into<String>) -> Self {
        let url = url.into();
        let driver = Driver::from_url(&url)
            .map(|d| d.as_str().to_owned())
            .unwrap_or_default();
        Self::new(name, url, driver)
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// URL safe for logs: any embedded password is masked.
    pub fn redacted_url(&self) -> String {
        match Url::parse(&self.url) {
            Ok(mut url) => {
                if url.password().is_some() {
                    let _ = url.set_password(Some("****"));
                }
                url.to_string()
            }
            Err(_) if !self.url.contains('@') => self.url.clone(),
            Err(_) => "<unparseable url>".to_string(),
        }
    }

    /// URL handed to the driver, with configured credentials applied.
    fn connect_url(&self, driver: Driver) -> Result<String, AttemptFailure> {
        if driver.is_embedded() || (self.username.is_none() && self.password.is_none()) {
            return Ok(self.url.clone());
        }

        let mut url = Url::parse(&self.url).map_err(|e| AttemptFailure::InvalidUrl {
            reason: e.to_string(),
        })?;

        if let Some(username) = &self.username {
            url.set_username(username)
                .map_err(|_| AttemptFailure::InvalidUrl {
                    reason: "url cannot carry a username".to_string(),
                })?;
        }
        if let Some(password) = &self.password {
            url.set_password(Some(password))
                .map_err(|_| AttemptFailure::InvalidUrl {
                    reason: "url cannot carry a password".to_string(),
                })?;
        }

        Ok(url.into())
    }
}

impl fmt::Debug for CandidateTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CandidateTarget")
            .field("name", &self.name)
            .field("url", &self.redacted_url())
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "****"))
            .field("driver", &self.driver)
            .finish()
    }
}

/// Which part of the chain served (or was tried for) a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConnectionTier {
    /// Configured candidate, by 0-based position in the trial order
    Candidate { index: usize },
    /// Ephemeral in-memory store
    LocalFallback,
}

impl ConnectionTier {
    /// False when data written through this tier is lost on restart.
    pub fn is_durable(&self) -> bool {
        matches!(self, Self::Candidate { .. })
    }
}

impl fmt::Display for ConnectionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Candidate { index } => write!(f, "candidate #{}", index + 1),
            Self::LocalFallback => f.write_str("local fallback"),
        }
    }
}

/// Why a single target could not be used
#[derive(Debug, thiserror::Error)]
pub enum AttemptFailure {
    #[error("driver unavailable: {0}")]
    DriverUnavailable(#[from] UnknownDriver),

    #[error("url scheme is not served by the {driver} driver")]
    SchemeMismatch { driver: Driver },

    #[error("invalid connection url: {reason}")]
    InvalidUrl { reason: String },

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("connect failed: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("schema bootstrap failed: {0}")]
    Bootstrap(#[source] sqlx::Error),
}

/// Result of one attempt, as recorded in the trial history
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Connected { elapsed_ms: u64 },
    Failed { reason: String },
}

/// One entry of the ordered trial history
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptRecord {
    pub target: String,
    pub tier: ConnectionTier,
    pub outcome: AttemptOutcome,
}

impl AttemptRecord {
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, AttemptOutcome::Connected { .. })
    }
}

impl fmt::Display for AttemptRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            AttemptOutcome::Connected { elapsed_ms } => {
                write!(f, "{} ({}): connected in {}ms", self.target, self.tier, elapsed_ms)
            }
            AttemptOutcome::Failed { reason } => {
                write!(f, "{} ({}): {}", self.target, self.tier, reason)
            }
        }
    }
}

/// Every target, the local fallback included, failed
#[derive(Debug, thiserror::Error)]
#[error("no database target reachable after {} attempts; last failure at '{last_target}': {last}", .attempts.len())]
pub struct ConnectionError {
    /// Ordered trial history
    pub attempts: Vec<AttemptRecord>,
    pub last_target: String,
    #[source]
    pub last: AttemptFailure,
}

/// A live connection plus where it came from
pub struct AcquiredConnection {
    pub connection: AnyConnection,
    pub driver: Driver,
    /// Name of the target that connected
    pub target: String,
    pub tier: ConnectionTier,
    /// Ordered trial history, ending with the successful attempt
    pub attempts: Vec<AttemptRecord>,
}

impl fmt::Debug for AcquiredConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AcquiredConnection")
            .field("driver", &self.driver)
            .field("target", &self.target)
            .field("tier", &self.tier)
            .field("attempts", &self.attempts)
            .finish_non_exhaustive()
    }
}

/// Produces one live connection from an ordered list of targets
#[derive(Debug, Clone)]
pub struct ConnectionSupplier {
    candidates: Vec<CandidateTarget>,
    local_fallback: CandidateTarget,
    connect_timeout: Duration,
}

impl ConnectionSupplier {
    /// Build a supplier and register the compiled-in drivers.
    pub fn new(
        candidates: Vec<CandidateTarget>,
        local_fallback_url: impl Into<String>,
        connect_timeout: Duration,
    ) -> Self {
        // Idempotent; every supplier can call it.
        sqlx::any::install_default_drivers();

        Self {
            candidates,
            local_fallback: CandidateTarget::from_url(LOCAL_FALLBACK_NAME, local_fallback_url),
            connect_timeout,
        }
    }

    /// Supplier with no candidates: always serves the in-memory fallback.
    pub fn local_only() -> Self {
        Self::new(Vec::new(), DEFAULT_LOCAL_FALLBACK, DEFAULT_CONNECT_TIMEOUT)
    }

    pub fn candidates(&self) -> &[CandidateTarget] {
        &self.candidates
    }

    pub fn local_fallback(&self) -> &CandidateTarget {
        &self.local_fallback
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Acquire a connection, trying candidates in order then the local fallback.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError`] only when every candidate and the local
    /// fallback failed; it wraps the fallback's failure as its source.
    pub async fn acquire(&self) -> Result<AcquiredConnection, ConnectionError> {
        let mut attempts = Vec::with_capacity(self.candidates.len() + 1);

        for (index, target) in self.candidates.iter().enumerate() {
            let tier = ConnectionTier::Candidate { index };
            if let Ok((connection, driver)) = self.try_target(target, tier, &mut attempts).await {
                return Ok(AcquiredConnection {
                    connection,
                    driver,
                    target: target.name.clone(),
                    tier,
                    attempts,
                });
            }
        }

        if !self.candidates.is_empty() {
            tracing::warn!(
                candidates = self.candidates.len(),
                "all database candidates failed, trying local fallback"
            );
        }

        let tier = ConnectionTier::LocalFallback;
        match self.try_target(&self.local_fallback, tier, &mut attempts).await {
            Ok((connection, driver)) => {
                tracing::warn!(
                    candidate = %self.local_fallback.name,
                    url = %self.local_fallback.redacted_url(),
                    "serving from the local fallback store; data will not survive a restart"
                );
                Ok(AcquiredConnection {
                    connection,
                    driver,
                    target: self.local_fallback.name.clone(),
                    tier,
                    attempts,
                })
            }
            Err(last) => {
                let history: Vec<String> = attempts.iter().map(ToString::to_string).collect();
                tracing::error!(
                    attempts = attempts.len(),
                    history = %history.join("; "),
                    "no database target reachable"
                );
                Err(ConnectionError {
                    attempts,
                    last_target: self.local_fallback.name.clone(),
                    last,
                })
            }
        }
    }

    /// Run one attempt, log it, and append it to the history.
    async fn try_target(
        &self,
        target: &CandidateTarget,
        tier: ConnectionTier,
        attempts: &mut Vec<AttemptRecord>,
    ) -> Result<(AnyConnection, Driver), AttemptFailure> {
        tracing::info!(
            candidate = %target.name,
            %tier,
            driver = %target.driver,
            url = %target.redacted_url(),
            "connecting to database target"
        );

        let started = Instant::now();
        let bootstrap = tier == ConnectionTier::LocalFallback;
        let result = attempt(target, bootstrap, self.connect_timeout).await;

        let outcome = match &result {
            Ok(_) => {
                let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
                tracing::info!(candidate = %target.name, %tier, elapsed_ms, "database connection established");
                AttemptOutcome::Connected { elapsed_ms }
            }
            Err(e) => {
                tracing::warn!(candidate = %target.name, %tier, error = %e, "database target failed");
                AttemptOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };

        attempts.push(AttemptRecord {
            target: target.name.clone(),
            tier,
            outcome,
        });

        result
    }
}

/// Open one target: resolve its driver, check the URL, connect within the timeout.
async fn attempt(
    target: &CandidateTarget,
    bootstrap: bool,
    timeout: Duration,
) -> Result<(AnyConnection, Driver), AttemptFailure> {
    let driver: Driver = target.driver.parse()?;
    if !driver.accepts_url(&target.url) {
        return Err(AttemptFailure::SchemeMismatch { driver });
    }

    let url = target.connect_url(driver)?;
    let mut connection = tokio::time::timeout(timeout, AnyConnection::connect(&url))
        .await
        .map_err(|_| AttemptFailure::Timeout(timeout))?
        .map_err(AttemptFailure::Connect)?;

    if bootstrap {
        schema::ensure_products_table(&mut connection, driver)
            .await
            .map_err(AttemptFailure::Bootstrap)?;
    }

    Ok((connection, driver))
}
