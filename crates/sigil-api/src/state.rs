//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers via
//! the `State` extractor:
//!
//! - **Prover**: the Groth16 membership prover for the configured hash
//!   version. Proof generation is CPU-bound and runs on blocking threads.
//! - **Sigils**: rendered artifacts keyed by sigil id.
//! - **Remote verifier**: optional hosted verifier, always bounded by a
//!   timeout with local fallback.
//! - **Metrics**: Prometheus handle when the recorder is installed.

use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusHandle;
use parking_lot::RwLock;
use sigil_zkp::{PoseidonVersion, SigilProver};
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_PROOF_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_VERIFIER_TIMEOUT_MS: u64 = 2_000;

// -- Sigil Store --------------------------------------------------------------

/// Thread-safe, cloneable map of sigil id to rendered SVG.
///
/// The lock is `parking_lot` and never held across `.await`.
#[derive(Debug, Clone, Default)]
pub struct SigilStore {
    data: Arc<RwLock<HashMap<String, String>>>,
}

impl SigilStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a document, returning the previous one under the same id.
    pub fn insert(&self, id: impl Into<String>, svg: impl Into<String>) -> Option<String> {
        self.data.write().insert(id.into(), svg.into())
    }

    pub fn get(&self, id: &str) -> Option<String> {
        self.data.read().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.data.read().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// -- Remote Verifier ----------------------------------------------------------

pub type VerifyFuture = Pin<Box<dyn Future<Output = Result<bool, String>> + Send>>;

/// A hosted verifier consulted before the local one.
pub trait RemoteVerifier: Send + Sync {
    fn verify(&self, public_signals: Vec<String>, proof: String) -> VerifyFuture;
}

// -- Configuration ------------------------------------------------------------

#[derive(Error, Debug)]
#[error("invalid {var}={value:?}: {reason}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub reason: String,
}

/// Application configuration.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    pub hash_version: PoseidonVersion,
    /// Directory holding ceremony keys. `None` uses the seeded setup.
    pub zk_key_dir: Option<PathBuf>,
    pub proof_timeout_ms: u64,
    pub verifier_timeout_ms: u64,
}

/// Custom Debug that hides the key directory location.
impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("hash_version", &self.hash_version)
            .field(
                "zk_key_dir",
                &self.zk_key_dir.as_ref().map(|_| "[REDACTED]"),
            )
            .field("proof_timeout_ms", &self.proof_timeout_ms)
            .field("verifier_timeout_ms", &self.verifier_timeout_ms)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            hash_version: PoseidonVersion::V2,
            zk_key_dir: None,
            proof_timeout_ms: DEFAULT_PROOF_TIMEOUT_MS,
            verifier_timeout_ms: DEFAULT_VERIFIER_TIMEOUT_MS,
        }
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match lookup(var).filter(|v| !v.trim().is_empty()) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError {
            var,
            reason: e.to_string(),
            value,
        }),
    }
}

impl AppConfig {
    /// Read `PORT`, `SIGIL_HASH_VERSION`, `SIGIL_ZK_KEY_DIR`,
    /// `SIGIL_PROOF_TIMEOUT_MS` and `SIGIL_VERIFIER_TIMEOUT_MS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            port: parse_var(&lookup, "PORT", DEFAULT_PORT)?,
            hash_version: parse_var(&lookup, "SIGIL_HASH_VERSION", PoseidonVersion::V2)?,
            zk_key_dir: lookup("SIGIL_ZK_KEY_DIR")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            proof_timeout_ms: parse_var(&lookup, "SIGIL_PROOF_TIMEOUT_MS", DEFAULT_PROOF_TIMEOUT_MS)?,
            verifier_timeout_ms: parse_var(
                &lookup,
                "SIGIL_VERIFIER_TIMEOUT_MS",
                DEFAULT_VERIFIER_TIMEOUT_MS,
            )?,
        })
    }

    pub fn proof_timeout(&self) -> Duration {
        Duration::from_millis(self.proof_timeout_ms)
    }

    pub fn verifier_timeout(&self) -> Duration {
        Duration::from_millis(self.verifier_timeout_ms)
    }
}

// -- Application State --------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub prover: Arc<SigilProver>,
    pub sigils: SigilStore,
    pub remote_verifier: Option<Arc<dyn RemoteVerifier>>,
    pub metrics: Option<PrometheusHandle>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("hash_version", &self.prover.version())
            .field("sigils", &self.sigils.len())
            .field("remote_verifier", &self.remote_verifier.is_some())
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}

impl AppState {
    pub fn new(prover: Arc<SigilProver>) -> Self {
        Self::with_config(AppConfig::default(), prover)
    }

    pub fn with_config(config: AppConfig, prover: Arc<SigilProver>) -> Self {
        Self {
            config,
            prover,
            sigils: SigilStore::new(),
            remote_verifier: None,
            metrics: None,
        }
    }

    pub fn with_remote_verifier(mut self, verifier: Arc<dyn RemoteVerifier>) -> Self {
        self.remote_verifier = Some(verifier);
        self
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
