use std::env;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::server::Readiness;

pub const DEFAULT_MODEL_NAME: &str = "default";
const DEFAULT_SETTLE_MS: u64 = 5000;
const DEFAULT_RPC_TIMEOUT_SECS: u64 = 5;
const DEFAULT_TERM_GRACE_MS: u64 = 5000;

const SERVER_BIN_UNDER_SRCDIR: &str =
    "tf_serving/tensorflow_serving/model_servers/tensorflow_model_server";
const TESTDATA_UNDER_SRCDIR: &str = "tf_serving/tensorflow_serving/servables/tensorflow/testdata";
const SAVED_MODEL_UNDER_SRCDIR: &str =
    "tf_serving/external/org_tensorflow/tensorflow/cc/saved_model/testdata/half_plus_two";

/// Where the server and fixtures live, and how long to wait for things.
#[derive(Debug, Clone, PartialEq)]
pub struct HarnessConfig {
    pub server_binary: PathBuf,
    /// Holds the `half_plus_two` bundle and the malformed `bad_half_plus_two`.
    pub testdata_dir: PathBuf,
    pub saved_model_dir: PathBuf,
    pub model_name: String,
    pub readiness: Readiness,
    pub rpc_timeout: Duration,
    pub termination_grace: Duration,
    pub server_log_dir: Option<PathBuf>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl HarnessConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source.
    ///
    /// Unparseable numbers fall back to their defaults with a warning. Paths not set
    /// explicitly are resolved under `TEST_SRCDIR`, or the working directory.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let srcdir = lookup("TEST_SRCDIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        let path = |key: &str, under_srcdir: &str| {
            lookup(key)
                .map(PathBuf::from)
                .unwrap_or_else(|| srcdir.join(under_srcdir))
        };
        let number = |key: &str, default: u64| match lookup(key) {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                warn!(variable = key, value = %raw, default, "Ignoring invalid number");
                default
            }),
            None => default,
        };

        let settle = Duration::from_millis(number("PREDICT_HARNESS_SETTLE_MS", DEFAULT_SETTLE_MS));
        let readiness = match lookup("PREDICT_HARNESS_READINESS").as_deref() {
            Some("probe") => Readiness::Probe { max_wait: settle },
            None | Some("settle") => Readiness::Settle(settle),
            Some(other) => {
                warn!(
                    variable = "PREDICT_HARNESS_READINESS",
                    value = other,
                    "Unknown readiness mode, using settle"
                );
                Readiness::Settle(settle)
            }
        };

        Self {
            server_binary: path("PREDICT_HARNESS_SERVER_BIN", SERVER_BIN_UNDER_SRCDIR),
            testdata_dir: path("PREDICT_HARNESS_TESTDATA", TESTDATA_UNDER_SRCDIR),
            saved_model_dir: path("PREDICT_HARNESS_SAVED_MODEL", SAVED_MODEL_UNDER_SRCDIR),
            model_name: lookup("PREDICT_HARNESS_MODEL_NAME")
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| DEFAULT_MODEL_NAME.to_string()),
            readiness,
            rpc_timeout: Duration::from_secs(number(
                "PREDICT_HARNESS_RPC_TIMEOUT_SECS",
                DEFAULT_RPC_TIMEOUT_SECS,
            )),
            termination_grace: Duration::from_millis(number(
                "PREDICT_HARNESS_TERM_GRACE_MS",
                DEFAULT_TERM_GRACE_MS,
            )),
            server_log_dir: lookup("PREDICT_HARNESS_SERVER_LOG_DIR")
                .filter(|dir| !dir.is_empty())
                .map(PathBuf::from),
        }
    }

    pub fn with_server_binary(mut self, path: impl Into<PathBuf>) -> Self {
        self.server_binary = path.into();
        self
    }

    pub fn with_testdata_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.testdata_dir = dir.into();
        self
    }

    pub fn with_saved_model_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.saved_model_dir = dir.into();
        self
    }

    pub fn with_model_name(mut self, name: impl Into<String>) -> Self {
        self.model_name = name.into();
        self
    }

    pub fn with_readiness(mut self, readiness: Readiness) -> Self {
        self.readiness = readiness;
        self
    }

    pub fn with_rpc_timeout(mut self, timeout: Duration) -> Self {
        self.rpc_timeout = timeout;
        self
    }

    pub fn with_termination_grace(mut self, grace: Duration) -> Self {
        self.termination_grace = grace;
        self
    }

    pub fn with_server_log_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.server_log_dir = dir;
        self
    }

    pub fn server_log_dir(&self) -> Option<&Path> {
        self.server_log_dir.as_deref()
    }
}
