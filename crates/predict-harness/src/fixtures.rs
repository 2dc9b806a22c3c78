//! Model exports the scenarios serve.

use std::path::Path;
use std::path::PathBuf;

use crate::config::HarnessConfig;
use crate::error::EnvironmentError;
use crate::scenario::Scenario;

pub const SESSION_BUNDLE_DIR: &str = "half_plus_two";
pub const BAD_MODEL_DIR: &str = "bad_half_plus_two";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fixtures {
    /// `half_plus_two` in the legacy bundle format.
    pub session_bundle: PathBuf,
    /// `half_plus_two` as a SavedModel.
    pub saved_model: PathBuf,
    /// A bundle the server cannot load.
    pub bad_model: PathBuf,
}

impl Fixtures {
    pub fn from_config(config: &HarnessConfig) -> Self {
        Self {
            session_bundle: config.testdata_dir.join(SESSION_BUNDLE_DIR),
            saved_model: config.saved_model_dir.clone(),
            bad_model: config.testdata_dir.join(BAD_MODEL_DIR),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Path)> {
        [
            ("session_bundle", self.session_bundle.as_path()),
            ("saved_model", self.saved_model.as_path()),
            ("bad_model", self.bad_model.as_path()),
        ]
        .into_iter()
    }

    /// Fails with the first fixture that does not exist.
    pub fn check(&self) -> Result<(), EnvironmentError> {
        self.check_where(|_| true)
    }

    /// Like [`Fixtures::check`], limited to fixtures these scenarios serve.
    pub fn check_for(&self, scenarios: &[Scenario]) -> Result<(), EnvironmentError> {
        self.check_where(|path| scenarios.iter().any(|s| s.model_path == path))
    }

    fn check_where(&self, needed: impl Fn(&Path) -> bool) -> Result<(), EnvironmentError> {
        match self
            .iter()
            .find(|(_, path)| needed(*path) && !path.exists())
        {
            Some((name, path)) => Err(EnvironmentError::FixtureNotFound {
                name,
                path: path.to_path_buf(),
            }),
            None => Ok(()),
        }
    }
}
