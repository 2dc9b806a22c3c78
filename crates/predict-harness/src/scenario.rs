//! One scenario: allocate a port, launch a server, wait, verify, terminate.

use std::path::PathBuf;
use std::time::Duration;
use std::time::Instant;

use serde::Serialize;
use tracing::Instrument;
use tracing::info;
use tracing::info_span;
use tracing::warn;

use crate::config::HarnessConfig;
use crate::error::EnvironmentError;
use crate::error::HarnessError;
use crate::fixtures::Fixtures;
use crate::port::is_port_free;
use crate::port::pick_unused_port;
use crate::rpc::GrpcPredictor;
use crate::rpc::Predictor;
use crate::server::Readiness;
use crate::server::ServerConfig;
use crate::server::ServerHandle;
use crate::server::ServerLauncher;
use crate::server::ServerOutput;
use crate::verify::Expectation;
use crate::verify::canonical_request;
use crate::verify::verify_bad_model;
use crate::verify::verify_deterministic;
use crate::verify::verify_predict;

pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Expect {
    /// Predict returns `y = 3.0` for `x = 2.0`.
    Serves,
    /// Predict fails with FAILED_PRECONDITION.
    RejectsModel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub name: String,
    pub model_path: PathBuf,
    pub use_saved_model: bool,
    pub enable_batching: bool,
    pub expect: Expect,
}

impl Scenario {
    pub fn server_config(&self, port: u16, model_name: &str) -> ServerConfig {
        ServerConfig::new(port, model_name, &self.model_path)
            .with_saved_model(self.use_saved_model)
            .with_batching(self.enable_batching)
    }
}

/// The suite run against a model server build.
pub fn standard_scenarios(fixtures: &Fixtures) -> Vec<Scenario> {
    let scenario = |name: &str, model_path: &PathBuf, saved: bool, batching: bool, expect| Scenario {
        name: name.to_string(),
        model_path: model_path.clone(),
        use_saved_model: saved,
        enable_batching: batching,
        expect,
    };

    vec![
        scenario("predict_session_bundle", &fixtures.session_bundle, false, false, Expect::Serves),
        scenario(
            "predict_batching_session_bundle",
            &fixtures.session_bundle,
            false,
            true,
            Expect::Serves,
        ),
        scenario("predict_saved_model", &fixtures.saved_model, true, false, Expect::Serves),
        scenario(
            "predict_upconverted_saved_model",
            &fixtures.session_bundle,
            true,
            false,
            Expect::Serves,
        ),
        scenario("bad_model_session_bundle", &fixtures.bad_model, false, false, Expect::RejectsModel),
        scenario(
            "bad_model_upconverted_saved_model",
            &fixtures.bad_model,
            true,
            false,
            Expect::RejectsModel,
        ),
    ]
}

/// Picks scenarios by name, keeping the requested order. No names selects all.
pub fn select_scenarios(
    scenarios: Vec<Scenario>,
    names: &[String],
) -> Result<Vec<Scenario>, EnvironmentError> {
    if names.is_empty() {
        return Ok(scenarios);
    }
    names
        .iter()
        .map(|name| {
            scenarios
                .iter()
                .find(|s| &s.name == name)
                .cloned()
                .ok_or_else(|| EnvironmentError::UnknownScenario(name.clone()))
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioState {
    NotStarted,
    Launched,
    ReadyForCalls,
    Verified,
    Failed,
    Terminated,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioFailure {
    pub category: &'static str,
    pub message: String,
    pub suggestion: String,
    pub exit_code: i32,
}

impl From<&HarnessError> for ScenarioFailure {
    fn from(err: &HarnessError) -> Self {
        Self {
            category: err.category().as_str(),
            message: err.to_string(),
            suggestion: err.suggestion(),
            exit_code: err.exit_code(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioReport {
    pub name: String,
    pub passed: bool,
    /// Every state the scenario went through, in order.
    pub states: Vec<ScenarioState>,
    pub port: Option<u16>,
    pub pid: Option<u32>,
    pub readiness: Option<&'static str>,
    pub termination: Option<&'static str>,
    /// Whether the port could be bound again after termination.
    pub port_released: Option<bool>,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<ScenarioFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_log: Option<PathBuf>,
}

impl ScenarioReport {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            passed: false,
            states: vec![ScenarioState::NotStarted],
            port: None,
            pid: None,
            readiness: None,
            termination: None,
            port_released: None,
            duration_ms: 0,
            failure: None,
            server_log: None,
        }
    }

    fn transition(&mut self, state: ScenarioState) {
        info!(scenario = %self.name, ?state, "Scenario state");
        self.states.push(state);
    }

    /// Records the verdict, then the termination. A server that verified but
    /// left its port bound still fails the scenario.
    fn finish(&mut self, result: Result<(), HarnessError>, port_released: Option<bool>) {
        self.port_released = port_released;
        let result = match (result, port_released, self.port) {
            (Ok(()), Some(false), Some(port)) => {
                Err(HarnessError::from(EnvironmentError::PortNotReleased(port)))
            }
            (result, _, _) => result,
        };

        match result {
            Ok(()) => {
                self.passed = true;
                self.transition(ScenarioState::Verified);
            }
            Err(err) => {
                warn!(error = %err, category = %err.category(), "Scenario failed");
                self.failure = Some(ScenarioFailure::from(&err));
                self.transition(ScenarioState::Failed);
            }
        }
        self.transition(ScenarioState::Terminated);
    }

    pub fn state(&self) -> ScenarioState {
        self.states
            .last()
            .copied()
            .unwrap_or(ScenarioState::NotStarted)
    }

    pub fn exit_code(&self) -> i32 {
        self.failure.as_ref().map_or(0, |f| f.exit_code)
    }
}

/// Reports for a sequential run of several scenarios.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuiteReport {
    pub scenarios: Vec<ScenarioReport>,
    pub passed: usize,
    pub failed: usize,
}

impl SuiteReport {
    pub fn new(scenarios: Vec<ScenarioReport>) -> Self {
        let passed = scenarios.iter().filter(|r| r.passed).count();
        let failed = scenarios.len() - passed;
        Self {
            scenarios,
            passed,
            failed,
        }
    }

    pub fn success(&self) -> bool {
        self.failed == 0
    }

    /// Exit code of the first failed scenario, or 0.
    pub fn exit_code(&self) -> i32 {
        self.scenarios
            .iter()
            .map(ScenarioReport::exit_code)
            .find(|code| *code != 0)
            .unwrap_or(0)
    }
}

/// Runs scenarios one at a time against servers started by one launcher.
#[derive(Debug, Clone)]
pub struct ScenarioRunner {
    launcher: ServerLauncher,
    model_name: String,
    readiness: Readiness,
    rpc_timeout: Duration,
}

impl ScenarioRunner {
    pub fn new(launcher: ServerLauncher) -> Self {
        Self {
            launcher,
            model_name: crate::config::DEFAULT_MODEL_NAME.to_string(),
            readiness: Readiness::default(),
            rpc_timeout: DEFAULT_RPC_TIMEOUT,
        }
    }

    pub fn from_config(config: &HarnessConfig) -> Self {
        let output = match config.server_log_dir() {
            Some(dir) => ServerOutput::LogDir(dir.to_path_buf()),
            None => ServerOutput::Inherit,
        };
        let launcher = ServerLauncher::new(&config.server_binary)
            .with_output(output)
            .with_termination_grace(config.termination_grace);

        Self::new(launcher)
            .with_model_name(config.model_name.clone())
            .with_readiness(config.readiness)
            .with_rpc_timeout(config.rpc_timeout)
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

    pub async fn run_all(&self, scenarios: &[Scenario]) -> SuiteReport {
        let mut reports = Vec::with_capacity(scenarios.len());
        for scenario in scenarios {
            reports.push(self.run(scenario).await);
        }
        SuiteReport::new(reports)
    }

    /// Runs one scenario to completion. The server is always terminated,
    /// whatever happened before.
    pub async fn run(&self, scenario: &Scenario) -> ScenarioReport {
        let span = info_span!("scenario", name = %scenario.name);
        async {
            let started = Instant::now();
            let mut report = ScenarioReport::new(&scenario.name);
            let mut server: Option<ServerHandle> = None;

            let result = self.launch_and_verify(scenario, &mut server, &mut report).await;

            let mut port_released = None;
            if let Some(mut handle) = server.take() {
                report.server_log = handle.log_path().map(|p| p.to_path_buf());
                let port = handle.port();
                // Termination sleeps through the grace period.
                match tokio::task::spawn_blocking(move || handle.terminate()).await {
                    Ok(Ok(outcome)) => report.termination = Some(outcome.as_str()),
                    Ok(Err(err)) => warn!(error = %err, "Server termination reported an error"),
                    Err(err) => warn!(error = %err, "Server termination task failed"),
                }
                port_released = Some(is_port_free(port));
            }
            report.finish(result, port_released);

            report.duration_ms = started.elapsed().as_millis() as u64;
            report
        }
        .instrument(span)
        .await
    }

    async fn launch_and_verify(
        &self,
        scenario: &Scenario,
        server: &mut Option<ServerHandle>,
        report: &mut ScenarioReport,
    ) -> Result<(), HarnessError> {
        let port = pick_unused_port()?;
        report.port = Some(port);

        let config = scenario.server_config(port, &self.model_name);
        let handle = server.insert(self.launcher.launch_as(&scenario.name, &config)?);
        report.pid = Some(handle.pid());
        report.transition(ScenarioState::Launched);

        let readiness = self.readiness.wait(handle).await;
        report.readiness = Some(readiness.as_str());
        report.transition(ScenarioState::ReadyForCalls);

        let predictor = GrpcPredictor::new(handle.address(), self.rpc_timeout)?;
        exercise(&predictor, scenario.expect, &self.model_name).await
    }
}

/// The calls a scenario makes once its server is up.
///
/// A serving model must answer both request shapes and answer the same
/// request identically twice. A malformed model must be refused.
pub async fn exercise(
    predictor: &dyn Predictor,
    expect: Expect,
    model_name: &str,
) -> Result<(), HarnessError> {
    match expect {
        Expect::Serves => {
            let expected = Expectation::half_plus_two();
            verify_predict(predictor, model_name, true, &expected).await?;
            verify_predict(predictor, model_name, false, &expected).await?;
            verify_deterministic(predictor, &canonical_request(model_name, true)).await
        }
        Expect::RejectsModel => verify_bad_model(predictor, model_name).await.map(|_| ()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use crate::rpc::MockPredictor;
    use crate::rpc::RpcFailure;
    use predict_harness_proto::Code;

    fn fixtures() -> Fixtures {
        Fixtures {
            session_bundle: PathBuf::from("/data/half_plus_two"),
            saved_model: PathBuf::from("/saved/half_plus_two"),
            bad_model: PathBuf::from("/data/bad_half_plus_two"),
        }
    }

    #[test]
    fn test_standard_scenarios_cover_the_suite() {
        let scenarios = standard_scenarios(&fixtures());
        let names: Vec<_> = scenarios.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "predict_session_bundle",
                "predict_batching_session_bundle",
                "predict_saved_model",
                "predict_upconverted_saved_model",
                "bad_model_session_bundle",
                "bad_model_upconverted_saved_model",
            ]
        );
        assert_eq!(
            scenarios
                .iter()
                .filter(|s| s.expect == Expect::RejectsModel)
                .count(),
            2
        );
    }

    #[test]
    fn test_upconverted_scenario_serves_bundle_as_saved_model() {
        let scenarios = standard_scenarios(&fixtures());
        let upconverted = scenarios
            .iter()
            .find(|s| s.name == "predict_upconverted_saved_model")
            .unwrap();
        assert_eq!(upconverted.model_path, PathBuf::from("/data/half_plus_two"));
        assert!(upconverted.use_saved_model);
        assert!(!upconverted.enable_batching);
    }

    #[test]
    fn test_server_config_from_scenario() {
        let scenarios = standard_scenarios(&fixtures());
        let config = scenarios[1].server_config(8500, "default");
        assert_eq!(config.port(), 8500);
        assert_eq!(config.model_name(), "default");
        assert!(config.enable_batching());
        assert!(!config.use_saved_model());
    }

    #[test]
    fn test_select_scenarios() {
        let all = standard_scenarios(&fixtures());
        assert_eq!(select_scenarios(all.clone(), &[]).unwrap().len(), 6);

        let picked = select_scenarios(
            all.clone(),
            &["predict_saved_model".to_string(), "bad_model_session_bundle".to_string()],
        )
        .unwrap();
        assert_eq!(picked[0].name, "predict_saved_model");
        assert_eq!(picked[1].name, "bad_model_session_bundle");

        let err = select_scenarios(all, &["nope".to_string()]).unwrap_err();
        assert!(matches!(err, EnvironmentError::UnknownScenario(name) if name == "nope"));
    }

    #[tokio::test]
    async fn test_exercise_serving_model_makes_four_calls() {
        let mock = MockPredictor::half_plus_two();
        exercise(&mock, Expect::Serves, "default").await.unwrap();
        assert_eq!(mock.call_count(), 4);
        assert!(mock.calls().iter().all(|c| c.model_name() == "default"));
    }

    #[tokio::test]
    async fn test_exercise_serving_model_refused() {
        let mock = MockPredictor::failing(RpcFailure::new(Code::FailedPrecondition, "bad"));
        let err = exercise(&mock, Expect::Serves, "default").await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Model);
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_exercise_bad_model() {
        let mock = MockPredictor::failing(RpcFailure::new(Code::FailedPrecondition, "bad"));
        exercise(&mock, Expect::RejectsModel, "default").await.unwrap();

        let serving = MockPredictor::half_plus_two();
        let err = exercise(&serving, Expect::RejectsModel, "default")
            .await
            .unwrap_err();
        assert!(matches!(err, HarnessError::UnexpectedSuccess { .. }));
    }

    #[tokio::test]
    async fn test_missing_binary_fails_as_environment() {
        let runner = ScenarioRunner::new(ServerLauncher::new("/nonexistent/model_server"))
            .with_readiness(Readiness::Settle(Duration::ZERO));
        let report = runner.run(&standard_scenarios(&fixtures())[0]).await;

        assert!(!report.passed);
        assert_eq!(
            report.states,
            vec![
                ScenarioState::NotStarted,
                ScenarioState::Failed,
                ScenarioState::Terminated
            ]
        );
        let failure = report.failure.as_ref().unwrap();
        assert_eq!(failure.category, "environment");
        assert_eq!(report.exit_code(), 78);
        assert_eq!(report.termination, None);
    }

    #[test]
    fn test_verified_scenario_fails_when_port_stays_bound() {
        let mut report = ScenarioReport::new("predict_session_bundle");
        report.port = Some(8500);
        report.finish(Ok(()), Some(false));

        assert!(!report.passed);
        assert_eq!(report.port_released, Some(false));
        assert_eq!(
            report.states,
            vec![
                ScenarioState::NotStarted,
                ScenarioState::Failed,
                ScenarioState::Terminated
            ]
        );
        assert_eq!(report.exit_code(), 78);
        assert!(report.failure.unwrap().message.contains("8500"));
    }

    #[test]
    fn test_released_port_keeps_verdict() {
        let mut report = ScenarioReport::new("predict_session_bundle");
        report.port = Some(8500);
        report.finish(Ok(()), Some(true));
        assert!(report.passed);
        assert_eq!(report.exit_code(), 0);
        assert_eq!(report.state(), ScenarioState::Terminated);

        let mut failed = ScenarioReport::new("bad_model_session_bundle");
        failed.port = Some(8501);
        let err = HarnessError::from(RpcFailure::new(Code::Unavailable, "refused"));
        failed.finish(Err(err), Some(false));
        assert_eq!(failed.failure.unwrap().category, "transport");
    }

    #[test]
    fn test_suite_report_counts() {
        let mut ok = ScenarioReport::new("a");
        ok.passed = true;
        let mut bad = ScenarioReport::new("b");
        bad.failure = Some(ScenarioFailure {
            category: "transport",
            message: "Transport failure".to_string(),
            suggestion: String::new(),
            exit_code: 75,
        });

        let suite = SuiteReport::new(vec![ok, bad]);
        assert_eq!(suite.passed, 1);
        assert_eq!(suite.failed, 1);
        assert!(!suite.success());
        assert_eq!(suite.exit_code(), 75);
    }

    #[test]
    fn test_report_serializes_states_snake_case() {
        let report = ScenarioReport::new("predict_saved_model");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["states"][0], "not_started");
        assert!(json.get("failure").is_none());
    }
}
