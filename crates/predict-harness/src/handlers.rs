use std::time::Duration;

use tracing::info;

use crate::commands::PredictArgs;
use crate::commands::RunArgs;
use crate::config::HarnessConfig;
use crate::error::EnvironmentError;
use crate::error::HarnessError;
use crate::fixtures::Fixtures;
use crate::port::pick_unused_port;
use crate::presenter::Presenter;
use crate::rpc::GrpcPredictor;
use crate::rpc::InferenceRequest;
use crate::rpc::Predictor;
use crate::rpc::Tensor;
use crate::scenario::ScenarioRunner;
use crate::scenario::SuiteReport;
use crate::scenario::select_scenarios;
use crate::scenario::standard_scenarios;
use crate::verify::Expectation;
use crate::verify::INPUT_NAME;
use crate::verify::INPUT_VALUE;
use crate::verify::OUTPUT_NAME;
use crate::verify::verify_response;

pub type HandlerResult = Result<(), HarnessError>;

/// Runs the selected scenarios and presents the suite report.
///
/// Scenario failures are part of the report, not an `Err`; the caller picks
/// the exit code from it.
pub async fn handle_run(
    presenter: &dyn Presenter,
    base: HarnessConfig,
    args: &RunArgs,
) -> Result<SuiteReport, HarnessError> {
    let config = args.apply(base);
    let fixtures = Fixtures::from_config(&config);
    let scenarios = select_scenarios(standard_scenarios(&fixtures), &args.scenarios)?;

    if !config.server_binary.is_file() {
        return Err(EnvironmentError::BinaryNotFound(config.server_binary).into());
    }
    fixtures.check_for(&scenarios)?;

    info!(
        count = scenarios.len(),
        binary = %config.server_binary.display(),
        "Running scenarios"
    );
    let runner = ScenarioRunner::from_config(&config);
    let suite = runner.run_all(&scenarios).await;
    presenter.present_suite(&suite);
    Ok(suite)
}

pub async fn handle_predict(presenter: &dyn Presenter, args: &PredictArgs) -> HandlerResult {
    let request = build_request(args);
    let predictor = GrpcPredictor::new(&args.address, Duration::from_secs(args.timeout_secs))?;
    let response = predictor.predict(&request).await?;

    if let Some(value) = args.expect {
        let output = args
            .outputs
            .first()
            .map(String::as_str)
            .unwrap_or(OUTPUT_NAME);
        verify_response(&response, &Expectation::scalar_float(output, value))?;
    }

    presenter.present_response(&response);
    Ok(())
}

fn build_request(args: &PredictArgs) -> InferenceRequest {
    let mut request = InferenceRequest::new(&args.model);
    if args.inputs.is_empty() {
        request = request.with_input(INPUT_NAME, Tensor::floats(vec![INPUT_VALUE]));
    }
    for input in &args.inputs {
        request = request.with_input(&input.name, Tensor::floats(input.values.clone()));
    }
    for output in &args.outputs {
        request = request.with_output(output);
    }
    request
}

pub fn handle_list(presenter: &dyn Presenter, config: &HarnessConfig) -> HandlerResult {
    let fixtures = Fixtures::from_config(config);
    presenter.present_scenarios(&standard_scenarios(&fixtures));
    Ok(())
}

pub fn handle_pick_port(presenter: &dyn Presenter) -> HandlerResult {
    presenter.present_port(pick_unused_port()?);
    Ok(())
}
