use serde_json::Value;
use serde_json::json;

use predict_harness_common::Colors;

use crate::commands::OutputFormat;
use crate::error::HarnessError;
use crate::rpc::InferenceResponse;
use crate::rpc::TensorValues;
use crate::scenario::Expect;
use crate::scenario::Scenario;
use crate::scenario::ScenarioReport;
use crate::scenario::SuiteReport;

/// Trait for presenting output to the user.
///
/// Handlers compute results; presenters decide between human-readable text
/// and JSON.
pub trait Presenter {
    fn present_suite(&self, suite: &SuiteReport);

    fn present_scenarios(&self, scenarios: &[Scenario]);

    fn present_response(&self, response: &InferenceResponse);

    fn present_port(&self, port: u16);

    /// Present an error with its suggestion.
    fn present_error(&self, error: &HarnessError);
}

/// Text presenter for human-readable output.
pub struct TextPresenter;

impl TextPresenter {
    fn present_report(&self, report: &ScenarioReport) {
        println!(
            "{} {} ({} ms)",
            Colors::verdict(report.passed),
            report.name,
            report.duration_ms
        );
        if let Some(failure) = &report.failure {
            println!("    {}", failure.message);
            println!("    {} {}", Colors::dim("Suggestion:"), failure.suggestion);
        }
        if let Some(log) = &report.server_log {
            if !report.passed {
                println!("    {} {}", Colors::dim("Server log:"), log.display());
            }
        }
        if report.port_released == Some(false) {
            println!(
                "    {} port {} still bound after termination",
                Colors::warning("Warning:"),
                report.port.unwrap_or_default()
            );
        }
    }
}

impl Presenter for TextPresenter {
    fn present_suite(&self, suite: &SuiteReport) {
        for report in &suite.scenarios {
            self.present_report(report);
        }
        let summary = format!("{} passed, {} failed", suite.passed, suite.failed);
        if suite.success() {
            println!("{}", Colors::success(&summary));
        } else {
            println!("{}", Colors::error(&summary));
        }
    }

    fn present_scenarios(&self, scenarios: &[Scenario]) {
        for scenario in scenarios {
            let expect = match scenario.expect {
                Expect::Serves => "serves",
                Expect::RejectsModel => "rejects model",
            };
            println!("{}", Colors::bold(&scenario.name));
            println!(
                "    use_saved_model={} enable_batching={} expect: {}",
                scenario.use_saved_model, scenario.enable_batching, expect
            );
            println!("    {}", Colors::dim(&scenario.model_path.display().to_string()));
        }
    }

    fn present_response(&self, response: &InferenceResponse) {
        for (name, tensor) in response.outputs() {
            println!(
                "{}: {} {:?} [{}]",
                Colors::bold(name),
                tensor.dtype(),
                tensor.shape(),
                format_values(tensor.values())
            );
        }
    }

    fn present_port(&self, port: u16) {
        println!("{}", port);
    }

    fn present_error(&self, error: &HarnessError) {
        eprintln!("{} {}", Colors::error("Error:"), error);
        eprintln!("{} {}", Colors::dim("Suggestion:"), error.suggestion());
    }
}

/// JSON presenter for machine-readable output.
pub struct JsonPresenter;

fn print_json(value: &Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_default()
    );
}

impl Presenter for JsonPresenter {
    fn present_suite(&self, suite: &SuiteReport) {
        print_json(&serde_json::to_value(suite).unwrap_or_default());
    }

    fn present_scenarios(&self, scenarios: &[Scenario]) {
        let items: Vec<Value> = scenarios
            .iter()
            .map(|s| {
                json!({
                    "name": s.name,
                    "model_path": s.model_path,
                    "use_saved_model": s.use_saved_model,
                    "enable_batching": s.enable_batching,
                    "expect": s.expect,
                })
            })
            .collect();
        print_json(&Value::Array(items));
    }

    fn present_response(&self, response: &InferenceResponse) {
        print_json(&json!({ "outputs": response.outputs() }));
    }

    fn present_port(&self, port: u16) {
        print_json(&json!({ "port": port }));
    }

    fn present_error(&self, error: &HarnessError) {
        eprintln!("{}", error.to_json());
    }
}

/// Create a presenter based on the output format.
pub fn create_presenter(format: &OutputFormat) -> Box<dyn Presenter> {
    match format {
        OutputFormat::Json => Box::new(JsonPresenter),
        OutputFormat::Text => Box::new(TextPresenter),
    }
}

pub fn format_values(values: &TensorValues) -> String {
    fn join<T: ToString>(items: &[T]) -> String {
        items
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }

    match values {
        TensorValues::Float(v) => join(v),
        TensorValues::Double(v) => join(v),
        TensorValues::Int32(v) => join(v),
        TensorValues::Int64(v) => join(v),
        TensorValues::Bool(v) => join(v),
        TensorValues::String(v) => v
            .iter()
            .map(|s| format!("{:?}", String::from_utf8_lossy(s)))
            .collect::<Vec<_>>()
            .join(", "),
        TensorValues::Unsupported => "<unsupported>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_values() {
        assert_eq!(format_values(&TensorValues::Float(vec![3.0, 0.5])), "3, 0.5");
        assert_eq!(format_values(&TensorValues::Bool(vec![true])), "true");
        assert_eq!(
            format_values(&TensorValues::String(vec![b"a".to_vec()])),
            "\"a\""
        );
        assert_eq!(format_values(&TensorValues::Unsupported), "<unsupported>");
    }

    #[test]
    fn test_create_presenter_by_format() {
        let _text = create_presenter(&OutputFormat::Text);
        let _json = create_presenter(&OutputFormat::Json);
    }
}
