#![deny(clippy::all)]

pub mod config;
pub mod error;
pub mod fixtures;
pub mod port;
pub mod rpc;
pub mod scenario;
pub mod server;
pub mod telemetry;
pub mod verify;

pub mod commands;
pub mod handlers;
pub mod presenter;

pub use config::HarnessConfig;
pub use error::EnvironmentError;
pub use error::ErrorCategory;
pub use error::HarnessError;
pub use fixtures::Fixtures;
pub use port::pick_unused_port;
pub use rpc::GrpcPredictor;
pub use rpc::InferenceRequest;
pub use rpc::InferenceResponse;
pub use rpc::MockPredictor;
pub use rpc::Predictor;
pub use rpc::RpcFailure;
pub use scenario::Scenario;
pub use scenario::ScenarioReport;
pub use scenario::ScenarioRunner;
pub use scenario::standard_scenarios;
pub use server::Readiness;
pub use server::ServerConfig;
pub use server::ServerHandle;
pub use server::ServerLauncher;
pub use server::TerminateOutcome;
pub use verify::Expectation;
pub use verify::Mismatch;

pub use handlers::HandlerResult;
