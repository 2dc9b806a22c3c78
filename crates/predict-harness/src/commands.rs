use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
pub use clap_complete::Shell;

use crate::config::HarnessConfig;
use crate::server::Readiness;

const LONG_ABOUT: &str = r#"predict-harness launches a model server binary, drives it through the
half_plus_two Predict workload over gRPC and checks the results.

Each scenario picks a free port, starts the server with one combination of
model format and batching flags, waits for it to settle, calls Predict and
terminates the server again, whether the checks passed or not.

ENVIRONMENT:
    PREDICT_HARNESS_SERVER_BIN     Model server binary
    PREDICT_HARNESS_TESTDATA       Directory with half_plus_two and bad_half_plus_two
    PREDICT_HARNESS_SAVED_MODEL    half_plus_two in SavedModel format
    PREDICT_HARNESS_SETTLE_MS      Readiness wait (default 5000)
    PREDICT_HARNESS_READINESS      settle | probe
    PREDICT_HARNESS_SERVER_LOG_DIR Capture server output per scenario
    PREDICT_HARNESS_LOG            Write harness logs to this file
    TEST_SRCDIR                    Root for the default paths above

EXAMPLES:
    predict-harness list
    predict-harness run
    predict-harness run --scenario predict_saved_model --probe
    predict-harness predict --address localhost:8500 --input x=2.0 --output y --expect 3.0"#;

#[derive(Parser)]
#[command(name = "predict-harness")]
#[command(author, version)]
#[command(about = "Integration harness for a gRPC model server's Predict endpoint")]
#[command(long_about = LONG_ABOUT)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Output as JSON (shorthand for --format json)
    #[arg(long, global = true)]
    pub json: bool,

    /// Disable colored output (also respects NO_COLOR env var)
    #[arg(
        long,
        global = true,
        env = "NO_COLOR",
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    pub no_color: bool,

    /// Log server lifecycle and RPC outcomes to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl Cli {
    /// Returns the effective output format, considering --json shorthand.
    pub fn effective_format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            self.format
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run scenarios against freshly launched servers
    #[command(long_about = r#"Run scenarios against freshly launched servers.

Runs the standard suite sequentially, or only the scenarios named with
--scenario, in the order given. Exits non-zero if any scenario failed.

EXAMPLES:
    predict-harness run
    predict-harness run --scenario bad_model_session_bundle
    predict-harness run --binary ./tensorflow_model_server --testdata ./testdata --json"#)]
    Run(RunArgs),

    /// Send one Predict request to a running server
    #[command(long_about = r#"Send one Predict request to a running server.

Inputs are float tensors given as NAME=VALUE[,VALUE...]. Without --input the
request carries x=2.0. With --expect, the first --output (default y) must
hold exactly that single float value.

EXAMPLES:
    predict-harness predict --address localhost:8500
    predict-harness predict -a localhost:8500 -i x=1,2,3
    predict-harness predict -a localhost:8500 -o y --expect 3.0"#)]
    Predict(PredictArgs),

    /// List the standard scenarios
    List,

    /// Print a local TCP port that is currently free
    #[command(name = "pick-port")]
    PickPort,

    /// Generate shell completion scripts
    #[command(
        long_about = r#"Generate shell completion scripts for bash, zsh, fish, powershell, or elvish.

EXAMPLES:
    source <(predict-harness completions bash)
    predict-harness completions zsh > /usr/local/share/zsh/site-functions/_predict-harness"#
    )]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Clone, Default, Args)]
pub struct RunArgs {
    /// Scenario to run (repeatable; default: all)
    #[arg(short, long = "scenario", value_name = "NAME")]
    pub scenarios: Vec<String>,

    /// Model server binary
    #[arg(long, value_name = "PATH")]
    pub binary: Option<PathBuf>,

    /// Directory holding half_plus_two and bad_half_plus_two
    #[arg(long, value_name = "DIR")]
    pub testdata: Option<PathBuf>,

    /// half_plus_two exported as a SavedModel
    #[arg(long, value_name = "DIR")]
    pub saved_model: Option<PathBuf>,

    /// Model name passed to the server and used in requests
    #[arg(long, value_name = "NAME")]
    pub model_name: Option<String>,

    /// How long to wait for a launched server, in milliseconds
    #[arg(long, value_name = "MS")]
    pub settle_ms: Option<u64>,

    /// Poll the port instead of sleeping the full settle time
    #[arg(long)]
    pub probe: bool,

    /// Predict call timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout_secs: Option<u64>,

    /// Write each server's output to <DIR>/<scenario>-<uuid>.log
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,
}

impl RunArgs {
    /// Layers the flags that were given over `config`.
    pub fn apply(&self, mut config: HarnessConfig) -> HarnessConfig {
        if let Some(binary) = &self.binary {
            config = config.with_server_binary(binary);
        }
        if let Some(dir) = &self.testdata {
            config = config.with_testdata_dir(dir);
        }
        if let Some(dir) = &self.saved_model {
            config = config.with_saved_model_dir(dir);
        }
        if let Some(name) = &self.model_name {
            config = config.with_model_name(name);
        }
        if let Some(dir) = &self.log_dir {
            config = config.with_server_log_dir(Some(dir.clone()));
        }
        if let Some(secs) = self.timeout_secs {
            config = config.with_rpc_timeout(Duration::from_secs(secs));
        }

        let budget = match (self.settle_ms, config.readiness) {
            (Some(ms), _) => Duration::from_millis(ms),
            (None, Readiness::Settle(d)) => d,
            (None, Readiness::Probe { max_wait }) => max_wait,
        };
        let probe = self.probe || matches!(config.readiness, Readiness::Probe { .. });
        config.with_readiness(if probe {
            Readiness::Probe { max_wait: budget }
        } else {
            Readiness::Settle(budget)
        })
    }
}

#[derive(Debug, Clone, Args)]
pub struct PredictArgs {
    /// Server address as HOST:PORT
    #[arg(short, long)]
    pub address: String,

    /// Model name in the request's model spec
    #[arg(short, long, default_value = crate::config::DEFAULT_MODEL_NAME)]
    pub model: String,

    /// Float input as NAME=VALUE[,VALUE...] (repeatable; default x=2.0)
    #[arg(short, long = "input", value_name = "NAME=VALUES", value_parser = parse_input)]
    pub inputs: Vec<InputArg>,

    /// Output to request (repeatable; default: all outputs)
    #[arg(short, long = "output", value_name = "NAME")]
    pub outputs: Vec<String>,

    /// Require the first requested output (or y) to be this single float
    #[arg(long, value_name = "VALUE")]
    pub expect: Option<f32>,

    /// Call timeout in seconds
    #[arg(long, default_value = "5")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InputArg {
    pub name: String,
    pub values: Vec<f32>,
}

pub fn parse_input(s: &str) -> Result<InputArg, String> {
    let (name, values) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", s))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing input name in '{}'", s));
    }
    let values = values
        .split(',')
        .map(|v| {
            v.trim()
                .parse::<f32>()
                .map_err(|e| format!("invalid value '{}' for {}: {}", v.trim(), name, e))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(InputArg {
        name: name.to_string(),
        values,
    })
}

#[derive(Clone, Copy, Debug, ValueEnum, Default, PartialEq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}
