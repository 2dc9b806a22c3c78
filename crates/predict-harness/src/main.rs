use clap::CommandFactory;
use clap::Parser;
use clap_complete::generate;

use predict_harness::EnvironmentError;
use predict_harness::HarnessConfig;
use predict_harness::HarnessError;
use predict_harness::commands::Cli;
use predict_harness::commands::Commands;
use predict_harness::handlers;
use predict_harness::presenter::Presenter;
use predict_harness::presenter::create_presenter;
use predict_harness::telemetry::init_tracing;
use predict_harness_common::color_init;

fn main() {
    let cli = Cli::parse();
    color_init(cli.no_color);
    let telemetry = init_tracing(if cli.verbose { "info" } else { "warn" });
    let presenter = create_presenter(&cli.effective_format());

    let code = match run(cli, presenter.as_ref()) {
        Ok(code) => code,
        Err(e) => {
            presenter.present_error(&e);
            e.exit_code()
        }
    };

    drop(telemetry);
    std::process::exit(code);
}

/// Dispatches the subcommand and returns the process exit code.
fn run(cli: Cli, presenter: &dyn Presenter) -> Result<i32, HarnessError> {
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = Cli::command();
        generate(*shell, &mut cmd, "predict-harness", &mut std::io::stdout());
        return Ok(0);
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(EnvironmentError::Runtime)?;

    match cli.command {
        Commands::Completions { .. } => unreachable!(),
        Commands::Run(args) => {
            let suite = runtime.block_on(handlers::handle_run(
                presenter,
                HarnessConfig::from_env(),
                &args,
            ))?;
            Ok(suite.exit_code())
        }
        Commands::Predict(args) => {
            runtime.block_on(handlers::handle_predict(presenter, &args))?;
            Ok(0)
        }
        Commands::List => {
            handlers::handle_list(presenter, &HarnessConfig::from_env())?;
            Ok(0)
        }
        Commands::PickPort => {
            handlers::handle_pick_port(presenter)?;
            Ok(0)
        }
    }
}
