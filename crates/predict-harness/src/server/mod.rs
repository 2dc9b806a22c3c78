//! Model server process control: command line, launch, readiness and
//! guaranteed termination.

mod config;
mod handle;
mod process;
mod readiness;

pub use config::ServerConfig;
pub use handle::ServerHandle;
pub use handle::ServerLauncher;
pub use handle::ServerOutput;
pub use handle::TerminateOutcome;
pub use process::ProcessSignaller;
pub use process::Signal;
pub use process::SystemSignaller;
pub use readiness::Readiness;
pub use readiness::ReadinessOutcome;
