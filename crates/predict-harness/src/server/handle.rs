//! Launching the model server and guaranteeing it is gone afterwards.

use std::fs::File;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::process::Child;
use std::process::Command;
use std::process::ExitStatus;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use predict_harness_common::Backoff;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::ServerConfig;
use super::process::ProcessSignaller;
use super::process::Signal;
use super::process::SystemSignaller;
use crate::error::EnvironmentError;

pub const DEFAULT_TERMINATION_GRACE: Duration = Duration::from_secs(5);

/// Where the server's stdout and stderr go.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ServerOutput {
    /// Interleaved with the harness's own output.
    #[default]
    Inherit,
    Discard,
    /// One `<label>-<uuid>.log` file per launch inside this directory.
    LogDir(PathBuf),
}

/// Starts server processes from one binary.
#[derive(Clone)]
pub struct ServerLauncher {
    binary: PathBuf,
    output: ServerOutput,
    termination_grace: Duration,
    signaller: Arc<dyn ProcessSignaller>,
}

impl std::fmt::Debug for ServerLauncher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerLauncher")
            .field("binary", &self.binary)
            .field("output", &self.output)
            .field("termination_grace", &self.termination_grace)
            .finish_non_exhaustive()
    }
}

impl ServerLauncher {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            output: ServerOutput::default(),
            termination_grace: DEFAULT_TERMINATION_GRACE,
            signaller: Arc::new(SystemSignaller),
        }
    }

    pub fn with_output(mut self, output: ServerOutput) -> Self {
        self.output = output;
        self
    }

    /// How long a server gets to exit after SIGTERM before it is killed.
    pub fn with_termination_grace(mut self, grace: Duration) -> Self {
        self.termination_grace = grace;
        self
    }

    pub fn with_signaller(mut self, signaller: Arc<dyn ProcessSignaller>) -> Self {
        self.signaller = signaller;
        self
    }

    pub fn launch(&self, config: &ServerConfig) -> Result<ServerHandle, EnvironmentError> {
        self.launch_as("server", config)
    }

    /// Starts the server; `label` names its log file when logging to a directory.
    ///
    /// Returns without waiting for the server to become ready.
    pub fn launch_as(
        &self,
        label: &str,
        config: &ServerConfig,
    ) -> Result<ServerHandle, EnvironmentError> {
        if !self.binary.is_file() {
            return Err(EnvironmentError::BinaryNotFound(self.binary.clone()));
        }

        let mut command = Command::new(&self.binary);
        command.args(config.args()).stdin(Stdio::null());

        let log_path = match &self.output {
            ServerOutput::Inherit => None,
            ServerOutput::Discard => {
                command.stdout(Stdio::null()).stderr(Stdio::null());
                None
            }
            ServerOutput::LogDir(dir) => {
                let path = dir.join(format!("{}-{}.log", label, uuid::Uuid::new_v4()));
                let (stdout, stderr) = open_log(dir, &path).map_err(|source| {
                    EnvironmentError::ServerLog {
                        path: path.clone(),
                        source,
                    }
                })?;
                command.stdout(stdout).stderr(stderr);
                Some(path)
            }
        };

        let child = command.spawn().map_err(|source| EnvironmentError::Spawn {
            binary: self.binary.clone(),
            source,
        })?;
        let pid = child.id();

        info!(
            pid,
            port = config.port(),
            command = %config.command_line(&self.binary),
            "Launched model server"
        );

        Ok(ServerHandle {
            child: Some(child),
            pid,
            config: config.clone(),
            log_path,
            exit_status: None,
            termination_grace: self.termination_grace,
            signaller: Arc::clone(&self.signaller),
        })
    }
}

fn open_log(dir: &Path, path: &Path) -> io::Result<(File, File)> {
    std::fs::create_dir_all(dir)?;
    let stdout = File::create(path)?;
    let stderr = stdout.try_clone()?;
    Ok((stdout, stderr))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminateOutcome {
    /// Termination already happened through this handle.
    NotRunning,
    /// The server exited on its own before being asked to.
    AlreadyExited(ExitStatus),
    /// Exited within the grace period after SIGTERM.
    Terminated(ExitStatus),
    /// Ignored SIGTERM and was killed.
    Killed(ExitStatus),
}

impl TerminateOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            TerminateOutcome::NotRunning => "not_running",
            TerminateOutcome::AlreadyExited(_) => "already_exited",
            TerminateOutcome::Terminated(_) => "terminated",
            TerminateOutcome::Killed(_) => "killed",
        }
    }

    pub fn status(&self) -> Option<ExitStatus> {
        match self {
            TerminateOutcome::NotRunning => None,
            TerminateOutcome::AlreadyExited(status)
            | TerminateOutcome::Terminated(status)
            | TerminateOutcome::Killed(status) => Some(*status),
        }
    }
}

/// A running (or exited but not yet reaped) server process.
///
/// Dropping the handle terminates and reaps the process, so every exit path
/// out of a scenario leaves nothing behind.
pub struct ServerHandle {
    child: Option<Child>,
    pid: u32,
    config: ServerConfig,
    log_path: Option<PathBuf>,
    exit_status: Option<ExitStatus>,
    termination_grace: Duration,
    signaller: Arc<dyn ProcessSignaller>,
}

impl std::fmt::Debug for ServerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerHandle")
            .field("pid", &self.pid)
            .field("port", &self.config.port())
            .field("running", &self.child.is_some())
            .field("log_path", &self.log_path)
            .finish_non_exhaustive()
    }
}

impl ServerHandle {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn port(&self) -> u16 {
        self.config.port()
    }

    pub fn address(&self) -> String {
        self.config.address()
    }

    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    /// Exit status if the process has exited, without blocking.
    pub fn exit_status(&mut self) -> io::Result<Option<ExitStatus>> {
        match self.child.as_mut() {
            Some(child) => child.try_wait(),
            None => Ok(self.exit_status),
        }
    }

    pub fn is_running(&mut self) -> bool {
        matches!(self.exit_status(), Ok(None)) && self.child.is_some()
    }

    /// SIGTERM, wait up to the grace period, SIGKILL, then reap.
    ///
    /// Blocks the calling thread for at most the grace period plus the final
    /// reap; async callers should run it on a blocking thread. Calling it
    /// again after it succeeded returns [`TerminateOutcome::NotRunning`].
    pub fn terminate(&mut self) -> io::Result<TerminateOutcome> {
        let Some(mut child) = self.child.take() else {
            return Ok(TerminateOutcome::NotRunning);
        };

        match stop_child(
            &mut child,
            self.signaller.as_ref(),
            self.termination_grace,
        ) {
            Ok(outcome) => {
                self.exit_status = outcome.status();
                info!(
                    pid = self.pid,
                    outcome = outcome.as_str(),
                    status = ?self.exit_status,
                    "Model server stopped"
                );
                Ok(outcome)
            }
            Err(err) => {
                warn!(pid = self.pid, error = %err, "Orderly shutdown failed, killing");
                let _ = child.kill();
                self.exit_status = child.wait().ok();
                Err(err)
            }
        }
    }
}

fn stop_child(
    child: &mut Child,
    signaller: &dyn ProcessSignaller,
    grace: Duration,
) -> io::Result<TerminateOutcome> {
    let pid = child.id();

    if let Some(status) = child.try_wait()? {
        return Ok(TerminateOutcome::AlreadyExited(status));
    }

    match signaller.send_signal(pid, Signal::Term) {
        Ok(()) => {
            debug!(pid, "Sent SIGTERM");
            for delay in Backoff::new(grace) {
                if let Some(status) = child.try_wait()? {
                    return Ok(TerminateOutcome::Terminated(status));
                }
                std::thread::sleep(delay);
            }
            if let Some(status) = child.try_wait()? {
                return Ok(TerminateOutcome::Terminated(status));
            }
            warn!(pid, grace_ms = grace.as_millis() as u64, "Server ignored SIGTERM");
        }
        Err(err) => {
            warn!(pid, error = %err, "Failed to send SIGTERM");
        }
    }

    // Can fail only if the process exited after the last try_wait; wait() reaps it either way.
    if let Err(err) = child.kill() {
        debug!(pid, error = %err, "SIGKILL not delivered");
    }
    let status = child.wait()?;
    Ok(TerminateOutcome::Killed(status))
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if self.child.is_none() {
            return;
        }
        match self.terminate() {
            Ok(outcome) => {
                debug!(pid = self.pid, outcome = outcome.as_str(), "Server cleaned up on drop");
            }
            Err(err) => {
                warn!(pid = self.pid, error = %err, "Failed to clean up server on drop");
            }
        }
    }
}
