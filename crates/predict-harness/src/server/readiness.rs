use std::net::Ipv4Addr;
use std::process::ExitStatus;
use std::time::Duration;
use std::time::Instant;

use predict_harness_common::Backoff;
use tokio::net::TcpStream;
use tracing::debug;
use tracing::warn;

use super::ServerHandle;

pub const DEFAULT_SETTLE: Duration = Duration::from_secs(5);

/// How the harness decides a freshly launched server can take calls.
///
/// Neither strategy fails a scenario: a server that never comes up is
/// reported by the first Predict call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Sleep a fixed interval.
    Settle(Duration),
    /// Poll the port with TCP connects until one succeeds or `max_wait` elapses.
    Probe { max_wait: Duration },
}

impl Default for Readiness {
    fn default() -> Self {
        Readiness::Settle(DEFAULT_SETTLE)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessOutcome {
    Settled,
    Listening { after: Duration },
    /// The process exited while the harness was waiting.
    Exited(ExitStatus),
    TimedOut,
}

impl ReadinessOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadinessOutcome::Settled => "settled",
            ReadinessOutcome::Listening { .. } => "listening",
            ReadinessOutcome::Exited(_) => "exited",
            ReadinessOutcome::TimedOut => "timed_out",
        }
    }
}

impl Readiness {
    pub async fn wait(&self, server: &mut ServerHandle) -> ReadinessOutcome {
        let outcome = match *self {
            Readiness::Settle(interval) => {
                tokio::time::sleep(interval).await;
                ReadinessOutcome::Settled
            }
            Readiness::Probe { max_wait } => probe(server, max_wait).await,
        };

        match outcome {
            ReadinessOutcome::Exited(status) => {
                warn!(pid = server.pid(), %status, "Server exited before it became ready");
            }
            ReadinessOutcome::TimedOut => {
                warn!(port = server.port(), "Server port never accepted a connection");
            }
            _ => debug!(port = server.port(), outcome = outcome.as_str(), "Server ready"),
        }
        outcome
    }
}

async fn probe(server: &mut ServerHandle, max_wait: Duration) -> ReadinessOutcome {
    let started = Instant::now();
    let target = (Ipv4Addr::LOCALHOST, server.port());
    let mut delays = Backoff::new(max_wait);

    loop {
        if let Ok(Some(status)) = server.exit_status() {
            return ReadinessOutcome::Exited(status);
        }
        if TcpStream::connect(target).await.is_ok() {
            return ReadinessOutcome::Listening {
                after: started.elapsed(),
            };
        }
        match delays.next() {
            Some(delay) => tokio::time::sleep(delay).await,
            None => return ReadinessOutcome::TimedOut,
        }
    }
}
