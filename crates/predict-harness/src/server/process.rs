use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Polite shutdown request.
    Term,
    /// Forced termination.
    Kill,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Term => "SIGTERM",
            Signal::Kill => "SIGKILL",
        }
    }
}

/// Delivers signals to a launched server by pid.
pub trait ProcessSignaller: Send + Sync {
    fn send_signal(&self, pid: u32, signal: Signal) -> io::Result<()>;
}

/// Signals the real process through the OS.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemSignaller;

#[cfg(unix)]
impl ProcessSignaller for SystemSignaller {
    fn send_signal(&self, pid: u32, signal: Signal) -> io::Result<()> {
        let pid_t: libc::pid_t = pid
            .try_into()
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "PID out of range"))?;

        let sig = match signal {
            Signal::Term => libc::SIGTERM,
            Signal::Kill => libc::SIGKILL,
        };

        // SAFETY: kill(2) has no memory-safety preconditions.
        let result = unsafe { libc::kill(pid_t, sig) };
        if result == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }
}

#[cfg(not(unix))]
impl ProcessSignaller for SystemSignaller {
    fn send_signal(&self, _pid: u32, signal: Signal) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("{} is not available on this platform", signal.as_str()),
        ))
    }
}
