#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use assert_cmd::Command;
use tempfile::TempDir;

pub fn harness_cmd() -> Command {
    let mut cmd = Command::cargo_bin("predict-harness").expect("binary built");
    cmd.env_remove("PREDICT_HARNESS_LOG")
        .env_remove("PREDICT_HARNESS_SERVER_LOG_DIR")
        .env_remove("PREDICT_HARNESS_READINESS")
        .env_remove("RUST_LOG");
    cmd
}

/// A stand-in model server: a shell script that ignores its flags.
pub struct StubServer {
    pub dir: TempDir,
    pub binary: PathBuf,
}

impl StubServer {
    /// Runs until signalled, like a server that never answers RPCs.
    pub fn sleeping() -> Self {
        Self::with_body("exec sleep 30")
    }

    pub fn with_body(body: &str) -> Self {
        let dir = TempDir::new().expect("temp dir");
        let binary = dir.path().join("tensorflow_model_server");
        std::fs::write(&binary, format!("#!/bin/sh\n{}\n", body)).expect("write stub");
        std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o755))
            .expect("chmod stub");
        Self { dir, binary }
    }

    /// Creates the fixture directories the standard scenarios point at.
    pub fn with_fixtures(self) -> Self {
        for sub in [
            "testdata/half_plus_two",
            "testdata/bad_half_plus_two",
            "saved_model/half_plus_two",
        ] {
            std::fs::create_dir_all(self.dir.path().join(sub)).expect("fixture dir");
        }
        self
    }

    pub fn testdata(&self) -> PathBuf {
        self.dir.path().join("testdata")
    }

    pub fn saved_model(&self) -> PathBuf {
        self.dir.path().join("saved_model/half_plus_two")
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

pub fn pid_exists(pid: u32) -> bool {
    unsafe { libc::kill(pid as libc::pid_t, 0) == 0 }
}

/// Polls `condition` for up to five seconds.
pub fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..500 {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    false
}
