//! Shared test infrastructure for integration tests.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const STUB_SCRIPT: &str = r#"#!/bin/sh
here=$(dirname "$0")
printf '%s\n' "$*" >> "$here/calls.log"
op="$2"
if [ -f "$here/$op.err" ]; then
  cat "$here/$op.err" >&2
  exit 254
fi
if [ -f "$here/$op.json" ]; then
  cat "$here/$op.json"
else
  echo "stub: no response for $op" >&2
  exit 255
fi
"#;

/// Stub remote service: an executable that replays canned JSON responses
/// per operation and records every argv it receives. Injected into the
/// binary through `STACKCTL_AWS_COMMAND`.
pub struct StubService {
    dir: TempDir,
}

impl Default for StubService {
    fn default() -> Self {
        Self::new()
    }
}

impl StubService {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("create stub dir");
        let script = dir.path().join("aws-stub");
        fs::write(&script, STUB_SCRIPT).expect("write stub script");
        let mut perms = fs::metadata(&script).expect("stat stub script").permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&script, perms).expect("chmod stub script");
        Self { dir }
    }

    /// Canned stdout for one operation (e.g. `describe-stack-events`).
    pub fn respond(&self, op: &str, json: &str) {
        fs::write(self.dir.path().join(format!("{op}.json")), json).expect("write stub response");
    }

    /// Canned failure: the stub prints `stderr` and exits non-zero.
    pub fn fail(&self, op: &str, stderr: &str) {
        fs::write(self.dir.path().join(format!("{op}.err")), stderr).expect("write stub failure");
    }

    pub fn command(&self) -> String {
        self.dir.path().join("aws-stub").display().to_string()
    }

    /// Recorded argv lines, one per invocation.
    pub fn calls(&self) -> Vec<String> {
        fs::read_to_string(self.dir.path().join("calls.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }
}

/// Run the stackctl binary in `cwd` against the stub service.
pub fn run_stackctl(stub: &StubService, cwd: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_stackctl"))
        .args(args)
        .current_dir(cwd)
        .env("STACKCTL_AWS_COMMAND", stub.command())
        .output()
        .expect("run stackctl")
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}
