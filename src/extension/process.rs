//! Extension child process execution.
//!
//! Runs a resolved extension executable with the invoker's stdio and an
//! environment that points the child at the API proxy. Any exit of a
//! started process is a normal, reportable outcome; only a refusal to
//! start is distinguished, and even that comes back as data rather than an
//! error.

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::Path;
use std::process::{ExitStatus, Stdio};

use tokio::process::Command;

use super::API_URL_ENV;

/// Exit code reported when the child could not be started, or when its
/// exit status carries neither a code nor a signal.
pub const FAILURE_EXIT_CODE: i32 = 126;

/// Outcome of running an extension process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The process started and terminated. Signal deaths on Unix are
    /// folded in as `128 + signal`, matching shell convention.
    Exited(i32),
    /// The OS refused to start the process, with the reason.
    FailedToStart(String),
}

/// Runs `path` with `args` in `cwd`, wiring the proxy address into the
/// child's environment.
///
/// stdin, stdout and stderr are inherited so the extension owns the
/// terminal while it runs; nothing is captured or rewrapped. The child
/// sees a copy of the current environment plus `STRATUS_API`; the parent's
/// own environment is never touched.
pub async fn run(path: &Path, args: &[String], cwd: &Path, proxy_url: &str) -> RunOutcome {
    let mut env: HashMap<OsString, OsString> = std::env::vars_os().collect();
    env.insert(OsString::from(API_URL_ENV), OsString::from(proxy_url));

    let status = Command::new(path)
        .args(args)
        .current_dir(cwd)
        .env_clear()
        .envs(&env)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await;

    match status {
        Ok(status) => RunOutcome::Exited(exit_code(status)),
        Err(e) => RunOutcome::FailedToStart(e.to_string()),
    }
}

/// Maps an exit status to the code reported at the CLI boundary.
///
/// A normal exit reports its own code. A Unix signal death reports
/// `128 + signal`. A status carrying neither (not expected on supported
/// platforms) reports [`FAILURE_EXIT_CODE`].
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    FAILURE_EXIT_CODE
}
