//! Extension invocation orchestration.
//!
//! Sequences the full delegation pipeline: resolve the executable, start
//! the API proxy, run the child, stop the proxy, report the exit code. The
//! proxy is stopped on every path that created it, so a long-lived parent
//! never accumulates listening sockets across invocations.

use std::path::Path;

use crate::api::ApiClient;

use super::ExtensionError;
use super::process::{self, FAILURE_EXIT_CODE, RunOutcome};
use super::proxy::ApiProxy;
use super::resolver;

/// Invokes extension `name` with `args` from `cwd` and returns the exit
/// code to report to the shell.
///
/// Resolution happens before any resource is acquired: an unknown name
/// creates no socket and no process. A child that starts and exits, with
/// whatever status, is a success carrying its exit code. A child the OS
/// refuses to start yields [`FAILURE_EXIT_CODE`] after the refusal is
/// logged.
///
/// # Errors
/// [`ExtensionError::NotFound`] when no executable matches `name`, and
/// [`ExtensionError::ProxyBind`] when the loopback listener cannot be
/// acquired. Both happen before a child process exists.
pub async fn invoke_extension(
    client: &ApiClient,
    name: &str,
    args: &[String],
    cwd: &Path,
) -> Result<i32, ExtensionError> {
    let resolved = resolver::resolve_extension(name, cwd)?;
    tracing::debug!("invoking extension: {}", resolved.path.display());

    let mut proxy = ApiProxy::start(client.clone())
        .await
        .map_err(ExtensionError::ProxyBind)?;

    let outcome = process::run(&resolved.path, args, cwd, &proxy.url()).await;

    // Teardown before the outcome is interpreted, on success and failure
    // alike. Drop would also catch it, but not any sooner.
    proxy.shutdown();

    match outcome {
        RunOutcome::Exited(code) => Ok(code),
        RunOutcome::FailedToStart(diagnostic) => {
            tracing::error!("error running extension: {}", diagnostic);
            Ok(FAILURE_EXIT_CODE)
        }
    }
}
