//! Extension dispatch for the Stratus CLI.
//!
//! A subcommand the CLI does not recognize is treated as an extension and
//! delegated to a standalone executable named `stratus-<command>`. The
//! pipeline is: resolve the executable (project-local installs shadow the
//! global `PATH`), start an ephemeral loopback proxy that forwards API
//! traffic with the invoking user's credentials, spawn the extension with
//! the proxy address in its environment, wait for it to exit, then tear the
//! proxy down.

pub mod invoke;
pub mod process;
pub mod proxy;
pub mod resolver;

use std::io;

use thiserror::Error;

pub use invoke::invoke_extension;
pub use process::{FAILURE_EXIT_CODE, RunOutcome};
pub use proxy::ApiProxy;
pub use resolver::{ExtensionOrigin, ResolvedExtension, resolve_extension};

/// Prefix identifying extension executables (`stratus-<command>`).
pub const EXTENSION_PREFIX: &str = "stratus-";

/// Environment variable carrying the proxy base URL to the child process.
///
/// `STRATUS_SCOPE`, `STRATUS_DEBUG` and `STRATUS_HELP` are reserved for
/// forwarding scope and verbosity flags to extensions, and are not set yet.
pub const API_URL_ENV: &str = "STRATUS_API";

/// Errors that abort an invocation before a child process exists.
///
/// Anything that happens after the child starts is reported through
/// [`RunOutcome`] instead, so a failing extension is indistinguishable from
/// a failing built-in command at the shell level.
#[derive(Debug, Error)]
pub enum ExtensionError {
    /// No matching executable in the project or on the `PATH`.
    #[error("command \"{0}\" not found")]
    NotFound(String),

    /// The loopback listener for the API proxy could not be acquired.
    #[error("failed to start extension API proxy: {0}")]
    ProxyBind(#[source] io::Error),
}
