//! Extension executable resolution.
//!
//! An extension invoked as `stratus <name>` must exist on disk as an
//! executable named `stratus-<name>`. Project-local installations under
//! `node_modules/.bin` are searched first so a project can pin its own
//! version of an extension; the global `PATH` is the fallback. Resolution
//! performs no side effects, so an unknown name costs nothing beyond a few
//! filesystem probes.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::project;

use super::{EXTENSION_PREFIX, ExtensionError};

/// Directory, relative to each project level, holding local executables.
pub const LOCAL_BIN_DIR: &str = "node_modules/.bin";

/// Which search location produced an executable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionOrigin {
    /// Found under a project's `node_modules/.bin`.
    Local,
    /// Found on the global command search path.
    Global,
}

/// A resolved extension executable.
#[derive(Debug, Clone)]
pub struct ResolvedExtension {
    /// Path to the executable.
    pub path: PathBuf,
    /// Which search location produced the path.
    pub origin: ExtensionOrigin,
}

/// Resolves the executable for extension `name` relative to `cwd`.
///
/// Search order, first match wins:
/// 1. `node_modules/.bin/stratus-<name>` at each directory from `cwd` up to
///    the nearest project root (lockfile directory, else manifest
///    directory).
/// 2. `stratus-<name>` on the `PATH`.
///
/// # Errors
/// Returns [`ExtensionError::NotFound`] when neither search yields an
/// executable.
pub fn resolve_extension(name: &str, cwd: &Path) -> Result<ResolvedExtension, ExtensionError> {
    resolve_extension_in(name, cwd, std::env::var_os("PATH"))
}

/// Same as [`resolve_extension`], with an explicit `PATH` value for the
/// global search so callers can pin the search locations.
pub fn resolve_extension_in(
    name: &str,
    cwd: &Path,
    search_path: Option<OsString>,
) -> Result<ResolvedExtension, ExtensionError> {
    let command = format!("{}{}", EXTENSION_PREFIX, name);

    let markers = project::scan_parent_dirs(cwd);
    if let Some(base) = markers.base_dir() {
        let filename = Path::new(LOCAL_BIN_DIR).join(&command);
        if let Some(path) = project::walk_parent_dirs(base, cwd, &filename) {
            tracing::debug!("resolved extension {} locally at {}", command, path.display());
            return Ok(ResolvedExtension {
                path,
                origin: ExtensionOrigin::Local,
            });
        }
    }

    if let Ok(path) = which::which_in(&command, search_path, cwd) {
        tracing::debug!("resolved extension {} on PATH at {}", command, path.display());
        return Ok(ResolvedExtension {
            path,
            origin: ExtensionOrigin::Global,
        });
    }

    tracing::debug!("failed to find extension command with name \"{}\"", command);
    Err(ExtensionError::NotFound(command))
}
