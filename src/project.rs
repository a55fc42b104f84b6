//! Project root scanning.
//!
//! Extension resolution prefers executables installed inside the current
//! project over globally installed ones. The project is delimited by the
//! nearest package manifest or package-manager lockfile above the working
//! directory; this module finds those markers and walks directories between
//! the working directory and the project root. All functions here are pure
//! filesystem reads.

use std::path::{Path, PathBuf};

/// Manifest filename marking a project directory.
pub const MANIFEST_FILE: &str = "package.json";

/// Lockfile names recognized as project-root markers.
pub const LOCKFILES: &[&str] = &[
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "bun.lockb",
];

/// Nearest project markers at or above a starting directory.
#[derive(Debug, Clone, Default)]
pub struct ProjectMarkers {
    /// Closest `package.json`, if any.
    pub manifest_path: Option<PathBuf>,
    /// Closest recognized lockfile, if any.
    pub lockfile_path: Option<PathBuf>,
}

impl ProjectMarkers {
    /// Directory bounding the local-executable search.
    ///
    /// The lockfile marks the workspace root in multi-package repositories,
    /// so its directory wins over the manifest's when both exist.
    #[must_use]
    pub fn base_dir(&self) -> Option<&Path> {
        self.lockfile_path
            .as_deref()
            .or(self.manifest_path.as_deref())
            .and_then(Path::parent)
    }
}

/// Scans `start` and its ancestors for the nearest manifest and lockfile.
///
/// The two markers are tracked independently: a lockfile two levels up does
/// not hide a manifest sitting in `start` itself.
#[must_use]
pub fn scan_parent_dirs(start: &Path) -> ProjectMarkers {
    let mut markers = ProjectMarkers::default();

    for dir in start.ancestors() {
        if markers.manifest_path.is_none() {
            let candidate = dir.join(MANIFEST_FILE);
            if candidate.is_file() {
                markers.manifest_path = Some(candidate);
            }
        }

        if markers.lockfile_path.is_none() {
            for lockfile in LOCKFILES {
                let candidate = dir.join(lockfile);
                if candidate.is_file() {
                    markers.lockfile_path = Some(candidate);
                    break;
                }
            }
        }

        if markers.manifest_path.is_some() && markers.lockfile_path.is_some() {
            break;
        }
    }

    markers
}

/// Probes `<dir>/<filename>` for each directory from `start` up to `base`
/// inclusive, returning the first hit.
///
/// Returns `None` when `start` does not live under `base`, or when no level
/// has the file. Checking stops at `base`; directories above the project
/// root are never probed.
#[must_use]
pub fn walk_parent_dirs(base: &Path, start: &Path, filename: &Path) -> Option<PathBuf> {
    if !start.starts_with(base) {
        return None;
    }

    for dir in start.ancestors() {
        let candidate = dir.join(filename);
        if candidate.is_file() {
            return Some(candidate);
        }
        if dir == base {
            break;
        }
    }

    None
}
