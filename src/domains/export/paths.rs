use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::domains::export::types::ExportError;
use crate::validation::sanitize_path;

/// Scratch file used to prove a directory is writable.
pub const PROBE_FILE_NAME: &str = "test_access_3478.tmp";
pub const FALLBACK_DIR_NAME: &str = "VRROutput";

/// Directory a run will write into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOutput {
    pub dir: PathBuf,
    pub redirected: bool,
}

#[derive(Debug)]
enum PrepareError {
    AccessDenied(std::io::Error),
    InUse(PathBuf),
    Io(PathBuf, std::io::Error),
}

fn is_access_denied(err: &std::io::Error) -> bool {
    err.kind() == ErrorKind::PermissionDenied
}

#[cfg(unix)]
fn probe_locked(path: &Path) -> bool {
    use std::os::unix::io::AsRawFd;

    let file = match OpenOptions::new().read(true).open(path) {
        Ok(file) => file,
        Err(_) => return false,
    };
    let fd = file.as_raw_fd();
    // SAFETY: fd belongs to `file`, which outlives both calls.
    let rc = unsafe { libc::flock(fd, libc::LOCK_EX | libc::LOCK_NB) };
    if rc == 0 {
        unsafe { libc::flock(fd, libc::LOCK_UN) };
        return false;
    }
    std::io::Error::last_os_error().kind() == ErrorKind::WouldBlock
}

#[cfg(not(unix))]
fn probe_locked(path: &Path) -> bool {
    // sharing and lock violations
    match OpenOptions::new().read(true).write(true).open(path) {
        Ok(_) => false,
        Err(e) => matches!(e.raw_os_error(), Some(32) | Some(33)),
    }
}

/// Create `dir` if needed, refuse a locked probe file, then prove the
/// directory is writable by creating and removing the probe.
fn prepare_dir(dir: &Path) -> Result<(), PrepareError> {
    if !dir.exists() {
        log::info!("Creating output directory: {}", dir.display());
    }
    fs::create_dir_all(dir).map_err(|e| {
        if is_access_denied(&e) {
            PrepareError::AccessDenied(e)
        } else {
            PrepareError::Io(dir.to_path_buf(), e)
        }
    })?;

    let probe = dir.join(PROBE_FILE_NAME);
    if probe.exists() && probe_locked(&probe) {
        return Err(PrepareError::InUse(probe));
    }

    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&probe)
        .map_err(|e| {
            if is_access_denied(&e) {
                PrepareError::AccessDenied(e)
            } else {
                PrepareError::Io(probe.clone(), e)
            }
        })?;
    file.write_all(b"probe").map_err(|e| PrepareError::Io(probe.clone(), e))?;
    drop(file);
    fs::remove_file(&probe).map_err(|e| PrepareError::Io(probe.clone(), e))?;
    Ok(())
}

fn into_export_error(dir: &Path, err: PrepareError) -> ExportError {
    match err {
        PrepareError::AccessDenied(e) => ExportError::io(dir, e),
        PrepareError::InUse(path) => ExportError::FileInUse(path.display().to_string()),
        PrepareError::Io(path, e) => ExportError::io(path, e),
    }
}

/// Where output goes: the requested directory, or the fallback directory
/// when the requested one denies access.
#[derive(Debug, Clone)]
pub struct OutputPathPolicy {
    fallback_dir: PathBuf,
}

impl OutputPathPolicy {
    pub fn new(fallback_dir: impl Into<PathBuf>) -> Self {
        Self { fallback_dir: fallback_dir.into() }
    }

    /// `VRROutput` under the user's documents folder, or home, or the
    /// working directory when neither is known.
    pub fn default_fallback_dir() -> PathBuf {
        dirs::document_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join(FALLBACK_DIR_NAME)
    }

    pub fn fallback_dir(&self) -> &Path {
        &self.fallback_dir
    }

    pub fn resolve(&self, requested: &str) -> Result<ResolvedOutput, ExportError> {
        self.resolve_with(requested, prepare_dir)
    }

    fn resolve_with<F>(&self, requested: &str, prepare: F) -> Result<ResolvedOutput, ExportError>
    where
        F: Fn(&Path) -> Result<(), PrepareError>,
    {
        let cleaned = sanitize_path(requested);
        if cleaned.is_empty() {
            return Err(ExportError::InvalidConfig("Output path is empty".to_string()));
        }
        let dir = PathBuf::from(cleaned);

        match prepare(&dir) {
            Ok(()) => Ok(ResolvedOutput { dir, redirected: false }),
            Err(PrepareError::AccessDenied(e)) => {
                log::warn!(
                    "Access denied to {} ({}), using alternative path: {}",
                    dir.display(),
                    e,
                    self.fallback_dir.display()
                );
                match prepare(&self.fallback_dir) {
                    Ok(()) => Ok(ResolvedOutput { dir: self.fallback_dir.clone(), redirected: true }),
                    Err(err) => Err(into_export_error(&self.fallback_dir, err)),
                }
            }
            Err(PrepareError::InUse(path)) => {
                log::error!("File in use: {}", path.display());
                Err(ExportError::FileInUse(path.display().to_string()))
            }
            Err(other) => Err(into_export_error(&dir, other)),
        }
    }
}
