//! Environment manager: build artifact and per-scenario workspaces.
//!
//! Scenarios run one at a time. Each gets a fresh temporary directory that
//! becomes the process working directory until teardown. Because the working
//! directory is process-wide state, a [`Workspace`] holds a global lock for
//! its whole lifetime, so a second workspace cannot be created while one is
//! active, even from another test thread.

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Mutex, MutexGuard, OnceLock};

use fs2::FileExt;
use tempfile::TempDir;

use crate::config::HarnessConfig;
use crate::error::{HarnessError, HarnessResult};

fn workspace_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

/// Builds the binary under test if its artifact is missing.
///
/// Outcomes are remembered per executable path for the life of the process.
/// The call that attempts a build gets its error as is; later calls for the
/// same executable get [`HarnessError::BinaryUnavailable`] carrying its
/// message. See [`build_if_missing`] for the cross-process locking.
pub fn ensure_built(config: &HarnessConfig) -> HarnessResult<PathBuf> {
    type Memo = Mutex<BTreeMap<PathBuf, Result<PathBuf, String>>>;
    static BUILT: OnceLock<Memo> = OnceLock::new();

    // Held across the build, so one executable is never built twice here.
    let mut built = BUILT
        .get_or_init(Memo::default)
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(outcome) = built.get(&config.executable) {
        return outcome
            .clone()
            .map_err(|message| HarnessError::BinaryUnavailable { message });
    }

    let outcome = build_if_missing(config);
    built.insert(
        config.executable.clone(),
        match &outcome {
            Ok(path) => Ok(path.clone()),
            Err(err) => Err(err.to_string()),
        },
    );
    outcome
}

/// Lock file serializing builds of the project at `config.project_root`.
///
/// It lives in the system temp directory, named after a BLAKE3 digest of the
/// project root, so the project tree is left untouched.
pub fn build_lock_path(config: &HarnessConfig) -> PathBuf {
    let root = config
        .project_root
        .canonicalize()
        .unwrap_or_else(|_| config.project_root.clone());
    let digest = blake3::hash(root.as_os_str().as_encoded_bytes()).to_hex();
    let name = format!("tagutil-build-{}.lock", &digest.as_str()[..16]);
    std::env::temp_dir().join(name)
}

/// Builds the binary under test if its artifact is missing, without
/// memoizing the outcome.
///
/// While checking and building it holds an exclusive lock on
/// [`build_lock_path`], so concurrent test binaries never build twice.
pub fn build_if_missing(config: &HarnessConfig) -> HarnessResult<PathBuf> {
    let executable = &config.executable;
    if executable.exists() {
        return Ok(executable.clone());
    }

    let lock_path = build_lock_path(config);
    let lock = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_path)?;
    lock.lock_exclusive()?;

    // Another process may have built while we waited for the lock.
    let outcome = if executable.exists() {
        Ok(executable.clone())
    } else {
        run_build(config)
    };

    let _ = lock.unlock();
    outcome
}

fn run_build(config: &HarnessConfig) -> HarnessResult<PathBuf> {
    let program = which::which(&config.build_program).map_err(|_| {
        HarnessError::BuildToolNotFound {
            program: config.build_program.clone(),
        }
    })?;

    tracing::info!(command = %config.build_command_line(), "building binary under test");
    let status = Command::new(&program)
        .args(&config.build_args)
        .current_dir(&config.project_root)
        .status()
        .map_err(|e| HarnessError::spawn_failed(config.build_program.clone(), e))?;

    if !status.success() {
        tracing::warn!(code = ?status.code(), "build failed");
        return Err(HarnessError::BuildFailed {
            command: config.build_command_line(),
            exit_code: status.code(),
        });
    }
    if !config.executable.exists() {
        return Err(HarnessError::ArtifactMissing {
            path: config.executable.clone(),
        });
    }
    Ok(config.executable.clone())
}

/// An isolated working directory for one scenario.
///
/// Creating it changes the process working directory; dropping it (or
/// calling [`teardown`](Self::teardown)) restores the previous one and
/// removes the directory with everything in it.
pub struct Workspace {
    dir: Option<TempDir>,
    path: PathBuf,
    previous_cwd: Option<PathBuf>,
    _guard: MutexGuard<'static, ()>,
}

impl Workspace {
    /// Creates a fresh uniquely named directory and makes it the working
    /// directory.
    ///
    /// Blocks while another workspace is active.
    pub fn setup() -> HarnessResult<Self> {
        // A scenario that panicked poisons the lock; its workspace was still
        // torn down on unwind, so the lock is safe to reuse.
        let guard = workspace_lock()
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let dir = tempfile::Builder::new().prefix("tagutil-scenario-").tempdir()?;
        let path = dir.path().canonicalize()?;
        let previous_cwd = std::env::current_dir().ok();
        std::env::set_current_dir(&path)?;

        tracing::debug!(path = %path.display(), "workspace created");
        Ok(Self {
            dir: Some(dir),
            path,
            previous_cwd,
            _guard: guard,
        })
    }

    /// Workspace directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of `name` inside the workspace.
    pub fn join(&self, name: impl AsRef<Path>) -> PathBuf {
        self.path.join(name)
    }

    /// Restores the previous working directory and removes the workspace.
    ///
    /// Files already removed by the scenario are not an error.
    pub fn teardown(mut self) -> HarnessResult<()> {
        self.cleanup()
    }

    fn cleanup(&mut self) -> HarnessResult<()> {
        if let Some(previous) = self.previous_cwd.take() {
            if let Err(e) = std::env::set_current_dir(&previous) {
                tracing::warn!(path = %previous.display(), "could not restore cwd: {}", e);
            }
        }
        let Some(dir) = self.dir.take() else {
            return Ok(());
        };
        match dir.close() {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        tracing::debug!(path = %self.path.display(), "workspace removed");
        Ok(())
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Err(e) = self.cleanup() {
            tracing::warn!(path = %self.path.display(), "workspace cleanup failed: {}", e);
        }
    }
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_lifecycle() {
        let workspace = Workspace::setup().unwrap();
        let path = workspace.path().to_path_buf();
        assert!(path.is_dir());
        assert_eq!(std::env::current_dir().unwrap().canonicalize().unwrap(), path);

        std::fs::write(workspace.join("scratch.txt"), "x").unwrap();
        workspace.teardown().unwrap();
        assert!(!path.exists());
        assert_ne!(std::env::current_dir().unwrap(), path);
    }

    #[test]
    fn test_teardown_tolerates_missing_directory() {
        let workspace = Workspace::setup().unwrap();
        let path = workspace.path().to_path_buf();
        std::env::set_current_dir(std::env::temp_dir()).unwrap();
        std::fs::remove_dir_all(&path).unwrap();
        workspace.teardown().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_workspace_removed_on_panic() {
        let path = std::panic::catch_unwind(|| {
            let workspace = Workspace::setup().unwrap();
            let path = workspace.path().to_path_buf();
            std::panic::panic_any(path);
        })
        .unwrap_err()
        .downcast::<PathBuf>()
        .unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_existing_artifact_skips_build() {
        let dir = TempDir::new().unwrap();
        let exe = dir.path().join("tagutil");
        std::fs::write(&exe, "").unwrap();
        let config = HarnessConfig::with_project_root(dir.path())
            .executable(&exe)
            .build_command("definitely-not-a-build-tool", Vec::<String>::new());
        assert_eq!(build_if_missing(&config).unwrap(), exe);
    }

    #[test]
    fn test_missing_build_tool_is_fatal() {
        let dir = TempDir::new().unwrap();
        let config = HarnessConfig::with_project_root(dir.path())
            .build_command("definitely-not-a-build-tool", Vec::<String>::new());
        let err = build_if_missing(&config).unwrap_err();
        assert!(matches!(err, HarnessError::BuildToolNotFound { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_build_leaves_project_root_untouched() {
        let dir = TempDir::new().unwrap();
        let config = HarnessConfig::with_project_root(dir.path())
            .build_command("definitely-not-a-build-tool", Vec::<String>::new());
        assert!(build_if_missing(&config).is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);

        let lock = build_lock_path(&config);
        assert!(lock.starts_with(std::env::temp_dir()));
        assert!(!lock.starts_with(dir.path()));
    }

    #[test]
    fn test_build_lock_is_per_project() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        let lock_a = build_lock_path(&HarnessConfig::with_project_root(a.path()));
        let lock_b = build_lock_path(&HarnessConfig::with_project_root(b.path()));
        assert_ne!(lock_a, lock_b);
        assert_eq!(
            lock_a,
            build_lock_path(&HarnessConfig::with_project_root(a.path()))
        );
    }

    #[test]
    fn test_ensure_built_remembers_each_executable() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        let exe_a = a.path().join("tagutil");
        let exe_b = b.path().join("tagutil");
        std::fs::write(&exe_a, "").unwrap();
        std::fs::write(&exe_b, "").unwrap();

        let config_a = HarnessConfig::with_project_root(a.path()).executable(&exe_a);
        let config_b = HarnessConfig::with_project_root(b.path()).executable(&exe_b);
        assert_eq!(ensure_built(&config_a).unwrap(), exe_a);
        assert_eq!(ensure_built(&config_b).unwrap(), exe_b);
        assert_eq!(ensure_built(&config_a).unwrap(), exe_a);
    }

    #[test]
    fn test_ensure_built_reports_the_build_error_first() {
        let dir = TempDir::new().unwrap();
        let config = HarnessConfig::with_project_root(dir.path())
            .build_command("definitely-not-a-build-tool", Vec::<String>::new());

        let first = ensure_built(&config).unwrap_err();
        assert!(matches!(
            first,
            HarnessError::BuildToolNotFound { ref program } if program == "definitely-not-a-build-tool"
        ));

        let second = ensure_built(&config).unwrap_err();
        assert!(matches!(
            second,
            HarnessError::BinaryUnavailable { ref message } if *message == first.to_string()
        ));
        assert!(second.is_fatal());
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_build_is_fatal() {
        let dir = TempDir::new().unwrap();
        let config = HarnessConfig::with_project_root(dir.path())
            .build_command("false", Vec::<String>::new());
        let err = build_if_missing(&config).unwrap_err();
        assert!(matches!(
            err,
            HarnessError::BuildFailed {
                exit_code: Some(1),
                ..
            }
        ));
        assert!(err.is_fatal());
    }

    #[cfg(unix)]
    #[test]
    fn test_build_without_artifact() {
        let dir = TempDir::new().unwrap();
        let config = HarnessConfig::with_project_root(dir.path())
            .build_command("true", Vec::<String>::new());
        let err = build_if_missing(&config).unwrap_err();
        assert!(matches!(err, HarnessError::ArtifactMissing { .. }));
    }
}
