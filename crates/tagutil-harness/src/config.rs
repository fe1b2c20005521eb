//! Harness configuration.
//!
//! Defaults point at a tagutil checkout sitting at the workspace root
//! (`build/tagutil`, built with `make`). Every path can be overridden through
//! the environment, see [`HarnessConfig::from_env`].

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Overrides the tagutil project root (build directory and `make -C` target).
pub const PROJECT_ROOT_VAR: &str = "TAGUTIL_PROJECT_ROOT";
/// Overrides the path of the binary under test.
pub const EXECUTABLE_VAR: &str = "TAGUTIL_EXECUTABLE";
/// Overrides the build command, split on whitespace.
pub const BUILD_COMMAND_VAR: &str = "TAGUTIL_BUILD_COMMAND";
/// Overrides the fixture directory.
pub const FIXTURES_DIR_VAR: &str = "TAGUTIL_FIXTURES_DIR";
/// Bounds every child process, in seconds.
pub const TIMEOUT_VAR: &str = "TAGUTIL_TIMEOUT_SECS";
/// Enables tests that drive the real tagutil binary.
pub const RUN_ACCEPTANCE_VAR: &str = "TAGUTIL_RUN_ACCEPTANCE";

/// Environment variable tagutil reads to find the user's editor.
pub const DEFAULT_EDITOR_VARIABLE: &str = "EDITOR";

/// Configuration for a harness session.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Root of the tagutil project.
    pub project_root: PathBuf,
    /// Path to the binary under test.
    pub executable: PathBuf,
    /// Build tool invoked when the executable is missing.
    pub build_program: String,
    /// Arguments to the build tool.
    pub build_args: Vec<String>,
    /// Directory holding one blank fixture per container.
    pub fixtures_dir: PathBuf,
    /// Child process timeout. `None` waits forever.
    pub timeout: Option<Duration>,
    /// Name of the editor-selection variable handed to the binary.
    pub editor_variable: String,
}

/// Root of this cargo workspace.
pub fn workspace_root() -> PathBuf {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let root = manifest_dir.join("..").join("..");
    root.canonicalize().unwrap_or(root)
}

fn default_build_args(project_root: &Path) -> Vec<String> {
    vec!["-C".to_string(), project_root.display().to_string()]
}

impl Default for HarnessConfig {
    fn default() -> Self {
        let root = workspace_root();
        Self {
            executable: root.join("build").join("tagutil"),
            build_program: "make".to_string(),
            build_args: default_build_args(&root),
            fixtures_dir: root.join("fixtures").join("tunes"),
            timeout: None,
            editor_variable: DEFAULT_EDITOR_VARIABLE.to_string(),
            project_root: root,
        }
    }
}

impl HarnessConfig {
    /// Creates a config for a tagutil project rooted at `project_root`.
    ///
    /// The executable and build command follow the root; the fixture
    /// directory stays the one shipped with this workspace.
    pub fn with_project_root(project_root: impl Into<PathBuf>) -> Self {
        let project_root = project_root.into();
        Self {
            executable: project_root.join("build").join("tagutil"),
            build_args: default_build_args(&project_root),
            project_root,
            ..Default::default()
        }
    }

    /// Default config with every override from the environment applied.
    pub fn from_env() -> Self {
        let mut config = match std::env::var(PROJECT_ROOT_VAR) {
            Ok(root) if !root.is_empty() => Self::with_project_root(root),
            _ => Self::default(),
        };

        if let Ok(exe) = std::env::var(EXECUTABLE_VAR) {
            if !exe.is_empty() {
                config.executable = PathBuf::from(exe);
            }
        }

        if let Ok(cmd) = std::env::var(BUILD_COMMAND_VAR) {
            let mut words = cmd.split_whitespace().map(str::to_string);
            if let Some(program) = words.next() {
                config.build_program = program;
                config.build_args = words.collect();
            }
        }

        if let Ok(dir) = std::env::var(FIXTURES_DIR_VAR) {
            if !dir.is_empty() {
                config.fixtures_dir = PathBuf::from(dir);
            }
        }

        if let Ok(secs) = std::env::var(TIMEOUT_VAR) {
            match secs.trim().parse::<u64>() {
                Ok(secs) => config.timeout = Some(Duration::from_secs(secs)),
                Err(err) => tracing::warn!(value = %secs, "ignoring {}: {}", TIMEOUT_VAR, err),
            }
        }

        config
    }

    /// Sets the binary under test.
    pub fn executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable = path.into();
        self
    }

    /// Sets the build command.
    pub fn build_command<I, S>(mut self, program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.build_program = program.into();
        self.build_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the fixture directory.
    pub fn fixtures_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.fixtures_dir = dir.into();
        self
    }

    /// Sets the child process timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the child process timeout in seconds.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = Some(Duration::from_secs(secs));
        self
    }

    /// Sets the editor-selection variable name.
    pub fn editor_variable(mut self, name: impl Into<String>) -> Self {
        self.editor_variable = name.into();
        self
    }

    /// Build command as a single display string.
    pub fn build_command_line(&self) -> String {
        std::iter::once(self.build_program.as_str())
            .chain(self.build_args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Check if tests against the real tagutil binary should run.
pub fn should_run_acceptance() -> bool {
    std::env::var(RUN_ACCEPTANCE_VAR)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}
