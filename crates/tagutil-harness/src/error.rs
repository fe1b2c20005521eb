//! Error types for the acceptance harness.
//!
//! Anything the binary under test does during a scenario (exit status,
//! output) is data, not an error: it lives in
//! [`ExecutionResult`](crate::runner::ExecutionResult). The variants here are
//! failures of the harness itself.

use std::path::PathBuf;

use tagutil_tags::TagError;
use thiserror::Error;

/// Result type for harness operations.
pub type HarnessResult<T> = Result<T, HarnessError>;

/// How far a harness failure reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// No scenario can run (build failure, binary missing, fixtures unreadable).
    Fatal,
    /// The current scenario is aborted; its workspace is still torn down.
    ScenarioSetup,
}

/// Errors that can occur while preparing or driving a scenario.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// The build tool could not be located.
    #[error("build tool '{program}' not found in PATH")]
    BuildToolNotFound { program: String },

    /// The build command ran and reported failure.
    #[error("building tagutil failed with exit code {exit_code:?} (command: {command})")]
    BuildFailed {
        command: String,
        exit_code: Option<i32>,
    },

    /// An earlier build attempt in this process failed.
    #[error("binary under test unavailable: {message}")]
    BinaryUnavailable { message: String },

    /// The build succeeded but the expected artifact is still missing.
    #[error("build succeeded but {path} does not exist")]
    ArtifactMissing { path: PathBuf },

    /// A child process could not be started.
    #[error("failed to spawn {program}: {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The combined output of a child process could not be read.
    #[error("failed to read output of {program}: {source}")]
    OutputCaptureFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// A child process exceeded the configured timeout and was killed.
    #[error("{program} timed out after {timeout_secs} seconds")]
    Timeout { program: String, timeout_secs: u64 },

    /// The fixture directory could not be read.
    #[error("failed to read fixture directory {path}: {message}")]
    FixtureStoreUnreadable { path: PathBuf, message: String },

    /// No fixture matches the requested extension.
    #[error("invalid argument: no fixture for extension '{ext}'")]
    UnknownExtension { ext: String },

    /// More than one fixture matches the requested extension.
    #[error("ambiguous fixture for extension '{ext}': {count} files match")]
    AmbiguousFixture { ext: String, count: usize },

    /// A tune name would escape the workspace or is empty.
    #[error("invalid argument: bad tune name '{name}'")]
    InvalidTuneName { name: String },

    /// No editor is registered under the keyword.
    #[error("couldn't find the `{keyword}' editor")]
    UnknownEditor { keyword: String },

    /// An operation needs an active workspace and there is none.
    #[error("no active workspace, call setup() first")]
    NoWorkspace,

    /// Loading initial tags into a tune did not go silently.
    #[error(
        "provisioning {path} failed (exit code {exit_code:?}, success: {success}):\n{output}"
    )]
    ProvisioningFailed {
        path: PathBuf,
        success: bool,
        exit_code: Option<i32>,
        output: String,
    },

    /// Tags could not be serialized for provisioning.
    #[error("tag list error: {0}")]
    Tags(#[from] TagError),

    /// IO error during workspace or fixture operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarnessError {
    /// Creates a new spawn failed error.
    pub fn spawn_failed(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::SpawnFailed {
            program: program.into(),
            source,
        }
    }

    /// Creates a new unknown extension error.
    pub fn unknown_extension(ext: impl Into<String>) -> Self {
        Self::UnknownExtension { ext: ext.into() }
    }

    /// Creates a new unknown editor error.
    pub fn unknown_editor(keyword: impl Into<String>) -> Self {
        Self::UnknownEditor {
            keyword: keyword.into(),
        }
    }

    /// Returns where this failure sits in the error taxonomy.
    pub fn severity(&self) -> Severity {
        match self {
            HarnessError::BuildToolNotFound { .. }
            | HarnessError::BuildFailed { .. }
            | HarnessError::BinaryUnavailable { .. }
            | HarnessError::ArtifactMissing { .. }
            | HarnessError::SpawnFailed { .. }
            | HarnessError::OutputCaptureFailed { .. }
            | HarnessError::Timeout { .. }
            | HarnessError::FixtureStoreUnreadable { .. } => Severity::Fatal,
            HarnessError::UnknownExtension { .. }
            | HarnessError::AmbiguousFixture { .. }
            | HarnessError::InvalidTuneName { .. }
            | HarnessError::UnknownEditor { .. }
            | HarnessError::NoWorkspace
            | HarnessError::ProvisioningFailed { .. }
            | HarnessError::Tags(_)
            | HarnessError::Io(_) => Severity::ScenarioSetup,
        }
    }

    /// True for failures that must stop the whole run.
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}
