//! Tune provisioner: copies blank fixtures into the workspace, optionally
//! pre-tagged.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tagutil_tags::TagList;

use crate::error::{HarnessError, HarnessResult};
use crate::fixtures::FixtureStore;
use crate::runner::{shell_quote, ProcessRunner};

/// Argument string loading a YAML tag list from stdin into `file`.
pub fn load_from_stdin_args(file: &str) -> String {
    format!("load:- {}", shell_quote(file))
}

/// A generated audio file inside the workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tune {
    /// `<base_name>.<extension>`, relative to the workspace.
    pub file_name: String,
    /// Absolute path.
    pub path: PathBuf,
}

fn check_base_name(name: &str) -> HarnessResult<()> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);
    if bad {
        return Err(HarnessError::InvalidTuneName {
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Creates tunes from fixtures.
#[derive(Debug, Clone)]
pub struct TuneProvisioner<'a> {
    fixtures: &'a FixtureStore,
    runner: &'a ProcessRunner,
}

impl<'a> TuneProvisioner<'a> {
    /// Creates a provisioner drawing from `fixtures` and loading tags with
    /// `runner`.
    pub fn new(fixtures: &'a FixtureStore, runner: &'a ProcessRunner) -> Self {
        Self { fixtures, runner }
    }

    /// Copies the fixture for `extension` to `<workspace>/<base_name>.<extension>`.
    ///
    /// With `tags`, the copy is then loaded with them by the binary under
    /// test. The load must exit with success and print nothing; anything
    /// else fails with the captured output. An unknown extension fails before
    /// any file is created.
    pub fn create_tune(
        &self,
        workspace: &Path,
        base_name: &str,
        extension: &str,
        tags: Option<&TagList>,
        env: &BTreeMap<String, String>,
    ) -> HarnessResult<Tune> {
        let fixture = self.fixtures.fixture(extension)?;
        check_base_name(base_name)?;

        let file_name = format!("{}.{}", base_name, extension);
        let path = workspace.join(&file_name);
        fs::copy(&fixture.path, &path)?;
        tracing::debug!(tune = %file_name, fixture = %fixture.path.display(), "tune created");

        let tune = Tune { file_name, path };
        if let Some(tags) = tags {
            self.load_tags(workspace, &tune, tags, env)?;
        }
        Ok(tune)
    }

    fn load_tags(
        &self,
        workspace: &Path,
        tune: &Tune,
        tags: &TagList,
        env: &BTreeMap<String, String>,
    ) -> HarnessResult<()> {
        let yaml = tags.to_yaml()?;
        let result = self.runner.run_with_stdin(
            &load_from_stdin_args(&tune.file_name),
            workspace,
            env,
            Some(&yaml),
        )?;

        if !result.success() || !result.output.is_empty() {
            tracing::warn!(
                tune = %tune.file_name,
                status = %result.status,
                "provisioning load was not silent"
            );
            return Err(HarnessError::ProvisioningFailed {
                path: tune.path.clone(),
                success: result.success(),
                exit_code: result.exit_code(),
                output: result.output,
            });
        }
        tracing::debug!(tune = %tune.file_name, tags = tags.len(), "tune tagged");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_args() {
        assert_eq!(load_from_stdin_args("track.flac"), "load:- track.flac");
        assert_eq!(load_from_stdin_args("my track.flac"), "load:- 'my track.flac'");
    }

    #[test]
    fn test_base_name_check() {
        assert!(check_base_name("track01").is_ok());
        assert!(check_base_name("").is_err());
        assert!(check_base_name("..").is_err());
        assert!(check_base_name("../escape").is_err());
        assert!(check_base_name("a/b").is_err());
    }
}
