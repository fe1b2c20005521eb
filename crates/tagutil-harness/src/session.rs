//! Scenario session context.
//!
//! A [`Session`] carries everything a scenario touches: the workspace, the
//! environment overlay handed to the binary, and the result of the last
//! invocation. One session serves a whole test run; [`Session::setup`] resets
//! the per-scenario state.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::path::Path;

use regex::Regex;
use tagutil_tags::{compare, expect_empty, Format, TagList};

use crate::config::HarnessConfig;
use crate::editor::EditorTable;
use crate::environment::{ensure_built, Workspace};
use crate::error::{HarnessError, HarnessResult};
use crate::fixtures::FixtureStore;
use crate::provision::{Tune, TuneProvisioner};
use crate::runner::{ExecutionResult, ProcessRunner};

/// State for running scenarios against the binary under test.
#[derive(Debug)]
pub struct Session {
    config: HarnessConfig,
    runner: ProcessRunner,
    fixtures: FixtureStore,
    editors: EditorTable,
    env: BTreeMap<String, String>,
    last: Option<ExecutionResult>,
    workspace: Option<Workspace>,
}

impl Session {
    /// Creates a session for `config` without building anything.
    ///
    /// Fails when the fixture directory cannot be read.
    pub fn new(config: HarnessConfig) -> HarnessResult<Self> {
        let fixtures = FixtureStore::open(&config.fixtures_dir)?;
        let runner = ProcessRunner::new(&config.executable).with_timeout(config.timeout);
        Ok(Self {
            config,
            runner,
            fixtures,
            editors: EditorTable::new(),
            env: BTreeMap::new(),
            last: None,
            workspace: None,
        })
    }

    /// Builds the binary under test if needed, then creates a session.
    pub fn prepare(config: HarnessConfig) -> HarnessResult<Self> {
        let executable = ensure_built(&config)?;
        Self::new(config.executable(executable))
    }

    /// Replaces the editor table.
    pub fn with_editors(mut self, editors: EditorTable) -> Self {
        self.editors = editors;
        self
    }

    /// Configuration in use.
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Fixtures in use.
    pub fn fixtures(&self) -> &FixtureStore {
        &self.fixtures
    }

    /// Starts a scenario in a fresh workspace.
    ///
    /// Any workspace still active is torn down first. The environment
    /// overlay and the last result are cleared.
    pub fn setup(&mut self) -> HarnessResult<&Path> {
        self.teardown()?;
        self.env.clear();
        self.last = None;
        let workspace = self.workspace.insert(Workspace::setup()?);
        Ok(workspace.path())
    }

    /// Ends the scenario, removing its workspace.
    pub fn teardown(&mut self) -> HarnessResult<()> {
        match self.workspace.take() {
            Some(workspace) => workspace.teardown(),
            None => Ok(()),
        }
    }

    /// Directory of the active workspace.
    pub fn workspace(&self) -> HarnessResult<&Path> {
        self.workspace
            .as_ref()
            .map(Workspace::path)
            .ok_or(HarnessError::NoWorkspace)
    }

    /// Copies the blank fixture for `extension` to `<base_name>.<extension>`.
    pub fn create_tune(&self, base_name: &str, extension: &str) -> HarnessResult<Tune> {
        self.provision(base_name, extension, None)
    }

    /// Like [`create_tune`](Self::create_tune), then loads `tags` into it.
    pub fn create_tagged_tune(
        &self,
        base_name: &str,
        extension: &str,
        tags: &TagList,
    ) -> HarnessResult<Tune> {
        self.provision(base_name, extension, Some(tags))
    }

    fn provision(
        &self,
        base_name: &str,
        extension: &str,
        tags: Option<&TagList>,
    ) -> HarnessResult<Tune> {
        let workspace = self.workspace()?;
        TuneProvisioner::new(&self.fixtures, &self.runner)
            .create_tune(workspace, base_name, extension, tags, &self.env)
    }

    /// Points the editor variable at the editor registered as `keyword`.
    pub fn use_editor(&mut self, keyword: &str) -> HarnessResult<()> {
        let path = self.editors.resolve(keyword)?;
        let value = path.display().to_string();
        tracing::debug!(keyword, path = %value, "editor selected");
        self.env.insert(self.config.editor_variable.clone(), value);
        Ok(())
    }

    /// Adds a variable to the environment overlay.
    pub fn set_env(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.env.insert(key.into(), value.into());
    }

    /// Environment overlay for the current scenario.
    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    /// Runs the binary under test with the literal argument string `argv`.
    ///
    /// The result is kept for the `expect_*` assertions.
    pub fn run(&mut self, argv: &str) -> HarnessResult<&ExecutionResult> {
        let workspace = self.workspace()?;
        let result = self.runner.run(argv, workspace, &self.env)?;
        Ok(self.last.insert(result))
    }

    /// Prints the tags of `file` in `format`.
    pub fn print_tags(&mut self, file: &str, format: Format) -> HarnessResult<&ExecutionResult> {
        self.run(&format.print_args(file))
    }

    /// Result of the last [`run`](Self::run).
    pub fn last_result(&self) -> Option<&ExecutionResult> {
        self.last.as_ref()
    }

    fn last_or_panic(&self) -> &ExecutionResult {
        match &self.last {
            Some(result) => result,
            None => panic!("no command has been run in this scenario"),
        }
    }

    fn fail(&self, message: impl Display) -> ! {
        let last = self.last_or_panic();
        panic!(
            "{}\nstatus: {}\noutput:\n{}",
            message, last.status, last.output
        );
    }

    /// Asserts the last run exited with code 0.
    pub fn expect_success(&self) {
        if !self.last_or_panic().success() {
            self.fail("expected the command to succeed");
        }
    }

    /// Asserts the last run did not succeed.
    pub fn expect_failure(&self) {
        if self.last_or_panic().success() {
            self.fail("expected the command to fail");
        }
    }

    /// Asserts the last output contains `text`.
    pub fn expect_output_contains(&self, text: &str) {
        if !self.last_or_panic().output.contains(text) {
            self.fail(format!("expected output to contain {:?}", text));
        }
    }

    /// Asserts the last output has a line starting with `section`.
    pub fn expect_help_about(&self, section: &str) {
        let pattern = format!("(?m)^{}", regex::escape(section));
        let re = Regex::new(&pattern)
            .unwrap_or_else(|e| panic!("bad help pattern {:?}: {}", pattern, e));
        if !re.is_match(&self.last_or_panic().output) {
            self.fail(format!("expected help about {:?}", section));
        }
    }

    /// Asserts the last output is an empty tag list in `format`.
    pub fn expect_empty_tag_list(&self, format: Format) {
        if let Err(err) = expect_empty(&self.last_or_panic().output, format) {
            self.fail(err);
        }
    }

    /// Asserts the last output is `expected` in `format`.
    pub fn expect_tag_list(&self, format: Format, expected: &TagList) {
        if let Err(err) = compare(&self.last_or_panic().output, expected, format) {
            self.fail(err);
        }
    }

    /// Logs the environment overlay and the last result.
    pub fn debug_dump(&self) {
        tracing::info!(env = ?self.env, "scenario environment");
        match &self.last {
            Some(last) => tracing::info!(status = %last.status, output = %last.output, "last result"),
            None => tracing::info!("no command run yet"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::EVIL_EDITOR;

    fn session() -> Session {
        Session::new(HarnessConfig::default().executable("/nonexistent/tagutil"))
            .unwrap()
            .with_editors(EditorTable::with_stub("/opt/evil-editor"))
    }

    #[test]
    fn test_operations_need_a_workspace() {
        let mut session = session();
        assert!(matches!(session.workspace(), Err(HarnessError::NoWorkspace)));
        assert!(matches!(
            session.create_tune("track", "flac"),
            Err(HarnessError::NoWorkspace)
        ));
        assert!(matches!(session.run("--help"), Err(HarnessError::NoWorkspace)));
    }

    #[test]
    fn test_use_editor_sets_overlay() {
        let mut session = session();
        session.use_editor(EVIL_EDITOR).unwrap();
        assert_eq!(
            session.env().get("EDITOR").map(String::as_str),
            Some("/opt/evil-editor")
        );

        let err = session.use_editor("emacs").unwrap_err();
        assert_eq!(err.to_string(), "couldn't find the `emacs' editor");
    }

    #[test]
    fn test_setup_resets_scenario_state() {
        let mut session = session();
        session.set_env("LC_ALL", "C");
        let first = session.setup().unwrap().to_path_buf();
        assert!(session.env().is_empty());

        session.set_env("LC_ALL", "C");
        let second = session.setup().unwrap().to_path_buf();
        assert!(!first.exists());
        assert_ne!(first, second);
        assert!(session.env().is_empty());
        assert!(session.last_result().is_none());

        session.teardown().unwrap();
        assert!(!second.exists());
    }

    #[test]
    fn test_unknown_extension_creates_nothing() {
        let mut session = session();
        let dir = session.setup().unwrap().to_path_buf();
        let err = session.create_tune("track", "wav").unwrap_err();
        assert!(matches!(err, HarnessError::UnknownExtension { .. }));
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 0);
        session.teardown().unwrap();
    }

    #[test]
    #[should_panic(expected = "no command has been run")]
    fn test_assertion_without_run_panics() {
        session().expect_success();
    }
}
