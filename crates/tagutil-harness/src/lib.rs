//! Acceptance test harness for tagutil
//!
//! Drives the tagutil binary as a black box: each scenario gets a fresh
//! workspace, blank audio files copied from fixtures (optionally pre-tagged),
//! invocations with a literal argument string, and assertions on the merged
//! output and exit status.
//!
//! # Example
//!
//! ```no_run
//! use tagutil_harness::{HarnessConfig, Session};
//! use tagutil_tags::{Format, TagList};
//!
//! let mut session = Session::prepare(HarnessConfig::from_env())?;
//! session.setup()?;
//!
//! let tags = TagList::new().with("artist", "Kyuss").with("track", "1");
//! session.create_tagged_tune("track", "flac", &tags)?;
//! session.print_tags("track.flac", Format::Yaml)?;
//! session.expect_tag_list(Format::Yaml, &tags);
//!
//! session.teardown()?;
//! # Ok::<(), tagutil_harness::HarnessError>(())
//! ```
//!
//! # Modules
//!
//! - [`config`]: Paths, build command and timeout
//! - [`environment`]: Build artifact and per-scenario workspace
//! - [`fixtures`]: Blank audio templates
//! - [`provision`]: Tune creation
//! - [`runner`]: Child process execution with merged output
//! - [`editor`]: Editor substitution and the stub editor's rewrite
//! - [`session`]: Scenario context and assertions
//! - [`logging`]: Tracing subscriber setup

pub mod config;
pub mod editor;
pub mod environment;
pub mod error;
pub mod fixtures;
pub mod logging;
pub mod provision;
pub mod runner;
pub mod session;

// Re-export commonly used types at the crate root
pub use config::{should_run_acceptance, HarnessConfig};
pub use editor::{edit_file, evil_edit, EditorTable, EVIL_EDITOR};
pub use environment::{ensure_built, Workspace};
pub use error::{HarnessError, HarnessResult, Severity};
pub use fixtures::{Fixture, FixtureStore};
pub use logging::{init_logging, init_stderr_logging};
pub use provision::{Tune, TuneProvisioner};
pub use runner::{ExecutionResult, ExitStatus, ProcessRunner};
pub use session::Session;
