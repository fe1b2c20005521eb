//! Editor substitution.
//!
//! tagutil's edit action writes the tags of a file to a temporary YAML
//! document, runs the user's editor on it and loads the result back. Tests
//! replace the editor with `evil-editor`, which rewrites every occurrence of
//! [`MARKER`] in tag values to [`REPLACEMENT`].

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tagutil_tags::{TagList, TagResult, TagValue};

use crate::error::{HarnessError, HarnessResult};

/// Text the stub editor looks for in tag values.
pub const MARKER: &str = "Good";
/// Text it puts in its place.
pub const REPLACEMENT: &str = "Bad";

/// Keyword under which the stub editor is registered.
pub const EVIL_EDITOR: &str = "evil-editor";

/// Applies the stub editor's rewrite to a YAML tag list document.
///
/// Only text values are touched. The result is re-serialized as YAML.
pub fn evil_edit(yaml: &str) -> TagResult<String> {
    let mut tags = TagList::from_yaml(yaml)?;
    for tag in tags.iter_mut() {
        if let TagValue::Text(text) = &mut tag.value {
            *text = text.replace(MARKER, REPLACEMENT);
        }
    }
    tags.to_yaml()
}

/// Rewrites the tag list file at `path` in place.
pub fn edit_file(path: &Path) -> HarnessResult<()> {
    let original = fs::read_to_string(path)?;
    let edited = evil_edit(&original)?;
    fs::write(path, edited)?;
    tracing::debug!(path = %path.display(), "edited tag list");
    Ok(())
}

/// Keyword to executable lookup for editor substitution.
#[derive(Debug, Clone, Default)]
pub struct EditorTable {
    editors: BTreeMap<String, PathBuf>,
}

impl EditorTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with the stub editor at `path` registered as [`EVIL_EDITOR`].
    pub fn with_stub(path: impl Into<PathBuf>) -> Self {
        let mut table = Self::new();
        table.register(EVIL_EDITOR, path);
        table
    }

    /// Registers (or replaces) an editor.
    pub fn register(&mut self, keyword: impl Into<String>, path: impl Into<PathBuf>) {
        self.editors.insert(keyword.into(), path.into());
    }

    /// Path registered for `keyword`, if any.
    pub fn find(&self, keyword: &str) -> Option<&Path> {
        self.editors.get(keyword).map(PathBuf::as_path)
    }

    /// Like [`find`](Self::find), failing the scenario for an unknown keyword.
    pub fn resolve(&self, keyword: &str) -> HarnessResult<&Path> {
        self.find(keyword)
            .ok_or_else(|| HarnessError::unknown_editor(keyword))
    }
}
