//! Format-aware tag list comparison.
//!
//! Output captured from the binary is parsed with the rules of the format it
//! was printed in. Expected tag lists come from scenario tables, so all their
//! values are text. The YAML reader turns plain digit-only scalars into
//! integers, hence digit-only expected values compared against YAML output go
//! through the same inference. The captured output is never coerced: a quoted
//! `'42'` is text and does not equal an expected `42`.
//! JSON output is compared literally: the string `"42"` never equals the
//! number `42`.

use std::fmt;

use thiserror::Error;

use crate::error::TagError;
use crate::format::Format;
use crate::taglist::{Tag, TagList, TagValue};

/// Why a comparison did not succeed.
#[derive(Debug, Error)]
pub enum CompareError {
    /// The captured output could not be read as a tag list.
    #[error("captured output is not a {format} tag list: {source}")]
    Unparseable {
        format: Format,
        #[source]
        source: TagError,
    },

    /// The output parsed but differs from the expectation.
    #[error(transparent)]
    Mismatch(#[from] TagMismatch),
}

/// A structural difference between an expected and an actual tag list.
#[derive(Debug, Clone, PartialEq)]
pub struct TagMismatch {
    /// Format the actual list was read in.
    pub format: Format,
    /// Expected list, after normalization.
    pub expected: TagList,
    /// Actual list, as parsed.
    pub actual: TagList,
    /// Index of the first differing entry. Equal to the shorter length when
    /// one list is a prefix of the other.
    pub position: usize,
}

impl fmt::Display for TagMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} tag list mismatch at entry {}: ", self.format, self.position)?;
        match (self.expected.get(self.position), self.actual.get(self.position)) {
            (Some(e), Some(a)) => write!(f, "expected {}, got {}", e, a)?,
            (Some(e), None) => write!(f, "expected {}, got end of list", e)?,
            (None, Some(a)) => write!(f, "expected end of list, got {}", a)?,
            (None, None) => write!(f, "lists are equal")?,
        }
        write!(
            f,
            "\n  expected: {}\n    actual: {}",
            self.expected, self.actual
        )
    }
}

impl std::error::Error for TagMismatch {}

/// True when `s` is non-empty and made of ASCII digits only.
pub fn is_digit_only(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn coerce_value(value: &TagValue) -> TagValue {
    match value {
        TagValue::Text(s) if is_digit_only(s) => {
            serde_yaml::from_str(s).unwrap_or_else(|_| value.clone())
        }
        other => other.clone(),
    }
}

/// Applies the YAML reader's inference to every digit-only text value.
///
/// Each such value becomes whatever the reader makes of the same plain
/// scalar: an integer of any width, text when it has a leading zero (`007`),
/// a float beyond 128 bits.
pub fn coerce_digits(tags: &TagList) -> TagList {
    tags.iter()
        .map(|tag| Tag {
            name: tag.name.clone(),
            value: coerce_value(&tag.value),
        })
        .collect()
}

/// Normalizes an expected tag list for comparison against `format` output.
pub fn normalize_expected(tags: &TagList, format: Format) -> TagList {
    match format {
        Format::Yaml => coerce_digits(tags),
        Format::Json => tags.clone(),
    }
}

/// Parses captured output as a tag list in `format`.
///
/// Values keep the types the format's reader gives them. A quoted YAML
/// scalar (`'42'`) stays text.
pub fn parse_output(output: &str, format: Format) -> Result<TagList, CompareError> {
    format
        .parse(output)
        .map_err(|source| CompareError::Unparseable { format, source })
}

/// Index of the first differing entry, or `None` when the lists are equal.
fn first_difference(expected: &TagList, actual: &TagList) -> Option<usize> {
    let common = expected.len().min(actual.len());
    (0..common)
        .find(|&i| expected.get(i) != actual.get(i))
        .or_else(|| (expected.len() != actual.len()).then_some(common))
}

/// Compares captured output against an expected tag list.
///
/// Equality is structural: same length, and at each position the same name
/// and the same (normalized) value.
pub fn compare(output: &str, expected: &TagList, format: Format) -> Result<(), CompareError> {
    let actual = parse_output(output, format)?;
    let expected = normalize_expected(expected, format);
    match first_difference(&expected, &actual) {
        None => Ok(()),
        Some(position) => Err(TagMismatch {
            format,
            expected,
            actual,
            position,
        }
        .into()),
    }
}

/// Checks that captured output is an empty tag list in `format`.
pub fn expect_empty(output: &str, format: Format) -> Result<(), CompareError> {
    compare(output, &TagList::new(), format)
}
