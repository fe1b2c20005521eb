//! Tag lists as seen by tagutil acceptance tests
//!
//! This crate models what the tagutil binary prints and loads: an ordered
//! list of single-key `name: value` entries, in YAML or JSON.
//!
//! # Example
//!
//! ```
//! use tagutil_tags::{compare, Format, TagList};
//!
//! let expected = TagList::new()
//!     .with("artist", "Kyuss")
//!     .with("track", "1");
//!
//! // The YAML reader infers `1` as an integer, the comparator accounts for it.
//! compare("- artist: Kyuss\n- track: 1\n", &expected, Format::Yaml).unwrap();
//!
//! // JSON strings are compared as written.
//! compare(r#"[{"artist":"Kyuss"},{"track":"1"}]"#, &expected, Format::Json).unwrap();
//! ```
//!
//! # Modules
//!
//! - [`taglist`]: Tag list model and its serde representation
//! - [`format`]: YAML/JSON format selector and audio container types
//! - [`compare`]: Format-aware comparison of captured output
//! - [`error`]: Error types

pub mod compare;
pub mod error;
pub mod format;
pub mod taglist;

// Re-export commonly used types at the crate root
pub use compare::{
    coerce_digits, compare, expect_empty, is_digit_only, normalize_expected, parse_output,
    CompareError, TagMismatch,
};
pub use error::{TagError, TagResult};
pub use format::{Container, Format};
pub use taglist::{Integer, Tag, TagList, TagValue};
