//! Tag list text formats and audio container types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{TagError, TagResult};
use crate::taglist::TagList;

/// Text representation tagutil uses to print, edit and load tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Format {
    /// YAML, tagutil's default format.
    Yaml,
    /// Compact JSON.
    Json,
}

impl Format {
    /// All formats.
    pub const ALL: [Format; 2] = [Format::Yaml, Format::Json];

    /// Returns the name used in scenario steps (`YAML`, `JSON`).
    pub fn name(&self) -> &'static str {
        match self {
            Format::Yaml => "YAML",
            Format::Json => "JSON",
        }
    }

    /// Returns the value tagutil expects after its `-F` option.
    pub fn option_value(&self) -> &'static str {
        match self {
            Format::Yaml => "yml",
            Format::Json => "json",
        }
    }

    /// Argument string querying the tags of `file` in this format.
    pub fn print_args(&self, file: &str) -> String {
        format!("-F {} print {}", self.option_value(), file)
    }

    /// Parses text emitted by the binary under the rules of this format.
    pub fn parse(&self, text: &str) -> TagResult<TagList> {
        match self {
            Format::Yaml => TagList::from_yaml(text),
            Format::Json => TagList::from_json(text),
        }
    }

    /// Serializes a tag list in this format.
    pub fn render(&self, tags: &TagList) -> TagResult<String> {
        match self {
            Format::Yaml => tags.to_yaml(),
            Format::Json => tags.to_json(),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Format {
    type Err = TagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Ok(Format::Yaml),
            "json" => Ok(Format::Json),
            _ => Err(TagError::unknown_format(s)),
        }
    }
}

/// Audio container formats tagutil can tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Container {
    /// MPEG-1 Layer III with ID3 tags.
    Mp3,
    /// Ogg Vorbis with Vorbis comments.
    Ogg,
    /// FLAC with Vorbis comments.
    Flac,
}

impl Container {
    /// All supported containers.
    pub const ALL: [Container; 3] = [Container::Mp3, Container::Ogg, Container::Flac];

    /// Returns the file extension for this container.
    pub fn extension(&self) -> &'static str {
        match self {
            Container::Mp3 => "mp3",
            Container::Ogg => "ogg",
            Container::Flac => "flac",
        }
    }

    /// Looks up a container by its file extension (case-sensitive, no dot).
    pub fn from_extension(ext: &str) -> TagResult<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.extension() == ext)
            .ok_or_else(|| TagError::unknown_container(ext))
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for Container {
    type Err = TagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s)
    }
}
