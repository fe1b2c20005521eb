//! Tag list model.
//!
//! A tag list is an ordered sequence of single-key mappings, one tag name to
//! one tag value. Both text representations used by tagutil (YAML and JSON)
//! serialize it as a sequence of one-entry maps:
//!
//! ```yaml
//! - artist: Kyuss
//! - title: Gardenia
//! - track: 1
//! ```

use std::fmt;

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::ser::{self, SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use crate::error::{TagError, TagResult};

/// An integer of any width, kept as canonical decimal text.
///
/// YAML readers infer integers from digit strings of arbitrary length, so no
/// fixed-width type can hold every value a tag list may carry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Integer(String);

impl Integer {
    /// Parses optionally signed decimal digits. Leading zeros are dropped and
    /// `-0` is `0`.
    pub fn parse(s: &str) -> Option<Self> {
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let digits = digits.trim_start_matches('0');
        Some(match (negative, digits.is_empty()) {
            (_, true) => Integer("0".to_string()),
            (true, false) => Integer(format!("-{}", digits)),
            (false, false) => Integer(digits.to_string()),
        })
    }

    /// Canonical decimal text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The value, if it fits in an `i64`.
    pub fn to_i64(&self) -> Option<i64> {
        self.0.parse().ok()
    }
}

impl fmt::Display for Integer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

macro_rules! integer_from {
    ($($t:ty),*) => {
        $(impl From<$t> for Integer {
            fn from(value: $t) -> Self {
                Integer(value.to_string())
            }
        })*
    };
}

integer_from!(i64, u64, i128, u128);

impl Serialize for Integer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if let Ok(n) = self.0.parse::<i64>() {
            serializer.serialize_i64(n)
        } else if let Ok(n) = self.0.parse::<u64>() {
            serializer.serialize_u64(n)
        } else if let Ok(n) = self.0.parse::<i128>() {
            serializer.serialize_i128(n)
        } else if let Ok(n) = self.0.parse::<u128>() {
            serializer.serialize_u128(n)
        } else {
            Err(ser::Error::custom(format!(
                "integer {} does not fit in 128 bits",
                self.0
            )))
        }
    }
}

/// A scalar tag value.
///
/// Values written by a scenario are always [`TagValue::Text`]; the other
/// variants appear when a reader infers a type from the serialized text.
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    /// Plain text.
    Text(String),
    /// An integer, as inferred by the YAML reader or emitted as a JSON number.
    Integer(Integer),
    /// A non-integer number.
    Float(f64),
    /// A boolean.
    Bool(bool),
    /// An explicit null.
    Null,
}

impl TagValue {
    /// Returns the text if this value is [`TagValue::Text`].
    pub fn as_text(&self) -> Option<&str> {
        match self {
            TagValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer if this value is [`TagValue::Integer`].
    pub fn as_integer(&self) -> Option<&Integer> {
        match self {
            TagValue::Integer(n) => Some(n),
            _ => None,
        }
    }
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagValue::Text(s) => write!(f, "{:?}", s),
            TagValue::Integer(n) => write!(f, "{}", n),
            TagValue::Float(x) => write!(f, "{}", x),
            TagValue::Bool(b) => write!(f, "{}", b),
            TagValue::Null => write!(f, "null"),
        }
    }
}

impl From<&str> for TagValue {
    fn from(value: &str) -> Self {
        TagValue::Text(value.to_string())
    }
}

impl From<String> for TagValue {
    fn from(value: String) -> Self {
        TagValue::Text(value)
    }
}

impl From<i64> for TagValue {
    fn from(value: i64) -> Self {
        TagValue::Integer(value.into())
    }
}

impl From<Integer> for TagValue {
    fn from(value: Integer) -> Self {
        TagValue::Integer(value)
    }
}

impl Serialize for TagValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TagValue::Text(s) => serializer.serialize_str(s),
            TagValue::Integer(n) => n.serialize(serializer),
            TagValue::Float(x) => serializer.serialize_f64(*x),
            TagValue::Bool(b) => serializer.serialize_bool(*b),
            TagValue::Null => serializer.serialize_none(),
        }
    }
}

struct TagValueVisitor;

impl<'de> Visitor<'de> for TagValueVisitor {
    type Value = TagValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a scalar tag value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<TagValue, E> {
        Ok(TagValue::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<TagValue, E> {
        Ok(TagValue::Integer(v.into()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<TagValue, E> {
        Ok(TagValue::Integer(v.into()))
    }

    fn visit_i128<E: de::Error>(self, v: i128) -> Result<TagValue, E> {
        Ok(TagValue::Integer(v.into()))
    }

    fn visit_u128<E: de::Error>(self, v: u128) -> Result<TagValue, E> {
        Ok(TagValue::Integer(v.into()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<TagValue, E> {
        Ok(TagValue::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<TagValue, E> {
        Ok(TagValue::Text(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<TagValue, E> {
        Ok(TagValue::Text(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<TagValue, E> {
        Ok(TagValue::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<TagValue, E> {
        Ok(TagValue::Null)
    }
}

impl<'de> Deserialize<'de> for TagValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(TagValueVisitor)
    }
}

/// One entry of a tag list: exactly one name mapped to one value.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    /// Tag name (e.g. `artist`).
    pub name: String,
    /// Tag value.
    pub value: TagValue,
}

impl Tag {
    /// Creates a new tag.
    pub fn new(name: impl Into<String>, value: impl Into<TagValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{:?}: {}}}", self.name, self.value)
    }
}

impl Serialize for Tag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.name, &self.value)?;
        map.end()
    }
}

struct TagVisitor;

impl<'de> Visitor<'de> for TagVisitor {
    type Value = Tag;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a mapping with exactly one tag name")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Tag, A::Error> {
        let (name, value) = map
            .next_entry::<String, TagValue>()?
            .ok_or_else(|| de::Error::invalid_length(0, &self))?;
        let mut extra = 0;
        while map.next_entry::<de::IgnoredAny, de::IgnoredAny>()?.is_some() {
            extra += 1;
        }
        if extra > 0 {
            return Err(de::Error::invalid_length(1 + extra, &self));
        }
        Ok(Tag { name, value })
    }
}

impl<'de> Deserialize<'de> for Tag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(TagVisitor)
    }
}

/// An ordered tag list.
///
/// Order is declaration order and is preserved by serialization and by
/// comparison.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagList(Vec<Tag>);

impl TagList {
    /// Creates an empty tag list.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Builds a tag list from `(name, value)` text pairs.
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        pairs
            .into_iter()
            .map(|(name, value)| Tag::new(name, value))
            .collect()
    }

    /// Builds a tag list from the rows of a two-column scenario table.
    ///
    /// Every cell is taken as text. A row without exactly two cells is
    /// rejected.
    pub fn from_table<R, C>(rows: R) -> TagResult<Self>
    where
        R: IntoIterator<Item = C>,
        C: AsRef<[String]>,
    {
        rows.into_iter()
            .enumerate()
            .map(|(i, row)| match row.as_ref() {
                [name, value] => Ok(Tag::new(name.as_str(), value.as_str())),
                cells => Err(TagError::invalid_row(
                    i,
                    format!("expected 2 cells (name, value), got {}", cells.len()),
                )),
            })
            .collect()
    }

    /// Appends a tag, builder style.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<TagValue>) -> Self {
        self.push(Tag::new(name, value));
        self
    }

    /// Appends a tag.
    pub fn push(&mut self, tag: Tag) {
        self.0.push(tag);
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the list has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the entries in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Tag> {
        self.0.iter()
    }

    /// Iterates mutably over the entries in order.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Tag> {
        self.0.iter_mut()
    }

    /// Entry at `index`.
    pub fn get(&self, index: usize) -> Option<&Tag> {
        self.0.get(index)
    }

    /// Serializes to the YAML text representation.
    pub fn to_yaml(&self) -> TagResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Serializes to the compact JSON text representation.
    pub fn to_json(&self) -> TagResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses the YAML text representation, with the YAML reader's scalar
    /// type inference applied to values.
    pub fn from_yaml(text: &str) -> TagResult<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Parses the JSON text representation. Values are taken as emitted.
    pub fn from_json(text: &str) -> TagResult<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

impl FromIterator<Tag> for TagList {
    fn from_iter<I: IntoIterator<Item = Tag>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for TagList {
    type Item = Tag;
    type IntoIter = std::vec::IntoIter<Tag>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a TagList {
    type Item = &'a Tag;
    type IntoIter = std::slice::Iter<'a, Tag>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for TagList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, tag) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", tag)?;
        }
        write!(f, "]")
    }
}
