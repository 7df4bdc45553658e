//! Core value types shared across the library.
//!
//! Defines the [`Id`] newtype used for every addressable object, the
//! monotonic [`Version`] counter that backs compare-and-swap writes, and the
//! tagged [`ContentValue`]/[`Snapshot`] unions carried through the conflict
//! and merge paths.

use serde::{Deserialize, Serialize};

use crate::position::PlacedItem;

/// An identifier for a record, container, placed item, or conflict.
///
/// Plain opaque string; freshly generated ids are UUIDv4.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Id(String);

impl Id {
    /// Creates a new ID from any string-like input.
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Generates a fresh random ID.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the ID is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for Id {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Id {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<&Id> for Id {
    fn from(id: &Id) -> Self {
        id.clone()
    }
}

impl AsRef<str> for Id {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", &self.0)
    }
}

/// Monotonic version counter for a stored record.
///
/// Every persisted record carries one; a write succeeds only if the caller's
/// declared version equals the store's current version at write time. The
/// wider application historically mixed string-encoded and integer versions
/// across record kinds; this type normalizes all of them to a single `u64`
/// counter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(u64);

impl Version {
    /// The version assigned to a freshly inserted record.
    pub fn initial() -> Self {
        Self(0)
    }

    /// Creates a version from a raw counter value.
    pub fn new(v: u64) -> Self {
        Self(v)
    }

    /// The version a successful compare-and-swap write produces.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Raw counter value.
    pub fn value(self) -> u64 {
        self.0
    }
}

impl From<u64> for Version {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A shared content field's value.
///
/// Tagged union rather than an untyped blob so the merge/resolve paths can
/// pattern-match exhaustively instead of sniffing runtime types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ContentValue {
    /// Plain newline-delimited text; the only kind eligible for automatic
    /// three-way merge.
    Text(String),
    /// Structured JSON content (rich-text documents, embeds).
    Json(serde_json::Value),
    /// Reference to an uploaded image asset.
    ImageRef(String),
}

impl ContentValue {
    /// Returns the inner text for `Text` content.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// The unit of data stored in a record and carried through a conflict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Snapshot {
    /// A shared content field.
    Content(ContentValue),
    /// A placed component (structural record).
    Structure(PlacedItem),
}

impl Snapshot {
    /// Returns the inner text when this snapshot is textual content.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Snapshot::Content(c) => c.as_text(),
            Snapshot::Structure(_) => None,
        }
    }

    /// The last editor recorded on this snapshot, if it carries one.
    ///
    /// Structure snapshots track their last modifier; content values do not
    /// carry authorship, so detection falls back to an unknown author.
    pub fn last_modified_by(&self) -> Option<&str> {
        match self {
            Snapshot::Structure(item) => Some(&item.last_modified_by),
            Snapshot::Content(_) => None,
        }
    }
}

impl From<ContentValue> for Snapshot {
    fn from(value: ContentValue) -> Self {
        Snapshot::Content(value)
    }
}

impl From<PlacedItem> for Snapshot {
    fn from(item: PlacedItem) -> Self {
        Snapshot::Structure(item)
    }
}
