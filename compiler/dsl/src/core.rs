//! Common items useful for working with IR elements but not themselves
//! part of IEC 61131-3.
use core::fmt;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use std::sync::{Arc, LazyLock};
use std::{cmp::Ordering, hash::Hash, hash::Hasher};

// Shared singleton for the empty file id so that default spans do not
// allocate. Test code creates a very large number of these.
static EMPTY_FILE_ID: LazyLock<Arc<str>> = LazyLock::new(|| Arc::from(""));

/// FileId is an identifier for a source input (a file path or a
/// synthetic name such as `<builder>`).
///
/// FileId is normally useful in the context of source positions
/// where a source position is in a particular input.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct FileId(Arc<str>);

impl FileId {
    /// Creates an empty file identifier.
    pub fn new() -> Self {
        FileId::default()
    }

    /// Creates a file identifier from the path.
    pub fn from_path(path: &Path) -> Self {
        FileId(Arc::from(path.to_string_lossy().as_ref()))
    }

    /// Creates a file identifier from the slice. The slice is normally
    /// the file path or a synthetic input name.
    pub fn from_string(name: &str) -> Self {
        FileId(Arc::from(name))
    }
}

impl Default for FileId {
    fn default() -> Self {
        FileId(EMPTY_FILE_ID.clone())
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for FileId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for FileId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Ok(FileId::from_string(&value))
    }
}

/// Location in a source input of an IR element instance.
///
/// The location is defined by byte indices in the source input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSpan {
    /// The position of the starting character (0-indexed).
    pub start: usize,
    /// The position one past the ending character (0-indexed).
    pub end: usize,
    pub file_id: FileId,
}

impl SourceSpan {
    pub fn range(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            file_id: FileId::default(),
        }
    }

    pub fn join(start: &SourceSpan, end: &SourceSpan) -> Self {
        Self {
            start: start.start,
            end: end.end,
            file_id: start.file_id.clone(),
        }
    }

    pub fn with_file_id(&self, file_id: &FileId) -> Self {
        Self {
            start: self.start,
            end: self.end,
            file_id: file_id.clone(),
        }
    }
}

impl Default for SourceSpan {
    fn default() -> Self {
        SourceSpan::range(0, 0)
    }
}

impl PartialEq for SourceSpan {
    fn eq(&self, _other: &Self) -> bool {
        // Two spans always compare equal. When comparing IR elements we
        // rarely care that they were declared at the same position, and
        // this keeps structural equality usable for determinism checks.
        true
    }
}
impl Eq for SourceSpan {}

impl Hash for SourceSpan {
    fn hash<H: Hasher>(&self, _state: &mut H) {
        // Consistent with PartialEq: all spans hash alike.
    }
}

/// Defines an element that has a location in source code.
pub trait Located {
    /// Get the source code position of the object.
    fn span(&self) -> SourceSpan;
}

/// Implements an identifier.
///
/// IEC 61131-3 declares that identifiers are case insensitive. This
/// type ensures case insensitive comparison while retaining the
/// original spelling for rendering.
#[derive(Serialize)]
pub struct Id {
    pub original: String,
    #[serde(skip)]
    pub lower_case: String,
    #[serde(skip)]
    pub span: SourceSpan,
}

impl Id {
    /// Converts a `&str` into an `Id`.
    pub fn from(str: &str) -> Self {
        Id {
            original: String::from(str),
            lower_case: str.to_lowercase(),
            span: SourceSpan::default(),
        }
    }

    pub fn with_span(mut self, span: SourceSpan) -> Self {
        self.span = span;
        self
    }

    /// Returns the lower case spelling used for comparisons.
    pub fn lower_case(&self) -> &str {
        &self.lower_case
    }

    pub fn original(&self) -> &str {
        &self.original
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Spelling {
            original: String,
        }
        let spelling = Spelling::deserialize(deserializer)?;
        Ok(Id::from(&spelling.original))
    }
}

impl Clone for Id {
    fn clone(&self) -> Self {
        Id::from(self.original.as_str()).with_span(self.span.clone())
    }
}

impl PartialEq for Id {
    fn eq(&self, other: &Self) -> bool {
        self.lower_case == other.lower_case
    }
}
impl Eq for Id {}

impl PartialOrd for Id {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Id {
    fn cmp(&self, other: &Self) -> Ordering {
        self.lower_case.cmp(&other.lower_case)
    }
}

impl Hash for Id {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.lower_case.hash(state);
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

impl Located for Id {
    fn span(&self) -> SourceSpan {
        self.span.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_when_different_case_then_equal() {
        assert_eq!(Id::from("Motor_Starter"), Id::from("MOTOR_STARTER"));
    }

    #[test]
    fn id_when_different_spelling_then_not_equal() {
        assert_ne!(Id::from("motor"), Id::from("pump"));
    }

    #[test]
    fn source_span_when_compared_then_position_ignored() {
        assert_eq!(SourceSpan::range(0, 4), SourceSpan::range(10, 20));
    }

    #[test]
    fn file_id_when_display_then_returns_value() {
        let file_id = FileId::from_string("line_logic");
        assert_eq!(format!("{file_id}"), "line_logic");
    }
}
