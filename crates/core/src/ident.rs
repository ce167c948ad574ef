//! Validated identifiers used to build storage paths.
//!
//! Both the upload identifier and the original file name arrive from the
//! client and end up as filesystem path components, so they are validated
//! against allow-list patterns before any path construction. The storage
//! backend performs its own traversal checks as a second layer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length of a file id.
const MAX_FILE_ID_LEN: usize = 128;

/// Maximum length of a sanitized file name.
const MAX_FILE_NAME_LEN: usize = 255;

/// A client-supplied identifier grouping all chunks of one logical file.
///
/// Restricted to ASCII alphanumerics, hyphen and underscore, starting with
/// an alphanumeric. This rules out path separators, `..`, and hidden-file
/// prefixes by construction.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FileId(String);

impl FileId {
    /// Validate and wrap a raw file id.
    pub fn parse(s: &str) -> crate::Result<Self> {
        if s.is_empty() {
            return Err(crate::Error::InvalidFileId("must not be empty".to_string()));
        }
        if s.len() > MAX_FILE_ID_LEN {
            return Err(crate::Error::InvalidFileId(format!(
                "length {} exceeds maximum {}",
                s.len(),
                MAX_FILE_ID_LEN
            )));
        }
        let mut chars = s.chars();
        let first = chars.next().expect("non-empty checked above");
        if !first.is_ascii_alphanumeric() {
            return Err(crate::Error::InvalidFileId(format!(
                "must start with an ASCII alphanumeric, got {first:?}"
            )));
        }
        if !s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(crate::Error::InvalidFileId(format!(
                "contains characters outside [A-Za-z0-9_-]: {s:?}"
            )));
        }
        Ok(Self(s.to_string()))
    }

    /// Get the underlying string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for FileId {
    type Error = crate::Error;

    fn try_from(s: String) -> crate::Result<Self> {
        Self::parse(&s)
    }
}

impl From<FileId> for String {
    fn from(id: FileId) -> String {
        id.0
    }
}

impl AsRef<str> for FileId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileId({})", self.0)
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sanitize a client-supplied file name into a safe single path component.
///
/// Strips any directory prefix, then requires the remainder to consist of
/// ASCII alphanumerics, dot, hyphen and underscore, with at least one
/// non-dot character. The extension survives sanitization, so the merged
/// artifact keeps the original file type suffix.
pub fn sanitize_file_name(name: &str) -> crate::Result<String> {
    // Take the last path component regardless of separator convention.
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .expect("rsplit yields at least one element");

    if base.is_empty() {
        return Err(crate::Error::InvalidFileName(
            "must not be empty".to_string(),
        ));
    }
    if base.len() > MAX_FILE_NAME_LEN {
        return Err(crate::Error::InvalidFileName(format!(
            "length {} exceeds maximum {}",
            base.len(),
            MAX_FILE_NAME_LEN
        )));
    }
    if !base
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_')
    {
        return Err(crate::Error::InvalidFileName(format!(
            "contains characters outside [A-Za-z0-9._-]: {base:?}"
        )));
    }
    if base.chars().all(|c| c == '.') {
        return Err(crate::Error::InvalidFileName(format!(
            "must contain a non-dot character: {base:?}"
        )));
    }
    Ok(base.to_string())
}
