/// Blob storage data models
use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical partition of the blob store
///
/// Keys are unique per namespace; the same key may exist in both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    /// Images uploaded by clients
    Uploads,
    /// Rendered diff images
    Outputs,
}

impl Namespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Uploads => "uploads",
            Namespace::Outputs => "outputs",
        }
    }

    pub fn all() -> [Namespace; 2] {
        [Namespace::Uploads, Namespace::Outputs]
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Check that a key names a single entry inside its namespace
///
/// Rejects empty keys, `.`/`..`, path separators and NUL so a key can never
/// escape the namespace directory.
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key != "."
        && key != ".."
        && !key.contains(['/', '\\', '\0'])
}
