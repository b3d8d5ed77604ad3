use serde::{Deserialize, Serialize};
use std::fmt;

/// Text of the elements around a link, captured at scan time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkContext {
    /// Text content of the element directly containing the link.
    pub enclosing: String,
    /// Text content of the element one level further out.
    pub outer: String,
}

/// A downloadable resource discovered on the directory page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLink {
    /// Position of the link in document order.
    pub index: usize,
    pub locator: String,
    pub context: LinkContext,
}

// NewType pattern for type safety
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityName(pub String);

impl EntityName {
    /// File name stem safe to join onto a directory.
    pub fn sanitized(&self) -> String {
        self.0.replace(['/', '\\'], "_")
    }
}

impl fmt::Display for EntityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
