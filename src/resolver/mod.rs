mod vocabulary;

pub use vocabulary::Vocabulary;

use crate::error::{PipelineError, Result};
use crate::models::{EntityName, LinkContext};

/// Infers which bank a link belongs to from the text around it.
#[derive(Debug, Clone)]
pub struct Resolver {
    vocabulary: Vocabulary,
}

impl Resolver {
    pub fn new(vocabulary: Vocabulary) -> Self {
        Self { vocabulary }
    }

    /// Checks the enclosing element first, then one level further out.
    pub fn resolve(&self, context: &LinkContext) -> Result<EntityName> {
        [&context.enclosing, &context.outer]
            .into_iter()
            .find_map(|text| self.vocabulary.find(text))
            .cloned()
            .ok_or_else(|| PipelineError::Resolution(snippet(&context.outer)))
    }
}

fn snippet(text: &str) -> String {
    const MAX_CHARS: usize = 120;
    if text.chars().count() <= MAX_CHARS {
        text.to_string()
    } else {
        let cut: String = text.chars().take(MAX_CHARS).collect();
        format!("{}...", cut)
    }
}
