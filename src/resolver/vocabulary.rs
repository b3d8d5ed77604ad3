use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};
use crate::models::EntityName;
use crate::parsers::clean_text;

#[derive(Debug, Clone)]
struct Alias {
    /// Lower-cased, whitespace-collapsed form used for matching.
    needle: String,
    text: String,
    canonical: EntityName,
}

/// Alias → canonical bank name mapping, loaded once per run.
///
/// Aliases are kept longest first so that when one alias contains another
/// ("Bank of India" inside "Central Bank of India") the more specific one
/// wins regardless of file order.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    aliases: Vec<Alias>,
}

impl Vocabulary {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Vocabulary(format!("could not open {}: {}", path.display(), e))
        })?;

        let map: HashMap<String, String> = serde_json::from_str(&content).map_err(|e| {
            PipelineError::Vocabulary(format!("could not decode {}: {}", path.display(), e))
        })?;

        let vocabulary = Self::from_pairs(map)?;
        info!("Loaded {} bank aliases from {}", vocabulary.len(), path.display());

        let overlaps = vocabulary.overlaps();
        if !overlaps.is_empty() {
            warn!(
                "{} aliases are contained in other aliases; the longer alias takes precedence",
                overlaps.len()
            );
        }
        for (shorter, longer) in overlaps {
            debug!("Alias \"{}\" is contained in \"{}\"", shorter, longer);
        }

        Ok(vocabulary)
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Result<Self>
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut aliases = Vec::new();

        for (alias, canonical) in pairs {
            let text: String = alias.into();
            let canonical: String = canonical.into();

            let needle = clean_text(&text).to_lowercase();
            if needle.is_empty() {
                return Err(PipelineError::Vocabulary(format!(
                    "blank alias for \"{}\"",
                    canonical
                )));
            }
            if canonical.trim().is_empty() {
                return Err(PipelineError::Vocabulary(format!(
                    "alias \"{}\" has a blank canonical name",
                    text
                )));
            }

            aliases.push(Alias {
                needle,
                text,
                canonical: EntityName(canonical),
            });
        }

        if aliases.is_empty() {
            return Err(PipelineError::Vocabulary("vocabulary is empty".to_string()));
        }

        aliases.sort_by(|a, b| {
            b.needle
                .chars()
                .count()
                .cmp(&a.needle.chars().count())
                .then_with(|| a.needle.cmp(&b.needle))
                .then_with(|| a.canonical.0.cmp(&b.canonical.0))
        });

        Ok(Self { aliases })
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    /// Canonical name of the first (longest) alias contained in `text`.
    pub fn find(&self, text: &str) -> Option<&EntityName> {
        let haystack = clean_text(text).to_lowercase();
        if haystack.is_empty() {
            return None;
        }

        self.aliases
            .iter()
            .find(|alias| haystack.contains(&alias.needle))
            .map(|alias| &alias.canonical)
    }

    /// Pairs `(shorter, longer)` where the shorter alias occurs inside the
    /// longer one and the two map to different names.
    pub fn overlaps(&self) -> Vec<(&str, &str)> {
        let mut pairs = Vec::new();

        for (i, longer) in self.aliases.iter().enumerate() {
            for shorter in &self.aliases[i + 1..] {
                if longer.canonical != shorter.canonical && longer.needle.contains(&shorter.needle) {
                    pairs.push((shorter.text.as_str(), longer.text.as_str()));
                }
            }
        }

        pairs
    }
}
