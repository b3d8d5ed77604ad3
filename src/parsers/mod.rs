pub mod page;

pub use page::*;

/// Collapse every run of whitespace to a single space and trim both ends.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  123  Main \t St\n"), "123 Main St");
        assert_eq!(clean_text("   "), "");
        assert_eq!(clean_text("Delhi"), "Delhi");
    }
}
