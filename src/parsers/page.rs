use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};
use url::Url;

use crate::error::{PipelineError, Result};
use crate::models::{LinkContext, ResourceLink};
use crate::parsers::clean_text;

static ANCHOR_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("Invalid anchor selector"));

/// A parsed directory listing page.
pub struct DirectoryPage {
    document: Html,
    base: Url,
}

impl DirectoryPage {
    /// Builds the node tree for `body`, resolving relative links against `base_url`.
    ///
    /// The HTML5 tree builder recovers from any markup error, so only a body
    /// that is empty or not UTF-8 is rejected.
    pub fn parse(body: &[u8], base_url: &str) -> Result<Self> {
        let html = std::str::from_utf8(body)
            .map_err(|e| PipelineError::Parse(format!("body is not valid UTF-8: {}", e)))?;

        if html.trim().is_empty() {
            return Err(PipelineError::Parse("document is empty".to_string()));
        }

        let base = Url::parse(base_url)
            .map_err(|e| PipelineError::Parse(format!("invalid page URL {}: {}", base_url, e)))?;

        Ok(Self {
            document: Html::parse_document(html),
            base,
        })
    }

    /// Links whose `href` ends with `suffix`, in document order.
    pub fn links<'a>(&'a self, suffix: &'a str) -> impl Iterator<Item = ResourceLink> + 'a {
        self.document
            .select(&ANCHOR_SELECTOR)
            .filter_map(move |anchor| {
                let href = anchor.value().attr("href")?;
                if !href.ends_with(suffix) {
                    return None;
                }

                match self.base.join(href) {
                    Ok(locator) => Some((locator.to_string(), capture_context(anchor))),
                    Err(e) => {
                        warn!("Skipping unresolvable link {}: {}", href, e);
                        None
                    }
                }
            })
            .enumerate()
            .map(|(index, (locator, context))| {
                debug!("Found link #{}: {}", index, locator);
                ResourceLink {
                    index,
                    locator,
                    context,
                }
            })
    }
}

/// Parses `body` and collects every matching link.
///
/// `Html` is not `Send`, so callers in async code go through this function to
/// keep the tree out of their futures.
pub fn scan_links(body: &[u8], base_url: &str, suffix: &str) -> Result<Vec<ResourceLink>> {
    let page = DirectoryPage::parse(body, base_url)?;
    let links = page.links(suffix).collect();
    Ok(links)
}

fn capture_context(anchor: ElementRef<'_>) -> LinkContext {
    let enclosing = anchor.parent().and_then(ElementRef::wrap);
    let outer = enclosing
        .and_then(|element| element.parent())
        .and_then(ElementRef::wrap);

    LinkContext {
        enclosing: enclosing.map(element_text).unwrap_or_default(),
        outer: outer.map(element_text).unwrap_or_default(),
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    clean_text(&element.text().collect::<String>())
}
