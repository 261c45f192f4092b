use scraper::{ElementRef, Html};
use tracing::debug;

use super::lang::{LanguageCode, detect};

/// Element kinds that carry candidate text on a results page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Paragraph,
    Span,
    ListItem,
    Block,
}

impl BlockKind {
    fn from_tag(name: &str) -> Option<Self> {
        match name {
            "p" => Some(Self::Paragraph),
            "span" => Some(Self::Span),
            "li" => Some(Self::ListItem),
            "div" => Some(Self::Block),
            _ => None,
        }
    }
}

/// A trimmed text fragment together with the attributes the filter needs.
#[derive(Debug)]
pub struct TextBlock {
    pub kind: BlockKind,
    pub text: String,
    pub len: usize,
    pub lang: LanguageCode,
}

/// Keeps blocks longer than `min_chars` whose language matches `target`.
#[derive(Debug, Clone)]
pub struct BlockFilter {
    pub target: LanguageCode,
    pub min_chars: usize,
}

impl BlockFilter {
    fn accepts_len(&self, len: usize) -> bool {
        len > self.min_chars
    }

    fn accepts(&self, block: &TextBlock) -> bool {
        self.accepts_len(block.len) && block.lang.matches(&self.target)
    }

    /// Walks `html` in document order and returns every accepted block,
    /// each followed by a newline.
    pub fn collect(&self, html: &str) -> String {
        let document = Html::parse_document(html);
        let mut corpus = String::new();
        for block in text_blocks(&document, |len| self.accepts_len(len)) {
            if self.accepts(&block) {
                debug!(kind = ?block.kind, len = block.len, "kept block");
                corpus.push_str(&block.text);
                corpus.push('\n');
            }
        }
        corpus
    }
}

/// Pre-order walk over the tree yielding a [`TextBlock`] for every element
/// of a known [`BlockKind`]. `wants_len` lets callers skip detection on
/// blocks they would discard anyway.
fn text_blocks<'a>(
    document: &'a Html,
    wants_len: impl Fn(usize) -> bool + 'a,
) -> impl Iterator<Item = TextBlock> + 'a {
    document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter_map(|element| {
            let kind = BlockKind::from_tag(element.value().name())?;
            Some((kind, element))
        })
        .filter_map(move |(kind, element)| {
            let raw: String = element.text().collect();
            let text = raw.trim();
            let len = text.chars().count();
            if !wants_len(len) {
                return None;
            }
            Some(TextBlock {
                kind,
                text: text.to_string(),
                len,
                lang: detect(text),
            })
        })
}
