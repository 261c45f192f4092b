use crate::config::CorpusPolicy;

/// Substituted when too little same-language text was gathered.
pub const FALLBACK_TEXT: &str = "You don't have enough examples in this language.
Use general reasoning to guess an answer.
If unsure, respond in English and say you're learning.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorpusOrigin {
    Scraped,
    Fallback,
}

/// Model context, already cut to the policy's budget.
#[derive(Debug, Clone)]
pub struct Corpus {
    pub text: String,
    pub origin: CorpusOrigin,
}

pub fn build(raw: &str, policy: CorpusPolicy) -> Corpus {
    let (source, origin) = if raw.chars().count() < policy.min_chars {
        (FALLBACK_TEXT, CorpusOrigin::Fallback)
    } else {
        (raw, CorpusOrigin::Scraped)
    };
    Corpus {
        text: truncate_chars(source, policy.max_chars).to_string(),
        origin,
    }
}

/// Longest prefix of `text` holding at most `max_chars` chars.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}
