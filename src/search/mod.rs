//! Content acquisition: fetch a search results page and keep same-language text.

pub(crate) mod blocks;
mod lang;

pub use lang::{LanguageCode, detect};

use std::time::Duration;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::Client;
use tracing::debug;

use crate::config::SearchConfig;
use crate::fetch::{self, FetchError};
use blocks::BlockFilter;

/// Same set a browser's `encodeURIComponent` leaves untouched.
const QUERY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Source of same-language sample text for a query.
/// Implemented by `SearchScraper` for production; mock implementations used in tests.
pub trait ContentSource {
    async fn acquire(&self, query: &str, target: &LanguageCode) -> Result<String, FetchError>;
}

pub struct SearchScraper {
    http: Client,
    base_url: String,
    min_block_chars: usize,
    timeout: Duration,
}

impl SearchScraper {
    pub fn new(http: Client, config: &SearchConfig) -> Self {
        Self {
            http,
            base_url: config.base_url.clone(),
            min_block_chars: config.min_block_chars,
            timeout: config.timeout,
        }
    }
}

impl ContentSource for SearchScraper {
    async fn acquire(&self, query: &str, target: &LanguageCode) -> Result<String, FetchError> {
        let url = search_url(&self.base_url, query);
        let html = fetch::download(&self.http, &url, self.timeout).await?;

        let filter = BlockFilter {
            target: target.clone(),
            min_chars: self.min_block_chars,
        };
        let text = filter.collect(&html);
        debug!(%target, chars = text.chars().count(), "collected same-language text");
        Ok(text)
    }
}

fn search_url(base_url: &str, query: &str) -> String {
    format!("{base_url}?q={}", utf8_percent_encode(query, QUERY_ENCODE_SET))
}
