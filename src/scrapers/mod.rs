//! Page fetching for season listings, keyword pages and credits pages.

mod episodes;
mod error;
mod http_client;

pub use episodes::EpisodeFetcher;
pub use error::FetchError;
pub use http_client::{resolve_user_agent, HttpClient, USER_AGENT};

use std::collections::HashMap;

use async_trait::async_trait;

/// Anything that can return the raw markup for a URL.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch one page. Every URL is requested at most once per run.
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// In-memory page source keyed by URL.
///
/// Useful for replaying saved pages; URLs without a page fail with
/// `FetchError::NotFound`.
#[derive(Debug, Clone, Default)]
pub struct StaticPages {
    pages: HashMap<String, String>,
}

impl StaticPages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.insert(url.into(), html.into());
        self
    }

    pub fn insert(&mut self, url: impl Into<String>, html: impl Into<String>) {
        self.pages.insert(url.into(), html.into());
    }
}

#[async_trait]
impl PageSource for StaticPages {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(url.to_string()))
    }
}
