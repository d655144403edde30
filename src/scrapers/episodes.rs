//! URL construction and page retrieval for one show.

use tracing::debug;
use url::Url;

use super::{FetchError, PageSource};
use crate::config::SourceConfig;

/// Fetches the three page kinds of a show through a `PageSource`.
pub struct EpisodeFetcher<'a> {
    source: &'a dyn PageSource,
    config: &'a SourceConfig,
}

impl<'a> EpisodeFetcher<'a> {
    pub fn new(source: &'a dyn PageSource, config: &'a SourceConfig) -> Self {
        Self { source, config }
    }

    /// Raw markup of a season's listing page.
    pub async fn fetch_listing(&self, season: u32) -> Result<String, FetchError> {
        let url = self.config.listing_url(season);
        debug!("Fetching season {} listing: {}", season, url);
        self.source.fetch(&url).await
    }

    /// Raw markup of an episode's keyword page.
    pub async fn fetch_keywords(&self, episode_link: &str) -> Result<String, FetchError> {
        let url = self.subpage_url(episode_link, &self.config.keywords_path)?;
        self.source.fetch(&url).await
    }

    /// Raw markup of an episode's credits page.
    pub async fn fetch_credits(&self, episode_link: &str) -> Result<String, FetchError> {
        let url = self.subpage_url(episode_link, &self.config.credits_path)?;
        self.source.fetch(&url).await
    }

    /// Resolve an episode link (absolute or relative) to its canonical base URL.
    ///
    /// Query string and fragment are dropped and the path always ends in `/`,
    /// so `/title/tt1480055/?ref_=ttep_ep1` becomes
    /// `https://www.imdb.com/title/tt1480055/`.
    pub fn resolve_link(&self, href: &str) -> Result<String, FetchError> {
        let invalid = |reason: String| FetchError::InvalidUrl {
            url: href.to_string(),
            reason,
        };

        let base = Url::parse(&self.config.base_url).map_err(|e| invalid(e.to_string()))?;
        let mut url = base.join(href).map_err(|e| invalid(e.to_string()))?;
        url.set_query(None);
        url.set_fragment(None);
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url.to_string())
    }

    /// URL of a page below an episode's base URL.
    pub fn subpage_url(&self, episode_link: &str, path: &str) -> Result<String, FetchError> {
        let base = self.resolve_link(episode_link)?;
        let url = Url::parse(&base)
            .and_then(|u| u.join(path))
            .map_err(|e| FetchError::InvalidUrl {
                url: format!("{}{}", base, path),
                reason: e.to_string(),
            })?;
        Ok(url.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::StaticPages;

    #[test]
    fn resolves_relative_link_without_query() {
        let pages = StaticPages::new();
        let config = SourceConfig::default();
        let fetcher = EpisodeFetcher::new(&pages, &config);

        assert_eq!(
            fetcher.resolve_link("/title/tt1480055/?ref_=ttep_ep1").unwrap(),
            "https://www.imdb.com/title/tt1480055/"
        );
        assert_eq!(
            fetcher.resolve_link("/title/tt1480055").unwrap(),
            "https://www.imdb.com/title/tt1480055/"
        );
    }

    #[test]
    fn builds_keyword_and_credit_urls() {
        let pages = StaticPages::new();
        let config = SourceConfig::default();
        let fetcher = EpisodeFetcher::new(&pages, &config);

        assert_eq!(
            fetcher
                .subpage_url("/title/tt1480055/?ref_=ttep_ep1", "keywords")
                .unwrap(),
            "https://www.imdb.com/title/tt1480055/keywords"
        );
        assert_eq!(
            fetcher
                .subpage_url("https://www.imdb.com/title/tt1668746/", "fullcredits")
                .unwrap(),
            "https://www.imdb.com/title/tt1668746/fullcredits"
        );
    }

    #[test]
    fn invalid_base_url_is_reported() {
        let pages = StaticPages::new();
        let config = SourceConfig {
            base_url: "not a url".to_string(),
            ..Default::default()
        };
        let fetcher = EpisodeFetcher::new(&pages, &config);

        assert!(matches!(
            fetcher.resolve_link("/title/tt1/"),
            Err(FetchError::InvalidUrl { .. })
        ));
    }

    #[tokio::test]
    async fn fetches_listing_from_template() {
        let config = SourceConfig {
            listing_url_template: "https://example.com/{show}/s{season}".to_string(),
            show_id: "show".to_string(),
            ..Default::default()
        };
        let pages = StaticPages::new().with_page("https://example.com/show/s2", "<html></html>");
        let fetcher = EpisodeFetcher::new(&pages, &config);

        assert_eq!(fetcher.fetch_listing(2).await.unwrap(), "<html></html>");
        assert!(fetcher.fetch_listing(3).await.is_err());
    }
}
