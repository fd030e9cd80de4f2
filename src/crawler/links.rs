//! Directory link extraction
//!
//! Every listing level (root, subdivision, city) links to its children with
//! the same `div.map-list-item a.ga-link` anchors. Links are resolved
//! against the page URL and filtered to the allowed hosts.

use scraper::Html;
use url::Url;

use crate::parser::selectors::directory_link;

/// Extracts child links from listing pages
#[derive(Debug, Clone, Default)]
pub struct LinkExtractor {
    /// Hosts links may point to; empty allows any host
    allowed_domains: Vec<String>,
}

impl LinkExtractor {
    #[must_use]
    pub fn new(allowed_domains: Vec<String>) -> Self {
        Self {
            allowed_domains: allowed_domains
                .into_iter()
                .map(|d| d.trim().to_ascii_lowercase())
                .filter(|d| !d.is_empty())
                .collect(),
        }
    }

    /// Extract absolute child URLs from a listing page, in page order
    ///
    /// Anchors without an `href`, unresolvable hrefs, non-HTTP schemes and
    /// offsite hosts are skipped.
    ///
    /// # Examples
    ///
    /// ```
    /// use store_locator::crawler::links::LinkExtractor;
    /// use url::Url;
    ///
    /// let extractor = LinkExtractor::new(vec!["restaurants.ihop.com".to_string()]);
    /// let base = Url::parse("https://restaurants.ihop.com/en-us").unwrap();
    /// let html = r#"<div class="map-list-item"><a class="ga-link" href="/en-us/tx">Texas</a></div>"#;
    /// let links = extractor.extract_links(html, &base);
    /// assert_eq!(links[0].as_str(), "https://restaurants.ihop.com/en-us/tx");
    /// ```
    pub fn extract_links(&self, html: &str, base: &Url) -> Vec<Url> {
        let document = Html::parse_document(html);
        self.extract_from_document(&document, base)
    }

    /// Same as [`Self::extract_links`] for an already parsed document
    pub fn extract_from_document(&self, document: &Html, base: &Url) -> Vec<Url> {
        document
            .select(directory_link())
            .filter_map(|anchor| anchor.value().attr("href"))
            .filter_map(|href| self.resolve(href, base))
            .collect()
    }

    /// Resolve an href against the page URL and apply the host filter
    pub fn resolve(&self, href: &str, base: &Url) -> Option<Url> {
        let href = href.trim();
        if href.is_empty() {
            return None;
        }

        let mut url = match base.join(href) {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!(href, error = %e, "Skipping unresolvable link");
                return None;
            }
        };

        if !matches!(url.scheme(), "http" | "https") {
            return None;
        }

        if !self.is_allowed(&url) {
            tracing::debug!(url = %url, "Skipping offsite link");
            return None;
        }

        url.set_fragment(None);
        Some(url)
    }

    /// Check a URL against the allowed hosts
    pub fn is_allowed(&self, url: &Url) -> bool {
        if self.allowed_domains.is_empty() {
            return true;
        }

        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();

        self.allowed_domains
            .iter()
            .any(|domain| host == *domain || host.ends_with(&format!(".{domain}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
        <div class="map-list">
            <div class="map-list-item"><a class="ga-link" href="/en-us/tx">Texas</a></div>
            <div class="map-list-item"><a class="ga-link" href="ca">California</a></div>
            <div class="map-list-item"><a class="ga-link" href="https://restaurants.ihop.com/en-us/ny#top">New York</a></div>
            <div class="map-list-item"><a class="ga-link" href="https://elsewhere.example/">Offsite</a></div>
            <div class="map-list-item"><a class="ga-link">No href</a></div>
            <div class="map-list-item"><a class="ga-link" href="mailto:hi@ihop.com">Mail</a></div>
            <div class="map-list-item"><a class="other" href="/en-us/wrong-class">Ignored</a></div>
            <a class="ga-link" href="/en-us/outside-item">Ignored</a>
        </div>
    "#;

    fn base() -> Url {
        Url::parse("https://restaurants.ihop.com/en-us/").unwrap()
    }

    #[test]
    fn test_extract_links_in_page_order() {
        let extractor = LinkExtractor::new(vec!["restaurants.ihop.com".to_string()]);
        let links: Vec<String> = extractor
            .extract_links(LISTING, &base())
            .into_iter()
            .map(String::from)
            .collect();

        assert_eq!(
            links,
            vec![
                "https://restaurants.ihop.com/en-us/tx",
                "https://restaurants.ihop.com/en-us/ca",
                "https://restaurants.ihop.com/en-us/ny",
            ]
        );
    }

    #[test]
    fn test_empty_allow_list_accepts_any_host() {
        let extractor = LinkExtractor::new(Vec::new());
        let links = extractor.extract_links(LISTING, &base());
        assert_eq!(links.len(), 4);
    }

    #[test]
    fn test_subdomain_is_allowed() {
        let extractor = LinkExtractor::new(vec!["ihop.com".to_string()]);
        assert!(extractor.is_allowed(&Url::parse("https://restaurants.ihop.com/").unwrap()));
        assert!(!extractor.is_allowed(&Url::parse("https://notihop.com/").unwrap()));
    }

    #[test]
    fn test_no_matching_anchors() {
        let extractor = LinkExtractor::default();
        assert!(extractor
            .extract_links("<html><body>Nothing here</body></html>", &base())
            .is_empty());
    }
}
