//! URL parser: fetches a remote resource and hands its body to the raw
//! parser chain, rewriting a few well-known "blob view" URLs to their raw
//! content endpoints first (GitHub/GitLab blob links return HTML, not the
//! file, unless rewritten).

use crate::domain::error::{Error, Result};
use crate::domain::ports::parser::{BuildingTree, ParseInput, Parser, ParsedNode};
use crate::parse::encoding;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_REDIRECTS: usize = 5;

pub struct UrlParser {
    client: Client,
}

impl Default for UrlParser {
    fn default() -> Self {
        let client = Client::builder()
            .timeout(FETCH_TIMEOUT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .expect("reqwest client with static TLS config should always build");
        Self { client }
    }
}

#[async_trait]
impl Parser for UrlParser {
    fn can_handle(&self, input: &ParseInput) -> bool {
        matches!(input, ParseInput::Url(_))
    }

    async fn parse(&self, input: &ParseInput) -> Result<BuildingTree> {
        let ParseInput::Url(url) = input else {
            return Err(Error::unimplemented("url parser only handles URL inputs"));
        };
        let fetch_url = rewrite_blob_url(url);

        let resp = self
            .client
            .get(&fetch_url)
            .send()
            .await
            .map_err(|e| Error::unavailable(format!("fetching {fetch_url}: {e}")))?;
        if !resp.status().is_success() {
            return Err(Error::unavailable(format!("{fetch_url} returned {}", resp.status())));
        }
        let mime = resp.headers().get(reqwest::header::CONTENT_TYPE).and_then(|v| v.to_str().ok()).map(str::to_string);
        let bytes = resp.bytes().await.map_err(|e| Error::unavailable(format!("reading body of {fetch_url}: {e}")))?;
        let text = encoding::decode(&bytes);

        let segment = url.rsplit('/').next().filter(|s| !s.is_empty()).unwrap_or(url).to_string();
        let mut root = ParsedNode::leaf(segment, text.clone());
        root.r#abstract = text.lines().find(|l| !l.trim().is_empty()).unwrap_or_default().chars().take(256).collect();

        Ok(BuildingTree { root, source_mime: mime, source_language: None })
    }

    fn name(&self) -> &'static str {
        "url"
    }
}

/// Rewrites known "blob view" URLs (GitHub, GitLab) to their raw-content
/// form. Anything else is fetched as given.
fn rewrite_blob_url(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("https://github.com/") {
        if let Some(idx) = rest.find("/blob/") {
            let (repo, tail) = rest.split_at(idx);
            let tail = &tail["/blob/".len()..];
            return format!("https://raw.githubusercontent.com/{repo}/{tail}");
        }
    }
    if url.contains("gitlab.com") && url.contains("/-/blob/") {
        return url.replacen("/-/blob/", "/-/raw/", 1);
    }
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_github_blob_urls_to_raw() {
        let url = "https://github.com/acme/widgets/blob/main/src/lib.rs";
        assert_eq!(rewrite_blob_url(url), "https://raw.githubusercontent.com/acme/widgets/main/src/lib.rs");
    }

    #[test]
    fn rewrites_gitlab_blob_urls_to_raw() {
        let url = "https://gitlab.com/acme/widgets/-/blob/main/src/lib.rs";
        assert_eq!(rewrite_blob_url(url), "https://gitlab.com/acme/widgets/-/raw/main/src/lib.rs");
    }

    #[test]
    fn leaves_unrelated_urls_untouched() {
        let url = "https://example.com/data.json";
        assert_eq!(rewrite_blob_url(url), url);
    }
}
