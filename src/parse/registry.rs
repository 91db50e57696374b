//! Parser registry: dispatches a [`ParseInput`] to the first parser that
//! claims it, falling back to the raw-content parser when nothing else
//! matches.

use crate::domain::error::Result;
use crate::domain::ports::parser::{BuildingTree, ParseInput, Parser};
use crate::parse::{archive::ArchiveParser, code::CodeParser, directory::DirectoryParser, markdown::MarkdownParser, raw::RawContentParser, url::UrlParser};
use std::sync::Arc;

pub struct ParserRegistry {
    parsers: Vec<Arc<dyn Parser>>,
    fallback: Arc<dyn Parser>,
}

impl ParserRegistry {
    pub fn new() -> Self {
        Self {
            parsers: vec![
                Arc::new(UrlParser::default()),
                Arc::new(DirectoryParser),
                Arc::new(ArchiveParser),
                Arc::new(MarkdownParser),
                Arc::new(CodeParser),
            ],
            fallback: Arc::new(RawContentParser),
        }
    }

    /// The parser that would be used for `input`, in registration order,
    /// falling back to the raw-content parser.
    pub fn resolve(&self, input: &ParseInput) -> Arc<dyn Parser> {
        self.parsers.iter().find(|p| p.can_handle(input)).cloned().unwrap_or_else(|| self.fallback.clone())
    }

    pub async fn parse(&self, input: &ParseInput) -> Result<BuildingTree> {
        self.resolve(input).parse(input).await
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatches_by_extension() {
        let registry = ParserRegistry::new();
        let md = ParseInput::Bytes { bytes: vec![], filename: Some("a.md".into()) };
        assert_eq!(registry.resolve(&md).name(), "markdown");

        let rs = ParseInput::Bytes { bytes: vec![], filename: Some("a.rs".into()) };
        assert_eq!(registry.resolve(&rs).name(), "code");

        let zip = ParseInput::Bytes { bytes: vec![], filename: Some("a.zip".into()) };
        assert_eq!(registry.resolve(&zip).name(), "archive");

        let unknown = ParseInput::Bytes { bytes: vec![], filename: Some("a.bin".into()) };
        assert_eq!(registry.resolve(&unknown).name(), "raw");
    }

    #[test]
    fn dispatches_url_and_directory_variants() {
        let registry = ParserRegistry::new();
        assert_eq!(registry.resolve(&ParseInput::Url("https://example.com".into())).name(), "url");
        assert_eq!(registry.resolve(&ParseInput::DirectoryPath("/tmp".into())).name(), "directory");
    }
}
