//! Raw-content parser: the fallback for any input no other parser claims.
//! Produces a single leaf node whose body is the decoded text.

use crate::domain::error::Result;
use crate::domain::ports::parser::{BuildingTree, ParseInput, Parser, ParsedNode};
use crate::parse::encoding;
use async_trait::async_trait;

pub struct RawContentParser;

#[async_trait]
impl Parser for RawContentParser {
    fn can_handle(&self, _input: &ParseInput) -> bool {
        true
    }

    async fn parse(&self, input: &ParseInput) -> Result<BuildingTree> {
        let (segment, text) = match input {
            ParseInput::Bytes { bytes, filename } => {
                let name = filename.clone().unwrap_or_else(|| "content".to_string());
                (name, encoding::decode(bytes))
            }
            ParseInput::Url(url) => (url.clone(), String::new()),
            ParseInput::DirectoryPath(path) => (path.clone(), String::new()),
        };
        let mut root = ParsedNode::leaf(segment, text.clone());
        root.r#abstract = abstract_seed(&text);
        Ok(BuildingTree { root, source_mime: Some("text/plain".to_string()), source_language: None })
    }

    fn name(&self) -> &'static str {
        "raw"
    }
}

/// First non-empty line, clipped to ~256 chars, used as the L0 abstract seed.
fn abstract_seed(text: &str) -> String {
    let first_line = text.lines().find(|l| !l.trim().is_empty()).unwrap_or_default();
    first_line.chars().take(256).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn parses_bytes_into_a_leaf() {
        let parser = RawContentParser;
        let input = ParseInput::Bytes { bytes: b"hello\nworld".to_vec(), filename: Some("a.txt".into()) };
        let tree = parser.parse(&input).await.unwrap();
        assert_eq!(tree.root.segment, "a.txt");
        assert_eq!(tree.root.content.as_deref(), Some("hello\nworld"));
        assert_eq!(tree.root.r#abstract, "hello");
    }
}
