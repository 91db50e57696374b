//! Markdown parser: turns a document's heading hierarchy into a node tree,
//! one node per section, with fenced-code and prose folded into that
//! section's content.

use crate::domain::error::{Error, Result};
use crate::domain::ports::parser::{BuildingTree, ParseInput, Parser, ParsedNode};
use crate::parse::encoding;
use async_trait::async_trait;
use pulldown_cmark::{Event, HeadingLevel, Parser as CmarkParser, Tag, TagEnd};

pub struct MarkdownParser;

struct Section {
    level: u8,
    title: String,
    body: String,
}

#[async_trait]
impl Parser for MarkdownParser {
    fn can_handle(&self, input: &ParseInput) -> bool {
        matches!(input, ParseInput::Bytes { filename: Some(name), .. } if name.to_lowercase().ends_with(".md") || name.to_lowercase().ends_with(".markdown"))
    }

    async fn parse(&self, input: &ParseInput) -> Result<BuildingTree> {
        let ParseInput::Bytes { bytes, filename } = input else {
            return Err(Error::unimplemented("markdown parser only handles byte inputs"));
        };
        let text = encoding::decode(bytes);
        let sections = split_into_sections(&text);
        let root_title = filename.clone().unwrap_or_else(|| "document".to_string());
        let root = build_tree(&root_title, &sections);
        Ok(BuildingTree { root, source_mime: Some("text/markdown".to_string()), source_language: None })
    }

    fn name(&self) -> &'static str {
        "markdown"
    }
}

/// Splits a document into flat `(level, title, body)` sections by heading,
/// with any text before the first heading collected under level 0.
fn split_into_sections(text: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut current_title = String::new();
    let mut current_level: u8 = 0;
    let mut current_body = String::new();
    let mut in_heading = false;

    for event in CmarkParser::new(text) {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                if !current_title.is_empty() || !current_body.trim().is_empty() {
                    sections.push(Section { level: current_level, title: current_title.clone(), body: current_body.clone() });
                }
                current_title.clear();
                current_body.clear();
                current_level = heading_level_to_u8(level);
                in_heading = true;
            }
            Event::End(TagEnd::Heading(_)) => {
                in_heading = false;
            }
            Event::Text(t) | Event::Code(t) => {
                if in_heading {
                    current_title.push_str(&t);
                } else {
                    current_body.push_str(&t);
                }
            }
            Event::SoftBreak | Event::HardBreak => current_body.push('\n'),
            Event::End(TagEnd::Paragraph) | Event::End(TagEnd::CodeBlock) => current_body.push('\n'),
            _ => {}
        }
    }
    if !current_title.is_empty() || !current_body.trim().is_empty() {
        sections.push(Section { level: current_level, title: current_title, body: current_body });
    }
    sections
}

fn heading_level_to_u8(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// Nests flat sections into a tree by heading level: a level-2 section
/// becomes a child of the nearest preceding level-1 section, and so on.
fn build_tree(root_title: &str, sections: &[Section]) -> ParsedNode {
    let mut root = ParsedNode::leaf(root_title.to_string(), String::new());
    root.is_leaf = false;
    root.content = None;

    // stack holds (level, index-path into root.children) of open ancestors
    let mut stack: Vec<(u8, Vec<usize>)> = Vec::new();

    for section in sections {
        if section.level == 0 {
            root.r#abstract = first_line(&section.body);
            root.overview = section.body.trim().to_string();
            continue;
        }

        let node = ParsedNode {
            segment: section.title.clone(),
            is_leaf: true,
            r#abstract: first_line(&section.body),
            overview: section.body.trim().to_string(),
            content: Some(section.body.trim().to_string()),
            children: Vec::new(),
            meta: Default::default(),
        };

        while let Some((lvl, _)) = stack.last() {
            if *lvl >= section.level {
                stack.pop();
            } else {
                break;
            }
        }

        let parent = match stack.last() {
            Some((_, path)) => get_node_mut(&mut root, path),
            None => &mut root,
        };
        parent.is_leaf = false;
        parent.children.push(node);
        let mut path = stack.last().map(|(_, p)| p.clone()).unwrap_or_default();
        path.push(parent.children.len() - 1);
        stack.push((section.level, path));
    }

    root
}

fn get_node_mut<'a>(root: &'a mut ParsedNode, path: &[usize]) -> &'a mut ParsedNode {
    let mut node = root;
    for &idx in path {
        node = &mut node.children[idx];
    }
    node
}

fn first_line(text: &str) -> String {
    text.lines().find(|l| !l.trim().is_empty()).unwrap_or_default().trim().chars().take(256).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn builds_nested_sections_from_headings() {
        let parser = MarkdownParser;
        let doc = "# Title\n\nintro text\n\n## Section A\n\nbody a\n\n### Sub A1\n\nbody a1\n\n## Section B\n\nbody b\n";
        let input = ParseInput::Bytes { bytes: doc.as_bytes().to_vec(), filename: Some("notes.md".into()) };
        let tree = parser.parse(&input).await.unwrap();

        assert_eq!(tree.root.children.len(), 2);
        assert_eq!(tree.root.children[0].segment, "Section A");
        assert_eq!(tree.root.children[0].children.len(), 1);
        assert_eq!(tree.root.children[0].children[0].segment, "Sub A1");
        assert_eq!(tree.root.children[1].segment, "Section B");
    }

    #[test]
    fn can_handle_matches_markdown_extensions() {
        let parser = MarkdownParser;
        let md = ParseInput::Bytes { bytes: vec![], filename: Some("a.md".into()) };
        let txt = ParseInput::Bytes { bytes: vec![], filename: Some("a.txt".into()) };
        assert!(parser.can_handle(&md));
        assert!(!parser.can_handle(&txt));
    }
}
