//! Tree-sitter code parser: extracts top-level items (functions, types,
//! impls) as nodes rather than chunking the full AST. One node per item,
//! named from its `name`/`identifier` child when the grammar exposes one.

use crate::domain::error::{Error, Result};
use crate::domain::ports::parser::{BuildingTree, ParseInput, Parser, ParsedNode};
use crate::parse::encoding;
use async_trait::async_trait;
use tree_sitter::{Language, Node};

struct LanguageSpec {
    language: Language,
    name: &'static str,
    extensions: &'static [&'static str],
    top_level_kinds: &'static [&'static str],
}

fn language_specs() -> Vec<LanguageSpec> {
    vec![
        LanguageSpec {
            language: tree_sitter_rust::LANGUAGE.into(),
            name: "rust",
            extensions: &["rs"],
            top_level_kinds: &[
                "function_item",
                "struct_item",
                "enum_item",
                "trait_item",
                "impl_item",
                "mod_item",
                "const_item",
                "static_item",
                "type_item",
            ],
        },
        LanguageSpec {
            language: tree_sitter_python::LANGUAGE.into(),
            name: "python",
            extensions: &["py"],
            top_level_kinds: &["function_definition", "class_definition"],
        },
        LanguageSpec {
            language: tree_sitter_javascript::LANGUAGE.into(),
            name: "javascript",
            extensions: &["js", "jsx", "mjs"],
            top_level_kinds: &["function_declaration", "class_declaration", "lexical_declaration"],
        },
        LanguageSpec {
            language: tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            name: "typescript",
            extensions: &["ts"],
            top_level_kinds: &[
                "function_declaration",
                "class_declaration",
                "interface_declaration",
                "type_alias_declaration",
                "lexical_declaration",
            ],
        },
        LanguageSpec {
            language: tree_sitter_typescript::LANGUAGE_TSX.into(),
            name: "tsx",
            extensions: &["tsx"],
            top_level_kinds: &[
                "function_declaration",
                "class_declaration",
                "interface_declaration",
                "type_alias_declaration",
                "lexical_declaration",
            ],
        },
        LanguageSpec {
            language: tree_sitter_go::LANGUAGE.into(),
            name: "go",
            extensions: &["go"],
            top_level_kinds: &["function_declaration", "method_declaration", "type_declaration", "const_declaration", "var_declaration"],
        },
    ]
}

fn extension_of(filename: &str) -> Option<String> {
    filename.rsplit('.').next().map(|s| s.to_lowercase())
}

pub struct CodeParser;

#[async_trait]
impl Parser for CodeParser {
    fn can_handle(&self, input: &ParseInput) -> bool {
        let ParseInput::Bytes { filename: Some(name), .. } = input else { return false };
        let Some(ext) = extension_of(name) else { return false };
        language_specs().iter().any(|spec| spec.extensions.contains(&ext.as_str()))
    }

    async fn parse(&self, input: &ParseInput) -> Result<BuildingTree> {
        let ParseInput::Bytes { bytes, filename: Some(filename) } = input else {
            return Err(Error::unimplemented("code parser only handles named byte inputs"));
        };
        let ext = extension_of(filename).ok_or_else(|| Error::unimplemented("file has no extension"))?;
        let spec = language_specs()
            .into_iter()
            .find(|spec| spec.extensions.contains(&ext.as_str()))
            .ok_or_else(|| Error::unimplemented(format!("no grammar registered for .{ext}")))?;

        let source = encoding::decode(bytes);
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&spec.language)
            .map_err(|e| Error::processing(format!("failed to load {} grammar: {e}", spec.name)))?;
        let tree = parser
            .parse(&source, None)
            .ok_or_else(|| Error::processing(format!("tree-sitter failed to parse {filename}")))?;

        let mut root = ParsedNode::leaf(filename.clone(), String::new());
        root.is_leaf = false;
        root.content = None;
        root.r#abstract = format!("{} source file", spec.name);

        let mut cursor = tree.root_node().walk();
        for child in tree.root_node().children(&mut cursor) {
            if spec.top_level_kinds.contains(&child.kind()) {
                root.children.push(node_from_item(&child, &source));
            }
        }
        root.overview = format!("{} top-level items", root.children.len());

        Ok(BuildingTree { root, source_mime: None, source_language: Some(spec.name.to_string()) })
    }

    fn name(&self) -> &'static str {
        "code"
    }
}

fn node_from_item(node: &Node, source: &str) -> ParsedNode {
    let text = node.utf8_text(source.as_bytes()).unwrap_or_default().to_string();
    let item_name = node
        .child_by_field_name("name")
        .and_then(|n| n.utf8_text(source.as_bytes()).ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| node.kind().to_string());

    let mut parsed = ParsedNode::leaf(item_name, text.clone());
    parsed.r#abstract = text.lines().next().unwrap_or_default().trim().chars().take(256).collect();
    parsed.overview = node.kind().to_string();
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn extracts_top_level_rust_items() {
        let parser = CodeParser;
        let source = "fn foo() {}\n\nstruct Bar { x: i32 }\n";
        let input = ParseInput::Bytes { bytes: source.as_bytes().to_vec(), filename: Some("lib.rs".into()) };
        let tree = parser.parse(&input).await.unwrap();
        assert_eq!(tree.source_language.as_deref(), Some("rust"));
        let names: Vec<_> = tree.root.children.iter().map(|c| c.segment.as_str()).collect();
        assert_eq!(names, vec!["foo", "Bar"]);
    }

    #[test]
    fn can_handle_checks_extension() {
        let parser = CodeParser;
        let rs = ParseInput::Bytes { bytes: vec![], filename: Some("a.rs".into()) };
        let unknown = ParseInput::Bytes { bytes: vec![], filename: Some("a.bin".into()) };
        assert!(parser.can_handle(&rs));
        assert!(!parser.can_handle(&unknown));
    }
}
