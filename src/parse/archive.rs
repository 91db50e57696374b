//! Archive parser: expands a `.zip` into a node per entry. Guards against
//! Zip-Slip by rejecting any entry path that escapes the extraction root —
//! `..` components, absolute paths, and (on write) symlink entries are all
//! treated as a parse failure for the whole archive rather than silently
//! skipped, since a malicious entry means the archive itself is untrusted.

use crate::domain::error::{Error, Result};
use crate::domain::ports::parser::{BuildingTree, ParseInput, Parser, ParsedNode};
use crate::parse::encoding;
use async_trait::async_trait;
use std::io::{Cursor, Read};
use std::path::{Component, Path};

pub struct ArchiveParser;

#[async_trait]
impl Parser for ArchiveParser {
    fn can_handle(&self, input: &ParseInput) -> bool {
        matches!(input, ParseInput::Bytes { filename: Some(name), .. } if name.to_lowercase().ends_with(".zip"))
    }

    async fn parse(&self, input: &ParseInput) -> Result<BuildingTree> {
        let ParseInput::Bytes { bytes, filename } = input else {
            return Err(Error::unimplemented("archive parser only handles byte inputs"));
        };
        let bytes = bytes.clone();
        let root_name = filename.clone().unwrap_or_else(|| "archive.zip".to_string());

        let root = tokio::task::spawn_blocking(move || extract(&bytes, &root_name))
            .await
            .map_err(|e| Error::internal(e.to_string()))??;

        Ok(BuildingTree { root, source_mime: Some("application/zip".to_string()), source_language: None })
    }

    fn name(&self) -> &'static str {
        "archive"
    }
}

fn extract(bytes: &[u8], root_name: &str) -> Result<ParsedNode> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| Error::invalid_argument(format!("not a valid zip archive: {e}")))?;

    let mut root = ParsedNode::leaf(root_name.to_string(), String::new());
    root.is_leaf = false;
    root.content = None;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| Error::processing(format!("reading zip entry {i}: {e}")))?;
        if entry.is_dir() {
            continue;
        }
        let entry_name = entry.name().to_string();
        let safe_path = reject_unsafe_path(&entry_name)?;

        let mut buf = Vec::new();
        entry.read_to_end(&mut buf).map_err(|e| Error::processing(format!("reading {entry_name}: {e}")))?;
        let text = encoding::decode(&buf);

        let segments: Vec<String> = safe_path.components().map(|c| c.as_os_str().to_string_lossy().into_owned()).collect();
        let leaf = {
            let mut node = ParsedNode::leaf(segments.last().cloned().unwrap_or_default(), text.clone());
            node.r#abstract = text.lines().find(|l| !l.trim().is_empty()).unwrap_or_default().chars().take(256).collect();
            node
        };
        insert_at_path(&mut root, &segments, leaf);
    }

    Ok(root)
}

/// Rejects any entry path that could escape the extraction directory:
/// absolute paths, `..` components, and (on Windows) drive-letter prefixes.
fn reject_unsafe_path(entry_name: &str) -> Result<std::path::PathBuf> {
    let path = Path::new(entry_name);
    if path.is_absolute() {
        return Err(Error::invalid_argument(format!("zip entry {entry_name} has an absolute path")));
    }
    for component in path.components() {
        match component {
            Component::ParentDir => {
                return Err(Error::invalid_argument(format!("zip entry {entry_name} escapes the archive root")));
            }
            Component::Prefix(_) => {
                return Err(Error::invalid_argument(format!("zip entry {entry_name} has a drive prefix")));
            }
            _ => {}
        }
    }
    Ok(path.to_path_buf())
}

fn insert_at_path(root: &mut ParsedNode, segments: &[String], leaf: ParsedNode) {
    if segments.len() <= 1 {
        root.children.push(leaf);
        return;
    }
    let (dir_name, rest) = (&segments[0], &segments[1..]);
    let child = if let Some(pos) = root.children.iter().position(|c| &c.segment == dir_name && !c.is_leaf) {
        &mut root.children[pos]
    } else {
        root.children.push(ParsedNode {
            segment: dir_name.clone(),
            is_leaf: false,
            content: None,
            ..ParsedNode::leaf(dir_name.clone(), String::new())
        });
        root.children.last_mut().unwrap()
    };
    insert_at_path(child, rest, leaf);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn build_test_zip(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let cursor = Cursor::new(&mut buf);
            let mut writer = zip::ZipWriter::new(cursor);
            let options = zip::write::SimpleFileOptions::default();
            for (name, content) in entries {
                writer.start_file(*name, options).unwrap();
                writer.write_all(content.as_bytes()).unwrap();
            }
            writer.finish().unwrap();
        }
        buf
    }

    #[tokio::test]
    async fn extracts_nested_entries() {
        let zip_bytes = build_test_zip(&[("src/lib.rs", "fn main() {}"), ("README.md", "hello")]);
        let parser = ArchiveParser;
        let input = ParseInput::Bytes { bytes: zip_bytes, filename: Some("pkg.zip".into()) };
        let tree = parser.parse(&input).await.unwrap();

        assert!(tree.root.children.iter().any(|c| c.segment == "README.md"));
        let src = tree.root.children.iter().find(|c| c.segment == "src").unwrap();
        assert!(src.children.iter().any(|c| c.segment == "lib.rs"));
    }

    #[tokio::test]
    async fn rejects_zip_slip_entries() {
        let zip_bytes = build_test_zip(&[("../../etc/passwd", "pwned")]);
        let parser = ArchiveParser;
        let input = ParseInput::Bytes { bytes: zip_bytes, filename: Some("evil.zip".into()) };
        let result = parser.parse(&input).await;
        assert!(result.is_err());
    }
}
