//! Directory parser: walks a tree on disk, honoring `.gitignore`, a fixed
//! deny-list of noisy directories, and a per-file size cap. Per-file read
//! failures are collected as warnings rather than aborting the whole walk
//! (a directory with one unreadable file still yields a tree for the rest).

use crate::domain::error::{Error, Result};
use crate::domain::ports::parser::{BuildingTree, ParseInput, Parser, ParsedNode};
use crate::parse::encoding;
use async_trait::async_trait;
use ignore::WalkBuilder;
use std::collections::HashMap;
use std::path::Path;

/// Directories never worth descending into regardless of `.gitignore`.
const DENY_DIRS: &[&str] = &[".git", "node_modules", "target", "__pycache__", ".venv", "venv", "dist", "build"];

/// Files larger than this are recorded as a warning and skipped, not read.
const MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;

pub struct DirectoryParser;

#[async_trait]
impl Parser for DirectoryParser {
    fn can_handle(&self, input: &ParseInput) -> bool {
        matches!(input, ParseInput::DirectoryPath(_))
    }

    async fn parse(&self, input: &ParseInput) -> Result<BuildingTree> {
        let ParseInput::DirectoryPath(path) = input else {
            return Err(Error::unimplemented("directory parser only handles directory paths"));
        };
        let root_path = path.clone();
        let (root, warnings) =
            tokio::task::spawn_blocking(move || walk(&root_path)).await.map_err(|e| Error::internal(e.to_string()))??;

        let mut meta = HashMap::new();
        if !warnings.is_empty() {
            meta.insert("warnings".to_string(), serde_json::to_value(&warnings).unwrap_or_default());
        }
        let mut root = root;
        root.meta = meta;

        Ok(BuildingTree { root, source_mime: None, source_language: None })
    }

    fn name(&self) -> &'static str {
        "directory"
    }
}

fn walk(root_path: &str) -> Result<(ParsedNode, Vec<String>)> {
    let root = Path::new(root_path);
    let root_name = root.file_name().and_then(|n| n.to_str()).unwrap_or(root_path).to_string();

    let mut warnings = Vec::new();
    let mut entries: Vec<(Vec<String>, ParsedNode)> = Vec::new();

    let walker = WalkBuilder::new(root)
        .hidden(false)
        .git_ignore(true)
        .filter_entry(|entry| {
            entry.file_name().to_str().map(|name| !DENY_DIRS.contains(&name)).unwrap_or(true)
        })
        .build();

    for result in walker {
        let entry = match result {
            Ok(entry) => entry,
            Err(e) => {
                warnings.push(format!("walk error: {e}"));
                continue;
            }
        };
        let path = entry.path();
        if path == root {
            continue;
        }
        let is_dir = entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false);
        if is_dir {
            continue;
        }

        let Ok(relative) = path.strip_prefix(root) else { continue };
        let segments: Vec<String> = relative.components().map(|c| c.as_os_str().to_string_lossy().into_owned()).collect();

        let metadata = match std::fs::metadata(path) {
            Ok(m) => m,
            Err(e) => {
                warnings.push(format!("{}: {e}", relative.display()));
                continue;
            }
        };
        if metadata.len() > MAX_FILE_BYTES {
            warnings.push(format!("{}: skipped, {} bytes exceeds the per-file cap", relative.display(), metadata.len()));
            continue;
        }

        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) => {
                warnings.push(format!("{}: {e}", relative.display()));
                continue;
            }
        };
        let text = encoding::decode(&bytes);
        let mut node = ParsedNode::leaf(segments.last().cloned().unwrap_or_default(), text.clone());
        node.r#abstract = text.lines().find(|l| !l.trim().is_empty()).unwrap_or_default().chars().take(256).collect();
        entries.push((segments, node));
    }

    let mut root_node = ParsedNode::leaf(root_name, String::new());
    root_node.is_leaf = false;
    root_node.content = None;
    for (segments, leaf) in entries {
        insert_at_path(&mut root_node, &segments, leaf);
    }
    root_node.overview = format!("{} files", count_leaves(&root_node));

    Ok((root_node, warnings))
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

fn count_leaves(node: &ParsedNode) -> usize {
    if node.is_leaf {
        1
    } else {
        node.children.iter().map(count_leaves).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn walks_nested_files_and_skips_deny_listed_dirs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src/sub")).unwrap();
        std::fs::create_dir_all(dir.path().join("node_modules")).unwrap();
        std::fs::File::create(dir.path().join("src/sub/a.txt")).unwrap().write_all(b"hello").unwrap();
        std::fs::File::create(dir.path().join("node_modules/junk.js")).unwrap().write_all(b"junk").unwrap();

        let parser = DirectoryParser;
        let input = ParseInput::DirectoryPath(dir.path().to_string_lossy().into_owned());
        let tree = parser.parse(&input).await.unwrap();

        let src = tree.root.children.iter().find(|c| c.segment == "src").expect("src dir present");
        let sub = src.children.iter().find(|c| c.segment == "sub").expect("sub dir present");
        assert!(sub.children.iter().any(|c| c.segment == "a.txt"));
        assert!(!tree.root.children.iter().any(|c| c.segment == "node_modules"));
    }

    #[tokio::test]
    async fn oversized_files_are_reported_as_warnings_not_errors() {
        let dir = tempfile::tempdir().unwrap();
        let big = vec![0u8; (MAX_FILE_BYTES + 1) as usize];
        std::fs::write(dir.path().join("big.bin"), &big).unwrap();

        let parser = DirectoryParser;
        let input = ParseInput::DirectoryPath(dir.path().to_string_lossy().into_owned());
        let tree = parser.parse(&input).await.unwrap();

        assert!(tree.root.meta.contains_key("warnings"));
        assert!(!tree.root.children.iter().any(|c| c.segment == "big.bin"));
    }
}
