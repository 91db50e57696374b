//! Viking URI: `viking://<scope>/<path>` addressing for context nodes.

use crate::domain::error::{Error, Result};
use std::fmt;
use unicode_segmentation::UnicodeSegmentation;

const SCHEME: &str = "viking://";
const MAX_SEGMENT_LEN: usize = 50;

/// The closed set of top-level URI segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Resources,
    User,
    Agent,
    Session,
    Queue,
    Temp,
}

impl Scope {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "resources" => Some(Self::Resources),
            "user" => Some(Self::User),
            "agent" => Some(Self::Agent),
            "session" => Some(Self::Session),
            "queue" => Some(Self::Queue),
            "temp" => Some(Self::Temp),
            _ => None,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Resources => "resources",
            Self::User => "user",
            Self::Agent => "agent",
            Self::Session => "session",
            Self::Queue => "queue",
            Self::Temp => "temp",
        };
        write!(f, "{s}")
    }
}

/// A parsed, normalized `viking://` URI.
///
/// Two `VikingUri` values are equal iff their normalized string forms match
/// byte-for-byte — comparing the `normalized` field is exactly comparing the
/// full URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VikingUri {
    scope: Scope,
    segments: Vec<String>,
    normalized: String,
}

impl VikingUri {
    /// Parse and normalize a `viking://scope/a/b/c` string.
    pub fn parse(raw: &str) -> Result<Self> {
        let rest = raw
            .strip_prefix(SCHEME)
            .ok_or_else(|| Error::invalid_uri(raw))?;
        let rest = rest.trim_end_matches('/');
        let mut parts = rest.splitn(2, '/');
        let scope_str = parts.next().unwrap_or("");
        let scope = Scope::parse(scope_str).ok_or_else(|| Error::invalid_uri(raw))?;
        let path = parts.next().unwrap_or("");
        let segments: Vec<String> = if path.is_empty() {
            Vec::new()
        } else {
            path.split('/').map(|s| s.to_string()).collect()
        };
        let normalized = Self::build_normalized(scope, &segments);
        Ok(Self { scope, segments, normalized })
    }

    /// Construct a URI from a scope and already-sanitized segments.
    pub fn from_parts(scope: Scope, segments: Vec<String>) -> Self {
        let normalized = Self::build_normalized(scope, &segments);
        Self { scope, segments, normalized }
    }

    fn build_normalized(scope: Scope, segments: &[String]) -> String {
        if segments.is_empty() {
            format!("{SCHEME}{scope}")
        } else {
            format!("{SCHEME}{scope}/{}", segments.join("/"))
        }
    }

    /// The top-level scope.
    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Path segments after the scope.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Final path segment, if any (the "name" of this node).
    pub fn name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Parent URI, or `None` if this URI is already a scope root.
    pub fn parent(&self) -> Option<VikingUri> {
        if self.segments.is_empty() {
            return None;
        }
        let parent_segments = self.segments[..self.segments.len() - 1].to_vec();
        Some(Self::from_parts(self.scope, parent_segments))
    }

    /// Append a child segment (sanitized).
    pub fn child(&self, name: &str) -> VikingUri {
        let mut segments = self.segments.clone();
        segments.push(sanitize_segment(name));
        Self::from_parts(self.scope, segments)
    }

    /// Append a raw, pre-sanitized suffix, e.g. `"_1"`, to the last segment.
    pub fn with_suffix(&self, suffix: &str) -> VikingUri {
        let mut segments = self.segments.clone();
        if let Some(last) = segments.last_mut() {
            last.push_str(suffix);
        } else {
            segments.push(suffix.trim_start_matches('_').to_string());
        }
        Self::from_parts(self.scope, segments)
    }

    /// Whether `other` is this URI or a descendant of it.
    pub fn is_prefix_of(&self, other: &VikingUri) -> bool {
        self.scope == other.scope && other.segments.starts_with(&self.segments)
    }

    /// The normalized string form.
    pub fn as_str(&self) -> &str {
        &self.normalized
    }
}

impl fmt::Display for VikingUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.normalized)
    }
}

impl TryFrom<String> for VikingUri {
    type Error = Error;
    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<VikingUri> for String {
    fn from(value: VikingUri) -> Self {
        value.normalized
    }
}

/// Sanitize a user-supplied name segment per spec §3.1:
/// replace any char outside `[\w一-鿿-]` with `_`, collapse runs of
/// `_`, trim leading/trailing `_`, truncate to 50 chars, empty → `unnamed`.
pub fn sanitize_segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_was_underscore = false;
    for g in raw.graphemes(true) {
        let ch = match g.chars().next() {
            Some(c) => c,
            None => continue,
        };
        let keep = ch.is_alphanumeric() || ch == '_' || ch == '-' || is_cjk(ch);
        if keep {
            out.push(ch);
            last_was_underscore = ch == '_';
        } else if !last_was_underscore {
            out.push('_');
            last_was_underscore = true;
        }
    }
    let trimmed = out.trim_matches('_');
    let truncated: String = trimmed.graphemes(true).take(MAX_SEGMENT_LEN).collect();
    if truncated.is_empty() {
        "unnamed".to_string()
    } else {
        truncated
    }
}

fn is_cjk(c: char) -> bool {
    ('\u{4e00}'..='\u{9fff}').contains(&c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scoped_uri() {
        let u = VikingUri::parse("viking://resources/docs/readme").unwrap();
        assert_eq!(u.scope(), Scope::Resources);
        assert_eq!(u.segments(), &["docs", "readme"]);
        assert_eq!(u.as_str(), "viking://resources/docs/readme");
    }

    #[test]
    fn rejects_unknown_scope() {
        assert!(VikingUri::parse("viking://bogus/a").is_err());
        assert!(VikingUri::parse("http://resources/a").is_err());
    }

    #[test]
    fn parent_of_root_is_none() {
        let u = VikingUri::parse("viking://resources").unwrap();
        assert!(u.parent().is_none());
    }

    #[test]
    fn parent_strips_last_segment() {
        let u = VikingUri::parse("viking://resources/a/b/c").unwrap();
        assert_eq!(u.parent().unwrap().as_str(), "viking://resources/a/b");
    }

    #[test]
    fn sanitizer_collapses_and_trims() {
        assert_eq!(sanitize_segment("Hello, World!!"), "Hello_World");
        assert_eq!(sanitize_segment("  "), "unnamed");
        assert_eq!(sanitize_segment("你好-世界"), "你好-世界");
        let long = "a".repeat(100);
        assert_eq!(sanitize_segment(&long).len(), 50);
    }

    #[test]
    fn equality_is_byte_for_byte_on_normalized_form() {
        let a = VikingUri::parse("viking://resources/a/").unwrap();
        let b = VikingUri::parse("viking://resources/a").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn is_prefix_of_respects_scope() {
        let root = VikingUri::parse("viking://resources/docs").unwrap();
        let child = VikingUri::parse("viking://resources/docs/readme").unwrap();
        let other_scope = VikingUri::parse("viking://user/docs/readme").unwrap();
        assert!(root.is_prefix_of(&child));
        assert!(!root.is_prefix_of(&other_scope));
    }
}
