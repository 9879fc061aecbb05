//! Variable paths
//!
//! Provides [`VarPath`], the normalized form of a dotted variable path.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Normalized path to a variable inside a scope
///
/// Parsed from a dotted string. Array indices written as `[n]` become
/// their own segment, so `party.members[2].name` and `party.members.2.name`
/// address the same location.
///
/// # Invariants
/// - Never empty
/// - No segment is empty
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarPath(Vec<String>);

impl VarPath {
    /// Parse a path, returning `None` for anything malformed
    ///
    /// Store operations use this instead of [`FromStr`] because an invalid
    /// path is a no-op there rather than an error.
    #[inline]
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        raw.parse().ok()
    }

    /// Create path from already-split segments
    ///
    /// # Errors
    /// Returns error if there are no segments or any segment is empty
    pub fn from_segments<I, S>(segments: I) -> Result<Self, PathError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(PathError::Empty);
        }
        if segments.iter().any(String::is_empty) {
            return Err(PathError::EmptySegment);
        }
        Ok(Self(segments))
    }

    /// Get path segments
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Number of segments
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; kept for API symmetry with `len`
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Final segment (the variable's own name)
    #[inline]
    #[must_use]
    pub fn leaf(&self) -> &str {
        self.0.last().map_or("", String::as_str)
    }

    /// Segments leading to the leaf
    #[inline]
    #[must_use]
    pub fn parent_segments(&self) -> &[String] {
        &self.0[..self.0.len().saturating_sub(1)]
    }

    /// Append a segment, returning new path
    #[inline]
    #[must_use]
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut new = self.clone();
        new.0.push(segment.into());
        new
    }

    /// Iterator over segments from root to leaf
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl Display for VarPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

impl FromStr for VarPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PathError::Empty);
        }

        let mut segments = Vec::new();
        for raw in s.split('.') {
            split_indices(raw, &mut segments)?;
        }
        Self::from_segments(segments)
    }
}

/// Split `name[1][2]` into `name`, `1`, `2`
fn split_indices(raw: &str, out: &mut Vec<String>) -> Result<(), PathError> {
    let raw = raw.trim();
    let (head, mut rest) = match raw.find('[') {
        Some(pos) => raw.split_at(pos),
        None => {
            if raw.contains(']') {
                return Err(PathError::UnbalancedBracket(raw.to_string()));
            }
            if raw.is_empty() {
                return Err(PathError::EmptySegment);
            }
            out.push(raw.to_string());
            return Ok(());
        }
    };

    // `[0]` directly after a dot is allowed: `list.[0]` reads the same as `list[0]`
    if !head.is_empty() {
        out.push(head.to_string());
    }

    while !rest.is_empty() {
        let Some(inner) = rest.strip_prefix('[') else {
            return Err(PathError::UnbalancedBracket(raw.to_string()));
        };
        let Some(close) = inner.find(']') else {
            return Err(PathError::UnbalancedBracket(raw.to_string()));
        };
        let index = inner[..close].trim().trim_matches(|c| c == '"' || c == '\'');
        if index.is_empty() {
            return Err(PathError::EmptySegment);
        }
        out.push(index.to_string());
        rest = &inner[close + 1..];
    }

    Ok(())
}

/// Errors related to variable paths
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// Path has no segments
    #[error("path is empty")]
    Empty,

    /// Empty segment in path
    #[error("path contains empty segment")]
    EmptySegment,

    /// `[` without `]` or the reverse
    #[error("unbalanced bracket in segment: {0}")]
    UnbalancedBracket(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_dotted() {
        let path: VarPath = "player.stats.hp".parse().unwrap();
        assert_eq!(path.segments(), &["player", "stats", "hp"]);
        assert_eq!(path.leaf(), "hp");
        assert_eq!(path.parent_segments(), &["player", "stats"]);
    }

    #[test]
    fn path_index_normalized() {
        let bracketed: VarPath = "party.members[2].name".parse().unwrap();
        let dotted: VarPath = "party.members.2.name".parse().unwrap();
        assert_eq!(bracketed, dotted);
        assert_eq!(bracketed.to_string(), "party.members.2.name");
    }

    #[test]
    fn path_multiple_indices() {
        let path: VarPath = "grid[1][3]".parse().unwrap();
        assert_eq!(path.segments(), &["grid", "1", "3"]);
    }

    #[test]
    fn path_quoted_index() {
        let path: VarPath = "relations['alice']".parse().unwrap();
        assert_eq!(path.segments(), &["relations", "alice"]);
    }

    #[test]
    fn path_unicode_segments() {
        let path: VarPath = "角色.好感度".parse().unwrap();
        assert_eq!(path.leaf(), "好感度");
    }

    #[test]
    fn path_empty_is_invalid() {
        assert_eq!("".parse::<VarPath>(), Err(PathError::Empty));
        assert_eq!("   ".parse::<VarPath>(), Err(PathError::Empty));
        assert!(VarPath::parse("").is_none());
    }

    #[test]
    fn path_empty_segment_is_invalid() {
        assert_eq!("a..b".parse::<VarPath>(), Err(PathError::EmptySegment));
        assert_eq!("a[]".parse::<VarPath>(), Err(PathError::EmptySegment));
    }

    #[test]
    fn path_unbalanced_bracket_is_invalid() {
        assert!(matches!(
            "a[1".parse::<VarPath>(),
            Err(PathError::UnbalancedBracket(_))
        ));
        assert!(matches!(
            "a1]".parse::<VarPath>(),
            Err(PathError::UnbalancedBracket(_))
        ));
        assert!(matches!(
            "a[1]x".parse::<VarPath>(),
            Err(PathError::UnbalancedBracket(_))
        ));
    }

    #[test]
    fn path_child_extends() {
        let a = VarPath::parse("a.b").unwrap();
        let b = VarPath::parse("a.b.c").unwrap();
        assert_eq!(a.child("c"), b);
    }

    #[test]
    fn path_from_segments_rejects_empty() {
        assert_eq!(
            VarPath::from_segments(Vec::<String>::new()),
            Err(PathError::Empty)
        );
        assert_eq!(
            VarPath::from_segments(["a", ""]),
            Err(PathError::EmptySegment)
        );
    }
}
