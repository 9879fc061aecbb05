//! Error types for command extraction
//!
//! None of these abort processing. A malformed instruction is skipped, logged,
//! and reported back to the caller alongside the instructions that did apply.

use vbe_store::PathError;

/// Why an instruction could not be turned into a command
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    /// Target path did not parse
    #[error("invalid path '{path}': {source}")]
    InvalidPath {
        path: String,
        #[source]
        source: PathError,
    },

    /// Call form with the wrong number of arguments
    #[error("expected 3 or 4 arguments, found {found}")]
    ArgumentCount { found: usize },

    /// Opening delimiter with no matching close
    #[error("unterminated {0} instruction")]
    Unterminated(&'static str),

    /// The store refused the write (an array was in the way)
    #[error("write to '{0}' was blocked")]
    WriteBlocked(String),
}

impl CommandError {
    /// Create invalid path error
    pub fn invalid_path(path: impl Into<String>, source: PathError) -> Self {
        Self::InvalidPath {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_path_display() {
        let err = CommandError::invalid_path("a..b", PathError::EmptySegment);
        assert_eq!(err.to_string(), "invalid path 'a..b': path contains empty segment");
    }

    #[test]
    fn argument_count_display() {
        let err = CommandError::ArgumentCount { found: 2 };
        assert_eq!(err.to_string(), "expected 3 or 4 arguments, found 2");
    }
}
