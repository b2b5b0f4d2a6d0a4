//! Path pattern matchers
//!
//! Provides [`PathPattern`], the explicit matcher behind the policy lists.
//! A configuration entry containing `*` compiles to a glob; everything else
//! matches as a prefix of the normalized path.

use regex::Regex;
use std::fmt::{self, Display, Formatter};

/// A single entry from an allow/deny list.
///
/// Two forms:
/// - `Prefix`: the entry is a literal prefix of the normalized path
///   (`src/` matches `src/main.rs`).
/// - `Glob`: the entry contains wildcards; `*` matches within one path
///   segment, `**` crosses segments, `?` matches a single character.
#[derive(Debug, Clone)]
pub enum PathPattern {
    /// Literal prefix over the normalized path
    Prefix(String),
    /// Compiled glob pattern (anchored full match)
    Glob {
        /// Original entry text, kept for display and equality
        raw: String,
        /// Compiled matcher
        regex: Regex,
    },
}

impl PathPattern {
    /// Parse one list entry into a matcher
    ///
    /// # Errors
    /// Returns [`PatternError::InvalidGlob`] if a wildcard entry does not
    /// compile.
    pub fn parse(entry: &str) -> Result<Self, PatternError> {
        let entry = normalize(entry);
        if entry.is_empty() {
            return Err(PatternError::EmptyEntry);
        }
        if entry.contains('*') || entry.contains('?') {
            let regex = compile_glob(&entry)?;
            Ok(Self::Glob { raw: entry, regex })
        } else {
            Ok(Self::Prefix(entry))
        }
    }

    /// Check whether a normalized path matches this entry
    #[must_use]
    pub fn matches(&self, normalized_path: &str) -> bool {
        match self {
            Self::Prefix(prefix) => normalized_path.starts_with(prefix.as_str()),
            Self::Glob { regex, .. } => regex.is_match(normalized_path),
        }
    }

    /// Original entry text
    #[inline]
    #[must_use]
    pub fn raw(&self) -> &str {
        match self {
            Self::Prefix(p) => p,
            Self::Glob { raw, .. } => raw,
        }
    }
}

impl PartialEq for PathPattern {
    fn eq(&self, other: &Self) -> bool {
        self.raw() == other.raw()
    }
}

impl Eq for PathPattern {}

impl Display for PathPattern {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw())
    }
}

/// Normalize a path string for matching: forward slashes, no leading `./`
#[must_use]
pub fn normalize(path: &str) -> String {
    let mut p = path.replace('\\', "/");
    while let Some(stripped) = p.strip_prefix("./") {
        p = stripped.to_string();
    }
    p
}

/// Compile a glob entry into an anchored regex.
///
/// `**` crosses path segments, `*` stays within one, `?` matches a single
/// non-separator character. All other regex metacharacters are escaped.
fn compile_glob(entry: &str) -> Result<Regex, PatternError> {
    let mut pattern = String::with_capacity(entry.len() + 8);
    pattern.push('^');
    let mut chars = entry.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    pattern.push_str(".*");
                } else {
                    pattern.push_str("[^/]*");
                }
            }
            '?' => pattern.push_str("[^/]"),
            '.' | '+' | '(' | ')' | '[' | ']' | '{' | '}' | '^' | '$' | '|' | '\\' => {
                pattern.push('\\');
                pattern.push(c);
            }
            other => pattern.push(other),
        }
    }
    pattern.push('$');

    Regex::new(&pattern).map_err(|source| PatternError::InvalidGlob {
        entry: entry.to_string(),
        message: source.to_string(),
    })
}

/// Errors constructing path patterns
#[derive(Debug, thiserror::Error)]
pub enum PatternError {
    /// Empty list entry
    #[error("empty policy list entry")]
    EmptyEntry,

    /// Glob entry failed to compile
    #[error("invalid glob entry '{entry}': {message}")]
    InvalidGlob {
        /// The offending entry
        entry: String,
        /// Compiler message
        message: String,
    },
}
