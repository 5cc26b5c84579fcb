//! Ignore Pattern List and the Pattern Filter.
//!
//! Patterns come from a `.gitignore`-like text, one glob per line. Matching is
//! plain shell-glob matching against the whole relative path: `*` also crosses
//! `/`, `**` is just `*`, braces are literal, and there is no negation,
//! anchoring or directory-only syntax.

use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};
use std::path::Path;
use tracing::{debug, warn};

/// Name of the ignore-specification file read at the tree root.
pub const IGNORE_FILE_NAME: &str = ".gitignore";

/// Parses ignore-file text into the ordered pattern list.
///
/// A line is kept if it is non-empty after trimming and does not start with
/// `#`. The comment check looks at the raw line, so `  # x` is kept as `# x`.
pub fn parse_patterns(text: &str) -> Vec<String> {
    text.lines()
        .filter(|line| !line.trim().is_empty() && !line.starts_with('#'))
        .map(|line| line.trim().to_string())
        .collect()
}

/// Rewrites a shell glob into globset syntax with the same meaning.
///
/// globset reads `**`, `{a,b}`, `[^..]` and a stray `]` or unclosed `[`
/// differently from a plain shell glob, so those are turned into forms that
/// match the way a shell glob would.
fn to_globset_syntax(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() + 8);
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' => {
                out.push('*');
                while chars.get(i + 1) == Some(&'*') {
                    i += 1;
                }
            }
            c @ ('{' | '}' | ']') => {
                out.push('[');
                out.push(c);
                out.push(']');
            }
            '[' => match class_end(&chars, i) {
                Some(end) => {
                    push_class(&mut out, &chars[i + 1..end]);
                    i = end;
                }
                None => out.push_str("[[]"),
            },
            c => out.push(c),
        }
        i += 1;
    }
    out
}

/// Index of the `]` closing the class opened at `open`. A `]` right after
/// `[` or `[!` belongs to the class.
fn class_end(chars: &[char], open: usize) -> Option<usize> {
    let mut j = open + 1;
    if chars.get(j) == Some(&'!') {
        j += 1;
    }
    if chars.get(j) == Some(&']') {
        j += 1;
    }
    while j < chars.len() && chars[j] != ']' {
        j += 1;
    }
    (j < chars.len()).then_some(j)
}

fn push_class(out: &mut String, body: &[char]) {
    match body.split_first() {
        // A leading `^` is a member, not a negation.
        Some(('^', [])) => out.push('^'),
        Some(('^', rest)) => {
            out.push('[');
            out.extend(rest);
            out.push_str("^]");
        }
        _ => {
            out.push('[');
            out.extend(body);
            out.push(']');
        }
    }
}

fn compile(pattern: &str) -> Result<Glob, globset::Error> {
    GlobBuilder::new(&to_globset_syntax(pattern))
        .literal_separator(false)
        .backslash_escape(false)
        .build()
}

/// Returns true if `path` matches any of `patterns`.
///
/// Compiles the patterns on every call; use [`IgnorePatterns`] when testing
/// many paths against the same list.
pub fn should_ignore(path: &str, patterns: &[String]) -> bool {
    patterns.iter().any(|pattern| match compile(pattern) {
        Ok(glob) => glob.compile_matcher().is_match(path),
        Err(_) => false,
    })
}

/// A compiled Ignore Pattern List.
#[derive(Debug, Clone)]
pub struct IgnorePatterns {
    patterns: Vec<String>,
    set: GlobSet,
}

impl Default for IgnorePatterns {
    fn default() -> Self {
        Self::empty()
    }
}

impl IgnorePatterns {
    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
            set: GlobSet::empty(),
        }
    }

    /// Compiles the given patterns. Patterns that are not valid globs are
    /// logged and left out of the matcher.
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patterns: Vec<String> = patterns.into_iter().map(Into::into).collect();
        let mut builder = GlobSetBuilder::new();
        for pattern in &patterns {
            match compile(pattern) {
                Ok(glob) => {
                    builder.add(glob);
                }
                Err(e) => warn!(pattern = %pattern, error = %e, "Skipping invalid ignore pattern"),
            }
        }
        let set = match builder.build() {
            Ok(set) => set,
            Err(e) => {
                warn!(error = %e, "Failed to build ignore pattern set, ignoring nothing");
                GlobSet::empty()
            }
        };
        debug!(count = patterns.len(), "Compiled ignore patterns");
        Self { patterns, set }
    }

    /// Parses and compiles ignore-file text.
    pub fn parse(text: &str) -> Self {
        Self::new(parse_patterns(text))
    }

    /// Reads an ignore file from disk. Any read error yields an empty list.
    pub fn from_file(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::parse(&text),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "No usable ignore file, ignoring nothing");
                Self::empty()
            }
        }
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// The Pattern Filter: true if `path` matches any pattern.
    pub fn matches(&self, path: &str) -> bool {
        !self.set.is_empty() && self.set.is_match(path)
    }
}
