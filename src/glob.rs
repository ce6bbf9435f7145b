//! Glob resolution for pipeline sources
//!
//! * `*` matches any run of characters, path separators included
//! * `?` matches one character
//! * `[seq]` / `[!seq]` match one character in / not in `seq`
//! * `**/` prefix additionally matches files at the base directory itself
//! * `!pattern` resolves to every file under the base that does NOT match
//!
//! Only regular files are yielded. Symlinked directories are not crawled.

use crate::error::{PipelineError, PipelineResult};
use crate::util::file::{absolutize, normalize_path, path_to_string};
use regex::Regex;
use std::path::{Component, MAIN_SEPARATOR, Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Characters that turn a path component into a match expression
pub const MAGIC_CHARS: [char; 4] = ['*', '?', '[', '!'];

/// Marker that switches resolution into filter mode
pub const NEGATION_MARKER: char = '!';

/// Check if the component contains any magic character
pub fn has_magic(component: &str) -> bool {
    component.chars().any(|c| MAGIC_CHARS.contains(&c))
}

/// Split a pattern into its non-magic base directory and the magic sub-pattern.
///
/// Components are consumed left to right: everything before the first magic
/// component goes into the base, the first magic component and everything after
/// it goes into the sub-pattern. An empty sub-pattern means the pattern names one
/// concrete path.
pub fn split_pattern(pattern: &str) -> (PathBuf, String) {
    let normalized = normalize_path(Path::new(pattern));
    let mut base = PathBuf::new();
    let mut sub_pattern: Vec<String> = Vec::new();

    for component in normalized.components() {
        let part = component.as_os_str().to_string_lossy();

        if !sub_pattern.is_empty() {
            sub_pattern.push(part.into_owned());
            continue;
        }

        match component {
            Component::Normal(_) if has_magic(&part) => sub_pattern.push(part.into_owned()),
            Component::CurDir => {}
            _ => base.push(component.as_os_str()),
        }
    }

    if base.as_os_str().is_empty() {
        base.push(".");
    }

    (base, sub_pattern.join(&MAIN_SEPARATOR.to_string()))
}

/// Translate a shell-style pattern into an anchored regular expression.
///
/// An unterminated `[` is matched literally.
pub fn translate(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let n = chars.len();
    let mut out = String::from("(?s)^");
    let mut i = 0;

    while i < n {
        let c = chars[i];
        i += 1;

        match c {
            '*' => {
                while i < n && chars[i] == '*' {
                    i += 1;
                }
                out.push_str(".*");
            }
            '?' => out.push('.'),
            '[' => {
                let mut j = i;
                if j < n && chars[j] == '!' {
                    j += 1;
                }
                if j < n && chars[j] == ']' {
                    j += 1;
                }
                while j < n && chars[j] != ']' {
                    j += 1;
                }

                if j >= n {
                    out.push_str("\\[");
                    continue;
                }

                let mut body = &chars[i..j];
                out.push('[');
                if body.first() == Some(&'!') {
                    out.push('^');
                    body = &body[1..];
                } else if body.first() == Some(&'^') {
                    out.push_str("\\^");
                    body = &body[1..];
                }
                for ch in body {
                    if matches!(ch, '\\' | '[' | ']' | '&' | '~') {
                        out.push('\\');
                    }
                    out.push(*ch);
                }
                out.push(']');
                i = j + 1;
            }
            _ => {
                let mut buf = [0u8; 4];
                out.push_str(&regex::escape(c.encode_utf8(&mut buf)));
            }
        }
    }

    out.push('$');
    out
}

fn compile(pattern: &str) -> PipelineResult<Regex> {
    Regex::new(&translate(pattern)).map_err(|source| PipelineError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

fn strip_globstar(pattern: &str) -> Option<&str> {
    pattern
        .strip_prefix("**/")
        .or_else(|| pattern.strip_prefix("**\\"))
}

/// A compiled shell-style pattern
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    full: Regex,
    globstar_tail: Option<Regex>,
}

impl Pattern {
    pub fn new(pattern: &str) -> PipelineResult<Self> {
        let globstar_tail = strip_globstar(pattern).map(compile).transpose()?;

        Ok(Self {
            source: pattern.to_string(),
            full: compile(pattern)?,
            globstar_tail,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Plain shell-style match against the whole path
    pub fn matches(&self, path: &str) -> bool {
        self.full.is_match(path)
    }

    /// Shell-style match, retried without a leading `**/` so that the globstar
    /// also covers zero directory levels
    pub fn matches_globstar(&self, path: &str) -> bool {
        self.full.is_match(path)
            || self
                .globstar_tail
                .as_ref()
                .is_some_and(|tail| tail.is_match(path))
    }
}

/// Plain shell-style match
pub fn fnmatch(path: &str, pattern: &str) -> PipelineResult<bool> {
    Ok(Pattern::new(pattern)?.matches(path))
}

/// Globstar-aware match
pub fn glob_match(path: &str, pattern: &str) -> PipelineResult<bool> {
    Ok(Pattern::new(pattern)?.matches_globstar(path))
}

/// One file found by [`PatternMatcher::resolve`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub absolute: PathBuf,
    pub relative: String,
}

/// Resolves glob patterns relative to a root directory
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    root: PathBuf,
}

impl PatternMatcher {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: normalize_path(root.as_ref()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lazily resolve `pattern` into `(absolute, relative)` file pairs
    pub fn resolve(&self, pattern: &str) -> PipelineResult<Resolve> {
        let (filter_mode, pattern) = match pattern.strip_prefix(NEGATION_MARKER) {
            Some(rest) => (true, rest),
            None => (false, pattern),
        };

        let (base, sub_pattern) = split_pattern(pattern);
        let base = absolutize(&self.root, &base);
        debug!(
            "Resolving pattern: base={:?}, sub_pattern={:?}, filter_mode={}",
            base, sub_pattern, filter_mode
        );

        if sub_pattern.is_empty() {
            // A literal path filtered against itself leaves nothing
            let hit = if !filter_mode && base.is_file() {
                let relative = base
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| ".".to_string());
                Some(Resolved {
                    absolute: base,
                    relative,
                })
            } else {
                None
            };
            return Ok(Resolve {
                inner: ResolveInner::Literal(hit),
            });
        }

        let pattern = Pattern::new(&sub_pattern)?;
        let inner = if base.is_dir() {
            ResolveInner::Walk {
                walker: WalkDir::new(&base).follow_links(false).into_iter(),
                base,
                pattern,
                filter_mode,
            }
        } else {
            ResolveInner::Literal(None)
        };

        Ok(Resolve { inner })
    }
}

enum ResolveInner {
    Literal(Option<Resolved>),
    Walk {
        walker: walkdir::IntoIter,
        base: PathBuf,
        pattern: Pattern,
        filter_mode: bool,
    },
}

/// Iterator returned by [`PatternMatcher::resolve`].
///
/// Yields files in filesystem enumeration order.
pub struct Resolve {
    inner: ResolveInner,
}

impl Iterator for Resolve {
    type Item = std::io::Result<Resolved>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            ResolveInner::Literal(hit) => hit.take().map(Ok),
            ResolveInner::Walk {
                walker,
                base,
                pattern,
                filter_mode,
            } => loop {
                let entry = match walker.next()? {
                    Ok(entry) => entry,
                    Err(e) => return Some(Err(e.into())),
                };

                if entry.depth() == 0 {
                    continue;
                }
                // Regular files only; symlinks count when they point at one
                let regular = if entry.path_is_symlink() {
                    entry.path().is_file()
                } else {
                    entry.file_type().is_file()
                };
                if !regular {
                    continue;
                }

                let relative = match entry.path().strip_prefix(base.as_path()) {
                    Ok(relative) => path_to_string(relative),
                    Err(_) => continue,
                };

                if pattern.matches_globstar(&relative) != *filter_mode {
                    return Some(Ok(Resolved {
                        absolute: entry.into_path(),
                        relative,
                    }));
                }
            },
        }
    }
}
