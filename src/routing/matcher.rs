//! Segment classification and matching
//!
//! Every pattern segment is classified exactly once, at insertion time, into a
//! [`ParamKind`]. Lookups only ever call [`ParamMatcher::matches`].

use crate::error::{Error, Result};
use dashmap::DashMap;
use regex::Regex;
use std::fmt;

/// Key under which a wildcard segment's text is recorded
pub const WILDCARD_KEY: &str = "*";

/// Kind of a single route pattern segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ParamKind {
    /// Literal text, no capture
    Static,
    /// `:name(regex)`
    NamedRegex,
    /// `:name`
    Named,
    /// `*`
    Wildcard,
}

/// Compiled regex constraints, shared by every node that uses the same text.
///
/// Compilation happens while the entry's shard is write-locked, so one
/// constraint text is compiled at most once even with concurrent inserts.
#[derive(Debug, Default)]
pub struct RegexCache {
    compiled: DashMap<String, Regex>,
}

impl RegexCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the compiled matcher for `constraint`, compiling it on first use.
    ///
    /// The expression is anchored so it must match the whole segment.
    pub fn get_or_compile(&self, constraint: &str) -> std::result::Result<Regex, regex::Error> {
        if let Some(regex) = self.compiled.get(constraint) {
            return Ok(regex.clone());
        }

        let entry = self
            .compiled
            .entry(constraint.to_string())
            .or_try_insert_with(|| {
                log::debug!("Compiling route constraint '{}'", constraint);
                Regex::new(&format!("^(?:{})$", constraint))
            })?;
        Ok(entry.clone())
    }

    /// Number of distinct constraints compiled so far
    pub fn len(&self) -> usize {
        self.compiled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }

    pub fn contains(&self, constraint: &str) -> bool {
        self.compiled.contains_key(constraint)
    }
}

/// Matcher for one pattern segment
#[derive(Clone)]
pub struct ParamMatcher {
    kind: ParamKind,
    /// Capture name; empty for static segments
    name: String,
    /// Original segment text, used as the node identity
    clause: String,
    regex: Option<Regex>,
}

impl ParamMatcher {
    /// Classify `segment` (one `/`-free piece of `pattern`).
    pub fn parse(segment: &str, pattern: &str, cache: &RegexCache) -> Result<Self> {
        if segment == "*" {
            return Ok(Self {
                kind: ParamKind::Wildcard,
                name: WILDCARD_KEY.to_string(),
                clause: segment.to_string(),
                regex: None,
            });
        }

        let Some(rest) = segment.strip_prefix(':') else {
            return Ok(Self::literal(segment));
        };

        match (rest.find('('), rest.rfind(')')) {
            (Some(open), Some(close)) => {
                if close < open {
                    return Err(Error::invalid_pattern(
                        pattern,
                        format!("unbalanced constraint in segment '{}'", segment),
                    ));
                }
                let name = &rest[..open];
                if name.is_empty() {
                    return Err(Error::invalid_pattern(
                        pattern,
                        format!("parameter in segment '{}' has no name", segment),
                    ));
                }
                let constraint = &rest[open + 1..close];
                let regex =
                    cache
                        .get_or_compile(constraint)
                        .map_err(|source| Error::InvalidRegex {
                            pattern: pattern.to_string(),
                            constraint: constraint.to_string(),
                            source,
                        })?;

                Ok(Self {
                    kind: ParamKind::NamedRegex,
                    name: name.to_string(),
                    clause: segment.to_string(),
                    regex: Some(regex),
                })
            }
            _ => {
                if rest.is_empty() {
                    return Err(Error::invalid_pattern(
                        pattern,
                        "parameters must be registered with a name",
                    ));
                }
                Ok(Self {
                    kind: ParamKind::Named,
                    name: rest.to_string(),
                    clause: segment.to_string(),
                    regex: None,
                })
            }
        }
    }

    pub(crate) fn literal(segment: &str) -> Self {
        Self {
            kind: ParamKind::Static,
            name: String::new(),
            clause: segment.to_string(),
            regex: None,
        }
    }

    pub fn kind(&self) -> ParamKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn clause(&self) -> &str {
        &self.clause
    }

    pub fn is_static(&self) -> bool {
        self.kind == ParamKind::Static
    }

    /// Test a request segment. Returns the captured text for parameter
    /// segments, `Some("")` for a static hit, `None` on a miss.
    pub fn matches<'s>(&self, segment: &'s str) -> Option<&'s str> {
        match self.kind {
            ParamKind::Static => (self.clause == segment).then_some(""),
            ParamKind::Wildcard => Some(segment),
            ParamKind::Named => (!segment.is_empty()).then_some(segment),
            ParamKind::NamedRegex => self
                .regex
                .as_ref()
                .filter(|regex| regex.is_match(segment))
                .map(|_| segment),
        }
    }
}

impl fmt::Debug for ParamMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamMatcher")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("clause", &self.clause)
            .finish()
    }
}
