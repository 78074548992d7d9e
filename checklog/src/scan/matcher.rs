use regex::Regex;

use crate::errors::{CheckError, CheckResult};

/// Strategy for testing a single pattern against a line
#[derive(Debug, Clone)]
pub enum MatchStrategy {
    /// Pattern has no regex metacharacters, a substring test is equivalent
    Literal(String),
    Regex(Regex),
}

impl MatchStrategy {
    /// Compiles `pattern`, picking the cheapest equivalent strategy
    pub fn compile(pattern: &str) -> CheckResult<Self> {
        if Self::is_literal(pattern) {
            return Ok(Self::Literal(pattern.to_string()));
        }
        Regex::new(pattern)
            .map(Self::Regex)
            .map_err(|e| CheckError::invalid_pattern(pattern, e))
    }

    /// A pattern is literal when escaping it changes nothing
    fn is_literal(pattern: &str) -> bool {
        regex::escape(pattern) == pattern
    }

    pub fn is_match(&self, line: &str) -> bool {
        match self {
            Self::Literal(needle) => line.contains(needle.as_str()),
            Self::Regex(regex) => regex.is_match(line),
        }
    }
}

/// Outcome of classifying one line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass {
    /// Matches the pattern and is not ignored
    Counted,
    /// Matches the pattern but also the ignore pattern
    Ignored,
    Unmatched,
}

/// Compiled match pattern plus optional ignore pattern, shared by all workers
#[derive(Debug, Clone)]
pub struct LineClassifier {
    pattern: MatchStrategy,
    ignore: Option<MatchStrategy>,
}

impl LineClassifier {
    /// Compiles both patterns. An empty ignore pattern ignores nothing.
    pub fn new(pattern: &str, ignore_pattern: &str) -> CheckResult<Self> {
        let pattern = MatchStrategy::compile(pattern)?;
        let ignore = if ignore_pattern.is_empty() {
            None
        } else {
            Some(MatchStrategy::compile(ignore_pattern)?)
        };
        Ok(Self { pattern, ignore })
    }

    pub fn classify(&self, line: &str) -> LineClass {
        if !self.pattern.is_match(line) {
            return LineClass::Unmatched;
        }
        match &self.ignore {
            Some(ignore) if ignore.is_match(line) => LineClass::Ignored,
            _ => LineClass::Counted,
        }
    }

    pub fn counts(&self, line: &str) -> bool {
        self.classify(line) == LineClass::Counted
    }
}
