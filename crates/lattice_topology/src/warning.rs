use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum Jaro-Winkler similarity for a suggestion to be offered.
const SUGGESTION_THRESHOLD: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WarningKind {
    UnknownClass,
    EmptyClassPath,
    UnknownDirective,
    UnknownTheme,
    DuplicateView,
    UnknownAxis,
    UnknownPropertyValue,
    DuplicateAxis,
    MalformedOverride,
    IndentJump,
    UnboundComputed,
}

impl WarningKind {
    fn describe(&self) -> &'static str {
        match self {
            WarningKind::UnknownClass => "unknown class",
            WarningKind::EmptyClassPath => "empty class path",
            WarningKind::UnknownDirective => "unknown directive",
            WarningKind::UnknownTheme => "unknown theme",
            WarningKind::DuplicateView => "view declared twice",
            WarningKind::UnknownAxis => "unknown property axis",
            WarningKind::UnknownPropertyValue => "unknown property value",
            WarningKind::DuplicateAxis => "property axis set twice",
            WarningKind::MalformedOverride => "malformed override",
            WarningKind::IndentJump => "indent skips a level",
            WarningKind::UnboundComputed => "computed slot has no owner and user slot before it",
        }
    }
}

/// A recoverable problem in source text. The parser always applies a fallback
/// and records one of these instead of failing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseWarning {
    pub kind: WarningKind,
    pub value: String,
    /// 1-indexed source line.
    pub line: usize,
    pub suggestion: Option<String>,
}

impl ParseWarning {
    pub fn new(kind: WarningKind, value: impl Into<String>, line: usize) -> Self {
        Self {
            kind,
            value: value.into(),
            line,
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: Option<String>) -> Self {
        self.suggestion = suggestion;
        self
    }
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {} '{}'", self.line, self.kind.describe(), self.value)?;
        if let Some(suggestion) = &self.suggestion {
            write!(f, " (did you mean '{suggestion}'?)")?;
        }
        Ok(())
    }
}

/// The closest candidate to `word`, if any is close enough.
pub fn suggest<'a>(word: &str, candidates: impl IntoIterator<Item = &'a str>) -> Option<String> {
    candidates
        .into_iter()
        .map(|candidate| (candidate, strsim::jaro_winkler(word, candidate)))
        .filter(|(_, score)| *score >= SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(candidate, _)| candidate.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suggest_closest() {
        let classes = ["header", "hero", "footer", "button"];
        assert_eq!(suggest("hedaer", classes).as_deref(), Some("header"));
        assert_eq!(suggest("buton", classes).as_deref(), Some("button"));
        assert_eq!(suggest("zzz", classes), None);
    }

    #[test]
    fn test_display() {
        let warning = ParseWarning::new(WarningKind::UnknownClass, "hedaer", 4)
            .with_suggestion(Some("header".into()));
        assert_eq!(
            warning.to_string(),
            "line 4: unknown class 'hedaer' (did you mean 'header'?)"
        );
    }
}
