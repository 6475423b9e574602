//! Knowledge category enumeration.

use serde::{Deserialize, Serialize};

/// Closed set of contribution categories.
///
/// The wire representation is snake_case; unknown strings are rejected at
/// the tool boundary rather than coerced to `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    BugFix,
    Workaround,
    Configuration,
    DomainExpertise,
    Tooling,
    Architecture,
    Pattern,
    Explanation,
    ReasoningTrace,
    FailedApproach,
    Other,
}

impl Category {
    pub const ALL: [Category; 11] = [
        Category::BugFix,
        Category::Workaround,
        Category::Configuration,
        Category::DomainExpertise,
        Category::Tooling,
        Category::Architecture,
        Category::Pattern,
        Category::Explanation,
        Category::ReasoningTrace,
        Category::FailedApproach,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::BugFix => "bug_fix",
            Category::Workaround => "workaround",
            Category::Configuration => "configuration",
            Category::DomainExpertise => "domain_expertise",
            Category::Tooling => "tooling",
            Category::Architecture => "architecture",
            Category::Pattern => "pattern",
            Category::Explanation => "explanation",
            Category::ReasoningTrace => "reasoning_trace",
            Category::FailedApproach => "failed_approach",
            Category::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.as_str() == s)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown category: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_matches_display_for_every_variant() {
        for c in Category::ALL {
            assert_eq!(Category::parse(c.as_str()), Some(c));
        }
    }

    #[test]
    fn serde_uses_snake_case() {
        assert_eq!(
            serde_json::to_string(&Category::BugFix).unwrap(),
            "\"bug_fix\""
        );
        let back: Category = serde_json::from_str("\"reasoning_trace\"").unwrap();
        assert_eq!(back, Category::ReasoningTrace);
    }

    #[test]
    fn unknown_category_is_rejected() {
        assert!(Category::parse("musings").is_none());
        assert!(serde_json::from_str::<Category>("\"musings\"").is_err());
    }
}
