//! Typed placeholder vocabulary.
//!
//! Each placeholder replaces an entire detected span. Placeholders are
//! short bracketed upper-case symbols; none of the detectors match them,
//! which is what makes sanitisation idempotent.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placeholder {
    Email,
    Phone,
    Name,
    Location,
    ApiKey,
    CreditCard,
    IpAddress,
    Username,
    Password,
    /// Fallback for high-confidence entities of unknown type.
    Redacted,
}

impl Placeholder {
    pub const ALL: [Placeholder; 10] = [
        Placeholder::Email,
        Placeholder::Phone,
        Placeholder::Name,
        Placeholder::Location,
        Placeholder::ApiKey,
        Placeholder::CreditCard,
        Placeholder::IpAddress,
        Placeholder::Username,
        Placeholder::Password,
        Placeholder::Redacted,
    ];

    pub fn token(&self) -> &'static str {
        match self {
            Placeholder::Email => "[EMAIL]",
            Placeholder::Phone => "[PHONE]",
            Placeholder::Name => "[NAME]",
            Placeholder::Location => "[LOCATION]",
            Placeholder::ApiKey => "[API_KEY]",
            Placeholder::CreditCard => "[CREDIT_CARD]",
            Placeholder::IpAddress => "[IP_ADDRESS]",
            Placeholder::Username => "[USERNAME]",
            Placeholder::Password => "[PASSWORD]",
            Placeholder::Redacted => "[REDACTED]",
        }
    }

    /// True when `token` contains any placeholder from the vocabulary.
    /// Used for ratio computation on whitespace-split tokens, where the
    /// placeholder may carry trailing punctuation ("[PHONE];").
    pub fn appears_in(token: &str) -> bool {
        Placeholder::ALL.iter().any(|p| token.contains(p.token()))
    }
}

impl std::fmt::Display for Placeholder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.token())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_bracketed_upper_case() {
        for p in Placeholder::ALL {
            let t = p.token();
            assert!(t.starts_with('[') && t.ends_with(']'));
            assert!(t[1..t.len() - 1]
                .chars()
                .all(|c| c.is_ascii_uppercase() || c == '_'));
        }
    }

    #[test]
    fn appears_in_tolerates_punctuation() {
        assert!(Placeholder::appears_in("[PHONE];"));
        assert!(Placeholder::appears_in("([EMAIL])"));
        assert!(!Placeholder::appears_in("[UNKNOWN]"));
        assert!(!Placeholder::appears_in("plain"));
    }
}
