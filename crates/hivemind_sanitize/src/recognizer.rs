//! Entity recognition layer.
//!
//! The recogniser is defined by contract, not by a concrete model: it
//! reports labelled spans, and the sanitiser maps labels to placeholders
//! through a table declared at startup. The shipped implementation is
//! rule-based; a model-backed recogniser plugs in behind the same trait.

use regex::Regex;

use crate::SanitizeError;

/// A labelled span in the original text. `start`/`end` are byte offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub start: usize,
    pub end: usize,
    pub label: &'static str,
}

pub trait EntityRecognizer: Send + Sync {
    fn recognize(&self, text: &str) -> Vec<Entity>;
}

struct LabelRule {
    regex: Regex,
    /// Capture group carrying the entity; the whole match when `None`.
    group: Option<usize>,
    label: &'static str,
}

/// Rule-based recogniser: honorific and contact-context cues for person
/// names, a gazetteer for locations. Deliberately conservative; a missed
/// name costs less than mangling technical prose.
pub struct RuleBasedRecognizer {
    rules: Vec<LabelRule>,
}

pub const LABEL_PERSON: &str = "PERSON";
pub const LABEL_LOCATION: &str = "LOCATION";

const LOCATION_GAZETTEER: &[&str] = &[
    "New York",
    "San Francisco",
    "Los Angeles",
    "Chicago",
    "Seattle",
    "Austin",
    "Boston",
    "Toronto",
    "Vancouver",
    "London",
    "Manchester",
    "Dublin",
    "Paris",
    "Berlin",
    "Munich",
    "Amsterdam",
    "Stockholm",
    "Copenhagen",
    "Oslo",
    "Helsinki",
    "Zurich",
    "Vienna",
    "Madrid",
    "Barcelona",
    "Lisbon",
    "Rome",
    "Milan",
    "Prague",
    "Warsaw",
    "Tel Aviv",
    "Tokyo",
    "Osaka",
    "Seoul",
    "Singapore",
    "Sydney",
    "Melbourne",
    "Auckland",
    "Mumbai",
    "Bangalore",
    "Delhi",
    "Beijing",
    "Shanghai",
    "Hong Kong",
    "Dubai",
    "Sao Paulo",
    "Mexico City",
    "Buenos Aires",
    "Cape Town",
    "Nairobi",
    "Lagos",
    "United States",
    "United Kingdom",
    "Germany",
    "France",
    "Canada",
    "Australia",
    "Japan",
    "India",
    "Brazil",
    "Netherlands",
];

impl RuleBasedRecognizer {
    pub fn new() -> Result<Self, SanitizeError> {
        let mut rules = Vec::new();

        let mut rule = |pattern: &str,
                        group: Option<usize>,
                        label: &'static str|
         -> Result<LabelRule, SanitizeError> {
            Ok(LabelRule {
                regex: Regex::new(pattern)
                    .map_err(|e| SanitizeError::Pattern(pattern.to_string(), e.to_string()))?,
                group,
                label,
            })
        };

        // Honorific-led names: "Dr. Jane Doe", "Mrs Smith".
        rules.push(rule(
            r"\b(?:Mr|Mrs|Ms|Dr|Prof)\.?\s+[A-Z][a-z]+(?:\s+[A-Z][a-z]+)?",
            None,
            LABEL_PERSON,
        )?);

        // Contact-context names: "contact John Smith", "ping Ana Costa".
        // The cue word stays; only the name span is the entity.
        rules.push(rule(
            r"\b(?i:contact|reach|ping|cc|ask|call|email)(?-i:\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)+))",
            Some(1),
            LABEL_PERSON,
        )?);

        // Sign-off names: "Regards,\nJohn Smith".
        rules.push(rule(
            r"(?m)^(?:Regards|Thanks|Cheers|Best|Sincerely),?\s*\n\s*([A-Z][a-z]+(?:\s+[A-Z][a-z]+)?)\s*$",
            Some(1),
            LABEL_PERSON,
        )?);

        // Gazetteer locations, longest names first so "New York" beats
        // any single-word entry that might prefix it.
        let mut names: Vec<&str> = LOCATION_GAZETTEER.to_vec();
        names.sort_by_key(|n| std::cmp::Reverse(n.len()));
        let alternation = names
            .iter()
            .map(|n| regex::escape(n))
            .collect::<Vec<_>>()
            .join("|");
        rules.push(rule(
            &format!(r"\b(?:{alternation})\b"),
            None,
            LABEL_LOCATION,
        )?);

        Ok(Self { rules })
    }
}

impl EntityRecognizer for RuleBasedRecognizer {
    fn recognize(&self, text: &str) -> Vec<Entity> {
        let mut out = Vec::new();
        for rule in &self.rules {
            for caps in rule.regex.captures_iter(text) {
                let m = match rule.group {
                    Some(g) => match caps.get(g) {
                        Some(m) => m,
                        None => continue,
                    },
                    None => caps.get(0).expect("capture 0 always present"),
                };
                out.push(Entity {
                    start: m.start(),
                    end: m.end(),
                    label: rule.label,
                });
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spans(text: &str) -> Vec<(String, &'static str)> {
        let r = RuleBasedRecognizer::new().unwrap();
        r.recognize(text)
            .into_iter()
            .map(|e| (text[e.start..e.end].to_string(), e.label))
            .collect()
    }

    #[test]
    fn contact_cue_finds_full_name() {
        let found = spans("Contact John Smith about the outage.");
        assert!(found.contains(&("John Smith".to_string(), LABEL_PERSON)));
    }

    #[test]
    fn honorific_finds_name() {
        let found = spans("Escalate to Dr. Jane Doe first.");
        assert!(found
            .iter()
            .any(|(s, l)| s.contains("Jane Doe") && *l == LABEL_PERSON));
    }

    #[test]
    fn gazetteer_finds_city() {
        let found = spans("The replica lives in San Francisco us-west.");
        assert!(found.contains(&("San Francisco".to_string(), LABEL_LOCATION)));
    }

    #[test]
    fn technical_prose_is_untouched() {
        assert!(spans("Set PINGINTERVAL=5 for the Redis pipeline.").is_empty());
        assert!(spans("the fix for redis timeouts in staging").is_empty());
    }

    #[test]
    fn cue_word_is_not_part_of_the_entity() {
        let text = "ping Ana Costa when done";
        let r = RuleBasedRecognizer::new().unwrap();
        let ents = r.recognize(text);
        assert_eq!(ents.len(), 1);
        assert_eq!(&text[ents[0].start..ents[0].end], "Ana Costa");
    }
}
