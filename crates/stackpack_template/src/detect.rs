//! Detection of the account id and region a template was synthesized for.

use std::collections::HashMap;

use regex::Regex;
use serde_json::Value;

/// The literals the rewrite passes replace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedContext {
    pub account_id: String,
    pub region: String,
}

/// Finds the dominant account id and the first region in a template.
///
/// The account id is the most frequent run of exactly twelve digits; ties
/// go to the value seen first. The region is the first substring shaped
/// like a region name, e.g. `us-west-2` or `us-gov-east-1`.
pub struct LiteralDetector {
    digits: Regex,
    region: Regex,
}

impl Default for LiteralDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl LiteralDetector {
    pub fn new() -> Self {
        Self {
            digits: Regex::new(r"\d+").expect("digit pattern is valid"),
            region: Regex::new(
                r"(?:us|eu|ap|sa|ca|me|af|il|mx)-(?:gov-)?(?:northeast|southeast|northwest|southwest|north|south|east|west|central)-\d",
            )
            .expect("region pattern is valid"),
        }
    }

    /// Detect both literals, or `None` when either is missing.
    pub fn detect(&self, template: &Value) -> Option<DetectedContext> {
        self.detect_in_text(&template.to_string())
    }

    pub fn detect_in_text(&self, text: &str) -> Option<DetectedContext> {
        Some(DetectedContext {
            account_id: self.account_id(text)?,
            region: self.region(text)?,
        })
    }

    pub fn account_id(&self, text: &str) -> Option<String> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        let mut order: Vec<&str> = Vec::new();

        for run in self.digits.find_iter(text).map(|m| m.as_str()) {
            if run.len() != 12 {
                continue;
            }
            let count = counts.entry(run).or_insert(0);
            if *count == 0 {
                order.push(run);
            }
            *count += 1;
        }

        // max_by_key keeps the last maximum, so scan in reverse
        order
            .into_iter()
            .rev()
            .max_by_key(|run| counts[run])
            .map(str::to_string)
    }

    pub fn region(&self, text: &str) -> Option<String> {
        self.region.find(text).map(|m| m.as_str().to_string())
    }
}
