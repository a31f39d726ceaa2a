//! Replacement of detected account and region literals with
//! pseudo-parameters.
//!
//! The rewrite is a fold over the template carrying two pieces of context:
//! the key the current value sits under, and whether the value is an
//! element of a `Fn::Join` parts list. The key decides how a string may be
//! rewritten:
//!
//! - under an availability zone key, `{region}{letter}` becomes a zone
//!   selection by index
//! - under `Fn::Sub`, the string already is a substitution template, so
//!   literals become `${AWS::...}` placeholders in place
//! - anywhere else, a string holding only the literal becomes a `Ref` and
//!   a string mixing it with other text is wrapped in a new `Fn::Sub`
//!
//! Inside join parts a string is instead split into literal and `Ref`
//! fragments that are spliced into the surrounding list. A number equal to
//! the account id becomes a `Ref` as well.

use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

use crate::detect::DetectedContext;
use crate::intrinsic::{self, JOIN, SUB};
use crate::segments::{self, Needle, Pseudo, Segment};

/// Keys whose string values name availability zones.
pub const AVAILABILITY_ZONE_KEYS: [&str; 2] = ["AvailabilityZone", "AvailabilityZones"];

/// Rewrites one template for one detected context.
pub struct PseudoParameterRewriter<'c> {
    context: &'c DetectedContext,
    asset_hash: Regex,
}

impl<'c> PseudoParameterRewriter<'c> {
    pub fn new(context: &'c DetectedContext) -> Self {
        Self {
            context,
            asset_hash: Regex::new(r"[a-f0-9]{64}\.(?:zip|tar)").expect("asset hash pattern is valid"),
        }
    }

    /// Rewrite a whole template.
    pub fn rewrite(&self, template: Value) -> Value {
        debug!(
            "Replacing account {} and region {}",
            self.context.account_id, self.context.region
        );
        self.rewrite_value(template, "", false)
    }

    fn needles(&self) -> [Needle<'_>; 2] {
        [
            (self.context.account_id.as_str(), Pseudo::AccountId),
            (self.context.region.as_str(), Pseudo::Region),
        ]
    }

    fn rewrite_value(&self, value: Value, parent_key: &str, in_join_parts: bool) -> Value {
        match value {
            Value::String(text) => self.rewrite_string(text, parent_key, in_join_parts),
            Value::Array(items) if parent_key == JOIN => self.rewrite_join(items),
            Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(|item| self.rewrite_value(item, parent_key, false))
                    .collect(),
            ),
            Value::Object(map) => Value::Object(self.rewrite_object(map)),
            Value::Number(number) if number.to_string() == self.context.account_id => {
                Pseudo::AccountId.reference()
            }
            scalar => scalar,
        }
    }

    fn rewrite_object(&self, map: Map<String, Value>) -> Map<String, Value> {
        map.into_iter()
            .map(|(key, value)| {
                let value = self.rewrite_value(value, &key, false);
                (key, value)
            })
            .collect()
    }

    /// `[separator, parts]`: the separator is kept, string parts are split
    /// and the resulting fragments spliced in place.
    fn rewrite_join(&self, items: Vec<Value>) -> Value {
        let mut items = items.into_iter();
        let mut rewritten = Vec::new();

        if let Some(separator) = items.next() {
            rewritten.push(separator);
        }
        if let Some(parts) = items.next() {
            let parts = match parts {
                Value::Array(parts) => Value::Array(
                    parts
                        .into_iter()
                        .map(|part| self.rewrite_value(part, JOIN, true))
                        .flat_map(splice)
                        .collect(),
                ),
                other => self.rewrite_value(other, JOIN, false),
            };
            rewritten.push(parts);
        }
        rewritten.extend(items.map(|item| self.rewrite_value(item, JOIN, false)));

        Value::Array(rewritten)
    }

    fn rewrite_string(&self, text: String, parent_key: &str, in_join_parts: bool) -> Value {
        if AVAILABILITY_ZONE_KEYS.contains(&parent_key) {
            if let Some(index) = self.zone_index(&text) {
                return intrinsic::select_az(index);
            }
        }

        if self.asset_hash.is_match(&text) {
            return Value::String(text);
        }

        let needles = self.needles();
        if !segments::contains_any(&text, &needles) {
            return Value::String(text);
        }
        let pieces = segments::split(&text, &needles);

        if in_join_parts {
            let mut fragments = segments::to_join_parts(&pieces);
            return if fragments.len() == 1 {
                fragments.remove(0)
            } else {
                Value::Array(fragments)
            };
        }

        if parent_key == SUB {
            return Value::String(segments::to_sub_template(&pieces, false));
        }

        match pieces.as_slice() {
            [Segment::Pseudo(pseudo)] => pseudo.reference(),
            _ => intrinsic::sub(segments::to_sub_template(&pieces, true)),
        }
    }

    /// Zone index of `{region}{letter}`, e.g. `us-west-2c` is 2.
    fn zone_index(&self, text: &str) -> Option<u64> {
        let suffix = text.strip_prefix(self.context.region.as_str())?;
        let mut chars = suffix.chars();
        match (chars.next(), chars.next()) {
            (Some(letter), None) if letter.is_ascii_lowercase() => Some(letter as u64 - 'a' as u64),
            _ => None,
        }
    }
}

/// Splice a fragment list produced for join parts into its parent.
fn splice(value: Value) -> Vec<Value> {
    match value {
        Value::Array(fragments) => fragments,
        other => vec![other],
    }
}
