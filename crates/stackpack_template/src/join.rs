//! Repair of placeholders left in join parts and outputs.

use serde_json::Value;
use tracing::debug;

use crate::document::{section_mut, OUTPUTS, PARAMETERS};
use crate::intrinsic::{self, JOIN};
use crate::segments::{self, Needle};

/// Second pass after pseudo-parameter rewriting.
///
/// `${AWS::...}` tokens are only meaningful inside `Fn::Sub`. Any that sit
/// in a `Fn::Join` parts list or a bare output value are turned into
/// proper references here, and expression-valued parameter defaults are
/// dropped.
pub struct JoinNormalizer {
    needles: [Needle<'static>; 2],
}

impl Default for JoinNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl JoinNormalizer {
    pub fn new() -> Self {
        Self {
            needles: segments::placeholder_needles(),
        }
    }

    /// Run all three repairs.
    pub fn normalize(&self, template: Value) -> Value {
        let mut template = self.normalize_joins(template);
        self.wrap_outputs(&mut template);
        let pruned = prune_expression_defaults(&mut template);
        if pruned > 0 {
            debug!("Removed {} expression-valued parameter default(s)", pruned);
        }
        template
    }

    /// Split placeholder strings in every join's parts list.
    pub fn normalize_joins(&self, value: Value) -> Value {
        match value {
            Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(key, value)| {
                        let value = match value {
                            Value::Array(items) if key == JOIN && items.len() == 2 => {
                                self.normalize_join(items)
                            }
                            other => self.normalize_joins(other),
                        };
                        (key, value)
                    })
                    .collect(),
            ),
            Value::Array(items) => {
                Value::Array(items.into_iter().map(|item| self.normalize_joins(item)).collect())
            }
            scalar => scalar,
        }
    }

    fn normalize_join(&self, items: Vec<Value>) -> Value {
        let mut items = items.into_iter();
        let separator = items.next().unwrap_or(Value::Null);
        let parts = match items.next() {
            Some(Value::Array(parts)) => Value::Array(
                parts
                    .into_iter()
                    .flat_map(|part| match part {
                        Value::String(text) if segments::contains_any(&text, &self.needles) => {
                            segments::to_join_parts(&segments::split(&text, &self.needles))
                        }
                        other => vec![self.normalize_joins(other)],
                    })
                    .collect(),
            ),
            Some(other) => self.normalize_joins(other),
            None => Value::Null,
        };
        Value::Array(vec![separator, parts])
    }

    /// Give output values with leftover placeholders a valid expression:
    /// strings become `Fn::Sub`, fragment lists become `Fn::Join`.
    pub fn wrap_outputs(&self, template: &mut Value) {
        let Some(outputs) = section_mut(template, OUTPUTS) else {
            return;
        };

        for (name, output) in outputs.iter_mut() {
            let Some(value) = output.get_mut("Value") else {
                continue;
            };
            let wrapped = match value {
                Value::String(text) if segments::contains_any(text.as_str(), &self.needles) => {
                    intrinsic::sub(text.as_str())
                }
                Value::Array(fragments) => intrinsic::join("", std::mem::take(fragments)),
                _ => continue,
            };
            debug!("Wrapped value of output {}", name);
            *value = wrapped;
        }
    }
}

/// Remove `Default` from parameters whose default is an object. Returns
/// the number removed.
pub fn prune_expression_defaults(template: &mut Value) -> usize {
    let Some(parameters) = section_mut(template, PARAMETERS) else {
        return 0;
    };

    let mut pruned = 0;
    for parameter in parameters.values_mut().filter_map(Value::as_object_mut) {
        if parameter.get("Default").map(Value::is_object).unwrap_or(false) {
            parameter.shift_remove("Default");
            pruned += 1;
        }
    }
    pruned
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_placeholders_in_join_parts_split() {
        let template = json!({"Value": {"Fn::Join": ["", [
            "https://${AWS::Region}.console.aws.amazon.com/${AWS::AccountId}",
            {"Ref": "Api"}
        ]]}});
        assert_eq!(
            JoinNormalizer::new().normalize_joins(template),
            json!({"Value": {"Fn::Join": ["", [
                "https://",
                {"Ref": "AWS::Region"},
                ".console.aws.amazon.com/",
                {"Ref": "AWS::AccountId"},
                {"Ref": "Api"}
            ]]}})
        );
    }

    #[test]
    fn test_nested_join_inside_parts() {
        let template = json!({"Fn::Join": ["", [
            {"Fn::Join": ["-", ["${AWS::AccountId}", "x"]]},
            "plain"
        ]]});
        assert_eq!(
            JoinNormalizer::new().normalize_joins(template),
            json!({"Fn::Join": ["", [
                {"Fn::Join": ["-", [{"Ref": "AWS::AccountId"}, "x"]]},
                "plain"
            ]]})
        );
    }

    #[test]
    fn test_sub_strings_left_alone() {
        let template = json!({"Fn::Sub": "${AWS::Region}-x"});
        assert_eq!(JoinNormalizer::new().normalize_joins(template.clone()), template);
    }

    #[test]
    fn test_output_values_wrapped() {
        let mut template = json!({"Outputs": {
            "Url": {"Value": "https://${AWS::Region}.example.com"},
            "Parts": {"Value": ["a", {"Ref": "AWS::Region"}]},
            "Plain": {"Value": "static"},
            "Attr": {"Value": {"Fn::GetAtt": ["A", "Arn"]}}
        }});
        JoinNormalizer::new().wrap_outputs(&mut template);

        assert_eq!(
            template["Outputs"]["Url"]["Value"],
            json!({"Fn::Sub": "https://${AWS::Region}.example.com"})
        );
        assert_eq!(
            template["Outputs"]["Parts"]["Value"],
            json!({"Fn::Join": ["", ["a", {"Ref": "AWS::Region"}]]})
        );
        assert_eq!(template["Outputs"]["Plain"]["Value"], "static");
        assert_eq!(
            template["Outputs"]["Attr"]["Value"],
            json!({"Fn::GetAtt": ["A", "Arn"]})
        );
    }

    #[test]
    fn test_expression_defaults_pruned() {
        let mut template = json!({"Parameters": {
            "Account": {"Type": "String", "Default": {"Ref": "AWS::AccountId"}},
            "Stage": {"Type": "String", "Default": "prod"},
            "Bucket": {"Type": "String"}
        }});
        assert_eq!(prune_expression_defaults(&mut template), 1);
        assert_eq!(
            template["Parameters"],
            json!({
                "Account": {"Type": "String"},
                "Stage": {"Type": "String", "Default": "prod"},
                "Bucket": {"Type": "String"}
            })
        );
    }
}
