//! Constructors for the intrinsic function objects the passes emit.

use serde_json::{json, Value};

pub const REF: &str = "Ref";
pub const SUB: &str = "Fn::Sub";
pub const JOIN: &str = "Fn::Join";
pub const SELECT: &str = "Fn::Select";
pub const GET_AZS: &str = "Fn::GetAZs";
pub const GET_ATT: &str = "Fn::GetAtt";

pub const ACCOUNT_ID: &str = "AWS::AccountId";
pub const REGION: &str = "AWS::Region";
pub const URL_SUFFIX: &str = "AWS::URLSuffix";

/// `{"Ref": name}`
pub fn reference(name: &str) -> Value {
    json!({ REF: name })
}

/// `{"Fn::Sub": text}`
pub fn sub(text: impl Into<String>) -> Value {
    json!({ SUB: text.into() })
}

/// `{"Fn::Sub": [text, variables]}`
pub fn sub_with(text: impl Into<String>, variables: Value) -> Value {
    json!({ SUB: [text.into(), variables] })
}

/// `{"Fn::Join": [separator, parts]}`
pub fn join(separator: &str, parts: Vec<Value>) -> Value {
    json!({ JOIN: [separator, parts] })
}

/// The `index`-th availability zone of the deploying region.
pub fn select_az(index: u64) -> Value {
    json!({ SELECT: [index, { GET_AZS: reference(REGION) }] })
}

/// `{"Fn::GetAtt": [resource, attribute]}`
pub fn get_att(resource: &str, attribute: &str) -> Value {
    json!({ GET_ATT: [resource, attribute] })
}

/// Whether `value` is a single-key object naming an intrinsic function.
pub fn is_intrinsic(value: &Value) -> bool {
    match value.as_object() {
        Some(map) if map.len() == 1 => map
            .keys()
            .next()
            .map(|k| k == REF || k == "Condition" || k.starts_with("Fn::"))
            .unwrap_or(false),
        _ => false,
    }
}
