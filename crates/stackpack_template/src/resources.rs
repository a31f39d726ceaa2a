//! Rewriters for resource shapes that carry asset locations directly.

use serde_json::{json, Value};
use tracing::debug;

use crate::document::resources_of_type_mut;
use crate::intrinsic;
use crate::parameters::{prefixed_asset_key, ASSET_BUCKET, ASSET_PREFIX};

pub const CODEBUILD_PROJECT: &str = "AWS::CodeBuild::Project";
pub const IAM_POLICY: &str = "AWS::IAM::Policy";

pub const BUCKET_VARIABLE: &str = "S3_BUCKET";
pub const KEY_VARIABLE: &str = "S3_KEY";

/// Point `S3_BUCKET`/`S3_KEY` build environment variables at the asset
/// parameters. Returns the number of variables rewritten.
pub fn rewrite_build_environment(template: &mut Value) -> usize {
    let mut rewritten = 0;

    for (logical_id, project) in resources_of_type_mut(template, &[CODEBUILD_PROJECT]) {
        let Some(variables) = project
            .pointer_mut("/Properties/Environment/EnvironmentVariables")
            .and_then(Value::as_array_mut)
        else {
            continue;
        };

        for variable in variables.iter_mut().filter_map(Value::as_object_mut) {
            let name = variable.get("Name").and_then(Value::as_str).unwrap_or_default();
            let replacement = match name {
                BUCKET_VARIABLE => Some(intrinsic::reference(ASSET_BUCKET)),
                KEY_VARIABLE => variable
                    .get("Value")
                    .and_then(Value::as_str)
                    .map(prefixed_asset_key),
                _ => None,
            };
            if let Some(value) = replacement {
                debug!("Rewrote {} of {}", name, logical_id);
                variable.insert("Value".to_string(), value);
                rewritten += 1;
            }
        }
    }

    rewritten
}

/// Wildcard object ARN under the asset bucket and prefix.
pub fn asset_objects_arn() -> Value {
    intrinsic::sub_with(
        "arn:aws:s3:::${Bucket}/${Prefix}*",
        json!({
            "Bucket": intrinsic::reference(ASSET_BUCKET),
            "Prefix": intrinsic::reference(ASSET_PREFIX),
        }),
    )
}

fn grants_object_read(statement: &Value) -> bool {
    let is_read = |action: &Value| {
        action
            .as_str()
            .map(|a| a.starts_with("s3:GetObject"))
            .unwrap_or(false)
    };
    match statement.get("Action") {
        Some(Value::Array(actions)) => actions.iter().any(is_read),
        Some(action) => is_read(action),
        None => false,
    }
}

fn is_tarball_arn(resource: &Value) -> bool {
    resource
        .as_str()
        .map(|arn| arn.contains("arn:aws:s3:::") && arn.contains(".tar"))
        .unwrap_or(false)
}

/// Replace literal tarball object ARNs in object-read statements with the
/// parameterized wildcard. Returns the number of ARNs replaced.
pub fn rewrite_tarball_grants(template: &mut Value) -> usize {
    let mut rewritten = 0;

    for (logical_id, policy) in resources_of_type_mut(template, &[IAM_POLICY]) {
        let before = rewritten;
        let Some(statements) = policy
            .pointer_mut("/Properties/PolicyDocument/Statement")
            .and_then(Value::as_array_mut)
        else {
            continue;
        };

        for statement in statements.iter_mut() {
            if !grants_object_read(statement) {
                continue;
            }
            let Some(resource) = statement.get_mut("Resource") else {
                continue;
            };

            if is_tarball_arn(resource) {
                *resource = asset_objects_arn();
                rewritten += 1;
            } else if let Value::Array(items) = resource {
                for item in items.iter_mut().filter(|r| is_tarball_arn(r)) {
                    *item = asset_objects_arn();
                    rewritten += 1;
                }
            }
        }
        if rewritten > before {
            debug!("Rewrote tarball grants in {}", logical_id);
        }
    }

    rewritten
}
