//! Asset location parameters and archive code references.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::document::{ensure_section, resources_of_type_mut, PARAMETERS};
use crate::intrinsic;

pub const ASSET_BUCKET: &str = "AssetBucket";
pub const ASSET_PREFIX: &str = "AssetPrefix";
pub const LANGUAGE: &str = "Language";

pub const LAMBDA_FUNCTION: &str = "AWS::Lambda::Function";
pub const LAMBDA_LAYER_VERSION: &str = "AWS::Lambda::LayerVersion";

pub const DEFAULT_SERVICES_STACK: &str = "powertoolsworkshopservices";

const ASSET_BUCKET_DESCRIPTION: &str = "Name of the Amazon S3 Bucket where the assets related to this stack will be found. The stack references this bucket.";
const ASSET_PREFIX_DESCRIPTION: &str = "Prefix of the Amazon S3 Bucket where the assets related to this stack are. This prefix is prepended to asset keys.";

/// The language selector added to the services stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageParameter {
    pub allowed_values: Vec<String>,
    pub default: String,
}

impl Default for LanguageParameter {
    fn default() -> Self {
        Self {
            allowed_values: ["typescript", "python", "java", "dotnet"]
                .into_iter()
                .map(String::from)
                .collect(),
            default: "typescript".to_string(),
        }
    }
}

impl LanguageParameter {
    pub fn to_parameter(&self) -> Value {
        json!({
            "Type": "String",
            "Description": format!(
                "Programming language for the services ({})",
                self.allowed_values.join(", ")
            ),
            "Default": self.default,
            "AllowedValues": self.allowed_values,
        })
    }
}

/// `{"Fn::Sub": ["${Prefix}<suffix>", {"Prefix": {"Ref": "AssetPrefix"}}]}`
pub fn prefixed_asset_key(suffix: &str) -> Value {
    intrinsic::sub_with(
        format!("${{Prefix}}{}", suffix),
        json!({ "Prefix": intrinsic::reference(ASSET_PREFIX) }),
    )
}

/// Adds the asset parameters and points archive-deployed code at them.
#[derive(Debug, Clone)]
pub struct ParameterInjector {
    services_stack: String,
    language: LanguageParameter,
}

impl Default for ParameterInjector {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICES_STACK)
    }
}

impl ParameterInjector {
    pub fn new(services_stack: impl Into<String>) -> Self {
        Self {
            services_stack: services_stack.into(),
            language: LanguageParameter::default(),
        }
    }

    pub fn with_language(mut self, language: LanguageParameter) -> Self {
        self.language = language;
        self
    }

    /// Inject parameters and rewrite code locations for `stack_name`.
    pub fn inject(&self, template: &mut Value, stack_name: &str) {
        if let Some(parameters) = ensure_section(template, PARAMETERS) {
            parameters.insert(
                ASSET_BUCKET.to_string(),
                json!({"Type": "String", "Description": ASSET_BUCKET_DESCRIPTION}),
            );
            parameters.insert(
                ASSET_PREFIX.to_string(),
                json!({"Type": "String", "Description": ASSET_PREFIX_DESCRIPTION}),
            );
            if stack_name == self.services_stack {
                parameters.insert(LANGUAGE.to_string(), self.language.to_parameter());
                debug!("Added {} parameter for services stack", LANGUAGE);
            }
        }

        let mut rewritten = 0;
        for (logical_id, resource) in
            resources_of_type_mut(template, &[LAMBDA_FUNCTION, LAMBDA_LAYER_VERSION])
        {
            let property = match resource.get("Type").and_then(Value::as_str) {
                Some(LAMBDA_LAYER_VERSION) => "Content",
                _ => "Code",
            };
            let Some(code) = resource
                .get_mut("Properties")
                .and_then(|p| p.get_mut(property))
                .and_then(Value::as_object_mut)
            else {
                continue;
            };

            if code.contains_key("ZipFile") {
                debug!("Leaving inline code of {} untouched", logical_id);
                continue;
            }
            if rewrite_code_location(code) {
                rewritten += 1;
            } else {
                warn!("{} has no literal S3Key; code location left as is", logical_id);
            }
        }
        debug!("Rewrote code location of {} resource(s)", rewritten);
    }
}

fn rewrite_code_location(code: &mut Map<String, Value>) -> bool {
    let Some(key) = code.get("S3Key").and_then(Value::as_str).map(str::to_string) else {
        return false;
    };
    code.insert("S3Bucket".to_string(), intrinsic::reference(ASSET_BUCKET));
    code.insert("S3Key".to_string(), prefixed_asset_key(&key));
    true
}
