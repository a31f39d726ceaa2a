//! Removal of build-tool-only template content.

use serde_json::Value;
use tracing::debug;

use crate::document::{section_mut, CONDITIONS, PARAMETERS, RESOURCES, RULES};

pub const BOOTSTRAP_VERSION: &str = "BootstrapVersion";
pub const METADATA: &str = "Metadata";
pub const CDK_METADATA: &str = "CDKMetadata";
pub const CDK_METADATA_AVAILABLE: &str = "CDKMetadataAvailable";

/// Strip the bootstrap rules, the bootstrap version parameter, resource
/// metadata, and the metadata resource and condition.
///
/// Every removal is a presence check, so sanitizing twice is harmless.
pub fn sanitize(template: &mut Value) {
    if let Some(root) = template.as_object_mut() {
        if root.shift_remove(RULES).is_some() {
            debug!("Removed {} section", RULES);
        }
    }

    if let Some(parameters) = section_mut(template, PARAMETERS) {
        parameters.shift_remove(BOOTSTRAP_VERSION);
    }

    if let Some(resources) = section_mut(template, RESOURCES) {
        resources.shift_remove(METADATA);
        resources.shift_remove(CDK_METADATA);

        let mut stripped = 0;
        for resource in resources.values_mut() {
            if let Some(resource) = resource.as_object_mut() {
                if resource.shift_remove(METADATA).is_some() {
                    stripped += 1;
                }
            }
        }
        debug!("Stripped metadata from {} resource(s)", stripped);
    }

    if let Some(conditions) = section_mut(template, CONDITIONS) {
        conditions.shift_remove(CDK_METADATA_AVAILABLE);
    }
}
