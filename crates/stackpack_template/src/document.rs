//! Template document I/O and section access.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{TemplateError, TemplateResult};

pub const PARAMETERS: &str = "Parameters";
pub const RESOURCES: &str = "Resources";
pub const CONDITIONS: &str = "Conditions";
pub const OUTPUTS: &str = "Outputs";
pub const RULES: &str = "Rules";

/// Parse template text. The root must be an object.
pub fn parse_template(content: &str) -> TemplateResult<Value> {
    let template: Value = serde_json::from_str(content)?;
    if !template.is_object() {
        return Err(TemplateError::NotAnObject);
    }
    Ok(template)
}

/// Read and parse a template file.
pub async fn load_template(path: &Path) -> TemplateResult<Value> {
    debug!("Loading template from {:?}", path);
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(TemplateError::NotFound(path.to_path_buf()))
        }
        Err(e) => return Err(e.into()),
    };

    parse_template(&content).map_err(|e| TemplateError::InvalidTemplate {
        path: PathBuf::from(path),
        message: e.to_string(),
    })
}

/// Serialize a template with two-space indentation.
pub fn render_template(template: &Value) -> TemplateResult<String> {
    Ok(serde_json::to_string_pretty(template)?)
}

/// Write a template, creating the parent directory when needed.
pub async fn write_template(template: &Value, path: &Path) -> TemplateResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, render_template(template)?).await?;
    debug!("Wrote template to {:?}", path);
    Ok(())
}

/// Mutable access to a top-level section, if present and an object.
pub fn section_mut<'a>(template: &'a mut Value, name: &str) -> Option<&'a mut Map<String, Value>> {
    template.get_mut(name)?.as_object_mut()
}

/// Mutable access to a top-level section, creating it when missing.
pub fn ensure_section<'a>(template: &'a mut Value, name: &str) -> Option<&'a mut Map<String, Value>> {
    let root = template.as_object_mut()?;
    let section = root
        .entry(name.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !section.is_object() {
        *section = Value::Object(Map::new());
    }
    section.as_object_mut()
}

/// Resources whose `Type` is one of `types`, with their logical ids.
pub fn resources_of_type_mut<'a>(
    template: &'a mut Value,
    types: &'a [&'a str],
) -> impl Iterator<Item = (&'a str, &'a mut Value)> + 'a {
    section_mut(template, RESOURCES)
        .into_iter()
        .flat_map(|resources| resources.iter_mut())
        .filter(move |(_, resource)| {
            resource
                .get("Type")
                .and_then(Value::as_str)
                .map(|t| types.contains(&t))
                .unwrap_or(false)
        })
        .map(|(logical_id, resource)| (logical_id.as_str(), resource))
}
