//! Read-only view over a resolved CloudFormation / SAM template

use crate::cors::CorsSpec;
use crate::error::ApiError;
use crate::reader;
use serde_json::{Map, Value};
use std::path::Path;
use std::str::FromStr;

pub const SERVERLESS_FUNCTION: &str = "AWS::Serverless::Function";
pub const LAMBDA_FUNCTION: &str = "AWS::Lambda::Function";
pub const SERVERLESS_API: &str = "AWS::Serverless::Api";
pub const REST_API: &str = "AWS::ApiGateway::RestApi";
pub const STAGE: &str = "AWS::ApiGateway::Stage";

/// A template document, already loaded and with parameters resolved
#[derive(Debug, Clone, Default)]
pub struct Template {
    value: Value,
}

impl Template {
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    pub fn load(path: &Path) -> Result<Self, ApiError> {
        reader::load_document(path).map(Self::new)
    }

    /// Resources in declaration order
    pub fn resources(&self) -> impl Iterator<Item = Resource<'_>> {
        self.value
            .get("Resources")
            .and_then(Value::as_object)
            .into_iter()
            .flatten()
            .map(|(logical_id, definition)| Resource {
                logical_id: logical_id.as_str(),
                resource_type: definition
                    .get("Type")
                    .and_then(Value::as_str)
                    .unwrap_or_default(),
                properties: definition.get("Properties").and_then(Value::as_object),
            })
    }

    pub fn resources_of_type<'a>(
        &'a self,
        resource_type: &'a str,
    ) -> impl Iterator<Item = Resource<'a>> + 'a {
        self.resources()
            .filter(move |r| r.resource_type == resource_type)
    }

    /// The `Globals.Api` block
    pub fn api_globals(&self) -> Option<&Map<String, Value>> {
        self.value.get("Globals")?.get("Api")?.as_object()
    }
}

impl FromStr for Template {
    type Err = ApiError;

    /// Parse YAML or JSON template text
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        reader::parse_document(text).map(Self::new)
    }
}

/// One entry of the `Resources` section
#[derive(Debug, Clone, Copy)]
pub struct Resource<'a> {
    pub logical_id: &'a str,
    pub resource_type: &'a str,
    properties: Option<&'a Map<String, Value>>,
}

impl<'a> Resource<'a> {
    pub fn property(&self, name: &str) -> Option<&'a Value> {
        self.properties?.get(name)
    }

    pub fn string_property(&self, name: &str) -> Option<&'a str> {
        self.property(name).and_then(Value::as_str)
    }

    pub fn is_function(&self) -> bool {
        self.resource_type == SERVERLESS_FUNCTION || self.resource_type == LAMBDA_FUNCTION
    }
}

/// Defaults from `Globals.Api`, applied to every SAM API.
///
/// The fields merge differently with a resource's own settings: a resource's
/// `Cors` replaces the global one outright, while binary media types from
/// every source are concatenated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlobalApiDefaults {
    pub cors: Option<CorsSpec>,
    pub binary_media_types: Vec<String>,
}

impl GlobalApiDefaults {
    pub fn from_template(template: &Template) -> Result<Self, ApiError> {
        let Some(globals) = template.api_globals() else {
            return Ok(Self::default());
        };

        Ok(Self {
            cors: globals.get("Cors").map(CorsSpec::from_value).transpose()?,
            binary_media_types: string_list(globals.get("BinaryMediaTypes")),
        })
    }

    pub fn cors_for(&self, resource_cors: Option<CorsSpec>) -> Option<CorsSpec> {
        resource_cors.or_else(|| self.cors.clone())
    }

    pub fn binary_media_types_for(&self, own: &[String], swagger: &[String]) -> Vec<String> {
        normalize_binary_media_types(
            own.iter()
                .chain(swagger)
                .chain(&self.binary_media_types)
                .map(String::as_str),
        )
    }
}

/// Unescape `~1` to `/`, then sort and deduplicate
pub fn normalize_binary_media_types<'a>(types: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut normalized: Vec<String> = types.into_iter().map(|t| t.replace("~1", "/")).collect();
    normalized.sort();
    normalized.dedup();
    normalized
}

/// String entries of a list property; anything else is ignored
pub fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resources_keep_declaration_order() {
        let template: Template = r"
Resources:
  Zeta:
    Type: AWS::Serverless::Function
  Alpha:
    Type: AWS::Serverless::Api
    Properties:
      StageName: dev
  NoType: {}
"
        .parse()
        .unwrap();

        let ids: Vec<&str> = template.resources().map(|r| r.logical_id).collect();
        assert_eq!(ids, vec!["Zeta", "Alpha", "NoType"]);

        let api = template.resources_of_type(SERVERLESS_API).next().unwrap();
        assert_eq!(api.string_property("StageName"), Some("dev"));
        assert!(template.resources().next().unwrap().is_function());
    }

    #[test]
    fn test_empty_template_has_no_resources() {
        let template = Template::new(json!({}));
        assert_eq!(template.resources().count(), 0);
        assert_eq!(
            GlobalApiDefaults::from_template(&template).unwrap(),
            GlobalApiDefaults::default()
        );
    }

    #[test]
    fn test_normalize_binary_media_types() {
        let normalized = normalize_binary_media_types(["image~1png", "image~1gif", "image/png"]);
        assert_eq!(normalized, vec!["image/gif", "image/png"]);
    }

    #[test]
    fn test_resource_cors_replaces_global() {
        let template = Template::new(json!({
            "Globals": {"Api": {"Cors": "'*'", "BinaryMediaTypes": ["image~1gif"]}}
        }));
        let globals = GlobalApiDefaults::from_template(&template).unwrap();

        assert_eq!(globals.cors_for(None), Some(CorsSpec::Origin("'*'".to_string())));

        let own = CorsSpec::Origin("'example.com'".to_string());
        assert_eq!(globals.cors_for(Some(own.clone())), Some(own));
    }

    #[test]
    fn test_binary_media_types_concatenate() {
        let globals = GlobalApiDefaults {
            cors: None,
            binary_media_types: vec!["image~1gif".to_string()],
        };
        let merged = globals.binary_media_types_for(
            &["text/html".to_string()],
            &["application~1octet-stream".to_string(), "image/gif".to_string()],
        );
        assert_eq!(merged, vec!["application/octet-stream", "image/gif", "text/html"]);
    }
}
