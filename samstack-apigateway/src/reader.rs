//! Swagger document loading
//!
//! A definition is either inline in the template (`DefinitionBody`, `Body`)
//! or a reference to a document elsewhere (`DefinitionUri`,
//! `BodyS3Location`). Only local files can be read.

use crate::error::ApiError;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Loads the Swagger document behind an API definition
pub trait SwaggerReader {
    /// Inline body takes precedence over the external reference. Returns
    /// `None` when there is no readable document.
    fn read(&self, definition_body: Option<&Value>, definition_uri: Option<&Value>)
        -> Option<Value>;
}

/// Reads local files relative to a working directory
#[derive(Debug, Clone)]
pub struct FsSwaggerReader {
    working_dir: PathBuf,
}

impl FsSwaggerReader {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
        }
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    fn read_location(&self, location: &str) -> Option<Value> {
        if location.starts_with("s3://") {
            warn!(location = %location, "Swagger documents stored in S3 cannot be read locally");
            return None;
        }

        let path = self.working_dir.join(location);
        match load_document(&path) {
            Ok(doc) => {
                debug!(path = %path.display(), "Loaded swagger document");
                Some(doc)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unable to read swagger document");
                None
            }
        }
    }
}

impl Default for FsSwaggerReader {
    fn default() -> Self {
        Self::new(".")
    }
}

impl SwaggerReader for FsSwaggerReader {
    fn read(
        &self,
        definition_body: Option<&Value>,
        definition_uri: Option<&Value>,
    ) -> Option<Value> {
        if let Some(body) = definition_body {
            return match include_location(body) {
                Some(location) => self.read_location(location),
                None => Some(body.clone()),
            };
        }

        match definition_uri? {
            Value::String(location) => self.read_location(location),
            Value::Object(map) if map.contains_key("Bucket") => {
                warn!(
                    bucket = ?map.get("Bucket"),
                    key = ?map.get("Key"),
                    "Swagger documents stored in S3 cannot be read locally"
                );
                None
            }
            other => {
                warn!(uri = %other, "Unsupported swagger definition reference");
                None
            }
        }
    }
}

/// Parse a YAML or JSON document from disk
pub fn load_document(path: &Path) -> Result<Value, ApiError> {
    let text = std::fs::read_to_string(path)?;
    parse_document(&text)
}

/// Parse YAML or JSON text. Short-form intrinsics (`!Ref X`, `!GetAtt A.B`,
/// `!Sub ...`) become their long-form mappings.
pub fn parse_document(text: &str) -> Result<Value, ApiError> {
    let yaml: serde_yaml::Value = serde_yaml::from_str(text)?;
    yaml_to_json(yaml)
}

fn yaml_to_json(yaml: serde_yaml::Value) -> Result<Value, ApiError> {
    use serde_yaml::Value as Yaml;

    Ok(match yaml {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(b),
        Yaml::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map_or(Value::Null, Value::Number)
            }
        }
        Yaml::String(s) => Value::String(s),
        Yaml::Sequence(items) => Value::Array(
            items
                .into_iter()
                .map(yaml_to_json)
                .collect::<Result<_, _>>()?,
        ),
        Yaml::Mapping(mapping) => {
            let mut object = serde_json::Map::with_capacity(mapping.len());
            for (key, value) in mapping {
                object.insert(mapping_key(key)?, yaml_to_json(value)?);
            }
            Value::Object(object)
        }
        Yaml::Tagged(tagged) => {
            let tag = tagged.tag.to_string();
            let name = tag.trim_start_matches('!');
            let value = yaml_to_json(tagged.value)?;
            let (key, value) = match (name, value) {
                ("Ref", value) => ("Ref".to_string(), value),
                ("GetAtt", Value::String(target)) => (
                    "Fn::GetAtt".to_string(),
                    Value::Array(
                        target
                            .splitn(2, '.')
                            .map(|part| Value::String(part.to_string()))
                            .collect(),
                    ),
                ),
                (other, value) => (format!("Fn::{other}"), value),
            };
            let mut object = serde_json::Map::with_capacity(1);
            object.insert(key, value);
            Value::Object(object)
        }
    })
}

fn mapping_key(key: serde_yaml::Value) -> Result<String, ApiError> {
    use serde_yaml::Value as Yaml;

    match key {
        Yaml::String(s) => Ok(s),
        Yaml::Bool(b) => Ok(b.to_string()),
        Yaml::Number(n) => Ok(n.to_string()),
        other => Err(ApiError::InvalidDocument(format!(
            "Unsupported mapping key: {other:?}"
        ))),
    }
}

/// `Location` of an `Fn::Transform: AWS::Include` body
fn include_location(body: &Value) -> Option<&str> {
    let transform = body.get("Fn::Transform")?;
    if transform.get("Name").and_then(Value::as_str) != Some("AWS::Include") {
        return None;
    }
    transform
        .get("Parameters")?
        .get("Location")?
        .as_str()
}
