//! Swagger document parsing
//!
//! Only `aws_proxy` integrations are routable locally; every other method
//! entry is skipped without failing the document.

use crate::lambda_uri;
use crate::route::{MethodSpec, Route};
use serde_json::Value;
use tracing::debug;

pub const INTEGRATION_KEY: &str = "x-amazon-apigateway-integration";
pub const BINARY_MEDIA_TYPES_KEY: &str = "x-amazon-apigateway-binary-media-types";

const PROXY_INTEGRATION_TYPE: &str = "aws_proxy";

/// Read-only view over one Swagger document
#[derive(Debug, Clone, Copy)]
pub struct SwaggerDocument<'a> {
    doc: &'a Value,
}

impl<'a> SwaggerDocument<'a> {
    pub fn new(doc: &'a Value) -> Self {
        Self { doc }
    }

    /// One route per valid (path, method) entry, with `ANY` already expanded
    pub fn routes(&self) -> Vec<Route> {
        let Some(paths) = self.doc.get("paths").and_then(Value::as_object) else {
            return Vec::new();
        };

        let mut routes = Vec::new();
        for (path, path_config) in paths {
            let Some(methods) = path_config.as_object() else {
                continue;
            };

            for (method, method_config) in methods {
                let Ok(spec) = method.parse::<MethodSpec>() else {
                    debug!(path = %path, method = %method, "Skipping unsupported swagger method");
                    continue;
                };

                let Some(function_name) = integration_function_name(method_config) else {
                    debug!(
                        path = %path,
                        method = %method,
                        "Skipping swagger method without a resolvable Lambda proxy integration"
                    );
                    continue;
                };

                routes.push(Route::new(path.as_str(), spec.expand(), function_name));
            }
        }

        routes
    }

    /// Binary media types declared on the document root, as written
    pub fn binary_media_types(&self) -> Vec<String> {
        self.doc
            .get(BINARY_MEDIA_TYPES_KEY)
            .and_then(Value::as_array)
            .map(|types| {
                types
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Function behind a method's Lambda proxy integration, if there is one
fn integration_function_name(method_config: &Value) -> Option<String> {
    let integration = method_config.get(INTEGRATION_KEY)?.as_object()?;

    if integration.get("type").and_then(Value::as_str) != Some(PROXY_INTEGRATION_TYPE) {
        return None;
    }

    let uri = integration.get("uri")?;
    lambda_uri::function_name(uri)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::HttpMethod;
    use serde_json::json;

    fn integration(function: &str) -> Value {
        json!({
            INTEGRATION_KEY: {
                "type": "aws_proxy",
                "uri": format!(
                    "arn:aws:apigateway:us-east-1:lambda:path/2015-03-31/functions/arn:aws:lambda:us-east-1:123456789012:function:{function}/invocations"
                )
            }
        })
    }

    #[test]
    fn test_one_path_one_method() {
        let doc = json!({ "paths": { "/path1": { "get": integration("myfunction") } } });

        let routes = SwaggerDocument::new(&doc).routes();
        assert_eq!(routes, vec![Route::new("/path1", [HttpMethod::Get], "myfunction")]);
    }

    #[test]
    fn test_combination_of_paths_and_methods() {
        let doc = json!({
            "paths": {
                "/path1": { "get": integration("myfunction"), "delete": integration("myfunction") },
                "/path2": { "post": integration("myfunction") }
            }
        });

        let routes = SwaggerDocument::new(&doc).routes();
        assert_eq!(routes.len(), 3);
        assert!(routes.contains(&Route::new("/path1", [HttpMethod::Get], "myfunction")));
        assert!(routes.contains(&Route::new("/path1", [HttpMethod::Delete], "myfunction")));
        assert!(routes.contains(&Route::new("/path2", [HttpMethod::Post], "myfunction")));
    }

    #[test]
    fn test_any_method_extension_expands() {
        let doc = json!({ "paths": { "/path1": { "x-amazon-apigateway-any-method": integration("myfunction") } } });

        let routes = SwaggerDocument::new(&doc).routes();
        assert_eq!(routes, vec![Route::new("/path1", HttpMethod::ANY, "myfunction")]);
    }

    #[test]
    fn test_unresolvable_function_is_skipped() {
        let doc = json!({
            "paths": {
                "/path1": {
                    "post": { INTEGRATION_KEY: { "type": "aws_proxy", "uri": "someuri" } },
                    "get": integration("valid")
                }
            }
        });

        let routes = SwaggerDocument::new(&doc).routes();
        assert_eq!(routes, vec![Route::new("/path1", [HttpMethod::Get], "valid")]);
    }

    #[test]
    fn test_invalid_documents_yield_no_routes() {
        let cases = [
            json!({}),
            json!(null),
            json!("not a document"),
            json!({ "foo": "bar" }),
            json!({ "paths": {} }),
            json!({ "paths": { "/path1": {} } }),
            json!({ "paths": { "/path1": { "get": {} } } }),
            json!({ "paths": { "/path1": { "parameters": [] } } }),
        ];

        for doc in &cases {
            assert!(SwaggerDocument::new(doc).routes().is_empty(), "{doc}");
        }
    }

    #[test]
    fn test_invalid_integrations_are_skipped() {
        let cases = [
            json!("myconfig"),
            json!({ "key": "value" }),
            json!({ INTEGRATION_KEY: {} }),
            json!({ INTEGRATION_KEY: "someval" }),
            json!({ INTEGRATION_KEY: { "type": "mock" } }),
            json!({ INTEGRATION_KEY: { "type": "aws_proxy" } }),
        ];

        for config in &cases {
            assert_eq!(integration_function_name(config), None, "{config}");
        }
    }

    #[test]
    fn test_binary_media_types() {
        let doc = json!({ BINARY_MEDIA_TYPES_KEY: ["image/gif", "application/json"] });
        assert_eq!(
            SwaggerDocument::new(&doc).binary_media_types(),
            vec!["image/gif", "application/json"]
        );

        assert!(SwaggerDocument::new(&json!({})).binary_media_types().is_empty());
        assert!(SwaggerDocument::new(&json!(null)).binary_media_types().is_empty());
    }
}
