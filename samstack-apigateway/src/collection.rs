//! Resolved APIs

use crate::cors::Cors;
use crate::route::{HttpMethod, Route};
use std::collections::HashMap;

pub const DEFAULT_STAGE_NAME: &str = "Prod";

/// Logical id SAM gives the API it generates for implicit routes
pub const IMPLICIT_API_ID: &str = "ServerlessRestApi";

/// A REST API with its final routes
#[derive(Debug, Clone, PartialEq)]
pub struct Api {
    pub logical_id: String,
    pub routes: Vec<Route>,
    /// Sorted, deduplicated, `~1` already unescaped
    pub binary_media_types: Vec<String>,
    pub stage_name: String,
    pub stage_variables: Option<HashMap<String, String>>,
    pub cors: Option<Cors>,
}

impl Api {
    pub fn new(logical_id: impl Into<String>) -> Self {
        Self {
            logical_id: logical_id.into(),
            routes: Vec::new(),
            binary_media_types: Vec::new(),
            stage_name: DEFAULT_STAGE_NAME.to_string(),
            stage_variables: None,
            cors: None,
        }
    }

    /// Route serving `method` on exactly `path`
    pub fn find_route(&self, path: &str, method: HttpMethod) -> Option<&Route> {
        self.routes
            .iter()
            .find(|r| r.path == path && r.has_method(method))
    }

    pub fn is_binary_media_type(&self, mime_type: &str) -> bool {
        self.binary_media_types.iter().any(|t| t == mime_type)
    }
}

/// Every API found in a template, in template order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApiCollection {
    apis: Vec<Api>,
}

impl ApiCollection {
    pub fn new(apis: Vec<Api>) -> Self {
        Self { apis }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Api> {
        self.apis.iter()
    }

    pub fn get(&self, logical_id: &str) -> Option<&Api> {
        self.apis.iter().find(|a| a.logical_id == logical_id)
    }

    /// Routes across all APIs
    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.apis.iter().flat_map(|a| a.routes.iter())
    }

    pub fn len(&self) -> usize {
        self.apis.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apis.is_empty()
    }
}

impl<'a> IntoIterator for &'a ApiCollection {
    type Item = &'a Api;
    type IntoIter = std::slice::Iter<'a, Api>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl IntoIterator for ApiCollection {
    type Item = Api;
    type IntoIter = std::vec::IntoIter<Api>;

    fn into_iter(self) -> Self::IntoIter {
        self.apis.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(logical_id: &str, routes: Vec<Route>) -> Api {
        Api {
            routes,
            ..Api::new(logical_id)
        }
    }

    #[test]
    fn test_new_api_defaults() {
        let api = Api::new("MyApi");
        assert_eq!(api.stage_name, "Prod");
        assert_eq!(api.stage_variables, None);
        assert!(api.routes.is_empty());
        assert!(api.cors.is_none());
    }

    #[test]
    fn test_find_route() {
        let api = api(
            "MyApi",
            vec![
                Route::new("/items", [HttpMethod::Get], "ListItems"),
                Route::new("/items", [HttpMethod::Post], "CreateItem"),
            ],
        );

        assert_eq!(
            api.find_route("/items", HttpMethod::Post).map(|r| r.function_name.as_str()),
            Some("CreateItem")
        );
        assert!(api.find_route("/items", HttpMethod::Delete).is_none());
        assert!(api.find_route("/other", HttpMethod::Get).is_none());
    }

    #[test]
    fn test_collection_iterates_every_api() {
        let collection = ApiCollection::new(vec![
            api("First", vec![Route::new("/a", [HttpMethod::Get], "A")]),
            api(
                "Second",
                vec![
                    Route::new("/b", [HttpMethod::Get], "B"),
                    Route::new("/c", [HttpMethod::Put], "C"),
                ],
            ),
        ]);

        assert_eq!(collection.len(), 2);
        assert_eq!(collection.routes().count(), 3);
        assert_eq!(collection.get("Second").map(|a| a.routes.len()), Some(2));
        assert!(collection.get("Third").is_none());

        let ids: Vec<&str> = (&collection).into_iter().map(|a| a.logical_id.as_str()).collect();
        assert_eq!(ids, vec!["First", "Second"]);
    }
}
