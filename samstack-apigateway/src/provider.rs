//! Route resolution
//!
//! Turns a template into the APIs it deploys. Two flavours exist:
//!
//! * SAM: `AWS::Serverless::Api` resources carry explicit routes in a Swagger
//!   definition, and `Api` events on functions declare implicit routes.
//! * CloudFormation: `AWS::ApiGateway::RestApi` resources with a Swagger
//!   `Body`, staged by `AWS::ApiGateway::Stage` resources.

use crate::collection::{Api, ApiCollection, DEFAULT_STAGE_NAME, IMPLICIT_API_ID};
use crate::cors::{CorsResolver, CorsSpec};
use crate::error::ApiError;
use crate::intrinsics::IntrinsicResolver;
use crate::reader::SwaggerReader;
use crate::route::{HttpMethod, MethodSpec, Route};
use crate::swagger::SwaggerDocument;
use crate::template::{
    normalize_binary_media_types, string_list, GlobalApiDefaults, Resource, Template, REST_API,
    SERVERLESS_API, STAGE,
};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

const API_EVENT_TYPE: &str = "Api";

/// Which resource types declare the APIs of a template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiFlavour {
    Sam,
    CloudFormation,
}

impl ApiFlavour {
    /// Any `AWS::ApiGateway::RestApi` makes the template a CloudFormation one
    pub fn detect(template: &Template) -> Self {
        if template.resources().any(|r| r.resource_type == REST_API) {
            Self::CloudFormation
        } else {
            Self::Sam
        }
    }
}

/// Resolves every API a template declares
pub struct RouteResolver<'a> {
    reader: &'a dyn SwaggerReader,
    intrinsics: &'a dyn IntrinsicResolver,
}

/// An explicit API before implicit routes are merged in
struct ExplicitApi {
    logical_id: String,
    routes: Vec<Route>,
    binary_media_types: Vec<String>,
    stage_name: String,
    stage_variables: Option<HashMap<String, String>>,
    cors: Option<CorsSpec>,
}

/// Routes one function declares through its `Api` events
struct ImplicitRoute {
    route: Route,
    rest_api_id: Option<String>,
}

impl<'a> RouteResolver<'a> {
    pub fn new(reader: &'a dyn SwaggerReader, intrinsics: &'a dyn IntrinsicResolver) -> Self {
        Self { reader, intrinsics }
    }

    pub fn resolve(&self, template: &Template) -> Result<ApiCollection, ApiError> {
        let collection = match ApiFlavour::detect(template) {
            ApiFlavour::Sam => self.resolve_sam(template)?,
            ApiFlavour::CloudFormation => self.resolve_cloudformation(template),
        };

        for api in &collection {
            info!(
                api = %api.logical_id,
                stage = %api.stage_name,
                routes = api.routes.len(),
                "Resolved API"
            );
        }

        Ok(collection)
    }

    // === SAM ===

    fn resolve_sam(&self, template: &Template) -> Result<ApiCollection, ApiError> {
        let globals = GlobalApiDefaults::from_template(template)?;

        let explicit = template
            .resources_of_type(SERVERLESS_API)
            .map(|resource| self.explicit_sam_api(resource, &globals))
            .collect::<Result<Vec<_>, _>>()?;

        let mut connected: HashMap<String, Vec<Route>> = HashMap::new();
        let mut unconnected = Vec::new();

        for implicit in self.implicit_routes(template) {
            let target = match implicit.rest_api_id {
                Some(id) if explicit.iter().any(|api| api.logical_id == id) => Some(id),
                Some(id) => {
                    warn!(
                        rest_api_id = %id,
                        path = %implicit.route.path,
                        "Api event references an unknown RestApiId, using the implicit API"
                    );
                    None
                }
                None if explicit.len() == 1 => Some(explicit[0].logical_id.clone()),
                None => None,
            };

            match target {
                Some(id) => connected.entry(id).or_default().push(implicit.route),
                None => unconnected.push(implicit.route),
            }
        }

        let mut apis = Vec::with_capacity(explicit.len() + 1);
        let has_explicit = !explicit.is_empty();

        for api in explicit {
            let implicit = connected.remove(&api.logical_id).unwrap_or_default();
            let routes = merge_routes(api.routes, implicit);
            apis.push(finish_api(
                api.logical_id,
                routes,
                api.binary_media_types,
                api.stage_name,
                api.stage_variables,
                api.cors.as_ref(),
            )?);
        }

        if !has_explicit || !unconnected.is_empty() {
            apis.push(finish_api(
                IMPLICIT_API_ID.to_string(),
                merge_routes(Vec::new(), unconnected),
                normalize_binary_media_types(globals.binary_media_types.iter().map(String::as_str)),
                DEFAULT_STAGE_NAME.to_string(),
                None,
                globals.cors.as_ref(),
            )?);
        }

        Ok(ApiCollection::new(apis))
    }

    fn explicit_sam_api(
        &self,
        resource: Resource<'_>,
        globals: &GlobalApiDefaults,
    ) -> Result<ExplicitApi, ApiError> {
        let swagger = self.reader.read(
            resource.property("DefinitionBody"),
            resource.property("DefinitionUri"),
        );
        let (routes, swagger_binary_types) = parse_swagger(resource.logical_id, swagger.as_ref());

        let own_cors = resource
            .property("Cors")
            .map(CorsSpec::from_value)
            .transpose()?;

        Ok(ExplicitApi {
            logical_id: resource.logical_id.to_string(),
            routes,
            binary_media_types: globals.binary_media_types_for(
                &string_list(resource.property("BinaryMediaTypes")),
                &swagger_binary_types,
            ),
            stage_name: resource
                .string_property("StageName")
                .unwrap_or(DEFAULT_STAGE_NAME)
                .to_string(),
            stage_variables: stage_variables(resource.property("Variables")),
            cors: globals.cors_for(own_cors),
        })
    }

    /// `Api` events of every function, one route per (API, path, function)
    fn implicit_routes(&self, template: &Template) -> Vec<ImplicitRoute> {
        let mut routes: Vec<ImplicitRoute> = Vec::new();

        for function in template.resources().filter(Resource::is_function) {
            let Some(events) = function.property("Events").and_then(Value::as_object) else {
                continue;
            };

            for (event_name, event) in events {
                if event.get("Type").and_then(Value::as_str) != Some(API_EVENT_TYPE) {
                    continue;
                }
                let properties = event.get("Properties");

                let Some(path) = properties.and_then(|p| p.get("Path")).and_then(Value::as_str)
                else {
                    warn!(function = %function.logical_id, event = %event_name, "Api event has no Path");
                    continue;
                };

                let method = properties
                    .and_then(|p| p.get("Method"))
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                let Ok(spec) = method.parse::<MethodSpec>() else {
                    warn!(
                        function = %function.logical_id,
                        event = %event_name,
                        method = %method,
                        "Api event has an unsupported Method"
                    );
                    continue;
                };

                let rest_api_id = properties
                    .and_then(|p| p.get("RestApiId"))
                    .and_then(|id| self.intrinsics.logical_id(id));

                let existing = routes.iter_mut().find(|r| {
                    r.rest_api_id == rest_api_id
                        && r.route.path == path
                        && r.route.function_name == function.logical_id
                });

                match existing {
                    Some(implicit) => {
                        for method in spec.expand() {
                            implicit.route.add_method(method);
                        }
                    }
                    None => routes.push(ImplicitRoute {
                        route: Route::new(path, spec.expand(), function.logical_id),
                        rest_api_id,
                    }),
                }
            }
        }

        routes
    }

    // === CloudFormation ===

    fn resolve_cloudformation(&self, template: &Template) -> ApiCollection {
        let mut apis: Vec<Api> = template
            .resources_of_type(REST_API)
            .map(|resource| {
                let swagger = self
                    .reader
                    .read(resource.property("Body"), resource.property("BodyS3Location"));
                let (routes, swagger_binary_types) =
                    parse_swagger(resource.logical_id, swagger.as_ref());

                let own = string_list(resource.property("BinaryMediaTypes"));
                Api {
                    routes: merge_routes(routes, Vec::new()),
                    binary_media_types: normalize_binary_media_types(
                        own.iter().chain(&swagger_binary_types).map(String::as_str),
                    ),
                    ..Api::new(resource.logical_id)
                }
            })
            .collect();

        for stage in template.resources_of_type(STAGE) {
            let Some(rest_api_id) = stage
                .property("RestApiId")
                .and_then(|id| self.intrinsics.logical_id(id))
            else {
                continue;
            };

            match apis.iter_mut().find(|api| api.logical_id == rest_api_id) {
                Some(api) => {
                    if let Some(name) = stage.string_property("StageName") {
                        api.stage_name = name.to_string();
                    }
                    api.stage_variables = stage_variables(stage.property("Variables"));
                }
                None => warn!(
                    stage = %stage.logical_id,
                    rest_api_id = %rest_api_id,
                    "Stage references an unknown RestApi"
                ),
            }
        }

        ApiCollection::new(apis)
    }
}

fn parse_swagger(logical_id: &str, swagger: Option<&Value>) -> (Vec<Route>, Vec<String>) {
    match swagger {
        Some(doc) => {
            let doc = SwaggerDocument::new(doc);
            (doc.routes(), doc.binary_media_types())
        }
        None => {
            debug!(api = %logical_id, "API has no readable swagger definition");
            (Vec::new(), Vec::new())
        }
    }
}

fn finish_api(
    logical_id: String,
    routes: Vec<Route>,
    binary_media_types: Vec<String>,
    stage_name: String,
    stage_variables: Option<HashMap<String, String>>,
    cors: Option<&CorsSpec>,
) -> Result<Api, ApiError> {
    let (cors, routes) = match cors {
        Some(spec) => {
            let (cors, routes) = CorsResolver::resolve(spec, routes)?;
            // Routes sharing a path must not both answer OPTIONS
            (Some(cors), dedupe_routes(routes))
        }
        None => (None, routes),
    };

    Ok(Api {
        logical_id,
        routes,
        binary_media_types,
        stage_name,
        stage_variables,
        cors,
    })
}

fn stage_variables(value: Option<&Value>) -> Option<HashMap<String, String>> {
    let variables = value?.as_object()?;
    Some(
        variables
            .iter()
            .map(|(name, value)| {
                let value = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (name.clone(), value)
            })
            .collect(),
    )
}

/// Merge implicit routes over an explicit API's routes.
///
/// Implicit routes take precedence: once an implicit route serves a
/// (path, method) the explicit routes also serve, every explicit route on that
/// path is dropped rather than merged method by method. Otherwise the two sets
/// are unioned.
pub(crate) fn merge_routes(explicit: Vec<Route>, implicit: Vec<Route>) -> Vec<Route> {
    let claimed: HashSet<(&str, HttpMethod)> = implicit
        .iter()
        .flat_map(|r| r.methods().iter().map(move |m| (r.path.as_str(), *m)))
        .collect();

    let overridden: HashSet<String> = explicit
        .iter()
        .filter(|r| r.methods().iter().any(|m| claimed.contains(&(r.path.as_str(), *m))))
        .map(|r| r.path.clone())
        .collect();

    let explicit = explicit
        .into_iter()
        .filter(|r| !overridden.contains(&r.path));

    dedupe_routes(explicit.chain(implicit).collect())
}

/// Later routes win a shared (path, method); survivors are grouped into one
/// route per (path, function).
fn dedupe_routes(routes: Vec<Route>) -> Vec<Route> {
    let mut seen: HashSet<(String, HttpMethod)> = HashSet::new();
    let mut kept = Vec::with_capacity(routes.len());

    for mut route in routes.into_iter().rev() {
        for method in route.methods().to_vec() {
            if !seen.insert((route.path.clone(), method)) {
                route.remove_method(method);
            }
        }
        if !route.methods().is_empty() {
            kept.push(route);
        }
    }
    kept.reverse();

    let mut grouped: Vec<Route> = Vec::with_capacity(kept.len());
    for route in kept {
        match grouped
            .iter_mut()
            .find(|r| r.path == route.path && r.function_name == route.function_name)
        {
            Some(existing) => {
                for method in route.methods() {
                    existing.add_method(*method);
                }
            }
            None => grouped.push(route),
        }
    }
    grouped
}
