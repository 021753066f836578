//! API Gateway route resolution for SamStack
//!
//! This crate reads a SAM or CloudFormation template and works out which
//! HTTP routes it exposes, which Lambda function serves each one, and the
//! CORS and binary media type settings of every API.

pub mod collection;
pub mod cors;
pub mod error;
pub mod intrinsics;
pub mod lambda_uri;
pub mod provider;
pub mod reader;
pub mod route;
pub mod swagger;
pub mod template;


pub use collection::{Api, ApiCollection};
pub use cors::{Cors, CorsResolver, CorsSpec};
pub use error::ApiError;
pub use intrinsics::{IntrinsicResolver, RefResolver};
pub use provider::{ApiFlavour, RouteResolver};
pub use reader::{FsSwaggerReader, SwaggerReader};
pub use route::{HttpMethod, MethodSpec, Route};
pub use swagger::SwaggerDocument;
pub use template::Template;
