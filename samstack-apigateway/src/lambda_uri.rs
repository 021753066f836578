//! Function name extraction from API Gateway integration URIs
//!
//! An `aws_proxy` integration URI looks like
//! `arn:aws:apigateway:<region>:lambda:path/2015-03-31/functions/<function>/invocations`
//! where `<function>` is either a Lambda ARN or, inside `Fn::Sub`, a
//! `${LogicalId.Arn}` substitution.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static FUNCTION_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"functions/(.+)/invocations").expect("valid regex"));

static LOGICAL_ID_SUB: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\$\{([A-Za-z0-9]+)\.(Arn|Alias)\}$").expect("valid regex"));

const FUNCTION_ARN_MARKER: &str = ":function:";

/// Resolve the function name or logical id an integration URI invokes.
///
/// Returns `None` when the URI is not a Lambda invocation URI or the function
/// cannot be resolved without evaluating the template.
pub fn function_name(uri: &Value) -> Option<String> {
    let raw = uri_string(uri)?;
    let segment = FUNCTION_SEGMENT.captures(raw)?.get(1)?.as_str();

    if let Some(captures) = LOGICAL_ID_SUB.captures(segment) {
        return captures.get(1).map(|m| m.as_str().to_string());
    }

    let (_, after) = segment.split_once(FUNCTION_ARN_MARKER)?;
    // Drop an alias or version qualifier
    let name = after.split(':').next()?;
    if name.is_empty() || name.contains("${") {
        return None;
    }
    Some(name.to_string())
}

/// The URI text, unwrapping an `Fn::Sub` in either of its two forms
fn uri_string(uri: &Value) -> Option<&str> {
    match uri {
        Value::String(s) => Some(s),
        Value::Object(map) => match map.get("Fn::Sub")? {
            Value::String(s) => Some(s),
            Value::Array(parts) => parts.first()?.as_str(),
            _ => None,
        },
        _ => None,
    }
}
