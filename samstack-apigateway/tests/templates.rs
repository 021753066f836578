//! Route resolution over YAML templates on disk

use samstack_apigateway::{
    FsSwaggerReader, HttpMethod, RefResolver, Route, RouteResolver, Template,
};
use std::fs;
use std::path::Path;

const SAM_TEMPLATE: &str = r#"
AWSTemplateFormatVersion: '2010-09-09'
Transform: AWS::Serverless-2016-10-31

Globals:
  Api:
    BinaryMediaTypes:
      - image~1png
    Cors:
      AllowOrigin: "'https://example.com'"
      AllowHeaders: "'Content-Type'"
      MaxAge: "'300'"

Resources:
  PetsApi:
    Type: AWS::Serverless::Api
    Properties:
      StageName: dev
      DefinitionUri: swagger/pets.yaml
      Variables:
        table: pets-dev

  ListPets:
    Type: AWS::Serverless::Function
    Properties:
      Handler: pets.list
      Runtime: python3.9
      Events:
        List:
          Type: Api
          Properties:
            Path: /pets
            Method: get
            RestApiId: !Ref PetsApi

  Health:
    Type: AWS::Serverless::Function
    Properties:
      Handler: health.handler
      Runtime: nodejs18.x
      Events:
        Ping:
          Type: Api
          Properties:
            Path: /health
            Method: any
"#;

const PETS_SWAGGER: &str = r#"
swagger: '2.0'
x-amazon-apigateway-binary-media-types:
  - application~1octet-stream
paths:
  /pets:
    get:
      x-amazon-apigateway-integration:
        type: aws_proxy
        httpMethod: POST
        uri: arn:aws:apigateway:us-east-1:lambda:path/2015-03-31/functions/arn:aws:lambda:us-east-1:123456789012:function:LegacyList/invocations
    post:
      x-amazon-apigateway-integration:
        type: aws_proxy
        httpMethod: POST
        uri:
          Fn::Sub: arn:aws:apigateway:${AWS::Region}:lambda:path/2015-03-31/functions/${CreatePet.Arn}/invocations
  /pets/{id}:
    get:
      x-amazon-apigateway-integration:
        type: mock
"#;

fn write(dir: &Path, relative: &str, contents: &str) {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

#[test]
fn test_sam_template_with_swagger_file() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "template.yaml", SAM_TEMPLATE);
    write(dir.path(), "swagger/pets.yaml", PETS_SWAGGER);

    let template = Template::load(&dir.path().join("template.yaml")).unwrap();
    let reader = FsSwaggerReader::new(dir.path());
    let collection = RouteResolver::new(&reader, &RefResolver)
        .resolve(&template)
        .unwrap();

    // Routes without a RestApiId join the only explicit API
    assert_eq!(collection.len(), 1);
    let api = collection.get("PetsApi").unwrap();

    assert_eq!(api.stage_name, "dev");
    assert_eq!(
        api.stage_variables.as_ref().and_then(|v| v.get("table")).map(String::as_str),
        Some("pets-dev")
    );
    assert_eq!(
        api.binary_media_types,
        vec!["application/octet-stream", "image/png"]
    );

    // The implicit GET replaces the swagger's /pets entries
    assert_eq!(
        api.find_route("/pets", HttpMethod::Get).map(|r| r.function_name.as_str()),
        Some("ListPets")
    );
    assert!(api.find_route("/pets", HttpMethod::Post).is_none());
    assert!(api.find_route("/pets/{id}", HttpMethod::Get).is_none());

    let health = api.find_route("/health", HttpMethod::Patch).unwrap();
    assert_eq!(health, &Route::new("/health", HttpMethod::ANY, "Health"));

    let cors = api.cors.as_ref().unwrap();
    assert_eq!(cors.allow_origin, "https://example.com");
    assert_eq!(cors.allow_headers.as_deref(), Some("Content-Type"));
    assert_eq!(cors.max_age, Some(300));
    assert_eq!(cors.allow_methods, "DELETE,GET,HEAD,OPTIONS,PATCH,POST,PUT");
    assert!(api.routes.iter().all(|r| r.has_method(HttpMethod::Options)));
}

#[test]
fn test_swagger_without_implicit_overrides() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "swagger/pets.yaml", PETS_SWAGGER);

    let template: Template = r"
Resources:
  PetsApi:
    Type: AWS::Serverless::Api
    Properties:
      StageName: Prod
      DefinitionBody:
        Fn::Transform:
          Name: AWS::Include
          Parameters:
            Location: swagger/pets.yaml
"
    .parse()
    .unwrap();

    let reader = FsSwaggerReader::new(dir.path());
    let collection = RouteResolver::new(&reader, &RefResolver)
        .resolve(&template)
        .unwrap();

    let api = collection.get("PetsApi").unwrap();
    assert_eq!(api.routes.len(), 2);
    assert_eq!(
        api.find_route("/pets", HttpMethod::Get).map(|r| r.function_name.as_str()),
        Some("LegacyList")
    );
    assert_eq!(
        api.find_route("/pets", HttpMethod::Post).map(|r| r.function_name.as_str()),
        Some("CreatePet")
    );
    assert!(api.cors.is_none());
}

#[test]
fn test_cloudformation_template() {
    let template: Template = r"
Resources:
  Api:
    Type: AWS::ApiGateway::RestApi
    Properties:
      Body:
        paths:
          /orders:
            x-amazon-apigateway-any-method:
              x-amazon-apigateway-integration:
                type: aws_proxy
                uri: arn:aws:apigateway:eu-west-1:lambda:path/2015-03-31/functions/arn:aws:lambda:eu-west-1:123456789012:function:Orders/invocations
  ProdStage:
    Type: AWS::ApiGateway::Stage
    Properties:
      RestApiId: Api
      StageName: live
"
    .parse()
    .unwrap();

    let reader = FsSwaggerReader::default();
    let collection = RouteResolver::new(&reader, &RefResolver)
        .resolve(&template)
        .unwrap();

    let api = collection.get("Api").unwrap();
    assert_eq!(api.stage_name, "live");
    assert_eq!(
        api.routes,
        vec![Route::new("/orders", HttpMethod::ANY, "Orders")]
    );
}

#[test]
fn test_missing_template_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(Template::load(&dir.path().join("absent.yaml")).is_err());
}
