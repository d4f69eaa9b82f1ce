//! Output schemas for structured generation, kept as data.
//!
//! A `Schema` tree is rendered to JSON Schema once and compiled with
//! `jsonschema`. The rendered document is what goes out in the request
//! (strict mode) and the compiled form checks what comes back, so both sides
//! always agree. Field names, required-ness and enum values are the contract
//! with the generation service; bump `SCHEMA_VERSION` whenever any of them
//! change. The version travels in the schema name sent to the model.

use std::{fmt, sync::Arc};

use jsonschema::{error::ValidationErrorKind, Draft, JSONSchema, ValidationError};
use serde_json::{json, Map, Value};
use thiserror::Error;

pub const SCHEMA_VERSION: &str = "1";

/// Resource kinds accepted in a learning kit.
pub const RESOURCE_KINDS: &[&str] = &["article", "video"];

#[derive(Clone, Debug, PartialEq)]
pub enum Schema {
  String,
  Integer,
  Enum(&'static [&'static str]),
  Array(Box<Schema>),
  Object(Vec<Field>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Field {
  pub name: &'static str,
  pub schema: Schema,
  pub required: bool,
  pub description: Option<&'static str>,
}

impl Field {
  pub fn required(name: &'static str, schema: Schema) -> Self {
    Self { name, schema, required: true, description: None }
  }

  pub fn describe(mut self, description: &'static str) -> Self {
    self.description = Some(description);
    self
  }
}

/// First mismatch between a reply and its schema. `path` is `$`-rooted,
/// e.g. `$.skillBreakdown[0].rating`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("schema violation at {path}: {reason}")]
pub struct SchemaViolation {
  pub path: String,
  pub reason: String,
}

/// A rendered schema the validator refused to compile.
#[derive(Debug, Error)]
#[error("output schema '{name}' does not compile: {message}")]
pub struct SchemaError {
  pub name: &'static str,
  pub message: String,
}

impl Schema {
  pub fn array(items: Schema) -> Self { Schema::Array(Box::new(items)) }

  /// Render as JSON Schema. Objects are closed (`additionalProperties: false`).
  pub fn to_json_schema(&self) -> Value {
    match self {
      Schema::String => json!({ "type": "string" }),
      Schema::Integer => json!({ "type": "integer" }),
      Schema::Enum(values) => json!({ "type": "string", "enum": values }),
      Schema::Array(items) => json!({ "type": "array", "items": items.to_json_schema() }),
      Schema::Object(fields) => {
        let mut props = Map::new();
        for f in fields {
          let mut node = f.schema.to_json_schema();
          if let (Some(desc), Some(obj)) = (f.description, node.as_object_mut()) {
            obj.insert("description".into(), Value::String(desc.into()));
          }
          props.insert(f.name.into(), node);
        }
        let required: Vec<&str> = fields.iter().filter(|f| f.required).map(|f| f.name).collect();
        json!({
          "type": "object",
          "properties": props,
          "required": required,
          "additionalProperties": false,
        })
      }
    }
  }
}

/// A schema plus the name it is registered under in the request.
#[derive(Clone, Debug, PartialEq)]
pub struct NamedSchema {
  pub name: &'static str,
  pub schema: Schema,
}

/// A `NamedSchema` rendered and compiled, ready to send and to validate against.
#[derive(Clone)]
pub struct CompiledSchema {
  pub name: &'static str,
  /// `{name}_v{SCHEMA_VERSION}`, the name the model sees.
  pub wire_name: String,
  pub json: Arc<Value>,
  validator: Arc<JSONSchema>,
}

impl fmt::Debug for CompiledSchema {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CompiledSchema").field("wire_name", &self.wire_name).finish_non_exhaustive()
  }
}

impl CompiledSchema {
  pub fn compile(named: &NamedSchema) -> Result<Self, SchemaError> {
    let json = named.schema.to_json_schema();
    let validator = JSONSchema::options()
      .with_draft(Draft::Draft7)
      .compile(&json)
      .map_err(|e| SchemaError { name: named.name, message: e.to_string() })?;
    Ok(Self {
      name: named.name,
      wire_name: format!("{}_v{}", named.name, SCHEMA_VERSION),
      json: Arc::new(json),
      validator: Arc::new(validator),
    })
  }

  /// Check `value` against the compiled schema, reporting the first violation.
  pub fn validate(&self, value: &Value) -> Result<(), SchemaViolation> {
    match self.validator.validate(value) {
      Ok(()) => Ok(()),
      Err(mut errors) => match errors.next() {
        Some(e) => Err(violation(&e)),
        None => Ok(()),
      },
    }
  }
}

fn violation(e: &ValidationError<'_>) -> SchemaViolation {
  let mut path = json_path(&e.instance_path.to_string());
  let reason = match &e.kind {
    ValidationErrorKind::Required { property } => {
      push_key(&mut path, property.as_str().unwrap_or_default());
      "missing required field".to_string()
    }
    ValidationErrorKind::AdditionalProperties { unexpected } => {
      if let Some(key) = unexpected.first() {
        push_key(&mut path, key);
      }
      "unexpected property".to_string()
    }
    _ => e.to_string(),
  };
  SchemaViolation { path, reason }
}

/// JSON Pointer (`/a/0/b`) to `$.a[0].b`.
fn json_path(pointer: &str) -> String {
  let mut path = String::from("$");
  for segment in pointer.split('/').skip(1) {
    let segment = segment.replace("~1", "/").replace("~0", "~");
    match segment.parse::<usize>() {
      Ok(i) => path.push_str(&format!("[{i}]")),
      Err(_) => push_key(&mut path, &segment),
    }
  }
  path
}

fn push_key(path: &mut String, key: &str) {
  path.push('.');
  path.push_str(key);
}

pub fn scenario_schema() -> NamedSchema {
  use Schema::*;
  NamedSchema {
    name: "scenario",
    schema: Object(vec![
      Field::required("companyName", String),
      Field::required("scenario", String),
      Field::required("task", String),
      Field::required("deliverables", Schema::array(String)),
      Field::required("mockEmail", Object(vec![
        Field::required("from", String),
        Field::required("subject", String),
        Field::required("body", String),
      ])),
      Field::required("mockAssets", Schema::array(Object(vec![
        Field::required("name", String).describe("The filename or title of the asset."),
        Field::required("content", String).describe(
          "The detailed content of the asset, like user persona details, design specs, or brand guidelines.",
        ),
      ]))),
    ]),
  }
}

pub fn feedback_schema() -> NamedSchema {
  use Schema::*;
  NamedSchema {
    name: "feedback",
    schema: Object(vec![
      Field::required("performanceReview", String),
      Field::required("skillBreakdown", Schema::array(Object(vec![
        Field::required("skill", String),
        Field::required("rating", Integer),
        Field::required("feedback", String),
      ]))),
      Field::required("learningKit", Schema::array(Object(vec![
        Field::required("title", String),
        Field::required("url", String),
        Field::required("type", Enum(RESOURCE_KINDS)),
      ]))),
    ]),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn valid_scenario() -> Value {
    json!({
      "companyName": "Acme",
      "scenario": "A widget shop.",
      "task": "Build the star rating.",
      "deliverables": ["Component", "Tests"],
      "mockEmail": { "from": "lead@acme.test", "subject": "Kickoff", "body": "Hi" },
      "mockAssets": [{ "name": "persona.md", "content": "Jo, 34" }]
    })
  }

  #[test]
  fn scenario_schema_renders_closed_required_objects() {
    let rendered = scenario_schema().schema.to_json_schema();
    assert_eq!(rendered["type"], "object");
    assert_eq!(rendered["additionalProperties"], false);
    let required: Vec<&str> = rendered["required"]
      .as_array().unwrap().iter().map(|v| v.as_str().unwrap()).collect();
    assert_eq!(required, ["companyName", "scenario", "task", "deliverables", "mockEmail", "mockAssets"]);
    assert_eq!(rendered["properties"]["mockEmail"]["required"], json!(["from", "subject", "body"]));
    assert_eq!(rendered["properties"]["mockAssets"]["items"]["properties"]["name"]["description"],
      "The filename or title of the asset.");
  }

  #[test]
  fn feedback_schema_carries_resource_enum() {
    let rendered = feedback_schema().schema.to_json_schema();
    let kind = &rendered["properties"]["learningKit"]["items"]["properties"]["type"];
    assert_eq!(kind["enum"], json!(["article", "video"]));
    assert_eq!(rendered["properties"]["skillBreakdown"]["items"]["properties"]["rating"]["type"], "integer");
  }

  fn compiled(named: NamedSchema) -> CompiledSchema {
    CompiledSchema::compile(&named).expect("schema compiles")
  }

  #[test]
  fn compiled_schema_carries_version_and_rendered_document() {
    let compiled = compiled(scenario_schema());
    assert_eq!(compiled.name, "scenario");
    assert_eq!(compiled.wire_name, format!("scenario_v{SCHEMA_VERSION}"));
    assert_eq!(*compiled.json, scenario_schema().schema.to_json_schema());
  }

  #[test]
  fn accepts_conforming_scenario() {
    assert_eq!(compiled(scenario_schema()).validate(&valid_scenario()), Ok(()));
  }

  #[test]
  fn reports_path_of_missing_nested_field() {
    let mut v = valid_scenario();
    v["mockEmail"].as_object_mut().unwrap().remove("subject");
    let err = compiled(scenario_schema()).validate(&v).unwrap_err();
    assert_eq!(err.path, "$.mockEmail.subject");
    assert_eq!(err.reason, "missing required field");
  }

  #[test]
  fn rejects_wrong_types_and_extra_fields() {
    let schema = compiled(scenario_schema());
    let mut v = valid_scenario();
    v["deliverables"] = json!(["ok", 3]);
    assert_eq!(schema.validate(&v).unwrap_err().path, "$.deliverables[1]");

    let mut v = valid_scenario();
    v["budget"] = json!("$10k");
    let err = schema.validate(&v).unwrap_err();
    assert_eq!(err.path, "$.budget");
    assert_eq!(err.reason, "unexpected property");
  }

  #[test]
  fn rating_must_be_integer_and_kind_in_enum() {
    let schema = compiled(feedback_schema());
    let base = json!({
      "performanceReview": "Good.",
      "skillBreakdown": [{ "skill": "CSS", "rating": 4, "feedback": "Tidy." }],
      "learningKit": [{ "title": "MDN", "url": "https://developer.mozilla.org", "type": "article" }]
    });
    assert!(schema.validate(&base).is_ok());

    let mut v = base.clone();
    v["skillBreakdown"][0]["rating"] = json!(4.5);
    assert_eq!(schema.validate(&v).unwrap_err().path, "$.skillBreakdown[0].rating");

    let mut v = base;
    v["learningKit"][0]["type"] = json!("podcast");
    let err = schema.validate(&v).unwrap_err();
    assert_eq!(err.path, "$.learningKit[0].type");
    assert!(err.reason.contains("article"), "{}", err.reason);
  }

  #[test]
  fn pointer_segments_become_dotted_path() {
    assert_eq!(json_path(""), "$");
    assert_eq!(json_path("/learningKit/2/url"), "$.learningKit[2].url");
    assert_eq!(json_path("/a~1b"), "$.a/b");
  }
}
