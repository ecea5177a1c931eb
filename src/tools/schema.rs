//! Tool argument schemas.
//!
//! An `ArgumentSchema` is the flat list of fields a tool accepts. It is
//! derived from the tool's typed input struct through `schemars`, checked
//! against incoming arguments before any handler runs, and rendered back to
//! JSON Schema for `tools/list`.

use crate::error::{ToolError, ToolResult};
use rmcp::model::JsonObject;
use schemars::JsonSchema;
use serde_json::{Value as JsonValue, json};

/// JSON type of one argument field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
    /// No type constraint
    Any,
}

impl FieldKind {
    fn from_json_type(name: &str) -> Self {
        match name {
            "string" => Self::String,
            "integer" => Self::Integer,
            "number" => Self::Number,
            "boolean" => Self::Boolean,
            "object" => Self::Object,
            "array" => Self::Array,
            _ => Self::Any,
        }
    }

    /// JSON Schema type name, `None` for `Any`.
    pub fn json_type(&self) -> Option<&'static str> {
        match self {
            Self::String => Some("string"),
            Self::Integer => Some("integer"),
            Self::Number => Some("number"),
            Self::Boolean => Some("boolean"),
            Self::Object => Some("object"),
            Self::Array => Some("array"),
            Self::Any => None,
        }
    }

    pub fn matches(&self, value: &JsonValue) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Object => value.is_object(),
            Self::Array => value.is_array(),
            Self::Any => true,
        }
    }
}

/// Name of a JSON value's type, for error messages.
fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(n) if n.is_f64() => "number",
        JsonValue::Number(_) => "integer",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    pub required: bool,
    pub description: Option<String>,
}

impl FieldSpec {
    pub fn required(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
            description: None,
        }
    }

    pub fn optional(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            required: false,
            ..Self::required(name, kind)
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Ordered list of the fields a tool accepts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgumentSchema {
    fields: Vec<FieldSpec>,
}

impl ArgumentSchema {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    /// Derive the schema of a typed input struct.
    ///
    /// `Option` fields become optional; a field with several non-null JSON
    /// types becomes `Any`.
    pub fn for_type<T: JsonSchema>() -> Self {
        let schema = schemars::schema_for!(T);
        let Some(root) = schema.as_object() else {
            return Self::default();
        };

        let required: Vec<&str> = root
            .get("required")
            .and_then(JsonValue::as_array)
            .map(|names| names.iter().filter_map(JsonValue::as_str).collect())
            .unwrap_or_default();

        let fields = root
            .get("properties")
            .and_then(JsonValue::as_object)
            .map(|props| {
                props
                    .iter()
                    .map(|(name, prop)| FieldSpec {
                        name: name.clone(),
                        kind: property_kind(prop),
                        required: required.contains(&name.as_str()),
                        description: prop
                            .get("description")
                            .and_then(JsonValue::as_str)
                            .map(str::to_string),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self { fields }
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Check raw arguments and return only the declared fields.
    ///
    /// A missing or null required field, or a field of the wrong JSON type,
    /// is a `Validation` error naming that field. Undeclared fields are
    /// dropped.
    pub fn validate(&self, args: Option<&JsonObject>) -> ToolResult<JsonObject> {
        let mut accepted = JsonObject::new();
        for field in &self.fields {
            match args.and_then(|a| a.get(&field.name)) {
                None | Some(JsonValue::Null) if field.required => {
                    return Err(ToolError::validation(&field.name, "is required"));
                }
                None | Some(JsonValue::Null) => {}
                Some(value) if !field.kind.matches(value) => {
                    return Err(ToolError::validation(
                        &field.name,
                        format!(
                            "expected {}, got {}",
                            field.kind.json_type().unwrap_or("any"),
                            json_type_name(value)
                        ),
                    ));
                }
                Some(value) => {
                    accepted.insert(field.name.clone(), value.clone());
                }
            }
        }
        Ok(accepted)
    }

    /// Render as a JSON Schema object for `tools/list`.
    pub fn to_json_schema(&self) -> JsonObject {
        let properties: JsonObject = self
            .fields
            .iter()
            .map(|field| {
                let mut prop = JsonObject::new();
                if let Some(ty) = field.kind.json_type() {
                    prop.insert("type".to_string(), json!(ty));
                }
                if let Some(description) = &field.description {
                    prop.insert("description".to_string(), json!(description));
                }
                (field.name.clone(), JsonValue::Object(prop))
            })
            .collect();
        let required: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name.as_str())
            .collect();

        let mut schema = JsonObject::new();
        schema.insert("type".to_string(), json!("object"));
        schema.insert("properties".to_string(), JsonValue::Object(properties));
        schema.insert("required".to_string(), json!(required));
        schema
    }
}

fn property_kind(prop: &JsonValue) -> FieldKind {
    match prop.get("type") {
        Some(JsonValue::String(ty)) => FieldKind::from_json_type(ty),
        Some(JsonValue::Array(types)) => {
            let non_null: Vec<&str> = types
                .iter()
                .filter_map(JsonValue::as_str)
                .filter(|t| *t != "null")
                .collect();
            match non_null.as_slice() {
                [ty] => FieldKind::from_json_type(ty),
                _ => FieldKind::Any,
            }
        }
        _ => FieldKind::Any,
    }
}
