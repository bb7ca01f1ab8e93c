//! Translation from server-declared tool schemas to the shapes the adapters use.
//!
//! [`ToolSchema`] is the normalized description every adapter starts from.
//! [`ArgsSchema`] is the typed argument model the structured and crew tools
//! validate input against before a call leaves the process.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, error};

use crate::mcp::McpTool;

/// Normalized tool description: name, description and an object schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: ToolParameters,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameters {
    #[serde(rename = "type")]
    pub kind: String,
    pub properties: Map<String, Value>,
    pub required: Vec<String>,
}

impl Default for ToolParameters {
    fn default() -> Self {
        Self {
            kind: "object".into(),
            properties: Map::new(),
            required: Vec::new(),
        }
    }
}

impl ToolParameters {
    pub fn to_value(&self) -> Value {
        json!({
            "type": self.kind,
            "properties": self.properties,
            "required": self.required,
        })
    }
}

impl ToolSchema {
    pub fn from_mcp(tool: &McpTool) -> Self {
        let input_schema = parse_input_schema(&tool.name, &tool.input_schema);
        debug!(tool = %tool.name, schema = %input_schema, "raw input schema");

        let properties = input_schema
            .get("properties")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let required = input_schema
            .get("required")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            name: tool.name.clone(),
            description: tool
                .description
                .clone()
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| format!("Execute {}", tool.name)),
            parameters: ToolParameters {
                kind: "object".into(),
                properties,
                required,
            },
        }
    }
}

/// Servers may send `inputSchema` as an object or as a JSON-encoded string.
/// Anything unusable becomes an empty schema.
fn parse_input_schema(tool: &str, raw: &Value) -> Value {
    match raw {
        Value::Object(_) => raw.clone(),
        Value::String(text) => match serde_json::from_str::<Value>(text) {
            Ok(parsed @ Value::Object(_)) => parsed,
            Ok(_) => {
                error!(tool, "inputSchema string is not a JSON object");
                json!({})
            }
            Err(e) => {
                error!(tool, error = %e, "failed to parse inputSchema");
                json!({})
            }
        },
        _ => json!({}),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Integer,
    Boolean,
}

impl FieldType {
    fn from_schema(schema: &Value) -> Self {
        match schema.get("type").and_then(Value::as_str) {
            Some("integer") => FieldType::Integer,
            Some("boolean") => FieldType::Boolean,
            _ => FieldType::String,
        }
    }

    fn accepts(&self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Integer => match value {
                Value::Bool(_) => true,
                Value::Number(n) => {
                    n.is_i64() || n.is_u64() || n.as_f64().is_some_and(is_whole)
                }
                Value::String(s) => s.trim().parse::<f64>().is_ok_and(is_whole),
                _ => false,
            },
            FieldType::Boolean => match value {
                Value::Bool(_) => true,
                Value::Number(n) => n.as_f64().is_some_and(|f| f == 0.0 || f == 1.0),
                Value::String(s) => matches!(
                    s.trim().to_ascii_lowercase().as_str(),
                    "true" | "false" | "1" | "0" | "yes" | "no" | "on" | "off" | "t" | "f" | "y" | "n"
                ),
                _ => false,
            },
        }
    }

    fn label(&self) -> &'static str {
        match self {
            FieldType::String => "a valid string",
            FieldType::Integer => "a valid integer",
            FieldType::Boolean => "a valid boolean",
        }
    }
}

fn is_whole(f: f64) -> bool {
    f.is_finite() && f.fract() == 0.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgField {
    pub name: String,
    pub field_type: FieldType,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Typed argument model derived from a tool's parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgsSchema {
    pub title: String,
    pub fields: Vec<ArgField>,
}

impl ArgsSchema {
    pub fn from_tool(tool: &ToolSchema) -> Self {
        let fields = tool
            .parameters
            .properties
            .iter()
            .map(|(name, schema)| ArgField {
                name: name.clone(),
                field_type: FieldType::from_schema(schema),
                required: tool.parameters.required.iter().any(|r| r == name),
                description: schema
                    .get("description")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            })
            .collect();

        Self {
            title: format!("{}Schema", tool.name),
            fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&ArgField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Check `params` against the model. Every problem is collected, one per
    /// line, in the form `<field>: <reason>`. Optional fields may be left out
    /// but an explicit `null` is still a type error.
    pub fn validate(&self, params: &Value) -> Result<(), String> {
        let Some(object) = params.as_object() else {
            return Err(format!("{}: input should be an object", self.title));
        };

        let mut problems = Vec::new();
        for field in &self.fields {
            match object.get(&field.name) {
                None if field.required => {
                    problems.push(format!("{}: field required", field.name));
                }
                None => {}
                Some(value) if !field.field_type.accepts(value) => {
                    problems.push(format!(
                        "{}: input should be {}, got {}",
                        field.name,
                        field.field_type.label(),
                        value
                    ));
                }
                Some(_) => {}
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems.join("\n"))
        }
    }

    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for field in &self.fields {
            let mut prop = json!({ "type": field.field_type });
            if let Some(ref description) = field.description {
                prop["description"] = json!(description);
            }
            properties.insert(field.name.clone(), prop);
        }
        let required: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name.as_str())
            .collect();

        json!({
            "title": self.title,
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}
