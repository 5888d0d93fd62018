//! Tool metadata advertised by a tool server.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Local view of a tool exposed by a connected server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    input_schema: Option<ToolInputSchema>,
}

impl ToolDescriptor {
    /// Creates a descriptor with only a name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            input_schema: None,
        }
    }

    /// Sets the description; blank values are dropped.
    #[must_use]
    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty());
        self
    }

    /// Sets the input schema.
    #[must_use]
    pub fn with_input_schema(mut self, input_schema: Option<ToolInputSchema>) -> Self {
        self.input_schema = input_schema;
        self
    }

    /// Returns the tool name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the optional description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the optional input schema.
    #[must_use]
    pub const fn input_schema(&self) -> Option<&ToolInputSchema> {
        self.input_schema.as_ref()
    }
}

/// JSON-schema summary of a tool's arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInputSchema {
    /// Schema type, normally `object`.
    #[serde(rename = "type")]
    pub schema_type: String,
    /// Argument property schemas keyed by argument name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Map<String, Value>>,
    /// Names of required arguments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
}

impl ToolInputSchema {
    /// Extracts a schema summary from a raw JSON schema.
    ///
    /// Returns `None` when the value is not an object carrying a string
    /// `type`. Malformed `properties` or `required` members are dropped rather
    /// than failing the whole schema.
    #[must_use]
    pub fn from_json(raw: &Value) -> Option<Self> {
        let object = raw.as_object()?;
        let schema_type = object.get("type")?.as_str()?.to_owned();
        let properties = object.get("properties").and_then(Value::as_object).cloned();
        let required = object
            .get("required")
            .and_then(Value::as_array)
            .map(|values| {
                values
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_owned)
                    .collect()
            });

        Some(Self {
            schema_type,
            properties,
            required,
        })
    }
}
