//! App specifications and parameter handling

use crate::error::{Diagnosis, ValidationIssue};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Data type of a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Free text
    String,
    /// Integer
    Int,
    /// Floating point
    Float,
    /// Reference to a workspace object
    Workspaceobjectref,
    /// List of values
    Set,
    /// Anything else
    #[serde(other)]
    Unspecified,
}

impl DataType {
    /// Name used in messages
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int => "int",
            Self::Float => "float",
            Self::Workspaceobjectref => "workspaceobjectref",
            Self::Set => "set",
            Self::Unspecified => "value",
        }
    }
}

/// One input of an app
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSpec {
    /// Parameter id
    pub id: String,
    /// Label shown to the user
    #[serde(default)]
    pub ui_name: String,
    /// Input control kind, e.g. `text` or `textsubdata`
    #[serde(default = "default_field_type")]
    pub field_type: String,
    /// Value type
    #[serde(default = "default_data_type")]
    pub data_type: DataType,
    /// Whether the parameter may be left blank
    #[serde(default)]
    pub optional: bool,
    /// Whether the value names an output object
    #[serde(default)]
    pub is_output_name: bool,
    /// Default value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
}

fn default_field_type() -> String {
    "text".to_string()
}

fn default_data_type() -> DataType {
    DataType::String
}

impl ParameterSpec {
    /// Required text parameter
    pub fn required(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ui_name: String::new(),
            field_type: default_field_type(),
            data_type: DataType::String,
            optional: false,
            is_output_name: false,
            default_value: None,
        }
    }

    /// Optional text parameter
    pub fn optional(id: impl Into<String>) -> Self {
        Self {
            optional: true,
            ..Self::required(id)
        }
    }

    /// With data type
    #[must_use]
    pub fn with_data_type(mut self, data_type: DataType) -> Self {
        self.data_type = data_type;
        self
    }

    /// With field type
    #[must_use]
    pub fn with_field_type(mut self, field_type: impl Into<String>) -> Self {
        self.field_type = field_type.into();
        self
    }

    /// Mark as naming an output object
    #[must_use]
    pub fn output_name(mut self) -> Self {
        self.is_output_name = true;
        self
    }

    /// Whether a value is required
    #[must_use]
    pub fn is_required(&self) -> bool {
        !self.optional
    }

    /// Whether `value` counts as blank
    ///
    /// Missing and null are always blank. Strings and object refs are blank
    /// when empty, sets when they hold no item.
    #[must_use]
    pub fn is_empty(&self, value: Option<&Value>) -> bool {
        match value {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.is_empty(),
            Some(Value::Array(items)) => items.is_empty(),
            Some(_) => false,
        }
    }
}

/// Summary information of an app
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppInfo {
    /// Catalog id
    pub id: String,
    /// Display name
    pub name: String,
    /// One-line description
    #[serde(default)]
    pub subtitle: String,
    /// Owning module
    #[serde(default)]
    pub namespace: Option<String>,
    /// Version string
    #[serde(default)]
    pub ver: Option<String>,
    /// Authors
    #[serde(default)]
    pub authors: Vec<String>,
    /// Source revision
    #[serde(default)]
    pub git_commit_hash: Option<String>,
}

/// Widgets requested by an app
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppWidgets {
    /// Input widget module
    #[serde(default)]
    pub input: Option<String>,
    /// Output widget module
    #[serde(default)]
    pub output: Option<String>,
}

/// Specification of an app as served by the catalog
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSpec {
    /// Summary
    pub info: AppInfo,
    /// Inputs in display order
    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,
    /// Widget choices
    #[serde(default)]
    pub widgets: AppWidgets,
}

impl AppSpec {
    /// Parameter specs keyed by id
    #[must_use]
    pub fn parameter_map(&self) -> IndexMap<&str, &ParameterSpec> {
        self.parameters.iter().map(|p| (p.id.as_str(), p)).collect()
    }

    /// Check every required parameter has a value
    ///
    /// # Errors
    ///
    /// One [`ValidationIssue`] per blank required parameter.
    pub fn validate(&self, params: &Map<String, Value>) -> Result<(), Vec<ValidationIssue>> {
        let issues: Vec<ValidationIssue> = self
            .parameters
            .iter()
            .filter(|spec| spec.is_required() && spec.is_empty(params.get(&spec.id)))
            .map(|spec| ValidationIssue {
                parameter: spec.id.clone(),
                diagnosis: Diagnosis::RequiredMissing,
                error_message: format!(
                    "The {} \"{}\" is required but was not provided",
                    spec.data_type.as_str(),
                    spec.id
                ),
            })
            .collect();
        if issues.is_empty() {
            Ok(())
        } else {
            Err(issues)
        }
    }

    /// Parameters in the shape the app expects
    ///
    /// Subdata selections are stored as arrays but passed on as one
    /// comma-separated string.
    #[must_use]
    pub fn export_params(&self, params: &Map<String, Value>) -> Map<String, Value> {
        let specs = self.parameter_map();
        params
            .iter()
            .map(|(key, value)| {
                let exported = match (specs.get(key.as_str()), value) {
                    (Some(spec), Value::Array(items)) if spec.field_type == "textsubdata" => {
                        Value::String(
                            items
                                .iter()
                                .map(|item| match item {
                                    Value::String(s) => s.clone(),
                                    other => other.to_string(),
                                })
                                .collect::<Vec<_>>()
                                .join(","),
                        )
                    }
                    _ => value.clone(),
                };
                (key.clone(), exported)
            })
            .collect()
    }

    /// Output object names set in `params`
    #[must_use]
    pub fn output_params(&self, params: &Map<String, Value>) -> Vec<OutputParam> {
        self.parameters
            .iter()
            .filter(|spec| spec.is_output_name)
            .filter_map(|spec| {
                params
                    .get(&spec.id)
                    .and_then(Value::as_str)
                    .filter(|name| !name.is_empty())
                    .map(|name| OutputParam {
                        param: spec.id.clone(),
                        object_name: name.to_string(),
                    })
            })
            .collect()
    }
}

/// Output object named by a parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputParam {
    /// Parameter id
    pub param: String,
    /// Object name
    pub object_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn spec() -> AppSpec {
        AppSpec {
            info: AppInfo {
                id: "Mod/assemble".into(),
                name: "Assemble".into(),
                ..AppInfo::default()
            },
            parameters: vec![
                ParameterSpec::required("reads").with_data_type(DataType::Workspaceobjectref),
                ParameterSpec::required("k").with_data_type(DataType::Int),
                ParameterSpec::optional("contigs")
                    .with_field_type("textsubdata")
                    .with_data_type(DataType::Set),
                ParameterSpec::required("output_name").output_name(),
            ],
            widgets: AppWidgets::default(),
        }
    }

    fn params(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn complete_params_validate() {
        let p = params(json!({"reads": "1/2/3", "k": 21, "output_name": "asm"}));
        assert!(spec().validate(&p).is_ok());
    }

    #[test]
    fn blank_required_params_are_reported() {
        let p = params(json!({"reads": "", "k": null}));
        let issues = spec().validate(&p).unwrap_err();
        let missing: Vec<_> = issues.iter().map(|i| i.parameter.as_str()).collect();
        assert_eq!(missing, vec!["reads", "k", "output_name"]);
        assert_eq!(
            issues[1].error_message,
            "The int \"k\" is required but was not provided"
        );
    }

    #[test]
    fn subdata_arrays_are_joined() {
        let p = params(json!({"contigs": ["c1", "c2"], "k": 21}));
        let exported = spec().export_params(&p);
        assert_eq!(exported["contigs"], json!("c1,c2"));
        assert_eq!(exported["k"], json!(21));
    }

    #[test]
    fn output_params_only_lists_named_outputs() {
        let p = params(json!({"reads": "r", "output_name": "asm"}));
        assert_eq!(
            spec().output_params(&p),
            vec![OutputParam {
                param: "output_name".into(),
                object_name: "asm".into()
            }]
        );
    }

    #[test]
    fn spec_deserializes_with_defaults() {
        let spec: AppSpec = serde_json::from_value(json!({
            "info": {"id": "Mod/x", "name": "X"},
            "parameters": [{"id": "a", "data_type": "mystery"}]
        }))
        .unwrap();
        assert_eq!(spec.parameters[0].data_type, DataType::Unspecified);
        assert!(spec.parameters[0].is_required());
    }
}
