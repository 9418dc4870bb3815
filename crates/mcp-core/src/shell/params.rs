//! Parameter declaration and argument coercion for shell tools (§4.7 step 1)

use std::fs;

use serde::Deserialize;
use serde_json::Value;

use super::error::ShellError;

/// The declared type of one shell-tool parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParamType {
    /// A string
    String,
    /// A 64-bit integer
    Int,
    /// A 64-bit float
    Float,
    /// A boolean
    Bool,
    /// An ISO-8601 date string
    Date,
    /// A list of strings
    StringList,
    /// A list of integers
    IntList,
    /// A list of floats
    FloatList,
    /// One of a declared set of strings
    Choice,
    /// A list drawn from a declared set of strings
    ChoiceList,
    /// A path to an existing file
    File,
    /// A list of file paths
    FileList,
    /// A string whose *contents* are read from a file at the given path
    StringFromFile,
    /// A JSON object whose contents are read from a file at the given path
    ObjectFromFile,
    /// A newline-delimited string list read from a file
    StringListFromFile,
    /// A JSON array of objects read from a file
    ObjectListFromFile,
    /// A `key=value` map, given as a list of `"key=value"` strings
    KeyValue,
}

/// One declared parameter of a shell tool
#[derive(Debug, Clone, Deserialize)]
pub struct ParamDef {
    /// Parameter name, used as the JSON Schema property and template variable
    pub name: String,
    /// Parameter type
    #[serde(rename = "type")]
    pub param_type: ParamType,
    /// Help text, used as the JSON Schema `description`
    #[serde(default)]
    pub help: String,
    /// Whether the argument must be supplied
    #[serde(default)]
    pub required: bool,
    /// Default value, used when the argument is absent and not required
    #[serde(default)]
    pub default: Option<Value>,
    /// Allowed values, for `choice`/`choiceList`
    #[serde(default)]
    pub choices: Vec<String>,
}

impl ParamDef {
    /// Build the JSON Schema property entry for this parameter
    #[must_use]
    pub fn schema_property(&self) -> Value {
        let mut schema = match self.param_type {
            ParamType::String
            | ParamType::Date
            | ParamType::File
            | ParamType::StringFromFile
            | ParamType::ObjectFromFile
            | ParamType::ObjectListFromFile => serde_json::json!({"type": "string"}),
            ParamType::Int => serde_json::json!({"type": "integer"}),
            ParamType::Float => serde_json::json!({"type": "number"}),
            ParamType::Bool => serde_json::json!({"type": "boolean"}),
            ParamType::StringList | ParamType::FileList | ParamType::StringListFromFile | ParamType::KeyValue => {
                serde_json::json!({"type": "array", "items": {"type": "string"}})
            }
            ParamType::IntList => serde_json::json!({"type": "array", "items": {"type": "integer"}}),
            ParamType::FloatList => serde_json::json!({"type": "array", "items": {"type": "number"}}),
            ParamType::Choice => serde_json::json!({"type": "string", "enum": self.choices}),
            ParamType::ChoiceList => {
                serde_json::json!({"type": "array", "items": {"type": "string", "enum": self.choices}})
            }
        };
        if !self.help.is_empty() {
            schema["description"] = Value::String(self.help.clone());
        }
        schema
    }
}

/// A coerced argument, ready to be placed in a template context
#[derive(Debug, Clone)]
pub enum CoercedArg {
    /// String-typed values, including file contents and date strings
    Text(String),
    /// Integer values
    Int(i64),
    /// Float values
    Float(f64),
    /// Boolean values
    Bool(bool),
    /// List-typed values (string/int/float/choice/file lists)
    List(Vec<CoercedArg>),
    /// Arbitrary JSON, for object-from-file parameters
    Object(Value),
    /// `key=value` pairs
    KeyValue(Vec<(String, String)>),
}

impl CoercedArg {
    /// Render as the string minijinja sees in `{{ Args.name }}`
    #[must_use]
    pub fn to_template_value(&self) -> minijinja::Value {
        match self {
            Self::Text(s) => minijinja::Value::from(s.clone()),
            Self::Int(i) => minijinja::Value::from(*i),
            Self::Float(f) => minijinja::Value::from(*f),
            Self::Bool(b) => minijinja::Value::from(*b),
            Self::List(items) => {
                minijinja::Value::from(items.iter().map(Self::to_template_value).collect::<Vec<_>>())
            }
            Self::Object(v) => minijinja::Value::from_serialize(v),
            Self::KeyValue(pairs) => {
                let map: std::collections::BTreeMap<String, String> = pairs.iter().cloned().collect();
                minijinja::Value::from_serialize(&map)
            }
        }
    }
}

/// Coerce a single raw JSON argument against its declared parameter type.
///
/// # Errors
///
/// Returns [`ShellError::InvalidArgument`] when the value is missing and
/// required, the wrong JSON shape for its declared type, a `choice`/
/// `choiceList` value outside the declared set, or a `*FromFile` parameter
/// whose file can't be read/parsed.
pub fn coerce(def: &ParamDef, raw: Option<&Value>) -> Result<CoercedArg, ShellError> {
    let raw = match raw {
        Some(v) if !v.is_null() => v,
        _ => {
            if let Some(default) = &def.default {
                return coerce(def, Some(default));
            }
            if def.required {
                return Err(ShellError::InvalidArgument {
                    name: def.name.clone(),
                    reason: "required argument missing".to_string(),
                });
            }
            return Ok(CoercedArg::Text(String::new()));
        }
    };

    let invalid = |reason: &str| -> ShellError {
        ShellError::InvalidArgument {
            name: def.name.clone(),
            reason: reason.to_string(),
        }
    };

    match def.param_type {
        ParamType::String | ParamType::Date | ParamType::File => raw
            .as_str()
            .map(|s| CoercedArg::Text(s.to_string()))
            .ok_or_else(|| invalid("expected a string")),
        ParamType::Int => raw.as_i64().map(CoercedArg::Int).ok_or_else(|| invalid("expected an integer")),
        ParamType::Float => raw.as_f64().map(CoercedArg::Float).ok_or_else(|| invalid("expected a number")),
        ParamType::Bool => raw.as_bool().map(CoercedArg::Bool).ok_or_else(|| invalid("expected a boolean")),
        ParamType::Choice => {
            let s = raw.as_str().ok_or_else(|| invalid("expected a string"))?;
            if !def.choices.is_empty() && !def.choices.iter().any(|c| c == s) {
                return Err(invalid(&format!("`{s}` is not one of {:?}", def.choices)));
            }
            Ok(CoercedArg::Text(s.to_string()))
        }
        ParamType::StringList | ParamType::FileList => coerce_list(raw, &invalid, |v| {
            v.as_str().map(|s| CoercedArg::Text(s.to_string())).ok_or_else(|| invalid("expected a string"))
        }),
        ParamType::IntList => coerce_list(raw, &invalid, |v| v.as_i64().map(CoercedArg::Int).ok_or_else(|| invalid("expected an integer"))),
        ParamType::FloatList => coerce_list(raw, &invalid, |v| v.as_f64().map(CoercedArg::Float).ok_or_else(|| invalid("expected a number"))),
        ParamType::ChoiceList => coerce_list(raw, &invalid, |v| {
            let s = v.as_str().ok_or_else(|| invalid("expected a string"))?;
            if !def.choices.is_empty() && !def.choices.iter().any(|c| c == s) {
                return Err(invalid(&format!("`{s}` is not one of {:?}", def.choices)));
            }
            Ok(CoercedArg::Text(s.to_string()))
        }),
        ParamType::StringFromFile => {
            let path = raw.as_str().ok_or_else(|| invalid("expected a file path"))?;
            let contents = fs::read_to_string(path)?;
            Ok(CoercedArg::Text(contents))
        }
        ParamType::ObjectFromFile => {
            let path = raw.as_str().ok_or_else(|| invalid("expected a file path"))?;
            let contents = fs::read_to_string(path)?;
            let value: Value = serde_json::from_str(&contents).map_err(|e| invalid(&e.to_string()))?;
            Ok(CoercedArg::Object(value))
        }
        ParamType::StringListFromFile => {
            let path = raw.as_str().ok_or_else(|| invalid("expected a file path"))?;
            let contents = fs::read_to_string(path)?;
            let items = contents.lines().map(|l| CoercedArg::Text(l.to_string())).collect();
            Ok(CoercedArg::List(items))
        }
        ParamType::ObjectListFromFile => {
            let path = raw.as_str().ok_or_else(|| invalid("expected a file path"))?;
            let contents = fs::read_to_string(path)?;
            let value: Value = serde_json::from_str(&contents).map_err(|e| invalid(&e.to_string()))?;
            let array = value.as_array().ok_or_else(|| invalid("expected a JSON array"))?;
            Ok(CoercedArg::List(array.iter().cloned().map(CoercedArg::Object).collect()))
        }
        ParamType::KeyValue => {
            let array = raw.as_array().ok_or_else(|| invalid("expected a list of \"key=value\" strings"))?;
            let mut pairs = Vec::with_capacity(array.len());
            for item in array {
                let s = item.as_str().ok_or_else(|| invalid("expected a string"))?;
                let (k, v) = s.split_once('=').ok_or_else(|| invalid(&format!("`{s}` is not `key=value`")))?;
                pairs.push((k.to_string(), v.to_string()));
            }
            Ok(CoercedArg::KeyValue(pairs))
        }
    }
}

fn coerce_list(
    raw: &Value,
    invalid: &dyn Fn(&str) -> ShellError,
    mut item: impl FnMut(&Value) -> Result<CoercedArg, ShellError>,
) -> Result<CoercedArg, ShellError> {
    let array = raw.as_array().ok_or_else(|| invalid("expected a list"))?;
    let items = array.iter().map(|v| item(v)).collect::<Result<Vec<_>, _>>()?;
    Ok(CoercedArg::List(items))
}
