use crate::{Error, Result};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// The command schema fetched from the command server: a dictionary of
/// `name -> function_declaration`.
///
/// The `answer` declaration is reserved for the runtime's YES/NO branch
/// tool; source programs cannot name it.
#[derive(Debug, Clone, Default)]
pub struct CommandSet {
    commands: Map<String, Value>,
}

impl CommandSet {
    pub fn new(commands: Map<String, Value>) -> Self {
        Self { commands }
    }

    /// Declaration for an action a source program may name.
    pub fn declaration(&self, name: &str) -> Option<&Value> {
        if name == "answer" {
            None
        } else {
            self.commands.get(name)
        }
    }

    /// Declaration lookup without the `answer` reservation.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.commands.get(name)
    }
}

/// Validation outcome for one argument name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamStatus {
    pub exists: bool,
    /// `None` means the name is not declared in the schema at all.
    pub valid: Option<bool>,
}

pub type ValidationResult = BTreeMap<String, ParamStatus>;

/// Validate an argument dictionary against one function declaration.
///
/// Every declared property gets an entry: present arguments are validated
/// recursively, absent ones are valid iff not required. Argument names the
/// schema does not declare are reported with `valid: None`; the caller
/// decides what passing means.
pub fn validate_arguments(
    args: &Map<String, Value>,
    declaration: &Value,
) -> Result<ValidationResult> {
    let params = declaration
        .get("parameters")
        .and_then(Value::as_object)
        .ok_or_else(|| {
            Error::Schema("function_declaration.parameters is missing or not an object".into())
        })?;

    let is_object = params
        .get("type")
        .and_then(Value::as_str)
        .is_some_and(|t| t.eq_ignore_ascii_case("object"));
    if !is_object {
        return Err(Error::Schema("parameters.type must be \"object\"".into()));
    }

    let empty = Map::new();
    let properties = params
        .get("properties")
        .and_then(Value::as_object)
        .unwrap_or(&empty);
    let required = required_names(params);

    let mut out = ValidationResult::new();

    for (name, subschema) in properties {
        let status = match args.get(name) {
            Some(value) => ParamStatus {
                exists: true,
                valid: Some(validate_value(Some(value), subschema)),
            },
            None => ParamStatus {
                exists: false,
                valid: Some(!required.contains(&name.as_str())),
            },
        };
        out.insert(name.clone(), status);
    }

    for name in args.keys() {
        if !properties.contains_key(name) {
            out.insert(
                name.clone(),
                ParamStatus {
                    exists: true,
                    valid: None,
                },
            );
        }
    }

    Ok(out)
}

fn required_names(schema: &Map<String, Value>) -> Vec<&str> {
    schema
        .get("required")
        .and_then(Value::as_array)
        .map(|list| list.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

/// Recursive check of one value against one schema node, covering the
/// `nullable`, `enum`, primitive-type, `items`, `required`, and
/// `properties` facets. Unknown facets are permissive.
fn validate_value(value: Option<&Value>, schema: &Value) -> bool {
    let Some(sch) = schema.as_object() else {
        return true;
    };

    let value = match value {
        None | Some(Value::Null) => {
            return sch
                .get("nullable")
                .and_then(Value::as_bool)
                .unwrap_or(false);
        }
        Some(v) => v,
    };

    if let Some(options) = sch.get("enum").and_then(Value::as_array)
        && !options.contains(value)
    {
        return false;
    }

    let ty = sch
        .get("type")
        .and_then(Value::as_str)
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match ty.as_str() {
        "string" => value.is_string(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "array" => {
            let Some(items) = value.as_array() else {
                return false;
            };
            match sch.get("items") {
                Some(item_schema) => items
                    .iter()
                    .map(|item| validate_value(Some(item), item_schema))
                    .all(|ok| ok),
                None => true,
            }
        }
        "object" => {
            let Some(fields) = value.as_object() else {
                return false;
            };
            if !required_names(sch)
                .iter()
                .all(|name| fields.contains_key(*name))
            {
                return false;
            }
            if let Some(props) = sch.get("properties").and_then(Value::as_object) {
                for (key, subschema) in props {
                    if let Some(field) = fields.get(key)
                        && !validate_value(Some(field), subschema)
                    {
                        return false;
                    }
                }
            }
            // Unknown keys on sub-objects are allowed.
            true
        }
        _ => true,
    }
}
