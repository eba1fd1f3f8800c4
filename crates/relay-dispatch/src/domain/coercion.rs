//! Argument coercion
//!
//! Normalizes a raw argument map against its declared schema:
//!
//! 1. Each supplied key resolves to a declared argument by exact name, then
//!    by snake_case spelling; anything else is `UnknownArgument`.
//! 2. Every declared argument then takes its supplied value, else its
//!    default, else stays absent (only allowed when nullable).
//! 3. Values coerce to their declared type, accepting loose spellings
//!    (integer ids, integral floats for `Int`, single values for lists).
//!
//! The output is backed by a `BTreeMap`, so its iteration order and
//! serialized form never depend on the input order.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::{BTreeMap, HashMap};

use crate::domain::arguments::{ArgumentDefinition, ArgumentType};
use crate::error::ArgumentError;

/// A canonical, fully-defaulted argument map.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CoercedArguments(BTreeMap<String, Value>);

impl CoercedArguments {
    /// An empty argument map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in lexicographic argument-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Convert to a JSON object.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone().into_iter().collect())
    }
}

/// Coerces raw argument maps against one declared argument list.
#[derive(Debug, Clone, Copy)]
pub struct ArgumentCoercer<'a> {
    definitions: &'a [ArgumentDefinition],
}

impl<'a> ArgumentCoercer<'a> {
    pub fn new(definitions: &'a [ArgumentDefinition]) -> Self {
        Self { definitions }
    }

    /// Coerce a raw argument value: an object, or `null` for "no arguments".
    pub fn coerce_value(&self, raw: &Value) -> Result<CoercedArguments, ArgumentError> {
        match raw {
            Value::Null => self.coerce(&Map::new()),
            Value::Object(map) => self.coerce(map),
            other => Err(ArgumentError::Coercion {
                path: String::new(),
                reason: format!("arguments must be an object, got {}", kind_of(other)),
            }),
        }
    }

    /// Coerce a raw argument map.
    pub fn coerce(&self, raw: &Map<String, Value>) -> Result<CoercedArguments, ArgumentError> {
        coerce_object(self.definitions, raw, "").map(CoercedArguments)
    }
}

fn coerce_object(
    definitions: &[ArgumentDefinition],
    raw: &Map<String, Value>,
    prefix: &str,
) -> Result<BTreeMap<String, Value>, ArgumentError> {
    let mut supplied: HashMap<&str, &Value> = HashMap::with_capacity(raw.len());

    for (key, value) in raw {
        let definition = definitions
            .iter()
            .find(|d| d.name == *key)
            .or_else(|| definitions.iter().find(|d| d.snake_case_name() == *key))
            .ok_or_else(|| ArgumentError::UnknownArgument {
                path: join_path(prefix, key),
            })?;

        if supplied.insert(definition.name.as_str(), value).is_some() {
            return Err(ArgumentError::Coercion {
                path: join_path(prefix, &definition.name),
                reason: "supplied more than once".to_string(),
            });
        }
    }

    let mut coerced = BTreeMap::new();
    for definition in definitions {
        let path = join_path(prefix, &definition.name);
        let value = match (supplied.get(definition.name.as_str()), &definition.default) {
            (Some(value), _) => *value,
            (None, Some(default)) => default,
            (None, None) if definition.ty.is_non_null() => {
                return Err(ArgumentError::Coercion {
                    path,
                    reason: format!("required argument of type {} was not supplied", definition.ty),
                });
            }
            (None, None) => continue,
        };
        coerced.insert(definition.name.clone(), coerce_typed(&definition.ty, value, &path)?);
    }

    Ok(coerced)
}

fn coerce_typed(ty: &ArgumentType, value: &Value, path: &str) -> Result<Value, ArgumentError> {
    let mismatch = || ArgumentError::Coercion {
        path: path.to_string(),
        reason: format!("expected {}, got {}", ty, kind_of(value)),
    };

    match ty {
        ArgumentType::NonNull(inner) => {
            if value.is_null() {
                return Err(ArgumentError::Coercion {
                    path: path.to_string(),
                    reason: format!("null is not allowed for {ty}"),
                });
            }
            coerce_typed(inner, value, path)
        }
        _ if value.is_null() => Ok(Value::Null),
        ArgumentType::String => value
            .as_str()
            .map(|s| Value::String(s.to_string()))
            .ok_or_else(mismatch),
        ArgumentType::Id => match value {
            Value::String(s) => Ok(Value::String(s.clone())),
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(Value::String(n.to_string())),
            _ => Err(mismatch()),
        },
        ArgumentType::Int => match value {
            Value::Number(n) => coerce_int(n, path),
            _ => Err(mismatch()),
        },
        ArgumentType::Float => value.as_f64().map(Value::from).ok_or_else(mismatch),
        ArgumentType::Boolean => value.as_bool().map(Value::Bool).ok_or_else(mismatch),
        ArgumentType::Enum(enum_type) => match value.as_str() {
            Some(name) if enum_type.contains(name) => Ok(Value::String(name.to_string())),
            Some(name) => Err(ArgumentError::Coercion {
                path: path.to_string(),
                reason: format!("{name:?} is not a value of enum {}", enum_type.name),
            }),
            None => Err(mismatch()),
        },
        ArgumentType::List(inner) => match value {
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| coerce_typed(inner, item, &format!("{path}[{i}]")))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            single => Ok(Value::Array(vec![coerce_typed(inner, single, path)?])),
        },
        ArgumentType::Input(input) => match value {
            Value::Object(map) => coerce_object(&input.fields, map, path)
                .map(|fields| Value::Object(fields.into_iter().collect())),
            _ => Err(mismatch()),
        },
    }
}

fn coerce_int(n: &Number, path: &str) -> Result<Value, ArgumentError> {
    if n.as_f64().is_some_and(|f| f.fract() != 0.0) {
        return Err(ArgumentError::Coercion {
            path: path.to_string(),
            reason: format!("{n} is not an integer"),
        });
    }

    n.as_i64()
        .and_then(|i| i32::try_from(i).ok())
        .or_else(|| {
            n.as_f64()
                .filter(|f| (f64::from(i32::MIN)..=f64::from(i32::MAX)).contains(f))
                .map(|f| f as i32)
        })
        .map(Value::from)
        .ok_or_else(|| out_of_range(n, path))
}

fn out_of_range(n: &Number, path: &str) -> ArgumentError {
    ArgumentError::Coercion {
        path: path.to_string(),
        reason: format!("{n} is outside the 32-bit Int range"),
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "Boolean",
        Value::Number(n) if n.is_f64() => "Float",
        Value::Number(_) => "Int",
        Value::String(_) => "String",
        Value::Array(_) => "List",
        Value::Object(_) => "Object",
    }
}
