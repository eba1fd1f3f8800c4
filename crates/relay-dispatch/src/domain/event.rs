//! Event schemas and scope bindings
//!
//! An event schema declares the arguments an event accepts and, optionally,
//! a scope binding. A scope binding is a data-only extraction rule: a path
//! into the subscriber's context whose value partitions the event's audience.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::domain::arguments::{is_valid_name, ArgumentDefinition, ArgumentType};
use crate::domain::coercion::ArgumentCoercer;
use crate::error::SchemaError;

/// Extraction rule mapping subscriber context to a scope value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeBinding {
    /// Name of the binding (for diagnostics and stored records).
    pub name: String,
    /// Object keys to walk, from the context root, to reach the scope value.
    pub context_path: Vec<String>,
}

impl ScopeBinding {
    pub fn new<I, S>(name: impl Into<String>, context_path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            context_path: context_path.into_iter().map(Into::into).collect(),
        }
    }

    /// A binding that reads a single top-level context key.
    pub fn context_key(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            name: key.clone(),
            context_path: vec![key],
        }
    }

    /// Extract the scope value from `context`; `None` if missing or null.
    ///
    /// The value is canonicalised with [`ScopeBinding::canonical_value`].
    #[must_use]
    pub fn extract(&self, context: &Value) -> Option<Value> {
        self.context_path
            .iter()
            .try_fold(context, |value, key| value.get(key))
            .filter(|value| !value.is_null())
            .map(Self::canonical_value)
    }

    /// Scope values compare like `ID`s: an integer scope becomes its decimal
    /// string, so `3` and `"3"` address the same audience. Other values are
    /// kept as given and must match exactly.
    #[must_use]
    pub fn canonical_value(value: &Value) -> Value {
        match value {
            Value::Number(n) if n.is_i64() || n.is_u64() => Value::String(n.to_string()),
            other => other.clone(),
        }
    }
}

/// Declared shape of one event stream.
#[derive(Debug, Clone, PartialEq)]
pub struct EventSchema {
    pub name: String,
    pub arguments: Vec<ArgumentDefinition>,
    pub scope: Option<ScopeBinding>,
}

impl EventSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: Vec::new(),
            scope: None,
        }
    }

    /// Builder-style method to declare an argument
    #[must_use]
    pub fn argument(mut self, definition: ArgumentDefinition) -> Self {
        self.arguments.push(definition);
        self
    }

    /// Builder-style method to attach a scope binding
    #[must_use]
    pub fn scoped(mut self, binding: ScopeBinding) -> Self {
        self.scope = Some(binding);
        self
    }

    /// The argument coercer for this event.
    #[must_use]
    pub fn coercer(&self) -> ArgumentCoercer<'_> {
        ArgumentCoercer::new(&self.arguments)
    }

    #[must_use]
    pub fn is_scoped(&self) -> bool {
        self.scope.is_some()
    }

    /// Validate names and defaults.
    pub fn validate(&self) -> Result<(), SchemaError> {
        if !is_valid_name(&self.name) {
            return Err(SchemaError::InvalidName(self.name.clone()));
        }
        validate_definitions(&self.name, &self.arguments)?;

        if let Some(binding) = &self.scope {
            if binding.context_path.is_empty() {
                return Err(SchemaError::EmptyScopePath(binding.name.clone()));
            }
        }

        // Coercing an empty map applies and checks every default
        for definition in self.arguments.iter().filter(|d| d.default.is_some()) {
            let single = std::slice::from_ref(definition);
            ArgumentCoercer::new(single)
                .coerce_value(&Value::Null)
                .map_err(|source| SchemaError::InvalidDefault {
                    event: self.name.clone(),
                    source,
                })?;
        }

        Ok(())
    }
}

fn validate_definitions(owner: &str, definitions: &[ArgumentDefinition]) -> Result<(), SchemaError> {
    let mut seen = HashSet::new();
    for definition in definitions {
        if !is_valid_name(&definition.name) {
            return Err(SchemaError::InvalidName(definition.name.clone()));
        }
        if !seen.insert(definition.name.as_str()) {
            return Err(SchemaError::DuplicateArgument {
                owner: owner.to_string(),
                argument: definition.name.clone(),
            });
        }
        validate_type(&definition.ty)?;
    }
    validate_aliases(owner, definitions)
}

/// Every supplied key must resolve to exactly one argument, so a snake_case
/// alias may not equal another argument's name or alias.
fn validate_aliases(owner: &str, definitions: &[ArgumentDefinition]) -> Result<(), SchemaError> {
    let mut spellings: HashMap<String, &str> = definitions
        .iter()
        .map(|d| (d.name.clone(), d.name.as_str()))
        .collect();

    for definition in definitions {
        let alias = definition.snake_case_name();
        match spellings.get(alias.as_str()) {
            Some(&existing) if existing != definition.name => {
                return Err(SchemaError::AliasCollision {
                    owner: owner.to_string(),
                    argument: definition.name.clone(),
                    alias,
                    existing: existing.to_string(),
                });
            }
            Some(_) => {}
            None => {
                spellings.insert(alias, definition.name.as_str());
            }
        }
    }
    Ok(())
}

fn validate_type(ty: &ArgumentType) -> Result<(), SchemaError> {
    match ty {
        ArgumentType::List(inner) | ArgumentType::NonNull(inner) => validate_type(inner),
        ArgumentType::Input(input) => {
            if !is_valid_name(&input.name) {
                return Err(SchemaError::InvalidName(input.name.clone()));
            }
            validate_definitions(&input.name, &input.fields)
        }
        ArgumentType::Enum(enum_type) => {
            if !is_valid_name(&enum_type.name) {
                return Err(SchemaError::InvalidName(enum_type.name.clone()));
            }
            match enum_type.values.iter().find(|v| !is_valid_name(v)) {
                Some(bad) => Err(SchemaError::InvalidName(bad.clone())),
                None => Ok(()),
            }
        }
        _ => Ok(()),
    }
}

/// Registry of event schemas, keyed by event name.
#[derive(Debug, Clone, Default)]
pub struct EventRegistry {
    events: HashMap<String, Arc<EventSchema>>,
}

impl EventRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema, replacing any earlier schema of the same name.
    pub fn register(&mut self, schema: EventSchema) -> Result<(), SchemaError> {
        schema.validate()?;
        self.events.insert(schema.name.clone(), Arc::new(schema));
        Ok(())
    }

    /// Builder-style registration.
    pub fn with_event(mut self, schema: EventSchema) -> Result<Self, SchemaError> {
        self.register(schema)?;
        Ok(self)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<EventSchema>> {
        self.events.get(name).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
