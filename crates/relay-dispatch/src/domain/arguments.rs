//! Declared argument schema
//!
//! Events declare their arguments with names, types and optional defaults.
//! The type system mirrors conventional query-language input types: scalar
//! leaves, enums, lists, non-null wrappers and nested input objects.

use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// The declared type of an argument or input-object field.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgumentType {
    /// UTF-8 string.
    String,
    /// Opaque identifier; accepts strings and integers, canonicalised to a string.
    Id,
    /// Signed 32-bit integer.
    Int,
    /// Double-precision float.
    Float,
    /// Boolean.
    Boolean,
    /// One of a fixed set of value names.
    Enum(Arc<EnumType>),
    /// Ordered list of the inner type.
    List(Box<ArgumentType>),
    /// The inner type, with `null` rejected.
    NonNull(Box<ArgumentType>),
    /// Structured argument with its own fields.
    Input(Arc<InputObjectType>),
}

impl ArgumentType {
    /// Wrap this type as non-null.
    #[must_use]
    pub fn non_null(self) -> Self {
        match self {
            Self::NonNull(_) => self,
            other => Self::NonNull(Box::new(other)),
        }
    }

    /// A list of `inner`.
    #[must_use]
    pub fn list_of(inner: ArgumentType) -> Self {
        Self::List(Box::new(inner))
    }

    /// Whether `null` is rejected for this type.
    #[must_use]
    pub fn is_non_null(&self) -> bool {
        matches!(self, Self::NonNull(_))
    }
}

impl fmt::Display for ArgumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => f.write_str("String"),
            Self::Id => f.write_str("ID"),
            Self::Int => f.write_str("Int"),
            Self::Float => f.write_str("Float"),
            Self::Boolean => f.write_str("Boolean"),
            Self::Enum(e) => f.write_str(&e.name),
            Self::List(inner) => write!(f, "[{inner}]"),
            Self::NonNull(inner) => write!(f, "{inner}!"),
            Self::Input(input) => f.write_str(&input.name),
        }
    }
}

/// An enum type: a name plus its allowed value names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumType {
    pub name: String,
    pub values: Vec<String>,
}

impl EnumType {
    pub fn new<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn contains(&self, value: &str) -> bool {
        self.values.iter().any(|v| v == value)
    }
}

/// A structured input type whose fields coerce like top-level arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct InputObjectType {
    pub name: String,
    pub fields: Vec<ArgumentDefinition>,
}

impl InputObjectType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Builder-style method to add a field
    #[must_use]
    pub fn field(mut self, definition: ArgumentDefinition) -> Self {
        self.fields.push(definition);
        self
    }
}

/// One declared argument: name, type and optional default.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentDefinition {
    pub name: String,
    pub ty: ArgumentType,
    pub default: Option<Value>,
}

impl ArgumentDefinition {
    pub fn new(name: impl Into<String>, ty: ArgumentType) -> Self {
        Self {
            name: name.into(),
            ty,
            default: None,
        }
    }

    /// Builder-style method to set the default value
    #[must_use]
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Required arguments are non-null and have no default.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.ty.is_non_null() && self.default.is_none()
    }

    /// The snake_case spelling accepted as an alias for this argument.
    #[must_use]
    pub fn snake_case_name(&self) -> String {
        to_snake_case(&self.name)
    }
}

/// Whether `name` is a valid event or argument name: `[_A-Za-z][_0-9A-Za-z]*`.
#[must_use]
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first == '_' || first.is_ascii_alphabetic() => {
            chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
        }
        _ => false,
    }
}

/// Convert a camelCase name to snake_case (`userId` -> `user_id`).
///
/// A run of capitals is one word: `userID` -> `user_id`,
/// `HTTPServer` -> `http_server`.
#[must_use]
pub fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1);
            let starts_word = match prev {
                Some(p) if p.is_ascii_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_ascii_uppercase() => next.is_some_and(char::is_ascii_lowercase),
                _ => false,
            };
            if starts_word {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
