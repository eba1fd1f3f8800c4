//! Topic key derivation
//!
//! A topic key identifies "this event with these argument values (and
//! scope)". Keys are built from coerced arguments only, so any two argument
//! maps that coerce to the same values share a key.
//!
//! Encoding:
//! - unscoped: `<event>:<canonical-args-json>`
//! - scoped:   `<event>:<canonical-args-json>@<canonical-scope-json>`
//!
//! Canonical JSON sorts object keys at every depth.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Borrow;
use std::fmt::{self, Write};

use crate::domain::coercion::CoercedArguments;
use crate::domain::event::{EventSchema, ScopeBinding};

/// Canonical identifier of an event stream partition.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopicKey(String);

impl TopicKey {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for TopicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for TopicKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Builds topic keys. Stateless; all methods are associated functions.
pub struct TopicKeyBuilder;

impl TopicKeyBuilder {
    /// Build a key from an event name, coerced arguments and an optional scope.
    ///
    /// `scope` is appended verbatim when present; callers decide whether the
    /// event's scope binding is active (see [`TopicKeyBuilder::for_event`]).
    #[must_use]
    pub fn build_key(
        event_name: &str,
        arguments: &CoercedArguments,
        scope: Option<&Value>,
    ) -> TopicKey {
        let mut key = String::with_capacity(event_name.len() + 32);
        key.push_str(event_name);
        key.push(':');

        key.push('{');
        for (i, (name, value)) in arguments.iter().enumerate() {
            if i > 0 {
                key.push(',');
            }
            write_string(&mut key, name);
            key.push(':');
            write_canonical(&mut key, value);
        }
        key.push('}');

        if let Some(scope) = scope {
            key.push('@');
            write_canonical(&mut key, scope);
        }

        TopicKey(key)
    }

    /// Build a key for `schema`, folding in a scope only when the event has a
    /// scope binding. Integer scopes fold as strings. A scoped event with no
    /// supplied scope folds `null`, which no scoped subscriber is ever
    /// indexed under.
    #[must_use]
    pub fn for_event(
        schema: &EventSchema,
        arguments: &CoercedArguments,
        supplied_scope: Option<&Value>,
    ) -> TopicKey {
        if schema.is_scoped() {
            let scope = supplied_scope
                .map(ScopeBinding::canonical_value)
                .unwrap_or(Value::Null);
            Self::build_key(&schema.name, arguments, Some(&scope))
        } else {
            Self::build_key(&schema.name, arguments, None)
        }
    }
}

/// Write `value` as compact JSON with object keys in lexicographic order.
fn write_canonical(out: &mut String, value: &Value) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_unstable_by(|a, b| a.0.cmp(b.0));

            out.push('{');
            for (i, (name, value)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(out, name);
                out.push(':');
                write_canonical(out, value);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(out, item);
            }
            out.push(']');
        }
        scalar => {
            // Writing into a String cannot fail
            let _ = write!(out, "{scalar}");
        }
    }
}

fn write_string(out: &mut String, s: &str) {
    let _ = write!(out, "{}", Value::from(s));
}
