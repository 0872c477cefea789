use std::fmt;

use serde::{Deserialize, Serialize};

use crate::acode::Aint;
use crate::world::Set;

/// A value on the evaluation stack or in an attribute slot.
///
/// Instance references and booleans are integers; strings and sets are owned,
/// so copying a value is always a deep copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    Int(Aint),
    Str(String),
    Set(Set),
}

impl Value {
    pub fn truthy(&self) -> bool {
        match self {
            Value::Int(v) => *v != 0,
            Value::Str(_) | Value::Set(_) => true,
        }
    }

    pub fn as_int(&self) -> Option<Aint> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Value::Int(_) => "integer",
            Value::Str(_) => "string",
            Value::Set(_) => "set",
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Int(0)
    }
}

impl From<Aint> for Value {
    fn from(v: Aint) -> Self {
        Value::Int(v)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Int(b as Aint)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Set> for Value {
    fn from(s: Set) -> Self {
        Value::Set(s)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Set(s) => write!(f, "{}", s),
        }
    }
}
