//! Tagged value union stored on the blackboard.

use std::collections::BTreeMap;
use std::fmt;

use crate::Status;

/// A blackboard value.
///
/// Nested attribute access (`battery.percentage`) is a lookup over
/// [`Value::Map`] entries; see [`Value::lookup`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Status(Status),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Resolve a dotted attribute path against this value.
    ///
    /// Each path segment must name an entry in a [`Value::Map`]; the first
    /// segment that does not resolve yields `None`.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut current = self;
        for segment in path.split('.') {
            match current {
                Value::Map(entries) => current = entries.get(segment)?,
                _ => return None,
            }
        }
        Some(current)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_status(&self) -> Option<Status> {
        match self {
            Value::Status(s) => Some(*s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::Status(s) => write!(f, "{s}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Map(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Status> for Value {
    fn from(s: Status) -> Self {
        Value::Status(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn battery() -> Value {
        let mut inner = BTreeMap::new();
        inner.insert("percentage".to_string(), Value::Int(87));
        let mut outer = BTreeMap::new();
        outer.insert("battery".to_string(), Value::Map(inner));
        Value::Map(outer)
    }

    #[test]
    fn nested_lookup_resolves() {
        let value = battery();
        assert_eq!(
            value.lookup("battery.percentage"),
            Some(&Value::Int(87))
        );
    }

    #[test]
    fn nested_lookup_misses_on_absent_segment() {
        let value = battery();
        assert_eq!(value.lookup("battery.voltage"), None);
        assert_eq!(value.lookup("motor"), None);
    }

    #[test]
    fn lookup_on_scalar_fails() {
        assert_eq!(Value::Int(3).lookup("anything"), None);
    }
}
