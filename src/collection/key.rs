//! Collection keys.

use std::fmt;

use serde_json::Value;

/// A collection key: an integer or a string.
///
/// Strings holding a canonical integer (`"7"`, `"-3"`, but not `"07"` or
/// `"+7"`) are normalized to [`Key::Int`], so `"7"` and `7` address the same
/// entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    Int(i64),
    Str(String),
}

impl Key {
    /// Parses a string key, normalizing canonical integers.
    pub fn parse(s: &str) -> Key {
        if is_canonical_int(s) {
            if let Ok(i) = s.parse::<i64>() {
                return Key::Int(i);
            }
        }
        Key::Str(s.to_string())
    }

    /// Converts a derived value into a key.
    ///
    /// Booleans become `0`/`1`, floats are truncated, `null` becomes the empty
    /// string. Arrays and objects cannot be keys and return `None`.
    pub fn from_value(value: &Value) -> Option<Key> {
        match value {
            Value::Null => Some(Key::Str(String::new())),
            Value::Bool(b) => Some(Key::Int(i64::from(*b))),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(Key::Int(i)),
                None => n.as_f64().map(|f| Key::Int(f.trunc() as i64)),
            },
            Value::String(s) => Some(Key::parse(s)),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Key::Int(i) => Some(*i),
            Key::Str(_) => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Key::Int(i) => Value::from(*i),
            Key::Str(s) => Value::String(s.clone()),
        }
    }
}

fn is_canonical_int(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    if digits == "0" {
        return s == "0";
    }
    !digits.starts_with('0')
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(i) => write!(f, "{}", i),
            Key::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Key::Int(value)
    }
}

impl From<i32> for Key {
    fn from(value: i32) -> Self {
        Key::Int(i64::from(value))
    }
}

impl From<usize> for Key {
    fn from(value: usize) -> Self {
        Key::Int(value as i64)
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::parse(value)
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key::parse(&value)
    }
}

impl From<&String> for Key {
    fn from(value: &String) -> Self {
        Key::parse(value)
    }
}

impl From<&Key> for Key {
    fn from(value: &Key) -> Self {
        value.clone()
    }
}
