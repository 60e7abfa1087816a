//! Helpers over `serde_json::Value` shared by records, collections and the
//! in-memory DAO.
//!
//! Field values are dynamically typed, so ordering, truthiness and numeric
//! coercion need one agreed definition. These functions are that definition.

use std::cmp::Ordering;

use serde_json::{Number, Value};

/// Returns whether a value counts as "truthy".
///
/// Falsy values are `null`, `false`, `0`, `0.0`, `""`, `"0"` and empty
/// arrays/objects. Everything else is truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !(s.is_empty() || s == "0"),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Coerces a value to a float for aggregates.
///
/// `null` is 0, booleans are 0/1, numeric strings are parsed, anything else
/// (including non-numeric strings and nested structures) is 0.
pub fn to_number(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        Value::Array(_) | Value::Object(_) => 0.0,
    }
}

/// Builds a JSON number, keeping integral results as integers.
pub fn number(value: f64) -> Value {
    if value.fract() == 0.0 && value >= i64::MIN as f64 && value <= i64::MAX as f64 {
        return Value::from(value as i64);
    }
    Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Ordering over values.
///
/// Values fall into classes ordered
/// `null < bool < numeric < string < array < object`, where "numeric" holds
/// numbers and numeric strings (`"10"`, `" 2.5"`) alike and compares them by
/// value. Other strings compare lexicographically; arrays and objects by
/// length, then element-wise. Values of different classes never compare by
/// content, which keeps the ordering transitive.
pub fn compare(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => x.len().cmp(&y.len()).then_with(|| {
            x.iter()
                .zip(y.iter())
                .map(|(l, r)| compare(l, r))
                .find(|ord| *ord != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        }),
        (Value::Object(x), Value::Object(y)) => x.len().cmp(&y.len()).then_with(|| {
            x.values()
                .zip(y.values())
                .map(|(l, r)| compare(l, r))
                .find(|ord| *ord != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        }),
        _ => match (numeric(a), numeric(b)) {
            (Some(x), Some(y)) => compare_numbers(&x, &y),
            (x, y) => match rank(a, x.is_some()).cmp(&rank(b, y.is_some())) {
                Ordering::Equal => match (a, b) {
                    (Value::String(x), Value::String(y)) => x.cmp(y),
                    _ => Ordering::Equal,
                },
                ord => ord,
            },
        },
    }
}

/// Reads a nested value by dotted path (`"address.city"`, `"tags.0"`).
///
/// An empty path returns the value itself. Missing segments yield `null`.
pub fn data_get(value: &Value, path: &str) -> Value {
    if path.is_empty() {
        return value.clone();
    }

    let mut current = value;
    for segment in path.split('.') {
        let next = match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        match next {
            Some(value) => current = value,
            None => return Value::Null,
        }
    }
    current.clone()
}

enum Numeric {
    Int(i64),
    Float(f64),
}

fn numeric(value: &Value) -> Option<Numeric> {
    match value {
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(Numeric::Int(i)),
            None => n.as_f64().map(Numeric::Float),
        },
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            match trimmed.parse::<i64>() {
                Ok(i) => Some(Numeric::Int(i)),
                Err(_) => trimmed
                    .parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(Numeric::Float),
            }
        }
        _ => None,
    }
}

fn compare_numbers(a: &Numeric, b: &Numeric) -> Ordering {
    match (a, b) {
        (Numeric::Int(x), Numeric::Int(y)) => x.cmp(y),
        (Numeric::Int(x), Numeric::Float(y)) => compare_int_float(*x, *y),
        (Numeric::Float(x), Numeric::Int(y)) => compare_int_float(*y, *x).reverse(),
        // finite on both sides; -0.0 equals 0.0
        (Numeric::Float(x), Numeric::Float(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
    }
}

/// Exact comparison; going through `f64` would merge large neighbouring
/// integers.
fn compare_int_float(i: i64, f: f64) -> Ordering {
    const TWO_POW_63: f64 = 9_223_372_036_854_775_808.0;
    if f >= TWO_POW_63 {
        return Ordering::Less;
    }
    if f < -TWO_POW_63 {
        return Ordering::Greater;
    }
    let floor = f.floor();
    match i.cmp(&(floor as i64)) {
        Ordering::Equal if f > floor => Ordering::Less,
        ord => ord,
    }
}

fn rank(value: &Value, is_numeric: bool) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        _ if is_numeric => 2,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn falsy_values() {
        for value in [
            json!(null),
            json!(false),
            json!(0),
            json!(0.0),
            json!(""),
            json!("0"),
            json!([]),
            json!({}),
        ] {
            assert!(!is_truthy(&value), "{value} should be falsy");
        }
        for value in [json!(true), json!(1), json!("a"), json!([0]), json!({"a": null})] {
            assert!(is_truthy(&value), "{value} should be truthy");
        }
    }

    #[test]
    fn numeric_strings_compare_as_numbers() {
        assert_eq!(compare(&json!("10"), &json!(9)), Ordering::Greater);
        assert_eq!(compare(&json!(2), &json!(2.0)), Ordering::Equal);
        assert_eq!(compare(&json!("b"), &json!("a")), Ordering::Greater);
    }

    #[test]
    fn numeric_strings_sit_with_numbers() {
        // "10a" is a plain string, so it follows every numeric value
        assert_eq!(compare(&json!(5), &json!("10a")), Ordering::Less);
        assert_eq!(compare(&json!("2"), &json!("10a")), Ordering::Less);
        assert_eq!(compare(&json!("2"), &json!(5)), Ordering::Less);
        assert_eq!(compare(&json!("inf"), &json!(1)), Ordering::Greater);
        assert_eq!(compare(&json!("NaN"), &json!("a")), Ordering::Less);
    }

    #[test]
    fn large_integers_compare_exactly_with_floats() {
        let big = 9_007_199_254_740_993_i64;
        assert_eq!(compare(&json!(big), &json!(9_007_199_254_740_992.0)), Ordering::Greater);
        assert_eq!(compare(&json!(i64::MAX), &json!(1e19)), Ordering::Less);
        assert_eq!(compare(&json!(-3), &json!(-2.5)), Ordering::Less);
        assert_eq!(compare(&json!(2.5), &json!(2)), Ordering::Greater);
    }

    #[test]
    fn ordering_is_transitive_over_mixed_values() {
        let values = [
            json!(null),
            json!(false),
            json!(true),
            json!(0),
            json!("0"),
            json!("0a"),
            json!(1),
            json!(1.5),
            json!("3"),
            json!("1a"),
            json!("10a"),
            json!("2"),
            json!(5),
            json!(" 7 "),
            json!("abc"),
            json!(""),
            json!([1]),
            json!(["2"]),
            json!({"a": 1}),
        ];
        for a in &values {
            assert_eq!(compare(a, a), Ordering::Equal, "{a} vs itself");
            for b in &values {
                assert_eq!(compare(a, b), compare(b, a).reverse(), "{a} vs {b}");
                for c in &values {
                    if compare(a, b) != Ordering::Greater && compare(b, c) != Ordering::Greater {
                        assert_ne!(compare(a, c), Ordering::Greater, "{a} <= {b} <= {c}");
                    }
                }
            }
        }
    }

    #[test]
    fn mixed_kinds_use_rank() {
        assert_eq!(compare(&json!(null), &json!(false)), Ordering::Less);
        assert_eq!(compare(&json!(3), &json!("abc")), Ordering::Less);
        assert_eq!(compare(&json!([1]), &json!({"a": 1})), Ordering::Less);
    }

    #[test]
    fn data_get_walks_objects_and_arrays() {
        let value = json!({"user": {"tags": ["a", "b"], "name": "ann"}});
        assert_eq!(data_get(&value, "user.name"), json!("ann"));
        assert_eq!(data_get(&value, "user.tags.1"), json!("b"));
        assert_eq!(data_get(&value, "user.missing"), json!(null));
        assert_eq!(data_get(&value, ""), value);
    }

    #[test]
    fn number_keeps_integers() {
        assert_eq!(number(4.0), json!(4));
        assert_eq!(number(2.5), json!(2.5));
        assert_eq!(to_number(&json!("3.5")), 3.5);
        assert_eq!(to_number(&json!(true)), 1.0);
        assert_eq!(to_number(&json!("abc")), 0.0);
    }
}
