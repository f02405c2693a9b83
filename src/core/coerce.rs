//! Value coercion and validation.
//!
//! Raw input arrives as text (flags, conf files) or as an already typed
//! scalar (structured documents, programmatic calls). [`coerce`] turns it into
//! the declared type; [`validate`] then applies the range and predicate.

use std::fmt;
use std::sync::Arc;

use crate::core::errors::TunableError;
use crate::core::value::{Value, ValueType};

/// Custom validator attached to a parameter.
pub type Predicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Parse a boolean word.
///
/// Accepts `true/yes/t/y/1` and `false/no/f/n/0`, case-insensitive.
pub fn parse_bool(input: &str) -> Result<bool, TunableError> {
    match input.to_lowercase().as_str() {
        "true" | "yes" | "t" | "y" | "1" => Ok(true),
        "false" | "no" | "f" | "n" | "0" => Ok(false),
        _ => Err(coercion_error(input, ValueType::Bool)),
    }
}

fn coercion_error(input: impl fmt::Display, target: ValueType) -> TunableError {
    TunableError::Coercion {
        input: input.to_string(),
        target: target.to_string(),
    }
}

/// Convert a raw value into `target`.
pub fn coerce(raw: &Value, target: ValueType) -> Result<Value, TunableError> {
    if raw.value_type() == target {
        return Ok(raw.clone());
    }

    match (target, raw) {
        (ValueType::Bool, Value::Str(s)) => parse_bool(s).map(Value::Bool),
        (ValueType::Bool, Value::Int(i)) => Ok(Value::Bool(*i != 0)),
        (ValueType::Bool, Value::Float(x)) => Ok(Value::Bool(*x != 0.0)),
        (ValueType::Bool, Value::Bytes(b)) => Ok(Value::Bool(!b.is_empty())),

        (ValueType::Int, Value::Str(s)) => s
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| coercion_error(s, target)),
        (ValueType::Int, Value::Bool(b)) => Ok(Value::Int(i64::from(*b))),
        (ValueType::Int, Value::Float(x)) => {
            let truncated = x.trunc();
            if truncated.is_finite()
                && truncated >= i64::MIN as f64
                && truncated <= i64::MAX as f64
            {
                Ok(Value::Int(truncated as i64))
            } else {
                Err(coercion_error(x, target))
            }
        }

        (ValueType::Float, Value::Str(s)) => s
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| coercion_error(s, target)),
        (ValueType::Float, Value::Int(i)) => Ok(Value::Float(*i as f64)),
        (ValueType::Float, Value::Bool(b)) => Ok(Value::Float(if *b { 1.0 } else { 0.0 })),

        (ValueType::Str, other) => Ok(Value::Str(other.to_string())),

        (ValueType::Bytes, Value::Str(s)) => hex::decode(s.trim())
            .map(Value::Bytes)
            .map_err(|_| coercion_error(s, target)),

        (_, other) => Err(coercion_error(other, target)),
    }
}

/// Allowed values of a parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueRange {
    /// Integer sequence `start, start + step, ..` stopping before `stop`.
    ///
    /// `stop` itself is also accepted.
    HalfOpen { start: i64, stop: i64, step: i64 },
    /// Closed numeric interval.
    Inclusive { min: f64, max: f64 },
    /// Explicit list of allowed values.
    OneOf(Vec<Value>),
}

impl ValueRange {
    /// `start..stop` with step 1.
    pub fn half_open(start: i64, stop: i64) -> Self {
        ValueRange::HalfOpen {
            start,
            stop,
            step: 1,
        }
    }

    /// `start..stop` with an explicit step. A zero step is treated as 1.
    pub fn stepped(start: i64, stop: i64, step: i64) -> Self {
        ValueRange::HalfOpen {
            start,
            stop,
            step: if step == 0 { 1 } else { step },
        }
    }

    pub fn inclusive(min: f64, max: f64) -> Self {
        ValueRange::Inclusive { min, max }
    }

    pub fn one_of(values: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        ValueRange::OneOf(values.into_iter().map(Into::into).collect())
    }

    /// Check membership of `value`.
    pub fn contains(&self, value: &Value) -> bool {
        match self {
            ValueRange::HalfOpen { start, stop, step } => {
                let Some(n) = integral(value) else {
                    return false;
                };
                if n == *stop {
                    return true;
                }
                let (start, stop, step) =
                    (i128::from(*start), i128::from(*stop), i128::from(*step));
                let n = i128::from(n);
                let inside = if step > 0 {
                    start <= n && n < stop
                } else {
                    stop < n && n <= start
                };
                inside && (n - start) % step == 0
            }
            ValueRange::Inclusive { min, max } => value
                .as_float()
                .map(|x| *min <= x && x <= *max)
                .unwrap_or(false),
            ValueRange::OneOf(values) => values.iter().any(|v| v == value),
        }
    }
}

/// The exact integer held by an `Int`, or by a whole `Float` inside the
/// `i64` range.
fn integral(value: &Value) -> Option<i64> {
    // 2^63
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    match *value {
        Value::Int(n) => Some(n),
        Value::Float(x) if x.fract() == 0.0 && (-LIMIT..LIMIT).contains(&x) => Some(x as i64),
        _ => None,
    }
}

impl fmt::Display for ValueRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueRange::HalfOpen { start, stop, step } if *step == 1 => {
                write!(f, "{}..{}", start, stop)
            }
            ValueRange::HalfOpen { start, stop, step } => {
                write!(f, "{}..{} step {}", start, stop, step)
            }
            ValueRange::Inclusive { min, max } => write!(f, "{:?}..={:?}", min, max),
            ValueRange::OneOf(values) => {
                let items: Vec<String> = values.iter().map(ToString::to_string).collect();
                write!(f, "{{{}}}", items.join(", "))
            }
        }
    }
}

/// Apply range and predicate checks to an already coerced value.
pub fn validate(
    name: &str,
    value: &Value,
    range: Option<&ValueRange>,
    predicate: Option<&Predicate>,
) -> Result<(), TunableError> {
    if let Some(range) = range {
        if !range.contains(value) {
            return Err(TunableError::Range {
                name: name.to_string(),
                value: value.to_string(),
                range: range.to_string(),
            });
        }
    }

    if let Some(test) = predicate {
        if !test(value) {
            return Err(TunableError::Predicate {
                name: name.to_string(),
                value: value.to_string(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_words() {
        for word in ["true", "YES", "t", "Y", "1"] {
            assert!(parse_bool(word).unwrap(), "{word}");
        }
        for word in ["false", "No", "F", "n", "0"] {
            assert!(!parse_bool(word).unwrap(), "{word}");
        }
        assert!(matches!(
            parse_bool("maybe"),
            Err(TunableError::Coercion { .. })
        ));
    }

    #[test]
    fn test_coerce_numeric_text() {
        assert_eq!(
            coerce(&Value::from("14.0"), ValueType::Float).unwrap(),
            Value::Float(14.0)
        );
        assert_eq!(
            coerce(&Value::from("17"), ValueType::Float).unwrap(),
            Value::Float(17.0)
        );
        assert_eq!(
            coerce(&Value::from(" 42 "), ValueType::Int).unwrap(),
            Value::Int(42)
        );
    }

    #[test]
    fn test_coerce_failure_carries_input_and_target() {
        let err = coerce(&Value::from("abc"), ValueType::Int).unwrap_err();
        match err {
            TunableError::Coercion { input, target } => {
                assert_eq!(input, "abc");
                assert_eq!(target, "int");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_coerce_cross_type() {
        assert_eq!(
            coerce(&Value::Float(3.9), ValueType::Int).unwrap(),
            Value::Int(3)
        );
        assert_eq!(
            coerce(&Value::Int(0), ValueType::Bool).unwrap(),
            Value::Bool(false)
        );
        assert_eq!(
            coerce(&Value::Float(2.5), ValueType::Str).unwrap(),
            Value::from("2.5")
        );
        assert_eq!(
            coerce(&Value::from("00ff"), ValueType::Bytes).unwrap(),
            Value::Bytes(vec![0x00, 0xff])
        );
        assert!(coerce(&Value::Bytes(vec![1]), ValueType::Int).is_err());
        assert!(coerce(&Value::Float(f64::NAN), ValueType::Int).is_err());
    }

    #[test]
    fn test_half_open_accepts_stop_once() {
        let range = ValueRange::half_open(0, 10);
        assert!(range.contains(&Value::Int(0)));
        assert!(range.contains(&Value::Int(9)));
        assert!(range.contains(&Value::Int(10)));
        assert!(!range.contains(&Value::Int(11)));
        assert!(!range.contains(&Value::Int(-1)));
        assert!(range.contains(&Value::Float(5.0)));
        assert!(!range.contains(&Value::Float(5.5)));
    }

    #[test]
    fn test_half_open_compares_large_ints_exactly() {
        let range = ValueRange::half_open(0, i64::MAX - 1);
        assert!(range.contains(&Value::Int(i64::MAX - 1)));
        assert!(range.contains(&Value::Int(i64::MAX - 2)));
        assert!(!range.contains(&Value::Int(i64::MAX)));

        let range = ValueRange::half_open(i64::MIN + 1, 0);
        assert!(!range.contains(&Value::Int(i64::MIN)));
        assert!(range.contains(&Value::Int(i64::MIN + 1)));

        assert!(!range.contains(&Value::Float(f64::NAN)));
        assert!(!range.contains(&Value::Float(f64::NEG_INFINITY)));
        assert!(!range.contains(&Value::Float(-1.0e19)));
        assert!(!range.contains(&Value::Bool(false)));
    }

    #[test]
    fn test_stepped_range() {
        let range = ValueRange::stepped(0, 10, 3);
        assert!(range.contains(&Value::Int(6)));
        assert!(!range.contains(&Value::Int(7)));
        assert!(range.contains(&Value::Int(10)));

        let down = ValueRange::stepped(10, 0, -2);
        assert!(down.contains(&Value::Int(8)));
        assert!(!down.contains(&Value::Int(7)));
    }

    #[test]
    fn test_validate_range_and_predicate() {
        let range = ValueRange::inclusive(0.0, 1.0);
        assert!(validate("p", &Value::Float(0.5), Some(&range), None).is_ok());
        assert!(matches!(
            validate("p", &Value::Float(1.5), Some(&range), None),
            Err(TunableError::Range { .. })
        ));

        let even: Predicate = Arc::new(|v| v.as_int().is_some_and(|i| i % 2 == 0));
        assert!(validate("p", &Value::Int(4), None, Some(&even)).is_ok());
        assert!(matches!(
            validate("p", &Value::Int(3), None, Some(&even)),
            Err(TunableError::Predicate { .. })
        ));
    }

    #[test]
    fn test_one_of() {
        let range = ValueRange::one_of(["fast", "slow"]);
        assert!(range.contains(&Value::from("fast")));
        assert!(!range.contains(&Value::from("medium")));
        assert_eq!(range.to_string(), "{fast, slow}");
    }
}
