//! JSON and YAML documents.
//!
//! Written as
//!
//! ```json
//! { "version": 1, "tunables": { "Otsu": { "floatValue": 14.0 } } }
//! ```
//!
//! On read, a value may also be a plain scalar (`"Otsu": 14.0`) and the
//! `version`/`tunables` wrapper may be left out entirely.

use std::collections::BTreeMap;
use std::io::Write;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::core::errors::TunableError;
use crate::core::snapshot::Snapshot;
use crate::core::value::{Value, ValueType};
use crate::serial::{RawMapping, Serializer, SCHEMA_VERSION};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Scalar {
    fn from_value(value: &Value) -> Scalar {
        match value {
            Value::Bool(b) => Scalar::Bool(*b),
            Value::Int(i) => Scalar::Int(*i),
            // Neither format has a portable spelling for NaN or infinity.
            Value::Float(x) if !x.is_finite() => Scalar::Str(format!("{:?}", x)),
            Value::Float(x) => Scalar::Float(*x),
            Value::Str(s) => Scalar::Str(s.clone()),
            Value::Bytes(b) => Scalar::Str(hex::encode(b)),
        }
    }

    fn into_value(self) -> Value {
        match self {
            Scalar::Bool(b) => Value::Bool(b),
            Scalar::Int(i) => Value::Int(i),
            Scalar::Float(x) => Value::Float(x),
            Scalar::Str(s) => Value::Str(s),
        }
    }
}

#[derive(Serialize)]
struct Outgoing<'a> {
    version: i64,
    tunables: IndexMap<&'a str, BTreeMap<&'static str, Scalar>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Incoming {
    Versioned(Versioned),
    Flat(IndexMap<String, Entry>),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Versioned {
    version: Option<i64>,
    tunables: IndexMap<String, Entry>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Entry {
    Tagged(BTreeMap<String, Scalar>),
    Plain(Scalar),
}

fn outgoing(snapshot: &Snapshot) -> Outgoing<'_> {
    let tunables = snapshot
        .entries()
        .map(|entry| {
            let mut tagged = BTreeMap::new();
            tagged.insert(entry.value_type().tag(), Scalar::from_value(&entry.value));
            (entry.name.as_str(), tagged)
        })
        .collect();

    Outgoing {
        version: SCHEMA_VERSION,
        tunables,
    }
}

fn tagged_value(format: &str, name: &str, tag: &str, scalar: Scalar) -> Result<Value, TunableError> {
    let ty = ValueType::from_tag(tag)
        .ok_or_else(|| TunableError::malformed(format, format!("unknown tag `{}` on `{}`", tag, name)))?;

    let value = match (ty, scalar) {
        (ValueType::Bool, Scalar::Bool(b)) => Value::Bool(b),
        (ValueType::Int, Scalar::Int(i)) => Value::Int(i),
        (ValueType::Float, Scalar::Float(x)) => Value::Float(x),
        (ValueType::Float, Scalar::Int(i)) => Value::Float(i as f64),
        (ValueType::Float, Scalar::Str(s)) => Value::Float(s.parse().map_err(|_| {
            TunableError::malformed(format, format!("`{}` is not a float in `{}`", s, name))
        })?),
        (ValueType::Str, Scalar::Str(s)) => Value::Str(s),
        (ValueType::Bytes, Scalar::Str(s)) => Value::Bytes(hex::decode(&s).map_err(|e| {
            TunableError::malformed(format, format!("bad hex in `{}`: {}", name, e))
        })?),
        (ty, scalar) => {
            return Err(TunableError::malformed(
                format,
                format!("`{}` is tagged {} but holds {:?}", name, ty.tag(), scalar),
            ))
        }
    };
    Ok(value)
}

fn into_mapping(format: &str, incoming: Incoming) -> Result<RawMapping, TunableError> {
    let entries = match incoming {
        Incoming::Versioned(doc) => {
            if let Some(found) = doc.version {
                if found != SCHEMA_VERSION {
                    return Err(TunableError::SchemaVersionMismatch {
                        expected: SCHEMA_VERSION,
                        found,
                    });
                }
            }
            doc.tunables
        }
        Incoming::Flat(entries) => entries,
    };

    let mut mapping = RawMapping::new();
    for (name, entry) in entries {
        let value = match entry {
            Entry::Plain(scalar) => scalar.into_value(),
            Entry::Tagged(tagged) => {
                if tagged.len() != 1 {
                    return Err(TunableError::malformed(
                        format,
                        format!("`{}` must carry exactly one type tag", name),
                    ));
                }
                let (tag, scalar) = tagged
                    .into_iter()
                    .next()
                    .ok_or_else(|| TunableError::malformed(format, "empty entry"))?;
                tagged_value(format, &name, &tag, scalar)?
            }
        };
        mapping.insert(name, value);
    }
    Ok(mapping)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn serialize(&self, snapshot: &Snapshot, out: &mut dyn Write) -> Result<(), TunableError> {
        serde_json::to_writer_pretty(&mut *out, &outgoing(snapshot))
            .map_err(|e| TunableError::malformed("json", e))?;
        writeln!(out)?;
        Ok(())
    }

    fn deserialize(&self, input: &[u8]) -> Result<RawMapping, TunableError> {
        let incoming: Incoming =
            serde_json::from_slice(input).map_err(|e| TunableError::malformed("json", e))?;
        into_mapping("json", incoming)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct YamlSerializer;

impl Serializer for YamlSerializer {
    fn serialize(&self, snapshot: &Snapshot, out: &mut dyn Write) -> Result<(), TunableError> {
        serde_yaml::to_writer(&mut *out, &outgoing(snapshot))
            .map_err(|e| TunableError::malformed("yaml", e))
    }

    fn deserialize(&self, input: &[u8]) -> Result<RawMapping, TunableError> {
        let incoming: Incoming =
            serde_yaml::from_slice(input).map_err(|e| TunableError::malformed("yaml", e))?;
        into_mapping("yaml", incoming)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serial::Format;

    fn sample() -> Snapshot {
        Snapshot::from_values([
            ("Enabled", Value::Bool(true)),
            ("Otsu", Value::Float(1.0)),
            ("Threshold", Value::Int(-3)),
            ("Label", Value::from("12")),
            ("Key", Value::Bytes(vec![0, 255])),
        ])
    }

    #[test]
    fn test_json_layout() {
        let bytes = crate::serial::to_bytes(&Snapshot::from_values([("Otsu", 14.0)]), Format::Json)
            .unwrap();
        let doc: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            doc,
            serde_json::json!({"version": 1, "tunables": {"Otsu": {"floatValue": 14.0}}})
        );
    }

    #[test]
    fn test_roundtrip_keeps_types() {
        let snapshot = sample();
        for format in [Format::Json, Format::Yaml] {
            let bytes = crate::serial::to_bytes(&snapshot, format).unwrap();
            let mapping = crate::serial::from_bytes(&bytes, format).unwrap();
            assert_eq!(mapping["Otsu"], Value::Float(1.0), "{format}");
            assert_eq!(mapping["Label"], Value::from("12"), "{format}");
            assert_eq!(mapping["Key"], Value::Bytes(vec![0, 255]), "{format}");
            assert_eq!(mapping.len(), snapshot.len());
        }
    }

    #[test]
    fn test_plain_values_accepted() {
        let mapping = JsonSerializer
            .deserialize(br#"{"Otsu": 17, "Name": "x", "Enabled": false}"#)
            .unwrap();
        assert_eq!(mapping["Otsu"], Value::Int(17));
        assert_eq!(mapping["Name"], Value::from("x"));
        assert_eq!(mapping["Enabled"], Value::Bool(false));

        let mapping = YamlSerializer
            .deserialize(b"version: 1\ntunables:\n  Otsu: 2.5\n  Mode: {intValue: 3}\n")
            .unwrap();
        assert_eq!(mapping["Otsu"], Value::Float(2.5));
        assert_eq!(mapping["Mode"], Value::Int(3));
    }

    #[test]
    fn test_float_tag_accepts_integer() {
        let mapping = JsonSerializer
            .deserialize(br#"{"version": 1, "tunables": {"Otsu": {"floatValue": 17}}}"#)
            .unwrap();
        assert_eq!(mapping["Otsu"], Value::Float(17.0));
    }

    #[test]
    fn test_non_finite_float() {
        let snapshot = Snapshot::from_values([("Limit", f64::INFINITY)]);
        let bytes = crate::serial::to_bytes(&snapshot, Format::Json).unwrap();
        let mapping = JsonSerializer.deserialize(&bytes).unwrap();
        assert_eq!(mapping["Limit"], Value::Float(f64::INFINITY));
    }

    #[test]
    fn test_version_checked() {
        let err = JsonSerializer
            .deserialize(br#"{"version": 2, "tunables": {}}"#)
            .unwrap_err();
        assert!(matches!(
            err,
            TunableError::SchemaVersionMismatch {
                expected: 1,
                found: 2
            }
        ));
    }

    #[test]
    fn test_tag_mismatch() {
        assert!(JsonSerializer
            .deserialize(br#"{"tunables": {"Otsu": {"boolValue": 3}}}"#)
            .is_err());
        assert!(JsonSerializer
            .deserialize(br#"{"tunables": {"Otsu": {"colorValue": 3}}}"#)
            .is_err());
    }
}
