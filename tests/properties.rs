//! Property tests for fingerprints, serializer round-trips, and parameter
//! updates.

use std::collections::BTreeMap;

use proptest::prelude::*;
use tunable::core::Snapshot;
use tunable::serial::{self, fingerprint, Format};
use tunable::{Parameter, ParameterRegistry, Value, ValueType};

fn name() -> impl Strategy<Value = String> {
    "[A-Z][a-zA-Z0-9]{0,8}(::[A-Z][a-zA-Z0-9]{0,8})?"
}

fn text() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_.]([a-zA-Z0-9_. -]{0,14}[a-zA-Z0-9_.])?"
}

fn value() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        (-1.0e9f64..1.0e9).prop_map(Value::Float),
        text().prop_map(Value::Str),
        prop::collection::vec(any::<u8>(), 0..12).prop_map(Value::Bytes),
    ]
}

fn values() -> impl Strategy<Value = BTreeMap<String, Value>> {
    prop::collection::btree_map(name(), value(), 0..8)
}

proptest! {
    #[test]
    fn test_fingerprint_ignores_insertion_order(
        entries in values(),
        seed in any::<u64>(),
    ) {
        let forward: Vec<_> = entries.clone().into_iter().collect();
        let mut shuffled = forward.clone();
        if !shuffled.is_empty() {
            let len = shuffled.len();
            shuffled.rotate_left((seed as usize) % len);
            shuffled.reverse();
        }

        let a = fingerprint(&Snapshot::from_values(forward), false);
        let b = fingerprint(&Snapshot::from_values(shuffled), false);
        prop_assert_eq!(a, b);
    }

    #[test]
    fn test_fingerprint_sees_value_changes(
        entries in prop::collection::btree_map(name(), value(), 1..8),
        pick in any::<prop::sample::Index>(),
        replacement in value(),
    ) {
        let key = pick.get(&entries.keys().cloned().collect::<Vec<_>>()).clone();
        prop_assume!(entries[&key] != replacement);

        let mut changed = entries.clone();
        changed.insert(key, replacement);

        let a = fingerprint(&Snapshot::from_values(entries), false);
        let b = fingerprint(&Snapshot::from_values(changed), false);
        prop_assert_ne!(a, b);
    }

    #[test]
    fn test_structured_formats_roundtrip(entries in values()) {
        let snapshot = Snapshot::from_values(entries.clone());

        for format in [Format::Json, Format::Yaml, Format::Xml, Format::Der] {
            let bytes = serial::to_bytes(&snapshot, format).unwrap();
            let decoded: BTreeMap<String, Value> =
                serial::from_bytes(&bytes, format).unwrap().into_iter().collect();
            prop_assert_eq!(&decoded, &entries, "format {}", format);
        }
    }

    #[test]
    fn test_conf_roundtrip_through_registry(
        entries in prop::collection::btree_map(name(), value(), 0..8),
    ) {
        // Conf is untyped, so the declared parameter types restore the values.
        let declare = || {
            let mut registry = ParameterRegistry::new().with_entry_namespace("app");
            for (name, value) in &entries {
                let (module, short) = match name.rsplit_once("::") {
                    Some((module, short)) => (format!("app::{}", module), short.to_string()),
                    None => ("app".to_string(), name.clone()),
                };
                registry
                    .register(
                        Parameter::new(module, short)
                            .with_default(value.clone())
                            .with_type(value.value_type()),
                    )
                    .unwrap();
            }
            registry
        };

        let saved = declare();
        let conf = saved.serialization(Format::Conf).unwrap();

        let mut restored = declare();
        restored.reset_all().unwrap();
        restored.load(serial::from_bytes(&conf, Format::Conf).unwrap()).unwrap();

        prop_assert_eq!(restored.current_snapshot(), saved.current_snapshot());
    }

    #[test]
    fn test_set_is_idempotent(raw in "-?[0-9]{1,6}(\\.[0-9]{1,4})?") {
        let mut registry = ParameterRegistry::new();
        registry
            .register(
                Parameter::new("app", "Otsu")
                    .with_default("1.0")
                    .with_type(ValueType::Float),
            )
            .unwrap();

        let once = registry.set("Otsu", raw.as_str()).unwrap().clone();
        let twice = registry.set("Otsu", raw.as_str()).unwrap().clone();
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn test_reset_restores_coerced_default(default in -100_000i64..100_000, raw in 0i64..10) {
        let mut registry = ParameterRegistry::new();
        registry
            .register(
                Parameter::new("app", "Level")
                    .with_default(default.to_string())
                    .with_type(ValueType::Int),
            )
            .unwrap();

        registry.set("Level", raw).unwrap();
        prop_assert_eq!(registry.reset("Level").unwrap(), &Value::Int(default));
    }
}
