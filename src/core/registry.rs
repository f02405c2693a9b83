//! Parameter registry.
//!
//! Owns every declared [`Parameter`] and indexes it under three names:
//!
//! - **long**: `module::path::Name`
//! - **semilong**: the long name with the entry namespace stripped; this is
//!   the key used in every serialized document
//! - **short**: `Name`, accepted only when unique

use std::collections::BTreeMap;

use crate::core::errors::TunableError;
use crate::core::parameter::{Parameter, ParameterDecl};
use crate::core::snapshot::{Snapshot, SnapshotEntry};
use crate::core::value::{FromValue, Value};
use crate::serial::{self, Format};

/// Registry of all declared parameters.
#[derive(Debug, Default)]
pub struct ParameterRegistry {
    parameters: BTreeMap<String, Parameter>,
    entry_namespace: Option<String>,
}

impl ParameterRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        ParameterRegistry {
            parameters: BTreeMap::new(),
            entry_namespace: None,
        }
    }

    /// Create a registry holding every parameter declared with
    /// [`declare_tunable!`](crate::declare_tunable).
    pub fn discover() -> Result<Self, TunableError> {
        let mut registry = ParameterRegistry::new();
        for decl in inventory::iter::<ParameterDecl> {
            registry.register((decl.build)())?;
        }
        tracing::debug!("discovered {} tunables", registry.len());
        Ok(registry)
    }

    /// Treat `namespace` as anonymous: `namespace::Name` is also known as
    /// `Name`, and serializes under that name.
    ///
    /// A binary typically passes its own `module_path!()`.
    pub fn with_entry_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.entry_namespace = Some(namespace.into());
        self
    }

    /// Register a parameter and apply its default.
    ///
    /// Registering a long name twice is a no-op; the first declaration wins.
    pub fn register(&mut self, mut parameter: Parameter) -> Result<(), TunableError> {
        let long = parameter.long_name();
        if self.parameters.contains_key(&long) {
            tracing::trace!("tunable {} already registered", long);
            return Ok(());
        }

        if parameter.default().is_some() {
            parameter.reset()?;
        }

        self.parameters.insert(long, parameter);
        Ok(())
    }

    /// Strip the entry namespace from a long name.
    pub fn semilong_name(&self, long: &str) -> String {
        if let Some(ns) = &self.entry_namespace {
            if let Some(rest) = long.strip_prefix(ns.as_str()) {
                if let Some(rest) = rest.strip_prefix("::") {
                    return rest.to_string();
                }
            }
        }
        long.to_string()
    }

    /// Map any accepted name to the long name.
    fn lookup(&self, name: &str) -> Result<String, TunableError> {
        if self.parameters.contains_key(name) {
            return Ok(name.to_string());
        }

        if let Some(long) = self
            .parameters
            .keys()
            .find(|long| self.semilong_name(long) == name)
        {
            return Ok(long.clone());
        }

        let matches: Vec<&String> = self
            .parameters
            .iter()
            .filter(|(_, p)| p.name() == name)
            .map(|(long, _)| long)
            .collect();

        match matches.as_slice() {
            [] => Err(TunableError::parameter_not_found(name)),
            [long] => Ok((*long).clone()),
            _ => Err(TunableError::Ambiguous {
                name: name.to_string(),
                candidates: matches.into_iter().cloned().collect(),
            }),
        }
    }

    /// Get a parameter by long, semilong, or short name.
    pub fn get(&self, name: &str) -> Result<&Parameter, TunableError> {
        let long = self.lookup(name)?;
        self.parameters
            .get(&long)
            .ok_or_else(|| TunableError::parameter_not_found(name))
    }

    fn get_mut(&mut self, name: &str) -> Result<&mut Parameter, TunableError> {
        let long = self.lookup(name)?;
        self.parameters
            .get_mut(&long)
            .ok_or_else(|| TunableError::parameter_not_found(name))
    }

    /// Current value of a parameter.
    pub fn value(&self, name: &str) -> Result<&Value, TunableError> {
        let parameter = self.get(name)?;
        parameter.value().ok_or_else(|| TunableError::Unset {
            name: parameter.long_name(),
        })
    }

    /// Current value converted to a Rust type.
    pub fn value_as<T: FromValue>(&self, name: &str) -> Result<T, TunableError> {
        let value = self.value(name)?;
        T::from_value(value).ok_or_else(|| TunableError::Coercion {
            input: value.to_string(),
            target: std::any::type_name::<T>().to_string(),
        })
    }

    /// Coerce, validate, and store a raw value.
    pub fn set(&mut self, name: &str, raw: impl Into<Value>) -> Result<&Value, TunableError> {
        let parameter = self.get_mut(name)?;
        let value = parameter.set(raw)?;
        tracing::debug!("set tunable {} = {}", name, value);
        Ok(value)
    }

    /// Re-apply one parameter's default.
    pub fn reset(&mut self, name: &str) -> Result<&Value, TunableError> {
        self.get_mut(name)?.reset()
    }

    /// Re-apply every default. Parameters without a default become unset.
    pub fn reset_all(&mut self) -> Result<(), TunableError> {
        for parameter in self.parameters.values_mut() {
            match parameter.reset() {
                Ok(_) | Err(TunableError::Unset { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Reset everything, then apply `mapping` in iteration order.
    ///
    /// # Partial application
    ///
    /// Loading is not atomic. The first invalid key aborts the load with its
    /// error, and every key applied before it stays applied. Callers needing
    /// all-or-nothing semantics must validate against a scratch registry
    /// first.
    pub fn load<K, V>(&mut self, mapping: impl IntoIterator<Item = (K, V)>) -> Result<(), TunableError>
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        self.reset_all()?;

        let mut applied = 0usize;
        for (name, raw) in mapping {
            self.set(name.as_ref(), raw)?;
            applied += 1;
        }

        tracing::debug!("loaded {} tunables", applied);
        Ok(())
    }

    /// Long names of all parameters.
    pub fn names(&self) -> Vec<String> {
        self.parameters.keys().cloned().collect()
    }

    /// Parameters in long-name order.
    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.values()
    }

    /// Snapshot of every set parameter, keyed by semilong name.
    pub fn snapshot(&self) -> Snapshot {
        let mut snapshot = Snapshot::new();
        for (long, parameter) in &self.parameters {
            let Some(value) = parameter.value() else {
                tracing::debug!("skipping unset tunable {}", long);
                continue;
            };
            snapshot.insert(SnapshotEntry {
                name: self.semilong_name(long),
                value: value.clone(),
                documentation: parameter.documentation().to_string(),
                hash: parameter.hash(),
            });
        }
        snapshot
    }

    /// Semilong name -> current value, in canonical order.
    pub fn current_snapshot(&self) -> BTreeMap<String, Value> {
        self.snapshot().values()
    }

    /// Render the current state in `format`.
    pub fn serialization(&self, format: Format) -> Result<Vec<u8>, TunableError> {
        serial::to_bytes(&self.snapshot(), format)
    }

    /// Fingerprint of the parameters that participate in hashing.
    pub fn fingerprint(&self) -> String {
        serial::fingerprint::fingerprint(&self.snapshot(), false)
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_ok()
    }
}
