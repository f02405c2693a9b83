//! Typed configuration parameters ("tunables").
//!
//! A [`Parameter`] is a named cell with a default, an optional declared
//! type, an optional range, an optional predicate, and documentation.
//! Parameters are normally declared statically with [`declare_tunable!`] and
//! collected into a [`ParameterRegistry`](crate::core::registry::ParameterRegistry)
//! at startup.

use std::fmt;
use std::sync::Arc;

use crate::core::coerce::{coerce, validate, Predicate, ValueRange};
use crate::core::errors::TunableError;
use crate::core::value::{Value, ValueType};

/// A named, typed, validated configuration cell.
#[derive(Clone)]
pub struct Parameter {
    module: String,
    name: String,
    value_type: Option<ValueType>,
    infer_type: bool,
    default: Option<Value>,
    value: Option<Value>,
    range: Option<ValueRange>,
    predicate: Option<Predicate>,
    documentation: String,
    hash: bool,
}

impl Parameter {
    /// Create a parameter named `name` inside the module path `module`.
    ///
    /// `module` uses Rust path syntax (`crate::a::b`) and may be empty.
    pub fn new(module: impl Into<String>, name: impl Into<String>) -> Self {
        Parameter {
            module: module.into(),
            name: name.into(),
            value_type: None,
            infer_type: true,
            default: None,
            value: None,
            range: None,
            predicate: None,
            documentation: String::new(),
            hash: true,
        }
    }

    /// Set the default (raw, coerced on reset).
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Fix the declared type.
    pub fn with_type(mut self, value_type: ValueType) -> Self {
        self.value_type = Some(value_type);
        self
    }

    /// Disable inferring the type from the default. Values are then stored
    /// as given.
    pub fn without_type_inference(mut self) -> Self {
        self.infer_type = false;
        self
    }

    pub fn with_range(mut self, range: ValueRange) -> Self {
        self.range = Some(range);
        self
    }

    /// Attach a validator run after coercion and range checks.
    pub fn with_predicate(mut self, test: impl Fn(&Value) -> bool + Send + Sync + 'static) -> Self {
        self.predicate = Some(Arc::new(test));
        self
    }

    pub fn with_documentation(mut self, documentation: impl Into<String>) -> Self {
        self.documentation = documentation.into().trim().to_string();
        self
    }

    /// Whether the parameter participates in the configuration fingerprint.
    pub fn with_hash(mut self, hash: bool) -> Self {
        self.hash = hash;
        self
    }

    /// Short name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Module path the parameter was declared in.
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Fully qualified name: `module::name`, or just `name` without a module.
    pub fn long_name(&self) -> String {
        if self.module.is_empty() {
            self.name.clone()
        } else {
            format!("{}::{}", self.module, self.name)
        }
    }

    /// Declared or inferred type. `None` until a type is known.
    pub fn value_type(&self) -> Option<ValueType> {
        self.value_type
    }

    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Current value, `None` while unset.
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn range(&self) -> Option<&ValueRange> {
        self.range.as_ref()
    }

    pub fn documentation(&self) -> &str {
        &self.documentation
    }

    pub fn hash(&self) -> bool {
        self.hash
    }

    /// Coerce `raw` to the declared type, validate it, and store it.
    pub fn set(&mut self, raw: impl Into<Value>) -> Result<&Value, TunableError> {
        let raw = raw.into();

        if self.value_type.is_none() && self.infer_type {
            self.value_type = self.default.as_ref().map(Value::value_type);
        }

        let value = match self.value_type {
            Some(target) => coerce(&raw, target)?,
            None => raw,
        };

        validate(
            &self.long_name(),
            &value,
            self.range.as_ref(),
            self.predicate.as_ref(),
        )?;

        tracing::trace!("{} = {}", self.long_name(), value);
        Ok(self.value.insert(value))
    }

    /// Re-apply the default.
    pub fn reset(&mut self) -> Result<&Value, TunableError> {
        match self.default.clone() {
            Some(default) => self.set(default),
            None => {
                self.value = None;
                Err(TunableError::Unset {
                    name: self.long_name(),
                })
            }
        }
    }
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameter")
            .field("module", &self.module)
            .field("name", &self.name)
            .field("value_type", &self.value_type)
            .field("default", &self.default)
            .field("value", &self.value)
            .field("range", &self.range)
            .field("predicate", &self.predicate.is_some())
            .field("hash", &self.hash)
            .finish()
    }
}

/// A static parameter declaration, collected with `inventory`.
pub struct ParameterDecl {
    pub build: fn() -> Parameter,
}

inventory::collect!(ParameterDecl);

/// Declare a tunable in the current module.
///
/// ```ignore
/// declare_tunable!(Otsu, with_default("1.0"), with_type(ValueType::Float));
/// ```
#[macro_export]
macro_rules! declare_tunable {
    ($name:ident $(, $method:ident($($arg:expr),* $(,)?))* $(,)?) => {
        $crate::inventory::submit! {
            $crate::core::parameter::ParameterDecl {
                build: || {
                    $crate::core::parameter::Parameter::new(module_path!(), stringify!($name))
                        $(.$method($($arg),*))*
                },
            }
        }
    };
}
