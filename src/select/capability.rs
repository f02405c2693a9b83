//! Capabilities and their implementation variants.
//!
//! A capability is an extension point whose instances are `Box<T>`, usually
//! `Box<dyn SomeTrait>`. Implementations register a factory plus markers:
//!
//! - **default**: the tie-break choice among its siblings when nothing was
//!   selected explicitly
//! - **abstract**: discoverable but never selectable or constructible
//!
//! An implementation may sit under another implementation instead of
//! directly under the capability, forming a chain that resolution walks
//! until it reaches the node to construct.

use std::any::{Any, TypeId};
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::core::value::{FromValue, Value};

/// Free-form construction parameters.
pub type Params = BTreeMap<String, Value>;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub(crate) type ErasedFactory =
    Arc<dyn Fn(&Construct<'_>) -> Result<Box<dyn Any>, BoxError> + Send + Sync>;

/// Typed handle naming a capability.
///
/// ```ignore
/// pub const HASHER: Capability<dyn Hasher> = Capability::new("Hasher").auto_load();
/// ```
pub struct Capability<T: ?Sized> {
    name: &'static str,
    multi_select: bool,
    auto_load: bool,
    _marker: PhantomData<fn() -> Box<T>>,
}

impl<T: ?Sized> Capability<T> {
    pub const fn new(name: &'static str) -> Self {
        Capability {
            name,
            multi_select: false,
            auto_load: false,
            _marker: PhantomData,
        }
    }

    /// Resolve to an ordered list of implementations instead of one.
    pub const fn multi_select(mut self) -> Self {
        self.multi_select = true;
        self
    }

    /// Try loading a module named after an unknown choice before rejecting it.
    pub const fn auto_load(mut self) -> Self {
        self.auto_load = true;
        self
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }

    pub const fn is_multi_select(&self) -> bool {
        self.multi_select
    }

    pub const fn is_auto_load(&self) -> bool {
        self.auto_load
    }
}

impl<T: ?Sized> Clone for Capability<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ?Sized> Copy for Capability<T> {}

impl<T: ?Sized> fmt::Debug for Capability<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capability")
            .field("name", &self.name)
            .field("multi_select", &self.multi_select)
            .field("auto_load", &self.auto_load)
            .finish()
    }
}

/// Registered capability, independent of its instance type.
#[derive(Debug, Clone)]
pub struct CapabilityInfo {
    pub name: String,
    pub multi_select: bool,
    pub auto_load: bool,
    pub(crate) type_id: TypeId,
    pub(crate) type_name: &'static str,
}

impl CapabilityInfo {
    pub(crate) fn of<T: ?Sized + 'static>(capability: &Capability<T>) -> Self {
        CapabilityInfo {
            name: capability.name().to_string(),
            multi_select: capability.is_multi_select(),
            auto_load: capability.is_auto_load(),
            type_id: TypeId::of::<Box<T>>(),
            type_name: std::any::type_name::<T>(),
        }
    }
}

/// Arguments handed to an implementation factory.
#[derive(Debug)]
pub struct Construct<'a> {
    /// Name of the implementation being constructed.
    pub variant: &'a str,
    /// Positional arguments from the call site.
    pub args: &'a [Value],
    /// Stored parameters merged with call-site parameters.
    pub params: Params,
}

impl Construct<'_> {
    /// Typed lookup of a construction parameter.
    pub fn param<T: FromValue>(&self, key: &str) -> Option<T> {
        self.params.get(key).and_then(T::from_value)
    }

    pub fn param_or<T: FromValue>(&self, key: &str, default: T) -> T {
        self.param(key).unwrap_or(default)
    }
}

/// Builder for registering an implementation of `Capability<T>`.
pub struct Implementation<T: ?Sized> {
    pub(crate) name: String,
    pub(crate) parent: Option<String>,
    pub(crate) default: bool,
    pub(crate) abstract_: bool,
    pub(crate) params: Params,
    pub(crate) factory: Option<ErasedFactory>,
    _marker: PhantomData<fn() -> Box<T>>,
}

impl<T: ?Sized + 'static> Implementation<T> {
    /// A constructible implementation.
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&Construct<'_>) -> anyhow::Result<Box<T>> + Send + Sync + 'static,
    {
        let erased: ErasedFactory = Arc::new(move |ctx: &Construct<'_>| {
            factory(ctx)
                .map(|instance| Box::new(instance) as Box<dyn Any>)
                .map_err(BoxError::from)
        });

        Implementation {
            name: name.into(),
            parent: None,
            default: false,
            abstract_: false,
            params: Params::new(),
            factory: Some(erased),
            _marker: PhantomData,
        }
    }

    /// A grouping node that can only be resolved through its children.
    pub fn abstract_node(name: impl Into<String>) -> Self {
        Implementation {
            name: name.into(),
            parent: None,
            default: false,
            abstract_: true,
            params: Params::new(),
            factory: None,
            _marker: PhantomData,
        }
    }

    /// Mark as the default among its siblings.
    pub fn default(mut self) -> Self {
        self.default = true;
        self
    }

    /// Place under another implementation of the same capability.
    pub fn under(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Stored default construction parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

/// A registered implementation variant.
#[derive(Clone)]
pub struct Variant {
    pub(crate) name: String,
    pub(crate) capability: String,
    pub(crate) parent: Option<usize>,
    pub(crate) default: bool,
    pub(crate) abstract_: bool,
    pub(crate) params: Params,
    pub(crate) factory: Option<ErasedFactory>,
}

impl Variant {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capability(&self) -> &str {
        &self.capability
    }

    pub fn is_default(&self) -> bool {
        self.default
    }

    pub fn is_abstract(&self) -> bool {
        self.abstract_
    }

    /// Stored default construction parameters.
    pub fn params(&self) -> &Params {
        &self.params
    }
}

impl fmt::Debug for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Variant")
            .field("name", &self.name)
            .field("capability", &self.capability)
            .field("default", &self.default)
            .field("abstract", &self.abstract_)
            .field("params", &self.params)
            .finish()
    }
}
