//! Selection registry - resolves capabilities to implementations.
//!
//! Resolution of a capability:
//!
//! 1. An explicit selection made with [`set`](SelectionRegistry::set) or
//!    [`add`](SelectionRegistry::add) wins and stays in place until replaced.
//! 2. Otherwise the single default-marked child of the capability is taken,
//!    and resolution keeps descending through default-marked children.
//!    Several defaults among siblings is a conflict; none is an error only
//!    when the node reached cannot be constructed itself.
//!
//! Only the node resolution ends on is constructed, so an implementation
//! reached through intermediate nodes is initialised exactly once.

use std::any::TypeId;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use crate::core::errors::TunableError;
use crate::core::value::Value;
use crate::select::capability::{
    Capability, CapabilityInfo, Construct, Implementation, Params, Variant,
};
use crate::select::choice::Choice;
use crate::select::loader::{candidate_names, LoadErrorMode, ModuleLoader, RegisterFn, UnitDecl};

/// Handle to a registered implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VariantId(usize);

/// Explicit selection for a capability.
#[derive(Debug, Clone, PartialEq)]
enum Selection {
    Single(usize),
    Many(Vec<usize>),
}

/// Registry of capabilities, their implementations, and the current
/// selections.
pub struct SelectionRegistry {
    capabilities: BTreeMap<String, CapabilityInfo>,
    variants: Vec<Variant>,
    selections: HashMap<String, Selection>,
    loader: Option<Arc<dyn ModuleLoader>>,
    prefixes: Vec<String>,
    auto_load: bool,
    on_load_error: LoadErrorMode,
    /// Load request -> unit that satisfied it.
    loaded: HashMap<String, String>,
    units: HashSet<String>,
}

impl SelectionRegistry {
    /// Create an empty registry without a module loader.
    pub fn new() -> Self {
        SelectionRegistry {
            capabilities: BTreeMap::new(),
            variants: Vec::new(),
            selections: HashMap::new(),
            loader: None,
            prefixes: vec![String::new()],
            auto_load: true,
            on_load_error: LoadErrorMode::Error,
            loaded: HashMap::new(),
            units: HashSet::new(),
        }
    }

    /// Create a registry and run every eager [`UnitDecl`].
    pub fn discover() -> Result<Self, TunableError> {
        let mut registry = SelectionRegistry::new();
        for unit in inventory::iter::<UnitDecl> {
            if unit.eager {
                registry.register_unit(unit.name, unit.register)?;
            }
        }
        tracing::debug!(
            "discovered {} capabilities with {} implementations",
            registry.capabilities.len(),
            registry.variants.len()
        );
        Ok(registry)
    }

    /// Use `loader` for `--module` requests and auto-loading.
    pub fn with_loader(mut self, loader: Arc<dyn ModuleLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn set_loader(&mut self, loader: Arc<dyn ModuleLoader>) {
        self.loader = Some(loader);
    }

    /// Globally allow or forbid auto-loading, whatever the capabilities ask.
    pub fn set_auto_load(&mut self, enabled: bool) {
        self.auto_load = enabled;
    }

    /// Choose how [`load_module`](Self::load_module) reports a unit that
    /// cannot be loaded.
    pub fn set_load_error_mode(&mut self, mode: LoadErrorMode) {
        self.on_load_error = mode;
    }

    /// Add a unit name prefix. Later prefixes are tried first.
    pub fn add_prefix(&mut self, prefix: impl Into<String>) {
        let prefix = prefix.into();
        if !self.prefixes.contains(&prefix) {
            self.prefixes.push(prefix);
        }
    }

    /// Run a unit's registration function once.
    pub fn register_unit(&mut self, name: &str, register: RegisterFn) -> Result<(), TunableError> {
        if !self.units.insert(name.to_string()) {
            return Ok(());
        }
        if let Err(e) = register(self) {
            self.units.remove(name);
            return Err(e);
        }
        tracing::debug!("registered unit {}", name);
        Ok(())
    }

    /// Load a unit by name through the configured loader.
    ///
    /// Repeated requests for the same name are no-ops. A failure is returned,
    /// logged, or dropped according to the [`LoadErrorMode`].
    pub fn load_module(&mut self, request: &str) -> Result<(), TunableError> {
        match self.try_load(request) {
            Err(e @ TunableError::Import { .. }) => match self.on_load_error {
                LoadErrorMode::Error => Err(e),
                LoadErrorMode::Warn => {
                    tracing::warn!("{}", e);
                    Ok(())
                }
                LoadErrorMode::Ignore => Ok(()),
            },
            other => other,
        }
    }

    fn try_load(&mut self, request: &str) -> Result<(), TunableError> {
        if self.loaded.contains_key(request) {
            return Ok(());
        }

        let candidates = candidate_names(request, &self.prefixes);
        let loader = self.loader.clone().ok_or_else(|| TunableError::Import {
            candidates: candidates.clone(),
        })?;

        let unit = loader.load_by_name(&candidates)?;
        self.register_unit(&unit.name, unit.register)?;
        tracing::info!("loaded module {}", unit.name);
        self.loaded.insert(request.to_string(), unit.name);
        Ok(())
    }

    /// Declare a capability. Declaring it again with the same instance type
    /// is a no-op.
    pub fn declare<T: ?Sized + 'static>(
        &mut self,
        capability: &Capability<T>,
    ) -> Result<(), TunableError> {
        match self.capabilities.get(capability.name()) {
            Some(info) if info.type_id != TypeId::of::<Box<T>>() => Err(TunableError::TypeMismatch {
                capability: capability.name().to_string(),
                expected: info.type_name,
            }),
            Some(_) => Ok(()),
            None => {
                self.capabilities
                    .insert(capability.name().to_string(), CapabilityInfo::of(capability));
                Ok(())
            }
        }
    }

    /// Register an implementation, declaring the capability if needed.
    ///
    /// Registering the same name twice replaces the earlier entry.
    pub fn implement<T: ?Sized + 'static>(
        &mut self,
        capability: &Capability<T>,
        implementation: Implementation<T>,
    ) -> Result<VariantId, TunableError> {
        self.declare(capability)?;
        let cap = capability.name();

        let parent = match &implementation.parent {
            Some(parent) => Some(self.variant_index(cap, parent).ok_or_else(|| {
                TunableError::NotFound {
                    kind: "implementation",
                    name: format!("{}::{}", cap, parent),
                }
            })?),
            None => None,
        };

        let variant = Variant {
            name: implementation.name,
            capability: cap.to_string(),
            parent,
            default: implementation.default,
            abstract_: implementation.abstract_,
            params: implementation.params,
            factory: implementation.factory,
        };

        tracing::debug!("registered implementation {}::{}", cap, variant.name);

        match self.variant_index(cap, &variant.name) {
            Some(index) => {
                self.variants[index] = variant;
                Ok(VariantId(index))
            }
            None => {
                self.variants.push(variant);
                Ok(VariantId(self.variants.len() - 1))
            }
        }
    }

    fn info(&self, capability: &str) -> Result<&CapabilityInfo, TunableError> {
        self.capabilities
            .get(capability)
            .ok_or_else(|| TunableError::capability_not_found(capability))
    }

    fn variant_index(&self, capability: &str, name: &str) -> Option<usize> {
        self.variants
            .iter()
            .position(|v| v.capability == capability && v.name == name)
    }

    fn selectable_index(&self, capability: &str, name: &str) -> Option<usize> {
        self.variant_index(capability, name)
            .filter(|&i| !self.variants[i].abstract_)
    }

    fn children(&self, capability: &str, parent: Option<usize>) -> Vec<usize> {
        self.variants
            .iter()
            .enumerate()
            .filter(|(_, v)| v.capability == capability && v.parent == parent)
            .map(|(i, _)| i)
            .collect()
    }

    /// All declared capabilities, by name.
    pub fn capabilities(&self) -> impl Iterator<Item = &CapabilityInfo> {
        self.capabilities.values()
    }

    pub fn capability(&self, name: &str) -> Option<&CapabilityInfo> {
        self.capabilities.get(name)
    }

    /// Every implementation of a capability, abstract ones included, in
    /// registration order.
    pub fn variants(&self, capability: &str) -> Result<Vec<&Variant>, TunableError> {
        self.info(capability)?;
        Ok(self
            .variants
            .iter()
            .filter(|v| v.capability == capability)
            .collect())
    }

    pub fn variant(&self, id: VariantId) -> Option<&Variant> {
        self.variants.get(id.0)
    }

    /// Names that [`set`](Self::set) accepts, sorted.
    pub fn choices(&self, capability: &str) -> Result<Vec<&str>, TunableError> {
        let mut names: Vec<&str> = self
            .variants(capability)?
            .into_iter()
            .filter(|v| !v.abstract_)
            .map(|v| v.name.as_str())
            .collect();
        names.sort_unstable();
        Ok(names)
    }

    /// Default-marked direct implementations of a capability.
    pub fn defaults(&self, capability: &str) -> Result<Vec<&str>, TunableError> {
        self.info(capability)?;
        Ok(self
            .children(capability, None)
            .into_iter()
            .filter(|&i| self.variants[i].default)
            .map(|i| self.variants[i].name.as_str())
            .collect())
    }

    /// Names of the explicit selection, if any.
    pub fn selected(&self, capability: &str) -> Option<Vec<&str>> {
        let indices = match self.selections.get(capability)? {
            Selection::Single(i) => vec![*i],
            Selection::Many(list) => list.clone(),
        };
        Some(
            indices
                .into_iter()
                .map(|i| self.variants[i].name.as_str())
                .collect(),
        )
    }

    /// Follow default-marked children from `start` (`None` is the
    /// capability itself).
    fn descend(&self, capability: &str, start: Option<usize>) -> Result<usize, TunableError> {
        let mut node = start;
        loop {
            let label = match node {
                Some(i) => self.variants[i].name.clone(),
                None => capability.to_string(),
            };

            let defaults: Vec<usize> = self
                .children(capability, node)
                .into_iter()
                .filter(|&i| self.variants[i].default)
                .collect();

            match defaults.as_slice() {
                [] => {
                    return match node {
                        Some(i) if !self.variants[i].abstract_ => Ok(i),
                        _ => Err(TunableError::NoImplementation { capability: label }),
                    }
                }
                [only] => node = Some(*only),
                many => {
                    return Err(TunableError::Conflict {
                        capability: label,
                        defaults: many
                            .iter()
                            .map(|&i| self.variants[i].name.clone())
                            .collect(),
                    })
                }
            }
        }
    }

    fn resolve_indices(&self, capability: &str) -> Result<Vec<usize>, TunableError> {
        self.info(capability)?;
        match self.selections.get(capability) {
            Some(Selection::Single(i)) => Ok(vec![*i]),
            Some(Selection::Many(list)) => Ok(list.clone()),
            None => Ok(vec![self.descend(capability, None)?]),
        }
    }

    /// The implementation a capability currently resolves to.
    ///
    /// For a multi-select capability this is the first selected one.
    pub fn resolve(&self, capability: &str) -> Result<&Variant, TunableError> {
        let indices = self.resolve_indices(capability)?;
        let first = indices
            .first()
            .ok_or_else(|| TunableError::NoImplementation {
                capability: capability.to_string(),
            })?;
        Ok(&self.variants[*first])
    }

    /// Every implementation a capability resolves to, in selection order.
    pub fn resolve_all(&self, capability: &str) -> Result<Vec<&Variant>, TunableError> {
        Ok(self
            .resolve_indices(capability)?
            .into_iter()
            .map(|i| &self.variants[i])
            .collect())
    }

    /// Find a selectable implementation, loading a unit named after it if
    /// the capability allows. Load failures are logged and otherwise
    /// ignored; the caller sees [`TunableError::InvalidChoice`].
    fn find_choice(&mut self, capability: &str, name: &str) -> Result<usize, TunableError> {
        let auto_load = self.auto_load && self.info(capability)?.auto_load;

        if let Some(i) = self.selectable_index(capability, name) {
            return Ok(i);
        }

        if auto_load && self.loader.is_some() {
            if let Err(e) = self.try_load(name) {
                tracing::debug!("auto-load of `{}` for {} failed: {}", name, capability, e);
            }
            if let Some(i) = self.selectable_index(capability, name) {
                return Ok(i);
            }
        }

        Err(TunableError::InvalidChoice {
            capability: capability.to_string(),
            choice: name.to_string(),
            choices: self
                .choices(capability)?
                .into_iter()
                .map(str::to_string)
                .collect(),
        })
    }

    fn apply_choice(&mut self, capability: &str, choice: &str) -> Result<usize, TunableError> {
        let choice = Choice::parse(choice)?;
        let index = self.find_choice(capability, &choice.name)?;
        self.variants[index].params.extend(choice.params);
        Ok(index)
    }

    /// Select an implementation by name, optionally with inline parameters
    /// (`Name(key=value,...)`). The selection replaces any earlier one.
    pub fn set(&mut self, capability: &str, choice: &str) -> Result<(), TunableError> {
        let index = self.apply_choice(capability, choice)?;
        tracing::debug!("selected {} for {}", self.variants[index].name, capability);
        self.selections
            .insert(capability.to_string(), Selection::Single(index));
        Ok(())
    }

    /// Select a registered implementation by handle.
    pub fn set_id(&mut self, capability: &str, id: VariantId) -> Result<(), TunableError> {
        self.info(capability)?;
        let valid = self
            .variants
            .get(id.0)
            .is_some_and(|v| v.capability == capability && !v.abstract_);
        if !valid {
            return Err(TunableError::InvalidChoice {
                capability: capability.to_string(),
                choice: format!("{:?}", id),
                choices: self
                    .choices(capability)?
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
            });
        }
        self.selections
            .insert(capability.to_string(), Selection::Single(id.0));
        Ok(())
    }

    /// Append an implementation to a multi-select capability's selection.
    pub fn add(&mut self, capability: &str, choice: &str) -> Result<(), TunableError> {
        if !self.info(capability)?.multi_select {
            return Err(TunableError::TypeMismatch {
                capability: capability.to_string(),
                expected: "a multi-select capability",
            });
        }

        let index = self.apply_choice(capability, choice)?;
        tracing::debug!("added {} to {}", self.variants[index].name, capability);

        let selection = match self.selections.remove(capability) {
            None => Selection::Many(vec![index]),
            Some(Selection::Single(first)) => Selection::Many(vec![first, index]),
            Some(Selection::Many(mut list)) => {
                list.push(index);
                Selection::Many(list)
            }
        };
        self.selections.insert(capability.to_string(), selection);
        Ok(())
    }

    /// Apply a choice the way its capability expects: `add` for
    /// multi-select capabilities, `set` otherwise.
    pub fn accept_choice(&mut self, capability: &str, choice: &str) -> Result<(), TunableError> {
        if self.info(capability)?.multi_select {
            self.add(capability, choice)
        } else {
            self.set(capability, choice)
        }
    }

    /// Forget the explicit selection of one capability.
    pub fn clear(&mut self, capability: &str) {
        self.selections.remove(capability);
    }

    /// Forget every explicit selection.
    pub fn reset_all(&mut self) {
        self.selections.clear();
    }

    fn check_type<T: ?Sized + 'static>(&self, capability: &Capability<T>) -> Result<(), TunableError> {
        let info = self.info(capability.name())?;
        if info.type_id != TypeId::of::<Box<T>>() {
            return Err(TunableError::TypeMismatch {
                capability: capability.name().to_string(),
                expected: std::any::type_name::<T>(),
            });
        }
        Ok(())
    }

    /// Stored parameters along the chain from the capability down to
    /// `index`, deeper nodes overriding shallower ones.
    fn chain_params(&self, index: usize) -> Params {
        let mut chain = vec![index];
        let mut node = self.variants[index].parent;
        while let Some(parent) = node {
            chain.push(parent);
            node = self.variants[parent].parent;
        }

        let mut params = Params::new();
        for i in chain.into_iter().rev() {
            params.extend(
                self.variants[i]
                    .params
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone())),
            );
        }
        params
    }

    fn construct<T: ?Sized + 'static>(
        &self,
        index: usize,
        args: &[Value],
        params: &Params,
    ) -> Result<Box<T>, TunableError> {
        let variant = &self.variants[index];
        let factory = variant
            .factory
            .as_ref()
            .ok_or_else(|| TunableError::NoImplementation {
                capability: variant.name.clone(),
            })?;

        let mut merged = self.chain_params(index);
        merged.extend(params.iter().map(|(k, v)| (k.clone(), v.clone())));

        let ctx = Construct {
            variant: &variant.name,
            args,
            params: merged,
        };

        let instance = factory(&ctx).map_err(|source| TunableError::Construction {
            implementation: variant.name.clone(),
            source,
        })?;
        tracing::debug!("constructed {}::{}", variant.capability, variant.name);

        instance
            .downcast::<Box<T>>()
            .map(|boxed| *boxed)
            .map_err(|_| TunableError::TypeMismatch {
                capability: variant.capability.clone(),
                expected: std::any::type_name::<T>(),
            })
    }

    /// Construct the implementation a capability resolves to.
    ///
    /// Stored parameters are merged first, then `params` from the call site.
    pub fn instantiate<T: ?Sized + 'static>(
        &self,
        capability: &Capability<T>,
        args: &[Value],
        params: &Params,
    ) -> Result<Box<T>, TunableError> {
        self.check_type(capability)?;
        let indices = self.resolve_indices(capability.name())?;
        let index = indices
            .first()
            .ok_or_else(|| TunableError::NoImplementation {
                capability: capability.name().to_string(),
            })?;
        self.construct(*index, args, params)
    }

    /// Construct every selected implementation of a capability, in order.
    pub fn instantiate_all<T: ?Sized + 'static>(
        &self,
        capability: &Capability<T>,
        args: &[Value],
        params: &Params,
    ) -> Result<Vec<Box<T>>, TunableError> {
        self.check_type(capability)?;
        self.resolve_indices(capability.name())?
            .into_iter()
            .map(|index| self.construct(index, args, params))
            .collect()
    }

    /// Construct a named implementation directly.
    ///
    /// A concrete implementation constructs itself; an abstract one resolves
    /// through its default children.
    pub fn instantiate_variant<T: ?Sized + 'static>(
        &self,
        capability: &Capability<T>,
        name: &str,
        args: &[Value],
        params: &Params,
    ) -> Result<Box<T>, TunableError> {
        self.check_type(capability)?;
        let index = self
            .variant_index(capability.name(), name)
            .ok_or_else(|| TunableError::NotFound {
                kind: "implementation",
                name: format!("{}::{}", capability.name(), name),
            })?;

        let index = if self.variants[index].abstract_ {
            self.descend(capability.name(), Some(index))?
        } else {
            index
        };
        self.construct(index, args, params)
    }

    /// Construct with no arguments.
    pub fn get<T: ?Sized + 'static>(&self, capability: &Capability<T>) -> Result<Box<T>, TunableError> {
        self.instantiate(capability, &[], &Params::new())
    }

    /// Construct every selection with no arguments.
    pub fn get_all<T: ?Sized + 'static>(
        &self,
        capability: &Capability<T>,
    ) -> Result<Vec<Box<T>>, TunableError> {
        self.instantiate_all(capability, &[], &Params::new())
    }
}

impl Default for SelectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
