//! Capability resolution ("selectables").
//!
//! A [`Capability`] names an extension point. Implementations register
//! against it with [`Implementation`] builders, and the
//! [`SelectionRegistry`] decides which one a request for the capability
//! gets: an explicit selection if one was made, otherwise the chain of
//! default-marked implementations.
//!
//! Implementations can live in units that are registered on demand through a
//! [`ModuleLoader`].

pub mod capability;
pub mod choice;
pub mod loader;
pub mod registry;

pub use capability::{Capability, CapabilityInfo, Construct, Implementation, Params, Variant};
pub use choice::Choice;
pub use loader::{
    candidate_names, InventoryLoader, LoadErrorMode, LoadedUnit, ModuleLoader, RegisterFn,
    UnitDecl,
};
pub use registry::{SelectionRegistry, VariantId};
