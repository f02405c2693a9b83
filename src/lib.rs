//! Tunable - typed configuration parameters and pluggable implementations
//!
//! This crate provides two registries and the glue around them:
//!
//! - [`ParameterRegistry`]: named, typed, validated parameters ("tunables")
//!   with defaults, bulk loading, and snapshots
//! - [`SelectionRegistry`]: capabilities with interchangeable
//!   implementations, chosen by default markers or explicitly, optionally
//!   loaded on demand
//! - [`serial`]: conf, JSON, YAML, XML and DER documents plus a
//!   configuration fingerprint
//! - [`cli`]: `clap` flags that drive both registries

pub mod cli;
pub mod core;
pub mod select;
pub mod serial;
pub mod util;

/// Shared fixtures for unit tests.
#[cfg(test)]
pub mod test_support;

#[doc(hidden)]
pub use inventory;

pub use core::{
    errors::TunableError,
    parameter::Parameter,
    registry::ParameterRegistry,
    value::{Value, ValueType},
};

pub use select::{Capability, Implementation, SelectionRegistry};
pub use serial::Format;
