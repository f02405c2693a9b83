//! Typed parameters ("tunables").
//!
//! - Tagged scalar values and their coercion rules
//! - Parameter declarations with defaults, ranges, and predicates
//! - The parameter registry and its snapshots
//! - The error type shared by the whole crate

pub mod coerce;
pub mod errors;
pub mod parameter;
pub mod registry;
pub mod snapshot;
pub mod value;

pub use coerce::{coerce, parse_bool, validate, Predicate, ValueRange};
pub use errors::TunableError;
pub use parameter::{Parameter, ParameterDecl};
pub use registry::ParameterRegistry;
pub use snapshot::{Snapshot, SnapshotEntry};
pub use value::{FromValue, Value, ValueType};
