//! Shared fixtures for unit tests.
//!
//! - [`sample_tunables`]: a small parameter registry with the entry
//!   namespace `app`
//! - [`sample_selection`]: a selection registry with a `Shape` capability
//!   (including an implementation chain) and a multi-select `Layer`
//!   capability, plus counters recording how often each factory ran

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::core::{Parameter, ParameterRegistry, Value, ValueRange, ValueType};
use crate::select::{Capability, Construct, Implementation, Params, SelectionRegistry};

/// Parameter registry used across the core and serializer tests.
///
/// | long name           | default | type  |
/// |---------------------|---------|-------|
/// | `app::Otsu`         | `"1.0"` | float |
/// | `app::QuickOtsu`    | `8`     | float |
/// | `app::Enabled`      | `true`  | bool  |
/// | `app::Verbose`      | `false` | bool, not hashed |
/// | `vision::Threshold` | `128`   | int in `[0, 256)` |
pub fn sample_tunables() -> ParameterRegistry {
    let mut registry = ParameterRegistry::new().with_entry_namespace("app");

    let parameters = [
        Parameter::new("app", "Otsu")
            .with_default("1.0")
            .with_type(ValueType::Float),
        Parameter::new("app", "QuickOtsu")
            .with_default(8)
            .with_type(ValueType::Float)
            .with_documentation("My little Otsu"),
        Parameter::new("app", "Enabled").with_default(true),
        Parameter::new("app", "Verbose")
            .with_default(false)
            .with_hash(false),
        Parameter::new("vision", "Threshold")
            .with_default(128)
            .with_range(ValueRange::half_open(0, 256))
            .with_documentation("Binarization cut-off."),
    ];

    for parameter in parameters {
        registry.register(parameter).expect("sample tunable registers");
    }
    registry
}

pub trait Shape {
    fn describe(&self) -> String;
    fn param(&self, key: &str) -> Option<Value>;
    fn arg_count(&self) -> usize;
}

struct Named {
    name: String,
    params: Params,
    args: usize,
}

impl Shape for Named {
    fn describe(&self) -> String {
        self.name.clone()
    }

    fn param(&self, key: &str) -> Option<Value> {
        self.params.get(key).cloned()
    }

    fn arg_count(&self) -> usize {
        self.args
    }
}

pub const SHAPE: Capability<dyn Shape> = Capability::new("Shape");
pub const LAYER: Capability<dyn Shape> = Capability::new("Layer").multi_select();

/// A shape with no parameters.
pub fn shape(name: &str) -> Box<dyn Shape> {
    Box::new(Named {
        name: name.to_string(),
        params: Params::new(),
        args: 0,
    })
}

/// Per-implementation factory call counts.
#[derive(Debug, Clone, Default)]
pub struct InitCounters(Arc<Mutex<HashMap<String, usize>>>);

impl InitCounters {
    pub fn count(&self, name: &str) -> usize {
        self.0.lock().unwrap().get(name).copied().unwrap_or(0)
    }

    fn bump(&self, name: &str) {
        *self.0.lock().unwrap().entry(name.to_string()).or_default() += 1;
    }
}

fn counted(
    counters: &InitCounters,
) -> impl Fn(&Construct<'_>) -> anyhow::Result<Box<dyn Shape>> + Send + Sync + 'static {
    let counters = counters.clone();
    move |ctx| {
        counters.bump(ctx.variant);
        Ok(Box::new(Named {
            name: ctx.variant.to_string(),
            params: ctx.params.clone(),
            args: ctx.args.len(),
        }))
    }
}

/// Selection registry with:
///
/// ```text
/// Shape: Circle (default), Square, Triangle,
///        Polygon (abstract) -> Quad (default) -> Rhombus (default)
/// Layer (multi-select): Fill (default), Stroke
/// ```
pub fn sample_selection() -> (SelectionRegistry, InitCounters) {
    let counters = InitCounters::default();
    let mut registry = SelectionRegistry::new();

    let shapes = [
        Implementation::new("Circle", counted(&counters)).default(),
        Implementation::new("Square", counted(&counters)),
        Implementation::new("Triangle", counted(&counters)),
        Implementation::abstract_node("Polygon"),
        Implementation::new("Quad", counted(&counters))
            .under("Polygon")
            .default(),
        Implementation::new("Rhombus", counted(&counters))
            .under("Quad")
            .default(),
    ];
    for implementation in shapes {
        registry
            .implement(&SHAPE, implementation)
            .expect("sample shape registers");
    }

    let layers = [
        Implementation::new("Fill", counted(&counters)).default(),
        Implementation::new("Stroke", counted(&counters)),
    ];
    for implementation in layers {
        registry
            .implement(&LAYER, implementation)
            .expect("sample layer registers");
    }

    (registry, counters)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_tunables_defaults_applied() {
        let registry = sample_tunables();
        assert_eq!(registry.len(), 5);
        assert_eq!(registry.value("Otsu").unwrap(), &Value::Float(1.0));
        assert_eq!(registry.value("Threshold").unwrap(), &Value::Int(128));
    }

    #[test]
    fn test_sample_selection_counts_nothing_until_constructed() {
        let (registry, counters) = sample_selection();
        assert_eq!(registry.choices("Shape").unwrap().len(), 5);
        assert_eq!(counters.count("Circle"), 0);

        registry.get(&SHAPE).unwrap();
        assert_eq!(counters.count("Circle"), 1);
    }
}
