//! Module units and on-demand loading.
//!
//! A unit is a named registration function that adds implementations to a
//! [`SelectionRegistry`]. Eager units run when the registry is discovered;
//! deferred units only run when something asks for them by name, either
//! explicitly (`--module`) or through a capability's auto-load.

use serde::Deserialize;

use crate::core::errors::TunableError;
use crate::select::registry::SelectionRegistry;

/// Registration entry point of a unit.
pub type RegisterFn = fn(&mut SelectionRegistry) -> Result<(), TunableError>;

/// A static unit declaration, collected with `inventory`.
pub struct UnitDecl {
    pub name: &'static str,
    pub eager: bool,
    pub register: RegisterFn,
}

impl UnitDecl {
    /// A unit registered as soon as the registry is discovered.
    pub const fn eager(name: &'static str, register: RegisterFn) -> Self {
        UnitDecl {
            name,
            eager: true,
            register,
        }
    }

    /// A unit registered only when loaded by name.
    pub const fn deferred(name: &'static str, register: RegisterFn) -> Self {
        UnitDecl {
            name,
            eager: false,
            register,
        }
    }
}

inventory::collect!(UnitDecl);

/// What an explicit load request does when no unit can be loaded.
///
/// Auto-loading is unaffected; its failures always end in `InvalidChoice`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadErrorMode {
    /// Return the `Import` error.
    #[default]
    Error,
    /// Log a warning and carry on.
    Warn,
    /// Carry on silently.
    Ignore,
}

/// A unit returned by a loader.
#[derive(Clone)]
pub struct LoadedUnit {
    pub name: String,
    pub register: RegisterFn,
}

/// Loads units by name.
///
/// `candidates` are tried in order; the first one that exists wins.
pub trait ModuleLoader: Send + Sync {
    fn load_by_name(&self, candidates: &[String]) -> Result<LoadedUnit, TunableError>;
}

/// Loader backed by the deferred [`UnitDecl`] table.
#[derive(Debug, Clone, Copy, Default)]
pub struct InventoryLoader;

impl ModuleLoader for InventoryLoader {
    fn load_by_name(&self, candidates: &[String]) -> Result<LoadedUnit, TunableError> {
        for candidate in candidates {
            let found = inventory::iter::<UnitDecl>
                .into_iter()
                .find(|unit| !unit.eager && unit.name == candidate.as_str());

            if let Some(unit) = found {
                return Ok(LoadedUnit {
                    name: unit.name.to_string(),
                    register: unit.register,
                });
            }
        }

        Err(TunableError::Import {
            candidates: candidates.to_vec(),
        })
    }
}

/// Candidate unit names for a request, in priority order.
///
/// The request is tried verbatim, then lowercased; for each spelling the
/// prefixes are tried newest first.
pub fn candidate_names(request: &str, prefixes: &[String]) -> Vec<String> {
    let lower = request.to_lowercase();
    let spellings = [request, lower.as_str()];

    let mut names = Vec::new();
    for spelling in spellings {
        for prefix in prefixes.iter().rev() {
            let name = format!("{}{}", prefix, spelling);
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register_nothing(_: &mut SelectionRegistry) -> Result<(), TunableError> {
        Ok(())
    }

    inventory::submit! {
        UnitDecl::deferred("loader_test_unit", register_nothing)
    }

    inventory::submit! {
        UnitDecl::eager("loader_test_eager", register_nothing)
    }

    #[test]
    fn test_candidate_order() {
        let prefixes = vec![String::new(), "selectable_".to_string()];
        assert_eq!(
            candidate_names("Md5", &prefixes),
            ["selectable_Md5", "Md5", "selectable_md5", "md5"]
        );
    }

    #[test]
    fn test_candidates_deduplicate_lowercase() {
        assert_eq!(candidate_names("md5", &[String::new()]), ["md5"]);
    }

    #[test]
    fn test_inventory_loader_finds_deferred_units_only() {
        let loader = InventoryLoader;

        let unit = loader
            .load_by_name(&["missing".to_string(), "loader_test_unit".to_string()])
            .unwrap();
        assert_eq!(unit.name, "loader_test_unit");

        assert!(matches!(
            loader.load_by_name(&["loader_test_eager".to_string()]),
            Err(TunableError::Import { .. })
        ));
    }
}
