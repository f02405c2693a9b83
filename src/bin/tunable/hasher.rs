//! Digest implementations selectable with `--Hasher` and post-processing
//! filters selectable with `--Filter`.
//!
//! `Sha256` and `Sha512` are registered at startup. `Sha224` lives in the
//! deferred `sha224` unit and is loaded the first time it is asked for.

use sha2::{Digest, Sha224, Sha256, Sha512};
use tunable::core::TunableError;
use tunable::select::{Capability, Construct, Implementation, SelectionRegistry, UnitDecl};

tunable::declare_tunable!(
    Salt,
    with_default(""),
    with_documentation("Prepended to every input before hashing.")
);

/// A digest algorithm.
pub trait Hasher {
    fn name(&self) -> &str;
    fn digest(&self, data: &[u8]) -> Vec<u8>;
}

pub const HASHER: Capability<dyn Hasher> = Capability::new("Hasher").auto_load();

/// Applied to the encoded digest, in selection order.
pub trait Filter {
    fn apply(&self, encoded: String) -> String;
}

pub const FILTER: Capability<dyn Filter> = Capability::new("Filter").multi_select();

struct Algorithm {
    name: String,
    rounds: i64,
    digest: fn(&[u8]) -> Vec<u8>,
}

impl Hasher for Algorithm {
    fn name(&self) -> &str {
        &self.name
    }

    fn digest(&self, data: &[u8]) -> Vec<u8> {
        let mut out = (self.digest)(data);
        for _ in 1..self.rounds {
            out = (self.digest)(&out);
        }
        out
    }
}

fn algorithm(
    digest: fn(&[u8]) -> Vec<u8>,
) -> impl Fn(&Construct<'_>) -> anyhow::Result<Box<dyn Hasher>> + Send + Sync + 'static {
    move |ctx| {
        let rounds = ctx.param_or("rounds", 1i64);
        if rounds < 1 {
            anyhow::bail!("rounds must be at least 1, got {}", rounds);
        }
        Ok(Box::new(Algorithm {
            name: ctx.variant.to_string(),
            rounds,
            digest,
        }))
    }
}

fn sha256(data: &[u8]) -> Vec<u8> {
    Sha256::digest(data).to_vec()
}

fn sha512(data: &[u8]) -> Vec<u8> {
    Sha512::digest(data).to_vec()
}

fn sha224(data: &[u8]) -> Vec<u8> {
    Sha224::digest(data).to_vec()
}

struct Identity;

impl Filter for Identity {
    fn apply(&self, encoded: String) -> String {
        encoded
    }
}

struct Upper;

impl Filter for Upper {
    fn apply(&self, encoded: String) -> String {
        encoded.to_uppercase()
    }
}

struct Truncate(usize);

impl Filter for Truncate {
    fn apply(&self, encoded: String) -> String {
        encoded.chars().take(self.0).collect()
    }
}

fn register_builtin(registry: &mut SelectionRegistry) -> Result<(), TunableError> {
    registry.implement(&HASHER, Implementation::new("Sha256", algorithm(sha256)).default())?;
    registry.implement(&HASHER, Implementation::new("Sha512", algorithm(sha512)))?;

    registry.implement(
        &FILTER,
        Implementation::new("Identity", |_: &Construct<'_>| {
            Ok(Box::new(Identity) as Box<dyn Filter>)
        })
        .default(),
    )?;
    registry.implement(
        &FILTER,
        Implementation::new("Upper", |_: &Construct<'_>| Ok(Box::new(Upper) as Box<dyn Filter>)),
    )?;
    registry.implement(
        &FILTER,
        Implementation::new("Truncate", |ctx: &Construct<'_>| {
            let len = ctx.param_or("len", 8i64);
            let len = usize::try_from(len)
                .map_err(|_| anyhow::anyhow!("len must not be negative, got {}", len))?;
            Ok(Box::new(Truncate(len)) as Box<dyn Filter>)
        })
        .with_param("len", 8),
    )?;
    Ok(())
}

fn register_sha224(registry: &mut SelectionRegistry) -> Result<(), TunableError> {
    registry.implement(&HASHER, Implementation::new("Sha224", algorithm(sha224)))?;
    Ok(())
}

tunable::inventory::submit! {
    UnitDecl::eager("hashers", register_builtin)
}

tunable::inventory::submit! {
    UnitDecl::deferred("sha224", register_sha224)
}
