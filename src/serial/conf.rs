//! Line-oriented `name=value` format.
//!
//! ```text
//! ### Tunables ###
//!
//! # Threshold of the binarization.
//! # type: float
//! Otsu=1.0
//! ```
//!
//! Lines starting with `#` are comments. A value is everything after the
//! first `=`, unescaped. Values are read back as text.

use std::io::Write;

use crate::core::errors::TunableError;
use crate::core::snapshot::Snapshot;
use crate::core::value::Value;
use crate::serial::{utf8, RawMapping, Serializer};

pub const HEADER: &str = "### Tunables ###";

#[derive(Debug, Clone, Copy, Default)]
pub struct ConfSerializer;

impl Serializer for ConfSerializer {
    fn serialize(&self, snapshot: &Snapshot, out: &mut dyn Write) -> Result<(), TunableError> {
        writeln!(out, "{}", HEADER)?;
        writeln!(out)?;

        for entry in snapshot.entries() {
            if !entry.documentation.is_empty() {
                for line in entry.documentation.lines() {
                    writeln!(out, "# {}", line)?;
                }
            }
            writeln!(out, "# type: {}", entry.value_type())?;
            writeln!(out, "{}={}", entry.name, entry.value)?;
            writeln!(out)?;
        }
        Ok(())
    }

    fn deserialize(&self, input: &[u8]) -> Result<RawMapping, TunableError> {
        let text = utf8("conf", input)?;
        let mut mapping = RawMapping::new();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (name, value) = line.split_once('=').unwrap_or((line, ""));
            mapping.insert(name.trim().to_string(), Value::from(value));
        }

        tracing::trace!("read {} conf entries", mapping.len());
        Ok(mapping)
    }
}
