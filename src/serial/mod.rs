//! Serialization of parameter snapshots.
//!
//! Every format writes a [`Snapshot`] and reads back a plain name -> raw value
//! mapping. Reading never coerces; the mapping is meant for
//! [`ParameterRegistry::load`](crate::core::ParameterRegistry::load).

pub mod conf;
pub mod der;
pub mod fingerprint;
pub mod structured;
pub mod xml;

use std::fmt;
use std::io::{Read, Write};
use std::path::Path;

use indexmap::IndexMap;

use crate::core::errors::TunableError;
use crate::core::snapshot::Snapshot;
use crate::core::value::Value;

pub use fingerprint::fingerprint;

/// Schema version embedded in versioned documents and fingerprints.
pub const SCHEMA_VERSION: i64 = 1;

/// Deserialized name -> raw value mapping, in document order.
pub type RawMapping = IndexMap<String, Value>;

/// A supported document format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Conf,
    Json,
    Yaml,
    Xml,
    Der,
}

impl Format {
    pub const ALL: [Format; 5] = [
        Format::Conf,
        Format::Json,
        Format::Yaml,
        Format::Xml,
        Format::Der,
    ];

    /// Format for a file extension, without the dot.
    pub fn from_extension(ext: &str) -> Result<Format, TunableError> {
        match ext.to_ascii_lowercase().as_str() {
            "conf" => Ok(Format::Conf),
            "json" => Ok(Format::Json),
            "yaml" | "yml" => Ok(Format::Yaml),
            "xml" => Ok(Format::Xml),
            "der" => Ok(Format::Der),
            _ => Err(TunableError::UnsupportedFormat {
                format: ext.to_string(),
            }),
        }
    }

    /// Format for a path, by its extension.
    pub fn from_path(path: &Path) -> Result<Format, TunableError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| TunableError::UnsupportedFormat {
                format: path.display().to_string(),
            })?;
        Format::from_extension(ext)
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Format::Conf => "conf",
            Format::Json => "json",
            Format::Yaml => "yaml",
            Format::Xml => "xml",
            Format::Der => "der",
        }
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, Format::Der)
    }

    pub fn serializer(&self) -> Box<dyn Serializer> {
        match self {
            Format::Conf => Box::new(conf::ConfSerializer),
            Format::Json => Box::new(structured::JsonSerializer),
            Format::Yaml => Box::new(structured::YamlSerializer),
            Format::Xml => Box::new(xml::XmlSerializer),
            Format::Der => Box::new(der::DerSerializer),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// Writes snapshots and reads raw mappings in one format.
pub trait Serializer {
    fn serialize(&self, snapshot: &Snapshot, out: &mut dyn Write) -> Result<(), TunableError>;

    fn deserialize(&self, input: &[u8]) -> Result<RawMapping, TunableError>;
}

/// Serialize into memory.
pub fn to_bytes(snapshot: &Snapshot, format: Format) -> Result<Vec<u8>, TunableError> {
    let mut buf = Vec::new();
    format.serializer().serialize(snapshot, &mut buf)?;
    Ok(buf)
}

pub fn from_bytes(input: &[u8], format: Format) -> Result<RawMapping, TunableError> {
    format.serializer().deserialize(input)
}

/// Read a whole stream and deserialize it.
pub fn read_from(input: &mut dyn Read, format: Format) -> Result<RawMapping, TunableError> {
    let mut buf = Vec::new();
    input.read_to_end(&mut buf)?;
    from_bytes(&buf, format)
}

fn utf8<'a>(format: &str, input: &'a [u8]) -> Result<&'a str, TunableError> {
    std::str::from_utf8(input).map_err(|e| TunableError::malformed(format, e))
}
