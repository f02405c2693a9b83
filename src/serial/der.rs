//! Canonical binary encoding (X.690 DER).
//!
//! ```text
//! Document ::= SEQUENCE {
//!     version   INTEGER,
//!     tunables  SEQUENCE OF SEQUENCE {
//!         name   UTF8String,
//!         value  CHOICE {
//!             boolValue    BOOLEAN,
//!             intValue     INTEGER,
//!             floatValue   REAL,
//!             stringValue  UTF8String,
//!             bytesValue   OCTET STRING } } }
//! ```
//!
//! Entries are emitted in the byte order of their UTF-8 names, so equal
//! snapshots always encode to equal bytes. REAL values use the DER base-2
//! form with an odd mantissa.

use std::io::Write;

use crate::core::errors::TunableError;
use crate::core::snapshot::Snapshot;
use crate::core::value::Value;
use crate::serial::{RawMapping, Serializer, SCHEMA_VERSION};

const BOOLEAN: u8 = 0x01;
const INTEGER: u8 = 0x02;
const OCTET_STRING: u8 = 0x04;
const REAL: u8 = 0x09;
const UTF8_STRING: u8 = 0x0c;
const SEQUENCE: u8 = 0x30;

fn der_error(message: impl std::fmt::Display) -> TunableError {
    TunableError::malformed("der", message)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DerSerializer;

impl Serializer for DerSerializer {
    fn serialize(&self, snapshot: &Snapshot, out: &mut dyn Write) -> Result<(), TunableError> {
        out.write_all(&encode(snapshot, true))?;
        Ok(())
    }

    fn deserialize(&self, input: &[u8]) -> Result<RawMapping, TunableError> {
        decode(input)
    }
}

/// Encode a snapshot. Unless `everything` is set, entries excluded from
/// hashing are left out.
pub fn encode(snapshot: &Snapshot, everything: bool) -> Vec<u8> {
    let mut tunables = Vec::new();
    for entry in snapshot.hashed(everything) {
        let mut body = Vec::new();
        write_tlv(&mut body, UTF8_STRING, entry.name.as_bytes());
        write_value(&mut body, &entry.value);
        write_tlv(&mut tunables, SEQUENCE, &body);
    }

    let mut document = Vec::new();
    write_tlv(&mut document, INTEGER, &integer_content(SCHEMA_VERSION));
    write_tlv(&mut document, SEQUENCE, &tunables);

    let mut out = Vec::new();
    write_tlv(&mut out, SEQUENCE, &document);
    out
}

fn write_value(out: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Bool(b) => write_tlv(out, BOOLEAN, &[if *b { 0xff } else { 0x00 }]),
        Value::Int(i) => write_tlv(out, INTEGER, &integer_content(*i)),
        Value::Float(x) => write_tlv(out, REAL, &real_content(*x)),
        Value::Str(s) => write_tlv(out, UTF8_STRING, s.as_bytes()),
        Value::Bytes(b) => write_tlv(out, OCTET_STRING, b),
    }
}

fn write_tlv(out: &mut Vec<u8>, tag: u8, content: &[u8]) {
    out.push(tag);
    write_length(out, content.len());
    out.extend_from_slice(content);
}

fn write_length(out: &mut Vec<u8>, len: usize) {
    if len < 0x80 {
        out.push(len as u8);
        return;
    }
    let bytes = (len as u64).to_be_bytes();
    let skip = bytes.iter().take_while(|&&b| b == 0).count();
    out.push(0x80 | (bytes.len() - skip) as u8);
    out.extend_from_slice(&bytes[skip..]);
}

/// Minimal two's complement, big-endian.
fn integer_content(i: i64) -> Vec<u8> {
    let bytes = i.to_be_bytes();
    let mut start = 0;
    while start < bytes.len() - 1 {
        let redundant = (bytes[start] == 0x00 && bytes[start + 1] & 0x80 == 0)
            || (bytes[start] == 0xff && bytes[start + 1] & 0x80 != 0);
        if !redundant {
            break;
        }
        start += 1;
    }
    bytes[start..].to_vec()
}

fn real_content(x: f64) -> Vec<u8> {
    if x.is_nan() {
        return vec![0x42];
    }
    if x.is_infinite() {
        return vec![if x > 0.0 { 0x40 } else { 0x41 }];
    }
    if x == 0.0 {
        return if x.is_sign_negative() { vec![0x43] } else { Vec::new() };
    }

    let bits = x.to_bits();
    let negative = bits >> 63 == 1;
    let biased = ((bits >> 52) & 0x7ff) as i64;
    let fraction = bits & ((1 << 52) - 1);

    let (mut mantissa, mut exponent) = if biased == 0 {
        (fraction, -1074)
    } else {
        (fraction | (1 << 52), biased - 1075)
    };
    let shift = mantissa.trailing_zeros();
    mantissa >>= shift;
    exponent += i64::from(shift);

    let exponent_bytes = integer_content(exponent);
    let mut first = 0x80 | (exponent_bytes.len() as u8 - 1);
    if negative {
        first |= 0x40;
    }

    let mantissa_bytes = mantissa.to_be_bytes();
    let skip = mantissa_bytes.iter().take_while(|&&b| b == 0).count();

    let mut content = vec![first];
    content.extend_from_slice(&exponent_bytes);
    content.extend_from_slice(&mantissa_bytes[skip..]);
    content
}

/// Decode a document into a name -> value mapping.
pub fn decode(input: &[u8]) -> Result<RawMapping, TunableError> {
    let mut outer = DerReader::new(input);
    let document = outer.expect(SEQUENCE)?;
    outer.finish()?;

    let mut document = DerReader::new(document);
    let found = decode_integer(document.expect(INTEGER)?)?;
    if found != SCHEMA_VERSION {
        return Err(TunableError::SchemaVersionMismatch {
            expected: SCHEMA_VERSION,
            found,
        });
    }

    let mut tunables = DerReader::new(document.expect(SEQUENCE)?);
    document.finish()?;

    let mut mapping = RawMapping::new();
    while !tunables.is_empty() {
        let mut entry = DerReader::new(tunables.expect(SEQUENCE)?);
        let name = decode_utf8(entry.expect(UTF8_STRING)?)?;
        let (tag, content) = entry.read()?;
        entry.finish()?;

        let value = match tag {
            BOOLEAN => match content {
                [0x00] => Value::Bool(false),
                [_] => Value::Bool(true),
                _ => return Err(der_error("BOOLEAN must be one octet")),
            },
            INTEGER => Value::Int(decode_integer(content)?),
            REAL => Value::Float(decode_real(content)?),
            UTF8_STRING => Value::Str(decode_utf8(content)?),
            OCTET_STRING => Value::Bytes(content.to_vec()),
            other => return Err(der_error(format!("unexpected tag 0x{:02x} for `{}`", other, name))),
        };
        mapping.insert(name, value);
    }

    Ok(mapping)
}

fn decode_utf8(content: &[u8]) -> Result<String, TunableError> {
    String::from_utf8(content.to_vec()).map_err(der_error)
}

fn decode_integer(content: &[u8]) -> Result<i64, TunableError> {
    if content.is_empty() || content.len() > 8 {
        return Err(der_error(format!("INTEGER of {} octets", content.len())));
    }
    let mut value: i64 = if content[0] & 0x80 != 0 { -1 } else { 0 };
    for &b in content {
        value = (value << 8) | i64::from(b);
    }
    Ok(value)
}

fn decode_unsigned(content: &[u8]) -> Result<u64, TunableError> {
    if content.len() > 8 {
        return Err(der_error("REAL mantissa too large"));
    }
    Ok(content.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b)))
}

/// `2^exp` for `exp` in the normal range.
fn pow2(exp: i64) -> f64 {
    f64::from_bits(((exp + 1023) as u64) << 52)
}

/// `value * 2^exp`, exact whenever the result is representable.
///
/// `value` is a decoded mantissa, so below `2^64`. Past `2^±2200` the result
/// is infinite or zero whatever the mantissa.
fn scale(mut value: f64, mut exp: i64) -> f64 {
    if value == 0.0 || !value.is_finite() {
        return value;
    }
    if exp > 2200 {
        return value * f64::INFINITY;
    }
    if exp < -2200 {
        return value * 0.0;
    }
    while exp > 1000 {
        value *= pow2(1000);
        exp -= 1000;
        if value.is_infinite() {
            return value;
        }
    }
    while exp < -1000 {
        value *= pow2(-1000);
        exp += 1000;
        if value == 0.0 {
            return value;
        }
    }
    value * pow2(exp)
}

fn decode_real(content: &[u8]) -> Result<f64, TunableError> {
    let Some((&first, rest)) = content.split_first() else {
        return Ok(0.0);
    };

    if first & 0x80 != 0 {
        let negative = first & 0x40 != 0;
        let log2_base = match (first >> 4) & 0x03 {
            0 => 1,
            1 => 3,
            2 => 4,
            _ => return Err(der_error("reserved REAL base")),
        };
        let factor = i64::from((first >> 2) & 0x03);

        let (exponent_len, rest) = match first & 0x03 {
            3 => {
                let (&len, rest) = rest
                    .split_first()
                    .ok_or_else(|| der_error("truncated REAL"))?;
                (usize::from(len), rest)
            }
            n => (usize::from(n) + 1, rest),
        };
        if rest.len() < exponent_len {
            return Err(der_error("truncated REAL exponent"));
        }
        let (exponent, mantissa) = rest.split_at(exponent_len);
        let exponent = decode_integer(exponent)?;
        let mantissa = decode_unsigned(mantissa)?;
        if mantissa == 0 {
            return Ok(if negative { -0.0 } else { 0.0 });
        }

        let binary_exponent = exponent
            .checked_mul(log2_base)
            .and_then(|e| e.checked_add(factor))
            .ok_or_else(|| der_error("REAL exponent overflow"))?;
        let magnitude = scale(mantissa as f64, binary_exponent);
        return Ok(if negative { -magnitude } else { magnitude });
    }

    if first & 0x40 != 0 {
        return match first {
            0x40 => Ok(f64::INFINITY),
            0x41 => Ok(f64::NEG_INFINITY),
            0x42 => Ok(f64::NAN),
            0x43 => Ok(-0.0),
            other => Err(der_error(format!("unknown special REAL 0x{:02x}", other))),
        };
    }

    // ISO 6093 decimal forms NR1..NR3.
    let text = std::str::from_utf8(rest).map_err(der_error)?;
    text.trim()
        .replace(',', ".")
        .parse()
        .map_err(|_| der_error(format!("bad decimal REAL `{}`", text)))
}

struct DerReader<'a> {
    input: &'a [u8],
}

impl<'a> DerReader<'a> {
    fn new(input: &'a [u8]) -> Self {
        DerReader { input }
    }

    fn is_empty(&self) -> bool {
        self.input.is_empty()
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], TunableError> {
        if self.input.len() < n {
            return Err(der_error("truncated document"));
        }
        let (head, tail) = self.input.split_at(n);
        self.input = tail;
        Ok(head)
    }

    fn read(&mut self) -> Result<(u8, &'a [u8]), TunableError> {
        let tag = self.take(1)?[0];
        if tag & 0x1f == 0x1f {
            return Err(der_error("high tag numbers are not supported"));
        }

        let first = self.take(1)?[0];
        let len = if first < 0x80 {
            usize::from(first)
        } else {
            let n = usize::from(first & 0x7f);
            if n == 0 || n > 8 {
                return Err(der_error("unsupported length encoding"));
            }
            let len = self
                .take(n)?
                .iter()
                .fold(0u64, |acc, &b| (acc << 8) | u64::from(b));
            usize::try_from(len).map_err(der_error)?
        };

        Ok((tag, self.take(len)?))
    }

    fn expect(&mut self, tag: u8) -> Result<&'a [u8], TunableError> {
        let (found, content) = self.read()?;
        if found != tag {
            return Err(der_error(format!(
                "expected tag 0x{:02x}, found 0x{:02x}",
                tag, found
            )));
        }
        Ok(content)
    }

    fn finish(&self) -> Result<(), TunableError> {
        if self.input.is_empty() {
            Ok(())
        } else {
            Err(der_error(format!("{} trailing octets", self.input.len())))
        }
    }
}
