//! Tagged-markup documents.
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <TunablesList>
//!   <version>1</version>
//!   <tunables>
//!     <Tunable>
//!       <name>Otsu</name>
//!       <value>
//!         <floatValue>14.0</floatValue>
//!       </value>
//!     </Tunable>
//!   </tunables>
//! </TunablesList>
//! ```
//!
//! Booleans are written as an empty child, `<boolValue><true/></boolValue>`.

use std::fmt;
use std::io::Write;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::core::errors::TunableError;
use crate::core::snapshot::Snapshot;
use crate::core::value::{Value, ValueType};
use crate::serial::{utf8, RawMapping, Serializer, SCHEMA_VERSION};

const ROOT: &str = "TunablesList";
const ENTRY: &str = "Tunable";

fn xml_error(e: impl fmt::Display) -> TunableError {
    TunableError::malformed("xml", e)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct XmlSerializer;

impl Serializer for XmlSerializer {
    fn serialize(&self, snapshot: &Snapshot, out: &mut dyn Write) -> Result<(), TunableError> {
        let mut writer = Writer::new_with_indent(&mut *out, b' ', 2);

        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(xml_error)?;
        start(&mut writer, ROOT)?;
        leaf(&mut writer, "version", &SCHEMA_VERSION.to_string())?;
        start(&mut writer, "tunables")?;

        for entry in snapshot.entries() {
            start(&mut writer, ENTRY)?;
            leaf(&mut writer, "name", &entry.name)?;
            start(&mut writer, "value")?;

            let tag = entry.value_type().tag();
            match &entry.value {
                Value::Bool(b) => {
                    start(&mut writer, tag)?;
                    writer
                        .write_event(Event::Empty(BytesStart::new(if *b { "true" } else { "false" })))
                        .map_err(xml_error)?;
                    end(&mut writer, tag)?;
                }
                Value::Bytes(b) => leaf(&mut writer, tag, &hex::encode(b))?,
                other => leaf(&mut writer, tag, &other.to_string())?,
            }

            end(&mut writer, "value")?;
            end(&mut writer, ENTRY)?;
        }

        end(&mut writer, "tunables")?;
        end(&mut writer, ROOT)?;
        writeln!(out)?;
        Ok(())
    }

    fn deserialize(&self, input: &[u8]) -> Result<RawMapping, TunableError> {
        let text = utf8("xml", input)?;
        let mut reader = Reader::from_str(text);
        let mut parser = DocumentParser::default();

        loop {
            match reader.read_event().map_err(xml_error)? {
                Event::Start(e) => parser.start(element_name(&e)),
                Event::Empty(e) => {
                    let name = element_name(&e);
                    parser.start(name.clone());
                    parser.end(&name)?;
                }
                Event::Text(e) => parser.text(&e.unescape().map_err(xml_error)?),
                Event::CData(e) => parser.text(utf8("xml", &e)?),
                Event::End(e) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    parser.end(&name)?;
                }
                Event::Eof => break,
                _ => {}
            }
        }

        parser.finish()
    }
}

fn start<W: Write>(writer: &mut Writer<W>, name: &str) -> Result<(), TunableError> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .map_err(xml_error)
}

fn end<W: Write>(writer: &mut Writer<W>, name: &str) -> Result<(), TunableError> {
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(xml_error)
}

fn leaf<W: Write>(writer: &mut Writer<W>, name: &str, text: &str) -> Result<(), TunableError> {
    start(writer, name)?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(xml_error)?;
    end(writer, name)
}

fn element_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).to_string()
}

/// Element names whose text content is meaningful.
fn is_leaf(name: &str) -> bool {
    name == "version" || name == "name" || ValueType::from_tag(name).is_some()
}

#[derive(Default)]
struct DocumentParser {
    stack: Vec<String>,
    text: String,
    version: Option<i64>,
    name: Option<String>,
    value: Option<Value>,
    mapping: RawMapping,
}

impl DocumentParser {
    fn start(&mut self, name: String) {
        self.stack.push(name);
        self.text.clear();
    }

    fn text(&mut self, text: &str) {
        if self.stack.last().is_some_and(|top| is_leaf(top)) {
            self.text.push_str(text);
        }
    }

    fn end(&mut self, name: &str) -> Result<(), TunableError> {
        self.stack.pop();
        let text = std::mem::take(&mut self.text);
        let parent = self.stack.last().map(String::as_str);

        match (name, parent) {
            ("version", Some(ROOT)) => {
                let version = text
                    .trim()
                    .parse()
                    .map_err(|_| xml_error(format!("bad version `{}`", text)))?;
                self.version = Some(version);
            }
            ("name", Some(ENTRY)) => self.name = Some(text),
            ("true", Some("boolValue")) => self.value = Some(Value::Bool(true)),
            ("false", Some("boolValue")) => self.value = Some(Value::Bool(false)),
            ("boolValue", _) => {
                if self.value.is_none() {
                    let b = match text.trim() {
                        "true" => true,
                        "false" => false,
                        other => return Err(xml_error(format!("bad boolean `{}`", other))),
                    };
                    self.value = Some(Value::Bool(b));
                }
            }
            ("intValue", _) => {
                let i = text
                    .trim()
                    .parse()
                    .map_err(|_| xml_error(format!("bad integer `{}`", text)))?;
                self.value = Some(Value::Int(i));
            }
            ("floatValue", _) => {
                let x = text
                    .trim()
                    .parse()
                    .map_err(|_| xml_error(format!("bad float `{}`", text)))?;
                self.value = Some(Value::Float(x));
            }
            ("stringValue", _) => self.value = Some(Value::Str(text)),
            ("bytesValue", _) => {
                let bytes = hex::decode(text.trim()).map_err(xml_error)?;
                self.value = Some(Value::Bytes(bytes));
            }
            (ENTRY, _) => {
                let name = self
                    .name
                    .take()
                    .ok_or_else(|| xml_error("tunable without a name"))?;
                let value = self
                    .value
                    .take()
                    .ok_or_else(|| xml_error(format!("tunable `{}` without a value", name)))?;
                self.mapping.insert(name, value);
            }
            _ => {}
        }
        Ok(())
    }

    fn finish(self) -> Result<RawMapping, TunableError> {
        match self.version {
            None => Err(xml_error("missing version")),
            Some(found) if found != SCHEMA_VERSION => Err(TunableError::SchemaVersionMismatch {
                expected: SCHEMA_VERSION,
                found,
            }),
            Some(_) => Ok(self.mapping),
        }
    }
}
