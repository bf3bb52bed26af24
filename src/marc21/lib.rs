// @see https://www.loc.gov/standards/marcxml/
#[macro_use]
extern crate strum_macros;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

#[derive(Debug, EnumDiscriminants)]
pub enum Marc21Error {
    IOError(std::io::Error),                     // Could not read file.
    QuickXMLError(quick_xml::Error),             // Malformed XML.
    MissingAttribute(&'static str, &'static str), // Element and the attribute it requires.
    InvalidSubfieldCode(String),                 // Subfield codes are a single character.
    UnexpectedEof,                               // Document ended inside a record.
}

impl fmt::Display for Marc21Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Marc21Error::IOError(error) => write!(f, "Failed to read MARC21 XML: {}", error),
            Marc21Error::QuickXMLError(error) => write!(f, "Malformed MARC21 XML: {}", error),
            Marc21Error::MissingAttribute(element, attribute) => write!(
                f,
                "Element '{}' is missing required attribute '{}'",
                element, attribute
            ),
            Marc21Error::InvalidSubfieldCode(code) => {
                write!(f, "Invalid subfield code '{}'", code)
            }
            Marc21Error::UnexpectedEof => write!(f, "Unexpected end of file inside a record"),
        }
    }
}

impl std::error::Error for Marc21Error {}

impl From<quick_xml::Error> for Marc21Error {
    fn from(error: quick_xml::Error) -> Self {
        Marc21Error::QuickXMLError(error)
    }
}

impl From<std::io::Error> for Marc21Error {
    fn from(error: std::io::Error) -> Self {
        Marc21Error::IOError(error)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ControlField {
    pub tag: String,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Subfield {
    pub code: char,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DataField {
    pub tag: String,
    pub ind1: char,
    pub ind2: char,
    pub subfields: Vec<Subfield>,
}

impl DataField {
    // First subfield with the given code.
    pub fn subfield(&self, code: char) -> Option<&str> {
        self.subfields(code).next()
    }

    pub fn subfields(&self, code: char) -> impl Iterator<Item = &str> {
        self.subfields
            .iter()
            .filter(move |subfield| subfield.code == code)
            .map(|subfield| subfield.value.as_str())
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Marc21Record {
    pub leader: Option<String>,
    pub control_fields: Vec<ControlField>,
    pub data_fields: Vec<DataField>,
}

impl Marc21Record {
    pub fn control_field(&self, tag: &str) -> Option<&str> {
        self.control_fields
            .iter()
            .find(|field| field.tag == tag)
            .map(|field| field.value.as_str())
    }

    pub fn data_fields<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a DataField> {
        self.data_fields.iter().filter(move |field| field.tag == tag)
    }

    pub fn from_path(path: &Path) -> Result<Vec<Marc21Record>, Marc21Error> {
        let file = File::open(path)?;
        load(BufReader::new(file))
    }

    pub fn parse(content: &str) -> Result<Vec<Marc21Record>, Marc21Error> {
        load(content.as_bytes())
    }
}

// Get the unescaped value of the attribute with the given name if present.
fn attribute<B: BufRead>(
    reader: &Reader<B>,
    element: &BytesStart,
    name: &str,
) -> Result<Option<String>, Marc21Error> {
    for attribute in element.attributes() {
        let attribute = attribute?;
        if attribute.key == name.as_bytes() {
            return Ok(Some(attribute.unescape_and_decode_value(reader)?));
        }
    }
    Ok(None)
}

fn required_attribute<B: BufRead>(
    reader: &Reader<B>,
    element: &BytesStart,
    element_name: &'static str,
    name: &'static str,
) -> Result<String, Marc21Error> {
    attribute(reader, element, name)?.ok_or(Marc21Error::MissingAttribute(element_name, name))
}

// Blank or absent indicators are a space.
fn indicator<B: BufRead>(
    reader: &Reader<B>,
    element: &BytesStart,
    name: &str,
) -> Result<char, Marc21Error> {
    Ok(attribute(reader, element, name)?
        .and_then(|value| value.chars().next())
        .unwrap_or(' '))
}

fn subfield_code<B: BufRead>(reader: &Reader<B>, element: &BytesStart) -> Result<char, Marc21Error> {
    let code = required_attribute(reader, element, "subfield", "code")?;
    let mut chars = code.chars();
    match (chars.next(), chars.next()) {
        (Some(code), None) => Ok(code),
        _ => Err(Marc21Error::InvalidSubfieldCode(code)),
    }
}

// Reads the character data up to the closing tag of the current element,
// markup nested inside it is dropped along with its content.
fn text<B: BufRead>(reader: &mut Reader<B>) -> Result<String, Marc21Error> {
    let mut value = String::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event(&mut buf)? {
            // The reader hands CDATA content over escaped, unescaping it
            // yields the section verbatim.
            Event::Text(ref e) | Event::CData(ref e) => {
                value.push_str(&e.unescape_and_decode(reader)?)
            }
            Event::Start(ref e) => reader.read_to_end(e.name(), &mut Vec::new())?,
            Event::End(_) => break,
            Event::Eof => return Err(Marc21Error::UnexpectedEof),
            _ => (),
        }
        buf.clear();
    }
    Ok(value)
}

fn subfields<B: BufRead>(reader: &mut Reader<B>) -> Result<Vec<Subfield>, Marc21Error> {
    let mut subfields = Vec::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event(&mut buf)? {
            Event::Start(ref e) if e.local_name() == b"subfield" => {
                let code = subfield_code(reader, e)?;
                let value = text(reader)?;
                subfields.push(Subfield { code, value });
            }
            Event::Empty(ref e) if e.local_name() == b"subfield" => {
                let code = subfield_code(reader, e)?;
                subfields.push(Subfield {
                    code,
                    value: String::new(),
                });
            }
            // Not part of a datafield, skip it entirely.
            Event::Start(ref e) => reader.read_to_end(e.name(), &mut Vec::new())?,
            // Closing datafield.
            Event::End(_) => break,
            Event::Eof => return Err(Marc21Error::UnexpectedEof),
            _ => (),
        }
        buf.clear();
    }
    Ok(subfields)
}

fn data_field<B: BufRead>(
    reader: &mut Reader<B>,
    element: &BytesStart,
    empty: bool,
) -> Result<DataField, Marc21Error> {
    let tag = required_attribute(reader, element, "datafield", "tag")?;
    let ind1 = indicator(reader, element, "ind1")?;
    let ind2 = indicator(reader, element, "ind2")?;
    let subfields = if empty { Vec::new() } else { subfields(reader)? };
    Ok(DataField {
        tag,
        ind1,
        ind2,
        subfields,
    })
}

fn record<B: BufRead>(reader: &mut Reader<B>) -> Result<Marc21Record, Marc21Error> {
    let mut record = Marc21Record::default();
    let mut buf = Vec::new();
    loop {
        match reader.read_event(&mut buf)? {
            Event::Start(ref e) => match e.local_name() {
                b"leader" => record.leader = Some(text(reader)?),
                b"controlfield" => {
                    let tag = required_attribute(reader, e, "controlfield", "tag")?;
                    let value = text(reader)?;
                    record.control_fields.push(ControlField { tag, value });
                }
                b"datafield" => record.data_fields.push(data_field(reader, e, false)?),
                // Anything else is not part of the MARC21 slim schema, skip it entirely.
                _ => reader.read_to_end(e.name(), &mut Vec::new())?,
            },
            Event::Empty(ref e) => match e.local_name() {
                b"leader" => record.leader = Some(String::new()),
                b"controlfield" => {
                    let tag = required_attribute(reader, e, "controlfield", "tag")?;
                    record.control_fields.push(ControlField {
                        tag,
                        value: String::new(),
                    });
                }
                b"datafield" => record.data_fields.push(data_field(reader, e, true)?),
                _ => (),
            },
            // Closing record.
            Event::End(_) => break,
            Event::Eof => return Err(Marc21Error::UnexpectedEof),
            _ => (),
        }
        buf.clear();
    }
    Ok(record)
}

// Decodes every record in the document, the root may either be a
// <collection> of records or a single <record>.
pub fn load<B: BufRead>(source: B) -> Result<Vec<Marc21Record>, Marc21Error> {
    let mut reader = Reader::from_reader(source);
    let mut records = Vec::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event(&mut buf)? {
            Event::Start(ref e) if e.local_name() == b"record" => {
                records.push(record(&mut reader)?);
            }
            Event::Empty(ref e) if e.local_name() == b"record" => {
                records.push(Marc21Record::default());
            }
            Event::Eof => break,
            _ => (),
        }
        buf.clear();
    }
    Ok(records)
}
