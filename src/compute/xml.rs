//! Minimal element tree for the compute API's XML bodies.
//!
//! Requests are built as [`Element`]s and rendered through [`Document`];
//! responses are parsed back into an [`Element`] and flattened into a
//! [`Value`] mapping with [`Element::to_value`].

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Error, Result};

/// Namespace of the v1.1 compute API documents.
pub const XMLNS_11: &str = "http://docs.openstack.org/compute/api/v1.1";

/// A value produced by flattening an XML element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Bool(bool),
    Text(String),
    Map(BTreeMap<String, Value>),
}

impl Value {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Text(s) => f.write_str(s),
            Value::Map(m) => {
                f.write_str("{")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}={v}")?;
                }
                f.write_str("}")
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    /// Text before the first child element
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    /// Element carrying an `xmlns` declaration.
    pub fn with_namespace(tag: impl Into<String>, namespace: &str) -> Self {
        Self::new(tag).with_attr("xmlns", namespace)
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.add_attr(name, value);
        self
    }

    /// Sets an attribute, replacing any existing value for the same name.
    pub fn add_attr(&mut self, name: impl Into<String>, value: impl ToString) {
        let name = name.into();
        let value = value.to_string();
        match self.attrs.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name, value)),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn append(&mut self, child: Element) {
        self.children.push(child);
    }

    pub fn child(&self, tag: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.tag == tag)
    }

    /// Parse a document into its root element. Namespace prefixes are dropped from tags.
    pub fn parse(xml: &str) -> Result<Element> {
        let mut reader = Reader::from_str(xml);
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let event = match reader.read_event() {
                Ok(event) => event,
                Err(e) => {
                    return Err(Error::Xml(format!(
                        "malformed document at byte {}: {e}",
                        reader.buffer_position()
                    )));
                }
            };

            match event {
                Event::Start(start) => {
                    if stack.is_empty() && root.is_some() {
                        return Err(Error::Xml("multiple root elements".to_string()));
                    }
                    stack.push(Element::from_start(&start)?);
                }
                Event::Empty(start) => {
                    let element = Element::from_start(&start)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| Error::Xml("unbalanced end tag".to_string()))?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(text) => {
                    let text = text.unescape().map_err(xml_error)?;
                    push_text(&mut stack, &text)?;
                }
                Event::CData(data) => {
                    let text = String::from_utf8_lossy(&data).into_owned();
                    push_text(&mut stack, &text)?;
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(Error::Xml("unexpected end of document".to_string()));
        }
        root.ok_or_else(|| Error::Xml("document has no root element".to_string()))
    }

    fn from_start(start: &BytesStart<'_>) -> Result<Element> {
        let mut element = Element::new(String::from_utf8_lossy(start.local_name().as_ref()));
        for attr in start.attributes() {
            let attr = attr.map_err(xml_error)?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value().map_err(xml_error)?.into_owned();
            element.attrs.push((key, value));
        }
        Ok(element)
    }

    /// Flatten the element into a [`Value`].
    ///
    /// `xmlns*` attributes are skipped. A leaf typed through an attribute valued
    /// `bool`, `int` or `long` is converted accordingly; any other leaf yields its
    /// text, or its attribute map when it has no text. Elements with children
    /// yield a map of attributes plus one entry per child tag.
    pub fn to_value(&self) -> Result<Value> {
        let mut map = BTreeMap::new();
        let mut bool_flag = false;
        let mut int_flag = false;

        for (key, value) in &self.attrs {
            if key.starts_with("xmlns") {
                continue;
            }
            match value.as_str() {
                "bool" => bool_flag = true,
                "int" | "long" => int_flag = true,
                _ => {}
            }
            map.insert(key.clone(), Value::Text(value.clone()));
        }

        if self.children.is_empty() {
            if bool_flag {
                return Ok(Value::Bool(self.text.eq_ignore_ascii_case("true")));
            }
            if int_flag {
                return self.text.trim().parse().map(Value::Int).map_err(|_| {
                    Error::Xml(format!(
                        "<{}> is typed as an integer but contains '{}'",
                        self.tag, self.text
                    ))
                });
            }
            if !self.text.is_empty() {
                return Ok(Value::Text(self.text.clone()));
            }
            return Ok(Value::Map(map));
        }

        for child in &self.children {
            map.insert(child.tag.clone(), child.to_value()?);
        }
        Ok(Value::Map(map))
    }

    fn write<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        let mut start = BytesStart::new(self.tag.as_str());
        for (key, value) in &self.attrs {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if self.children.is_empty() && self.text.is_empty() {
            writer.write_event(Event::Empty(start)).map_err(xml_error)?;
            return Ok(());
        }

        writer.write_event(Event::Start(start)).map_err(xml_error)?;
        if !self.text.is_empty() {
            writer
                .write_event(Event::Text(BytesText::new(&self.text)))
                .map_err(xml_error)?;
        }
        for child in &self.children {
            child.write(writer)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new(self.tag.as_str())))
            .map_err(xml_error)?;
        Ok(())
    }
}

/// A complete XML document with declaration, ready to send as a request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    root: Element,
}

impl Document {
    pub fn new(root: Element) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn to_xml(&self) -> Result<String> {
        let mut writer = Writer::new(Vec::new());
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(xml_error)?;
        self.root.write(&mut writer)?;
        String::from_utf8(writer.into_inner()).map_err(xml_error)
    }
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
    } else if root.is_some() {
        return Err(Error::Xml("multiple root elements".to_string()));
    } else {
        *root = Some(element);
    }
    Ok(())
}

fn push_text(stack: &mut [Element], text: &str) -> Result<()> {
    match stack.last_mut() {
        Some(current) if current.children.is_empty() => current.text.push_str(text),
        Some(_) => {}
        None if text.trim().is_empty() => {}
        None => {
            return Err(Error::Xml(format!(
                "text outside the root element: '{}'",
                text.trim()
            )));
        }
    }
    Ok(())
}

fn xml_error(e: impl fmt::Display) -> Error {
    Error::Xml(e.to_string())
}
