// Copyright 2023 Viktor Reusch
//
// This file is part of tcx_garmin_convert.
//
// tcx_garmin_convert is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or (at your
// option) any later version.
//
// tcx_garmin_convert is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License
// for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with tcx_garmin_convert. If not, see <https://www.gnu.org/licenses/>.

//! Minimal mutable XML tree.
//!
//! The tree only keeps what TCX files need: elements, their attributes, and
//! text. Comments, processing instructions, and the document type are dropped
//! while parsing.

use std::io::{self, BufReader, Read, Write};

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use thiserror::Error;

/// This line is prepended to every written document.
const XML_HEAD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;
/// Indentation character of written documents.
const INDENT_CHAR: u8 = b' ';
/// Number of [`INDENT_CHAR`]s per nesting level.
const INDENT_SIZE: usize = 2;
/// Deepest element nesting accepted by [`Document::parse`].
///
/// Lookups, writing, and dropping recurse once per level. TCX itself needs
/// fewer than ten levels.
pub const MAX_DEPTH: usize = 256;

/// Error returned when reading or writing a [`Document`].
#[derive(Error, Debug)]
pub enum XmlError {
    /// The XML is not well-formed.
    #[error("malformed XML: {0}")]
    Syntax(#[from] quick_xml::Error),
    /// The input contains no element at all.
    #[error("document has no root element")]
    NoRoot,
    /// The input ended inside of an element.
    #[error("element <{0}> is never closed")]
    Unclosed(String),
    /// There is a second root element or text after the root element.
    #[error("unexpected content after the root element")]
    TrailingContent,
    /// Elements are nested deeper than [`MAX_DEPTH`].
    #[error("elements are nested deeper than {} levels", MAX_DEPTH)]
    TooDeep,
    /// Writing the output failed.
    #[error("I/O failed: {0}")]
    Io(#[from] io::Error),
}

/// A child of an [`Element`].
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// A single XML element.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Element {
    /// Qualified name, i.e., including a namespace prefix if there is one.
    pub name: String,
    /// Attributes in document order.
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

/// A parsed XML document consisting of exactly one root element.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    pub root: Element,
}

impl Document {
    /// Parse a complete XML document from `source`.
    pub fn parse(source: impl Read) -> Result<Self, XmlError> {
        let mut reader = Reader::from_reader(BufReader::new(source));
        reader.trim_text(true);

        let mut stack: Vec<Element> = vec![];
        let mut root = None;
        let mut buf = vec![];
        loop {
            let event = reader.read_event_into(&mut buf)?;
            match event {
                Event::Start(ref start) | Event::Empty(ref start) => {
                    let element = read_start(&reader, start)?;
                    if root.is_some() {
                        return Err(XmlError::TrailingContent);
                    }
                    if stack.len() >= MAX_DEPTH {
                        return Err(XmlError::TooDeep);
                    }
                    if matches!(event, Event::Start(_)) {
                        stack.push(element);
                    } else {
                        close(element, &mut stack, &mut root);
                    }
                }
                // quick-xml already checked that the end tag matches.
                Event::End(_) => {
                    if let Some(element) = stack.pop() {
                        close(element, &mut stack, &mut root);
                    }
                }
                Event::Text(text) => {
                    let text = text.unescape()?.into_owned();
                    push_text(text, &mut stack, &root)?;
                }
                Event::CData(data) => {
                    let text = reader.decoder().decode(&data)?.into_owned();
                    push_text(text, &mut stack, &root)?;
                }
                Event::Eof => break,
                Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
            }
            buf.clear();
        }

        if let Some(open) = stack.pop() {
            return Err(XmlError::Unclosed(open.name));
        }
        root.map(|root| Document { root }).ok_or(XmlError::NoRoot)
    }

    /// Write the document including an XML declaration to `sink`.
    pub fn write(&self, mut sink: impl Write) -> Result<(), XmlError> {
        writeln!(&mut sink, "{XML_HEAD}")?;
        let mut writer = Writer::new_with_indent(&mut sink, INDENT_CHAR, INDENT_SIZE);
        write_element(&mut writer, &self.root)?;
        writeln!(&mut sink)?;
        Ok(())
    }
}

/// Convert a start tag into an element without children.
fn read_start<R>(reader: &Reader<R>, start: &BytesStart) -> Result<Element, XmlError> {
    let decoder = reader.decoder();
    let name = decoder.decode(start.name().as_ref())?.into_owned();
    let mut attributes = vec![];
    for attribute in start.attributes() {
        let attribute = attribute.map_err(quick_xml::Error::from)?;
        let key = decoder.decode(attribute.key.as_ref())?.into_owned();
        let value = attribute.unescape_value()?.into_owned();
        attributes.push((key, value));
    }

    Ok(Element {
        name,
        attributes,
        children: vec![],
    })
}

/// Attach a completed `element` to its parent or make it the `root`.
fn close(element: Element, stack: &mut [Element], root: &mut Option<Element>) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(Node::Element(element)),
        None => *root = Some(element),
    }
}

/// Attach `text` to the currently open element.
///
/// Text outside of the root element is an error. Whitespace has already been
/// trimmed by the reader.
fn push_text(text: String, stack: &mut [Element], root: &Option<Element>) -> Result<(), XmlError> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(Node::Text(text));
            Ok(())
        }
        None if root.is_some() => Err(XmlError::TrailingContent),
        // Stray text before the root is not XML either, but quick-xml lets it
        // through. Treat it like a missing root.
        None => Err(XmlError::NoRoot),
    }
}

/// Recursively serialize `element`.
fn write_element<W: Write>(writer: &mut Writer<W>, element: &Element) -> Result<(), XmlError> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    for child in &element.children {
        match child {
            Node::Element(child) => write_element(writer, child)?,
            Node::Text(text) => writer.write_event(Event::Text(BytesText::new(text)))?,
        }
    }
    writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
    Ok(())
}

/// Strip the namespace prefix from a qualified `name`.
fn local_name(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}

impl Element {
    /// Create an empty element called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Element {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Create an element called `name` containing only `text`.
    pub fn with_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Element {
            name: name.into(),
            children: vec![Node::Text(text.into())],
            ..Default::default()
        }
    }

    /// Name without namespace prefix.
    pub fn local_name(&self) -> &str {
        local_name(&self.name)
    }

    /// Whether the local part of this element's name equals `name`.
    pub fn is(&self, name: &str) -> bool {
        self.local_name() == name
    }

    /// Value of the attribute with the exact (qualified) name `key`.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set attribute `key` to `value`, keeping its position if it exists.
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some((_, old)) => *old = value,
            None => self.attributes.push((key, value)),
        }
    }

    /// Remove attribute `key` and return its former value.
    pub fn remove_attribute(&mut self, key: &str) -> Option<String> {
        let index = self.attributes.iter().position(|(k, _)| k == key)?;
        Some(self.attributes.remove(index).1)
    }

    /// Concatenated text of the direct text children.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|child| match child {
                Node::Text(text) => Some(text.as_str()),
                Node::Element(_) => None,
            })
            .collect()
    }

    /// Direct child elements in document order.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|child| match child {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        })
    }

    /// First direct child element called `name`.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.child_elements().find(|element| element.is(name))
    }

    /// Index into [`Element::children`] of the first direct child element
    /// called `name`.
    pub fn child_position(&self, name: &str) -> Option<usize> {
        self.children
            .iter()
            .position(|child| matches!(child, Node::Element(element) if element.is(name)))
    }

    /// Insert `element` into [`Element::children`] at `index`.
    ///
    /// The element formerly at `index` ends up directly behind the new one.
    ///
    /// # Panics
    /// Panics if `index > children.len()`.
    pub fn insert_child(&mut self, index: usize, element: Element) {
        self.children.insert(index, Node::Element(element));
    }

    /// Append `element` as the last child.
    pub fn push_child(&mut self, element: Element) {
        self.children.push(Node::Element(element));
    }

    /// Detach the first direct child element called `name`.
    pub fn remove_child(&mut self, name: &str) -> Option<Element> {
        let index = self.child_position(name)?;
        match self.children.remove(index) {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        }
    }

    /// First element called `name` in document order, including `self`.
    pub fn find(&self, name: &str) -> Option<&Element> {
        if self.is(name) {
            return Some(self);
        }
        self.child_elements().find_map(|child| child.find(name))
    }

    /// Mutable variant of [`Element::find`].
    pub fn find_mut(&mut self, name: &str) -> Option<&mut Element> {
        if self.is(name) {
            return Some(self);
        }
        self.children.iter_mut().find_map(|child| match child {
            Node::Element(element) => element.find_mut(name),
            Node::Text(_) => None,
        })
    }

    /// All descendants called `name` in document order.
    ///
    /// The search does not descend into matching elements.
    pub fn find_all_mut(&mut self, name: &str) -> Vec<&mut Element> {
        let mut found = vec![];
        collect_named(self, name, &mut found);
        found
    }
}

/// Push all descendants of `element` called `name` to `found`.
fn collect_named<'a>(element: &'a mut Element, name: &str, found: &mut Vec<&'a mut Element>) {
    for child in element.children.iter_mut() {
        if let Node::Element(child) = child {
            if child.is(name) {
                found.push(child);
            } else {
                collect_named(child, name, found);
            }
        }
    }
}
