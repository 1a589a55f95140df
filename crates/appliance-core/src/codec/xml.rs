//! Namespace-aware XML payloads.
//!
//! Decoding resolves prefixes to full namespace names so callers look elements up
//! by `(namespace, local name)` regardless of the prefixes the appliance chose.
//! Encoding assigns `ns0`, `ns1`, ... in first-use order and declares them all on
//! the root element. Namespaced attributes keep their namespace through a
//! decode/encode cycle. Text is kept verbatim; only whitespace-only text nodes
//! (indentation between elements) are dropped.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::{NsReader, Writer};

use super::{is_blank, PayloadCodec};
use crate::error::{Error, Result};

const XML_MEDIA_TYPE: &str = "application/xml";

// Bound to the `xml` prefix by definition; never redeclared.
const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// Value of a field in an element skeleton.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlValue {
    /// Element without content
    Empty,
    /// Element with text content
    Text(String),
    /// Element with ordered child elements
    Map(Vec<(String, XmlValue)>),
}

impl XmlValue {
    /// Text value.
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Text value when present, [`XmlValue::Empty`] otherwise.
    pub fn optional(value: Option<impl Into<String>>) -> Self {
        value.map_or(Self::Empty, Self::text)
    }

    /// Ordered nested fields.
    pub fn map<K: Into<String>>(fields: impl IntoIterator<Item = (K, XmlValue)>) -> Self {
        Self::Map(
            fields
                .into_iter()
                .map(|(name, value)| (name.into(), value))
                .collect(),
        )
    }
}

/// An attribute with its resolved namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    /// Namespace name, `None` for plain attributes
    pub namespace: Option<String>,
    /// Local name
    pub name: String,
    /// Unescaped value
    pub value: String,
}

impl XmlAttribute {
    fn qualified_name(&self, namespaces: &[&str]) -> String {
        match self.namespace.as_deref() {
            None => self.name.clone(),
            Some(XML_NS) => format!("xml:{}", self.name),
            Some(ns) => namespaces
                .iter()
                .position(|known| *known == ns)
                .map_or_else(|| self.name.clone(), |index| format!("ns{index}:{}", self.name)),
        }
    }
}

/// An XML element with resolved namespace, ordered attributes and children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    /// Namespace name (not the prefix)
    pub namespace: Option<String>,
    /// Local name
    pub name: String,
    /// Attributes in document order, namespace declarations excluded
    pub attributes: Vec<XmlAttribute>,
    /// Child elements in document order
    pub children: Vec<XmlElement>,
    /// Text content
    pub text: Option<String>,
}

impl XmlElement {
    /// Element without namespace.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Element in `namespace`.
    pub fn namespaced(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            name: name.into(),
            ..Self::default()
        }
    }

    /// Resource skeleton: a root element carrying `name` and `description` attributes.
    ///
    /// Fields are added with [`XmlElement::with_fields`] in the order the appliance
    /// validates them.
    pub fn skeleton(
        namespace: Option<&str>,
        tag: &str,
        name: &str,
        description: &str,
    ) -> Self {
        let element = match namespace {
            Some(ns) => Self::namespaced(ns, tag),
            None => Self::new(tag),
        };
        element
            .with_attribute("name", name)
            .with_attribute("description", description)
    }

    /// Append un-namespaced child elements built from ordered fields.
    #[must_use]
    pub fn with_fields<K: Into<String>>(
        mut self,
        fields: impl IntoIterator<Item = (K, XmlValue)>,
    ) -> Self {
        for (name, value) in fields {
            self.children.push(Self::from_value(name.into(), value));
        }
        self
    }

    fn from_value(name: String, value: XmlValue) -> Self {
        let mut element = Self::new(name);
        match value {
            XmlValue::Empty => {}
            XmlValue::Text(text) => element.text = Some(text),
            XmlValue::Map(fields) => {
                element.children = fields
                    .into_iter()
                    .map(|(name, value)| Self::from_value(name, value))
                    .collect();
            }
        }
        element
    }

    /// Add an attribute.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push(XmlAttribute {
            namespace: None,
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Add an attribute in `namespace`.
    #[must_use]
    pub fn with_namespaced_attribute(
        mut self,
        namespace: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.attributes.push(XmlAttribute {
            namespace: Some(namespace.into()),
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Set the text content.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Add a child element.
    #[must_use]
    pub fn with_child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    /// Returns true if this element has the given namespace and local name.
    #[must_use]
    pub fn is_named(&self, namespace: Option<&str>, name: &str) -> bool {
        self.name == name && self.namespace.as_deref() == namespace
    }

    /// First direct child with the given name.
    #[must_use]
    pub fn child(&self, namespace: Option<&str>, name: &str) -> Option<&Self> {
        self.children
            .iter()
            .find(|child| child.is_named(namespace, name))
    }

    /// Direct children with the given name.
    pub fn children<'a>(
        &'a self,
        namespace: Option<&'a str>,
        name: &'a str,
    ) -> impl Iterator<Item = &'a Self> + 'a {
        self.children
            .iter()
            .filter(move |child| child.is_named(namespace, name))
    }

    /// All descendants with the given name, in document order.
    #[must_use]
    pub fn descendants(&self, namespace: Option<&str>, name: &str) -> Vec<&Self> {
        let mut found = Vec::new();
        self.collect_descendants(namespace, name, &mut found);
        found
    }

    fn collect_descendants<'a>(
        &'a self,
        namespace: Option<&str>,
        name: &str,
        found: &mut Vec<&'a Self>,
    ) {
        for child in &self.children {
            if child.is_named(namespace, name) {
                found.push(child);
            }
            child.collect_descendants(namespace, name, found);
        }
    }

    /// Returns true if a direct child with the given name exists.
    #[must_use]
    pub fn has_child(&self, namespace: Option<&str>, name: &str) -> bool {
        self.child(namespace, name).is_some()
    }

    /// Value of the plain (un-namespaced) attribute `name`.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.namespaced_attribute(None, name)
    }

    /// Attribute value by namespace and local name.
    #[must_use]
    pub fn namespaced_attribute(&self, namespace: Option<&str>, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attribute| attribute.name == name && attribute.namespace.as_deref() == namespace)
            .map(|attribute| attribute.value.as_str())
    }

    /// Text content.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Text content of the first direct child with the given name.
    #[must_use]
    pub fn child_text(&self, namespace: Option<&str>, name: &str) -> Option<&str> {
        self.child(namespace, name).and_then(Self::text)
    }

    fn collect_namespaces<'a>(&'a self, namespaces: &mut Vec<&'a str>) {
        let attribute_namespaces = self
            .attributes
            .iter()
            .filter_map(|attribute| attribute.namespace.as_deref());
        for ns in self.namespace.as_deref().into_iter().chain(attribute_namespaces) {
            if ns != XML_NS && !namespaces.contains(&ns) {
                namespaces.push(ns);
            }
        }
        for child in &self.children {
            child.collect_namespaces(namespaces);
        }
    }

    fn qualified_name(&self, namespaces: &[&str]) -> String {
        self.namespace
            .as_deref()
            .and_then(|ns| namespaces.iter().position(|known| *known == ns))
            .map_or_else(
                || self.name.clone(),
                |index| format!("ns{index}:{}", self.name),
            )
    }

    fn write(&self, writer: &mut Writer<Vec<u8>>, namespaces: &[&str], root: bool) -> Result<()> {
        let tag = self.qualified_name(namespaces);
        let mut start = BytesStart::new(tag.as_str());
        if root {
            for (index, ns) in namespaces.iter().enumerate() {
                let declaration = format!("xmlns:ns{index}");
                start.push_attribute((declaration.as_str(), *ns));
            }
        }
        for attribute in &self.attributes {
            let key = attribute.qualified_name(namespaces);
            start.push_attribute((key.as_str(), attribute.value.as_str()));
        }

        if self.children.is_empty() && self.text.is_none() {
            return writer.write_event(Event::Empty(start)).map_err(encode_error);
        }

        writer.write_event(Event::Start(start)).map_err(encode_error)?;
        if let Some(text) = &self.text {
            writer
                .write_event(Event::Text(BytesText::new(text)))
                .map_err(encode_error)?;
        }
        for child in &self.children {
            child.write(writer, namespaces, false)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new(tag.as_str())))
            .map_err(encode_error)
    }

    /// Serialize as a standalone UTF-8 document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EncodeError`] if writing fails.
    pub fn to_document(&self) -> Result<Vec<u8>> {
        let mut namespaces = Vec::new();
        self.collect_namespaces(&mut namespaces);

        let mut writer = Writer::new(Vec::new());
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))
            .map_err(encode_error)?;
        self.write(&mut writer, &namespaces, true)?;
        Ok(writer.into_inner())
    }

    /// Parse a document; `Ok(None)` when it holds no element.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DecodeError`] for malformed documents.
    pub fn parse(body: &[u8]) -> Result<Option<Self>> {
        let mut reader = NsReader::from_reader(body);
        let mut buf = Vec::new();
        let mut tree = TreeBuilder::default();

        loop {
            let done = {
                let (resolved, event) = reader.read_resolved_event_into(&mut buf)?;
                let namespace = match event {
                    Event::Start(_) | Event::Empty(_) => resolve_namespace(&resolved)?,
                    _ => None,
                };
                tree.handle(&reader, namespace, event)?
            };
            buf.clear();
            if done {
                break;
            }
        }

        tree.finish()
    }
}

fn encode_error(err: quick_xml::Error) -> Error {
    Error::EncodeError(err.to_string())
}

fn utf8(bytes: &[u8]) -> Result<String> {
    std::str::from_utf8(bytes)
        .map(ToString::to_string)
        .map_err(|e| Error::DecodeError(e.to_string()))
}

fn resolve_namespace(resolved: &ResolveResult<'_>) -> Result<Option<String>> {
    match resolved {
        ResolveResult::Bound(Namespace(ns)) => utf8(ns).map(Some),
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Unknown(prefix) => Err(Error::DecodeError(format!(
            "unknown namespace prefix `{}`",
            String::from_utf8_lossy(prefix)
        ))),
    }
}

#[derive(Default)]
struct TreeBuilder {
    open: Vec<XmlElement>,
    root: Option<XmlElement>,
}

impl TreeBuilder {
    /// Consume one event; returns true at end of input.
    fn handle(
        &mut self,
        reader: &NsReader<&[u8]>,
        namespace: Option<String>,
        event: Event<'_>,
    ) -> Result<bool> {
        match event {
            Event::Start(start) => {
                let element = Self::open_element(reader, namespace, &start)?;
                self.open.push(element);
            }
            Event::Empty(start) => {
                let element = Self::open_element(reader, namespace, &start)?;
                self.close(element)?;
            }
            Event::End(_) => {
                let element = self
                    .open
                    .pop()
                    .ok_or_else(|| Error::DecodeError("unbalanced end tag".to_string()))?;
                self.close(element)?;
            }
            Event::Text(text) => {
                let text = text.unescape()?;
                self.append_text(&text);
            }
            Event::CData(data) => {
                let text = utf8(&data.into_inner())?;
                self.append_text(&text);
            }
            Event::Eof => return Ok(true),
            _ => {}
        }
        Ok(false)
    }

    fn open_element(
        reader: &NsReader<&[u8]>,
        namespace: Option<String>,
        start: &BytesStart<'_>,
    ) -> Result<XmlElement> {
        let mut element = XmlElement {
            namespace,
            name: utf8(start.local_name().as_ref())?,
            ..XmlElement::default()
        };

        for attribute in start.attributes() {
            let attribute = attribute.map_err(|e| Error::DecodeError(e.to_string()))?;
            let key = attribute.key.as_ref();
            if key == b"xmlns" || key.starts_with(b"xmlns:") {
                continue;
            }
            let (resolved, local_name) = reader.resolve_attribute(attribute.key);
            element.attributes.push(XmlAttribute {
                namespace: match resolved {
                    ResolveResult::Unknown(prefix) if prefix == b"xml" => Some(XML_NS.to_string()),
                    resolved => resolve_namespace(&resolved)?,
                },
                name: utf8(local_name.as_ref())?,
                value: attribute.unescape_value()?.into_owned(),
            });
        }

        Ok(element)
    }

    fn close(&mut self, element: XmlElement) -> Result<()> {
        if let Some(parent) = self.open.last_mut() {
            parent.children.push(element);
            return Ok(());
        }
        if self.root.is_some() {
            return Err(Error::DecodeError("multiple root elements".to_string()));
        }
        self.root = Some(element);
        Ok(())
    }

    fn append_text(&mut self, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        if let Some(current) = self.open.last_mut() {
            match current.text.as_mut() {
                Some(existing) => existing.push_str(text),
                None => current.text = Some(text.to_string()),
            }
        }
    }

    fn finish(self) -> Result<Option<XmlElement>> {
        if self.open.is_empty() {
            Ok(self.root)
        } else {
            Err(Error::DecodeError("unexpected end of document".to_string()))
        }
    }
}

/// XML codec producing [`XmlElement`] trees.
#[derive(Debug, Clone)]
pub struct XmlCodec {
    media_type: String,
}

impl XmlCodec {
    /// Create a codec using `application/xml`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            media_type: XML_MEDIA_TYPE.to_string(),
        }
    }

    /// Use a vendor media type instead of `application/xml`.
    #[must_use]
    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = media_type.into();
        self
    }
}

impl Default for XmlCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl PayloadCodec for XmlCodec {
    type Value = XmlElement;

    fn media_type(&self) -> &str {
        &self.media_type
    }

    fn encode(&self, value: &XmlElement) -> Result<Vec<u8>> {
        value.to_document()
    }

    fn decode(&self, body: &[u8]) -> Result<Option<XmlElement>> {
        if is_blank(body) {
            return Ok(None);
        }
        XmlElement::parse(body)
    }
}
