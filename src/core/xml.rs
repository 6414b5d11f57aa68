//! Small helpers over quick-xml shared by the GIFTI and CIFTI codecs.

use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::util::{Error, Result};

/// Indented XML writer with a fixed attribute order.
pub struct XmlWriter {
    inner: Writer<Vec<u8>>,
}

impl XmlWriter {
    pub fn new() -> Self {
        Self { inner: Writer::new_with_indent(Vec::new(), b' ', 2) }
    }

    /// `<?xml version="1.0" encoding="UTF-8"?>`
    pub fn declaration(&mut self) -> Result<()> {
        self.inner
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        Ok(())
    }

    pub fn doctype(&mut self, text: &str) -> Result<()> {
        self.inner.write_event(Event::DocType(BytesText::from_escaped(text)))?;
        Ok(())
    }

    /// Open an element; attributes are written in the given order.
    pub fn start(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
        self.inner.write_event(Event::Start(element(name, attrs)))?;
        Ok(())
    }

    /// Self-closing element.
    pub fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
        self.inner.write_event(Event::Empty(element(name, attrs)))?;
        Ok(())
    }

    pub fn end(&mut self, name: &str) -> Result<()> {
        self.inner.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    /// `<name attrs>text</name>` with the text escaped.
    pub fn text_element(&mut self, name: &str, attrs: &[(&str, &str)], text: &str) -> Result<()> {
        self.inner.write_event(Event::Start(element(name, attrs)))?;
        self.inner.write_event(Event::Text(BytesText::new(text)))?;
        self.inner.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    /// `<name><![CDATA[text]]></name>`
    pub fn cdata_element(&mut self, name: &str, text: &str) -> Result<()> {
        self.inner.write_event(Event::Start(BytesStart::new(name)))?;
        self.inner.write_event(Event::CData(BytesCData::new(text)))?;
        self.inner.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    /// Finished document, newline terminated.
    pub fn finish(self) -> Vec<u8> {
        let mut buf = self.inner.into_inner();
        buf.push(b'\n');
        buf
    }
}

impl Default for XmlWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn element<'a>(name: &'a str, attrs: &[(&'a str, &'a str)]) -> BytesStart<'a> {
    let mut elem = BytesStart::new(name);
    for &attr in attrs {
        elem.push_attribute(attr);
    }
    elem
}

/// Local element name as a string.
pub fn tag_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

/// Unescaped value of attribute `key`, if present.
pub fn attr_value(e: &BytesStart<'_>, key: &str) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.local_name().as_ref() == key.as_bytes() {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Attribute `key` or a structure error naming the element.
pub fn required_attr(e: &BytesStart<'_>, key: &str) -> Result<String> {
    attr_value(e, key)?
        .ok_or_else(|| Error::invalid(format!("<{}> is missing attribute {}", tag_name(e), key)))
}

/// Attribute `key` parsed with `FromStr`.
pub fn parse_attr<T: std::str::FromStr>(e: &BytesStart<'_>, key: &str) -> Result<T> {
    let raw = required_attr(e, key)?;
    raw.trim()
        .parse()
        .map_err(|_| Error::invalid(format!("<{}> has bad {}=\"{}\"", tag_name(e), key, raw)))
}
