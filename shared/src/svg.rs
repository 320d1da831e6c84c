//! Minimal SVG reader/writer for the base map.
//!
//! Only the subset of XML that map documents use is understood: elements,
//! attributes with quoted values, text, comments, CDATA sections and a prolog
//! (XML declaration, doctype). Character data and attribute values are kept as
//! raw markup so a document survives a read/write cycle unchanged apart from
//! inline styles.

use std::fmt::Write as _;

use crate::document::{MapDocument, NodeId, NodeKind};
use crate::error::SvgError;

pub fn parse(src: &str) -> Result<MapDocument, SvgError> {
    let mut reader = Reader { src, pos: 0 };
    let mut prolog = Vec::new();
    let mut doc: Option<MapDocument> = None;
    let mut stack: Vec<NodeId> = Vec::new();
    let mut closed_root = false;

    while !reader.at_end() {
        let start = reader.pos;
        if reader.starts_with("<?") {
            let body = reader.take_between("<?", "?>")?;
            if doc.is_none() {
                prolog.push(format!("<?{body}?>"));
            }
        } else if reader.starts_with("<!--") {
            let body = reader.take_between("<!--", "-->")?;
            match (stack.last(), doc.as_mut()) {
                (Some(&parent), Some(doc)) => {
                    doc.append_comment(parent, body);
                }
                (None, None) => prolog.push(format!("<!--{body}-->")),
                _ => {}
            }
        } else if reader.starts_with("<![CDATA[") {
            let body = reader.take_between("<![CDATA[", "]]>")?;
            let (Some(&parent), Some(doc)) = (stack.last(), doc.as_mut()) else {
                return Err(SvgError::Malformed(start));
            };
            doc.append_cdata(parent, body);
        } else if reader.starts_with("<!") {
            let body = reader.take_between("<!", ">")?;
            if doc.is_some() {
                return Err(SvgError::Malformed(start));
            }
            prolog.push(format!("<!{body}>"));
        } else if reader.starts_with("</") {
            let name = reader.take_between("</", ">")?.trim();
            let Some(open) = stack.pop() else {
                return Err(SvgError::Malformed(start));
            };
            let expected = doc
                .as_ref()
                .and_then(|doc| doc.element(open))
                .map(|element| element.tag.as_str())
                .unwrap_or_default();
            if expected != name {
                return Err(SvgError::MismatchedTag {
                    expected: expected.to_owned(),
                    found: name.to_owned(),
                });
            }
            closed_root = stack.is_empty();
        } else if reader.starts_with("<") {
            if closed_root {
                return Err(SvgError::Malformed(start));
            }
            let tag = reader.read_start_tag()?;
            let node = match (doc.as_mut(), stack.last()) {
                (None, _) => {
                    let created = MapDocument::new(tag.name);
                    let root = created.root();
                    doc = Some(created);
                    root
                }
                (Some(doc), Some(&parent)) => doc.append_element(parent, tag.name),
                (Some(_), None) => return Err(SvgError::Malformed(start)),
            };
            if let Some(doc) = doc.as_mut() {
                for (name, value) in &tag.attributes {
                    doc.set_attribute(node, name, value);
                }
            }
            if !tag.self_closing {
                stack.push(node);
            } else if stack.is_empty() {
                closed_root = true;
            }
        } else {
            let text = reader.take_text();
            match (stack.last(), doc.as_mut()) {
                (Some(&parent), Some(doc)) => {
                    doc.append_text(parent, text);
                }
                _ if text.trim().is_empty() => {}
                _ => return Err(SvgError::Malformed(start)),
            }
        }
    }

    if !stack.is_empty() {
        return Err(SvgError::UnexpectedEof);
    }
    let mut doc = doc.ok_or(SvgError::NoRootElement)?;
    doc.prolog = prolog;
    Ok(doc)
}

/// Serialize the document, writing each element's inline style back as a
/// `style` attribute.
pub fn to_svg(doc: &MapDocument) -> String {
    let mut out = String::new();
    for item in &doc.prolog {
        out.push_str(item);
        out.push('\n');
    }
    write_node(doc, doc.root(), &mut out);
    out
}

fn write_node(doc: &MapDocument, id: NodeId, out: &mut String) {
    match &doc.node(id).kind {
        NodeKind::Element(element) => {
            let _ = write!(out, "<{}", element.tag);
            for (name, value) in &element.attributes {
                let _ = write!(out, " {name}=\"{}\"", escape_quotes(value));
            }
            if !element.style.is_empty() {
                let _ = write!(out, " style=\"{}\"", escape_quotes(&element.style.to_string()));
            }
            let children = doc.children(id);
            if children.is_empty() {
                out.push_str("/>");
                return;
            }
            out.push('>');
            for &child in children {
                write_node(doc, child, out);
            }
            let _ = write!(out, "</{}>", element.tag);
        }
        NodeKind::Text(text) => out.push_str(text),
        NodeKind::Comment(text) => {
            let _ = write!(out, "<!--{text}-->");
        }
        NodeKind::CData(text) => {
            let _ = write!(out, "<![CDATA[{text}]]>");
        }
    }
}

fn escape_quotes(value: &str) -> String {
    value.replace('"', "&quot;")
}

struct StartTag<'a> {
    name: &'a str,
    attributes: Vec<(&'a str, &'a str)>,
    self_closing: bool,
}

struct Reader<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Reader<'a> {
    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn starts_with(&self, prefix: &str) -> bool {
        self.rest().starts_with(prefix)
    }

    /// Consume `open`, then everything up to and including `close`, returning
    /// what lies between.
    fn take_between(&mut self, open: &str, close: &str) -> Result<&'a str, SvgError> {
        let body_start = self.pos + open.len();
        let len = self.src[body_start..]
            .find(close)
            .ok_or(SvgError::UnexpectedEof)?;
        self.pos = body_start + len + close.len();
        Ok(&self.src[body_start..body_start + len])
    }

    fn take_text(&mut self) -> &'a str {
        let rest = self.rest();
        let len = rest.find('<').unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn take_name(&mut self) -> &'a str {
        let rest = self.rest();
        let len = rest
            .find(|c: char| c.is_whitespace() || matches!(c, '>' | '/' | '='))
            .unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    fn read_start_tag(&mut self) -> Result<StartTag<'a>, SvgError> {
        self.pos += 1;
        let name = self.take_name();
        if name.is_empty() {
            return Err(SvgError::Malformed(self.pos));
        }
        let mut attributes = Vec::new();
        loop {
            self.skip_whitespace();
            if self.at_end() {
                return Err(SvgError::UnexpectedEof);
            }
            if self.starts_with("/>") {
                self.pos += 2;
                return Ok(StartTag {
                    name,
                    attributes,
                    self_closing: true,
                });
            }
            if self.starts_with(">") {
                self.pos += 1;
                return Ok(StartTag {
                    name,
                    attributes,
                    self_closing: false,
                });
            }

            let attr_start = self.pos;
            let attr = self.take_name();
            self.skip_whitespace();
            if attr.is_empty() || !self.starts_with("=") {
                return Err(SvgError::Malformed(attr_start));
            }
            self.pos += 1;
            self.skip_whitespace();
            let quote = match self.rest().chars().next() {
                Some(q @ ('"' | '\'')) => q,
                Some(_) => return Err(SvgError::Malformed(self.pos)),
                None => return Err(SvgError::UnexpectedEof),
            };
            self.pos += 1;
            let len = self.rest().find(quote).ok_or(SvgError::UnexpectedEof)?;
            let value = &self.rest()[..len];
            self.pos += len + 1;
            attributes.push((attr, value));
        }
    }
}
