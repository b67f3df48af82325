//! A minimal ordered-attribute XML DOM and writer, standing in for the
//! `ElementTree` tree the original converter builds up with `ET.SubElement`
//! before a single `tree.write(...)` at the end. Nothing in the retrieval
//! pack writes generic XML, so this is hand-rolled rather than borrowed;
//! `roxmltree` (from `gltrains-openldbsvws-rs`) covers the one place this
//! pipeline needs to read XML back (the scenery `no_displacement` cache).

use std::fmt::Write as _;
use std::io::{self, Write};

/// One XML element: a tag name, attributes in insertion order, and child
/// elements. Attribute order matters here only for human-readable diffing of
/// the output, never for semantics.
#[derive(Debug, Clone, Default)]
pub struct Element {
    pub name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Element>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Element {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.push((key.into(), value.into()));
    }

    pub fn get_attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn push_child(&mut self, child: Element) -> &mut Element {
        self.children.push(child);
        self.children.last_mut().unwrap()
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    /// Depth-first search for the first descendant (including self) with the
    /// given tag name.
    pub fn find(&self, name: &str) -> Option<&Element> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }

    /// All descendants (not including self) with the given tag name,
    /// at any depth.
    pub fn find_all<'a>(&'a self, name: &'a str) -> Vec<&'a Element> {
        let mut out = Vec::new();
        self.collect_all(name, &mut out);
        out
    }

    fn collect_all<'a>(&'a self, name: &'a str, out: &mut Vec<&'a Element>) {
        for child in &self.children {
            if child.name == name {
                out.push(child);
            }
            child.collect_all(name, out);
        }
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        self.write_indented(w, 0)
    }

    fn write_indented<W: Write>(&self, w: &mut W, depth: usize) -> io::Result<()> {
        write!(w, "<{}", self.name)?;
        for (key, value) in &self.attributes {
            write!(w, " {}=\"{}\"", key, escape_attr(value))?;
        }
        if self.children.is_empty() {
            write!(w, "/>")?;
        } else {
            write!(w, ">")?;
            for child in &self.children {
                child.write_indented(w, depth + 1)?;
            }
            write!(w, "</{}>", self.name)?;
        }
        Ok(())
    }

    pub fn to_string(&self) -> String {
        let mut buf = String::new();
        self.write_to(&mut buf).expect("writing to a String never fails");
        buf
    }
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
    out
}

/// An XML document: one root element, written with the `<?xml?>`-free style
/// the original uses (`tree.write(..., encoding="unicode")`).
pub struct Document {
    pub root: Element,
}

impl Document {
    pub fn new(root: Element) -> Self {
        Document { root }
    }

    pub fn write_to_file(&self, path: &std::path::Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = String::new();
        self.root.write_to(&mut out)?;
        std::fs::File::create(path)?.write_all(out.as_bytes())
    }
}

/// Reads back the `BoundingR` attributes of every top-level
/// `Landschaft/Verknuepfte` element in a previously emitted scenery file, for
/// the `no_displacement` cache (§4.3/§4.4): when a scenery file has already
/// been converted once, re-parse it rather than converting it again, just to
/// learn the combined bounding radius a caller still needs.
pub fn max_bounding_r(xml: &str) -> Option<f64> {
    let doc = roxmltree::Document::parse(xml).ok()?;
    let root = doc.root_element();
    let landschaft = root
        .children()
        .find(|n| n.is_element() && n.tag_name().name() == "Landschaft")?;
    let mut max_r = 0.0_f64;
    for node in landschaft.children() {
        if node.is_element() && node.tag_name().name() == "Verknuepfte" {
            if let Some(r) = node.attribute("BoundingR").and_then(|s| s.parse().ok()) {
                max_r = f64::max(max_r, r);
            }
        }
    }
    Some(max_r)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_self_closing_tags_without_children() {
        let el = Element::new("Datei").attr("Dateiname", "foo.ls3");
        assert_eq!(el.to_string(), r#"<Datei Dateiname="foo.ls3"/>"#);
    }

    #[test]
    fn nests_children_in_insertion_order() {
        let el = Element::new("Signal")
            .attr("BoundingR", "12")
            .child(Element::new("p").attr("X", "1").attr("Y", "2").attr("Z", "3"))
            .child(Element::new("phi").attr("X", "0").attr("Y", "0").attr("Z", "0"));
        assert_eq!(
            el.to_string(),
            r#"<Signal BoundingR="12"><p X="1" Y="2" Z="3"/><phi X="0" Y="0" Z="0"/></Signal>"#
        );
    }

    #[test]
    fn escapes_reserved_characters_in_attribute_values() {
        let el = Element::new("ReferenzElemente").attr("Info", r#"<a> & "b""#);
        assert_eq!(
            el.to_string(),
            r#"<ReferenzElemente Info="&lt;a&gt; &amp; &quot;b&quot;"/>"#
        );
    }

    #[test]
    fn max_bounding_r_reads_back_previously_emitted_scenery() {
        let xml = r#"<Zusi><Landschaft><Verknuepfte BoundingR="4.5"><Datei Dateiname="a"/></Verknuepfte><Verknuepfte BoundingR="9.0"><Datei Dateiname="b"/></Verknuepfte></Landschaft></Zusi>"#;
        assert_eq!(max_bounding_r(xml), Some(9.0));
    }

    #[test]
    fn find_locates_nested_tag() {
        let el = Element::new("Zusi").child(Element::new("Landschaft").child(Element::new("Verknuepfte")));
        assert!(el.find("Verknuepfte").is_some());
        assert!(el.find("Missing").is_none());
    }
}
