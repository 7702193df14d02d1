use std::path::Path;

use anyhow::{anyhow, Result};

pub const XBRLI_NS: &str = "http://www.xbrl.org/2003/instance";
pub const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema";
pub const LINK_NS: &str = "http://www.xbrl.org/2003/linkbase";
pub const XLINK_NS: &str = "http://www.w3.org/1999/xlink";
const XML_NS_PREFIX: &str = "xml";

#[derive(Clone, Debug, PartialEq)]
pub struct Attribute {
    pub namespace: Option<String>,
    pub name: String,
    pub value: String,
}

/// Owned copy of one XML element.
///
/// `text` mirrors `roxmltree::Node::text`: the first child text node only.
#[derive(Clone, Debug)]
pub struct Element {
    pub namespace: Option<String>,
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub text: Option<String>,
    pub children: Vec<Element>,
}

impl Element {
    fn from_node(node: roxmltree::Node) -> Self {
        let attributes = node
            .attributes()
            .map(|a| Attribute {
                namespace: a.namespace().map(String::from),
                name: a.name().to_string(),
                value: a.value().to_string(),
            })
            .collect();

        let children = node
            .children()
            .filter(|c| c.is_element())
            .map(Element::from_node)
            .collect();

        Element {
            namespace: node.tag_name().namespace().map(String::from),
            name: node.tag_name().name().to_string(),
            attributes,
            text: node.text().map(String::from),
            children,
        }
    }

    pub fn is(&self, namespace: &str, name: &str) -> bool {
        self.name == name && self.namespace.as_deref() == Some(namespace)
    }

    /// Unqualified attribute lookup.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.namespace.is_none() && a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn attribute_ns(&self, namespace: &str, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.namespace.as_deref() == Some(namespace) && a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn children_named<'a>(
        &'a self,
        namespace: &'a str,
        name: &'a str,
    ) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.is(namespace, name))
    }

    pub fn child(&self, namespace: &str, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.is(namespace, name))
    }

    /// Trimmed text content, empty when the element has no text.
    pub fn text_trimmed(&self) -> &str {
        self.text.as_deref().map(str::trim).unwrap_or("")
    }

    /// Pre-order walk starting at (and including) `self`.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }
}

pub struct Descendants<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        self.stack.extend(next.children.iter().rev());
        Some(next)
    }
}

/// A parsed XBRL document with its root-level namespace declarations.
#[derive(Clone, Debug)]
pub struct XmlDocument {
    pub root: Element,
    /// `(prefix, uri)` pairs declared on the root; `None` is the default namespace.
    pub namespaces: Vec<(Option<String>, String)>,
}

impl XmlDocument {
    pub fn parse(text: &str) -> Result<Self, roxmltree::Error> {
        let tree = roxmltree::Document::parse(text)?;
        let root = tree.root_element();

        let namespaces = root
            .namespaces()
            .filter(|ns| ns.name() != Some(XML_NS_PREFIX))
            .map(|ns| (ns.name().map(String::from), ns.uri().to_string()))
            .collect();

        Ok(XmlDocument {
            root: Element::from_node(root),
            namespaces,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read {}: {}", path.display(), e))?;
        XmlDocument::parse(&content).map_err(|e| anyhow!("Failed to parse {}: {}", path.display(), e))
    }

    /// Every element with the given expanded name, in document order.
    pub fn find_all<'a>(&'a self, namespace: &'a str, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.root.descendants().filter(move |e| e.is(namespace, name))
    }

    /// `targetNamespace` of a schema document.
    pub fn target_namespace(&self) -> Option<&str> {
        self.root.attribute("targetNamespace")
    }
}
