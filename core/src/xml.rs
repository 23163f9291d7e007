//! Minimal owned XML tree.
//!
//! The decoder walks `XmlNode` rather than a borrowed `roxmltree::Node` so
//! parsed documents can be returned and stored without tying callers to the
//! lifetime of the input text.

use crate::error::RpcError;

/// Deepest element nesting accepted from a document.
pub const MAX_DEPTH: usize = 256;

/// An element with its attributes, element children and direct text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlNode {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
    /// Concatenated text of the element's direct text children.
    pub text: String,
}

impl XmlNode {
    /// Parse a document and return its root element.
    pub fn parse(text: &str) -> Result<XmlNode, RpcError> {
        let doc = roxmltree::Document::parse(text)
            .map_err(|e| RpcError::MalformedResponse(e.to_string()))?;
        Self::from_roxml(doc.root_element(), 1)
    }

    fn from_roxml(node: roxmltree::Node<'_, '_>, depth: usize) -> Result<XmlNode, RpcError> {
        if depth > MAX_DEPTH {
            return Err(RpcError::MalformedResponse(format!(
                "elements nested deeper than {MAX_DEPTH} levels"
            )));
        }
        let mut text = String::new();
        let mut children = Vec::new();
        for child in node.children() {
            if child.is_element() {
                children.push(Self::from_roxml(child, depth + 1)?);
            } else if child.is_text() {
                text.push_str(child.text().unwrap_or_default());
            }
        }
        Ok(XmlNode {
            tag: node.tag_name().name().to_string(),
            attributes: node
                .attributes()
                .map(|a| (a.name().to_string(), a.value().to_string()))
                .collect(),
            children,
            text,
        })
    }

    pub fn first_child(&self) -> Option<&XmlNode> {
        self.children.first()
    }

    pub fn child(&self, tag: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.tag == tag)
    }

    /// Depth-first, document-order search below `self` (excluding `self`).
    pub fn find_descendant(&self, tag: &str) -> Option<&XmlNode> {
        for child in &self.children {
            if child.tag == tag {
                return Some(child);
            }
            if let Some(found) = child.find_descendant(tag) {
                return Some(found);
            }
        }
        None
    }

    /// First node matching a descendant path like `params param value`, in
    /// document order. Each step may skip any number of levels.
    pub fn find_path(&self, path: &[&str]) -> Option<&XmlNode> {
        let Some((head, rest)) = path.split_first() else {
            return Some(self);
        };
        for child in &self.children {
            if child.tag == *head {
                if let Some(found) = child.find_path(rest) {
                    return Some(found);
                }
            }
            if let Some(found) = child.find_path(path) {
                return Some(found);
            }
        }
        None
    }

    /// All text below this node in document order, like DOM `textContent`.
    pub fn text_content(&self) -> String {
        if self.children.is_empty() {
            return self.text.clone();
        }
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        // Mixed content comes out text-first; XML-RPC elements never mix.
        out.push_str(&self.text);
        for child in &self.children {
            child.collect_text(out);
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}
