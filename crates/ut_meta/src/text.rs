//! The abstract text document consumed and produced by the text modes.
//!
//! A document is a tree of named [`Node`]s. Concrete syntaxes are out of
//! scope: the tree implements `serde`'s `Serialize`/`Deserialize`, so any
//! serde format can store it.

use alloc::string::String;
use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

// -----------------------------------------------------------------------------
// Node

/// One node of a text document.
///
/// # Examples
///
/// ```
/// use ut_meta::text::Node;
///
/// let mut root = Node::new("root");
/// root.add_child(Node::attribute("id", "1"));
///
/// assert_eq!(root.find_child("id").and_then(|n| n.value.as_deref()), Some("1"));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Type tag of [`value`](Self::value), e.g. `"uint32"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    /// Marks metadata nodes (type, id, count...) as opposed to data nodes.
    #[serde(default, rename = "attribute", skip_serializing_if = "is_false")]
    pub is_attribute: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Creates an attribute node holding `value`.
    pub fn attribute(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
            is_attribute: true,
            ..Self::default()
        }
    }

    /// Appends a child and returns its index.
    pub fn add_child(&mut self, child: Node) -> usize {
        self.children.push(child);
        self.children.len() - 1
    }

    /// Index of the first child called `name`.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.children.iter().position(|c| c.name == name)
    }

    pub fn find_child(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn find_child_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.children.iter_mut().find(|c| c.name == name)
    }

    /// Children that carry data, skipping attributes.
    pub fn data_children(&self) -> impl Iterator<Item = (usize, &Node)> {
        self.children.iter().enumerate().filter(|(_, c)| !c.is_attribute)
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

#[cfg(test)]
mod tests {
    use alloc::vec;
    use alloc::vec::Vec;

    use super::Node;

    fn sample() -> Node {
        let mut root = Node::new("snapshot");
        root.add_child(Node::attribute("type", "reflective"));
        let mut value = Node::new("value");
        value.add_child(Node {
            name: "name".into(),
            value: Some("abc".into()),
            value_type: Some("string".into()),
            ..Node::default()
        });
        root.add_child(value);
        root
    }

    #[test]
    fn data_children_skip_attributes() {
        let root = sample();
        let data: Vec<_> = root.data_children().map(|(i, n)| (i, n.name.as_str())).collect();
        assert_eq!(data, vec![(1, "value")]);
        assert_eq!(root.position("value"), Some(1));
        assert!(root.find_child("missing").is_none());
    }

    #[test]
    fn json_round_trip() {
        let root = sample();
        let json = serde_json::to_string(&root).unwrap();
        let back: Node = serde_json::from_str(&json).unwrap();
        assert_eq!(back, root);
    }

    #[test]
    fn ron_round_trip() {
        let root = sample();
        let text = ron::to_string(&root).unwrap();
        let back: Node = ron::from_str(&text).unwrap();
        assert_eq!(back, root);
    }

    #[test]
    fn json_missing_fields_default() {
        let node: Node = serde_json::from_str(r#"{"name":"x","extra":5}"#).unwrap();
        assert_eq!(node, Node::new("x"));
        assert!(serde_json::from_str::<Node>(r#"{"value":"1"}"#).is_err());
    }

    #[test]
    fn empty_fields_are_not_written() {
        let json = serde_json::to_string(&Node::attribute("id", "1")).unwrap();
        assert_eq!(json, r#"{"name":"id","value":"1","attribute":true}"#);
        assert_eq!(serde_json::to_string(&Node::new("x")).unwrap(), r#"{"name":"x"}"#);
    }
}
