//! Node type definitions.
//!
//! The `NodeKind` enum carries the payload of each node the builder can
//! produce. Navigation links (parent, children, siblings) are stored in
//! `NodeData`, not here.

use super::attributes::AttributeMap;

/// The kind of a node and its associated data.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// An element node, e.g., `<item id="1">`.
    Element {
        /// The element name, validated as an XML `Name`.
        name: String,
        /// Attributes on this element, in insertion order.
        attributes: AttributeMap,
    },

    /// A text node. Stored raw and escaped when serialized.
    Text {
        /// The unescaped text content.
        content: String,
    },

    /// A CDATA section, e.g., `<![CDATA[...]]>`.
    CData {
        /// The content, already converted from the input encoding and
        /// checked for the `]]>` terminator.
        content: String,
    },
}

impl NodeKind {
    pub(crate) fn element(name: &str) -> Self {
        Self::Element {
            name: name.to_string(),
            attributes: AttributeMap::new(),
        }
    }

    /// Returns `true` for element nodes.
    #[must_use]
    pub fn is_element(&self) -> bool {
        matches!(self, Self::Element { .. })
    }
}
