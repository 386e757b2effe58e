//! Arena-based document tree.
//!
//! All nodes live in a contiguous `Vec` of slots owned by the `Document` and
//! are referenced by `NodeId`, a generational index. Navigation links
//! (parent, first\_child, last\_child, next\_sibling, prev\_sibling) are arena
//! indices, so there are no reference cycles and no per-node ownership.
//!
//! # Freeing
//!
//! [`Document::detach`] unlinks a node from its parent and frees it together
//! with its whole subtree. A freed slot drops its payload immediately, bumps
//! its generation, and goes on a free list for reuse. Handles to freed nodes
//! are therefore detected as stale rather than silently aliasing whatever
//! node later reuses the slot. This is what keeps a streamed document's
//! memory bounded: flushed subtrees give their slots back.

mod attributes;
mod node;

pub use attributes::{Attribute, AttributeMap, AttributeValue};
pub use node::NodeKind;

use std::num::NonZeroU32;

use crate::encoding::{self, escape, Charset};
use crate::error::{BuildError, BuildResult};
use crate::util::name::is_valid_name;

/// A handle to a node in a [`Document`].
///
/// Handles are cheap to copy. A handle stays valid until its node is freed;
/// after that every operation taking it fails with `InvalidOperation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: NonZeroU32,
    generation: u32,
}

impl NodeId {
    /// Creates a `NodeId` from a raw slot index.
    ///
    /// # Panics
    ///
    /// Panics if `index` is 0 or does not fit in a `u32`.
    #[allow(clippy::expect_used)]
    fn new(index: usize, generation: u32) -> Self {
        let index = u32::try_from(index)
            .ok()
            .and_then(NonZeroU32::new)
            .expect("NodeId index must be non-zero and fit in u32");
        Self { index, generation }
    }

    /// Returns the raw index as a `usize` for indexing into the arena.
    fn as_index(self) -> usize {
        self.index.get() as usize
    }
}

/// Storage for a single live node.
///
/// Access nodes via [`Document::node`].
#[derive(Debug, Clone)]
pub struct NodeData {
    /// What kind of node this is and its payload.
    pub kind: NodeKind,
    /// Parent node. `None` for the root element and for unattached nodes.
    pub parent: Option<NodeId>,
    /// First child node.
    pub first_child: Option<NodeId>,
    /// Last child node (for O(1) append).
    pub last_child: Option<NodeId>,
    /// Next sibling.
    pub next_sibling: Option<NodeId>,
    /// Previous sibling.
    pub prev_sibling: Option<NodeId>,
}

impl NodeData {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            first_child: None,
            last_child: None,
            next_sibling: None,
            prev_sibling: None,
        }
    }

    fn vacant() -> Self {
        Self::new(NodeKind::Text {
            content: String::new(),
        })
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    live: bool,
    data: NodeData,
}

/// An XML document under construction.
///
/// The `Document` owns every node and the document-wide configuration
/// (version, output encoding, input encoding, formatting) that node creation
/// and serialization read from.
///
/// # Examples
///
/// ```
/// use xmlbuilder::tree::Document;
///
/// let mut doc = Document::new("root", "1.0", "UTF-8").unwrap();
/// let child = doc.add_element(doc.root(), "child", Some("value")).unwrap();
/// assert_eq!(doc.node_name(child), Some("child"));
/// assert_eq!(doc.text_content(child), "value");
/// ```
#[derive(Debug)]
pub struct Document {
    /// The node arena. Index 0 is unused (placeholder for `NonZeroU32`).
    slots: Vec<Slot>,
    /// Indices of freed slots available for reuse.
    free: Vec<usize>,
    /// The root element.
    root: NodeId,
    version: String,
    encoding_label: String,
    output_encoding: Charset,
    input_encoding: Charset,
    pretty_print: bool,
    indent: String,
}

impl Document {
    /// Creates a document with a root element.
    ///
    /// Pretty-print is on, the indent unit is two spaces, and the input
    /// encoding is UTF-8.
    ///
    /// # Errors
    ///
    /// - `InvalidName` if `root_name` is not a valid XML name.
    /// - `InvalidOperation` if `version` is not of the form `1.<digits>`.
    /// - `Encoding` if `encoding` is unknown or cannot be written.
    pub fn new(root_name: &str, version: &str, encoding: &str) -> BuildResult<Self> {
        if !is_valid_version(version) {
            return Err(BuildError::invalid_operation(format!(
                "invalid XML version '{version}'"
            )));
        }
        let output_encoding = encoding::resolve_output(encoding)?;
        check_name(root_name, output_encoding)?;

        let mut slots = Vec::with_capacity(64);
        // Index 0: placeholder (NodeId uses NonZeroU32)
        slots.push(Slot {
            generation: 0,
            live: false,
            data: NodeData::vacant(),
        });
        slots.push(Slot {
            generation: 0,
            live: true,
            data: NodeData::new(NodeKind::element(root_name)),
        });
        Ok(Self {
            slots,
            free: Vec::new(),
            root: NodeId::new(1, 0),
            version: version.to_string(),
            encoding_label: encoding.trim().to_string(),
            output_encoding,
            input_encoding: Charset::utf8(),
            pretty_print: true,
            indent: "  ".to_string(),
        })
    }

    // --- Configuration ---

    /// Returns the declared XML version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the output encoding label as given by the caller.
    ///
    /// This is the value written into the XML declaration.
    #[must_use]
    pub fn encoding(&self) -> &str {
        &self.encoding_label
    }

    /// Returns the resolved output encoding.
    #[must_use]
    pub fn output_encoding(&self) -> Charset {
        self.output_encoding
    }

    /// Returns the resolved input encoding used for CDATA conversion.
    #[must_use]
    pub fn input_encoding(&self) -> Charset {
        self.input_encoding
    }

    /// Sets the encoding that CDATA values are converted from.
    ///
    /// # Errors
    ///
    /// Returns `Encoding` if the label is unknown; the setting is unchanged.
    pub fn set_input_encoding(&mut self, label: &str) -> BuildResult<()> {
        self.input_encoding = encoding::resolve(label)?;
        Ok(())
    }

    /// Returns `true` if serialization inserts indentation and newlines.
    #[must_use]
    pub fn pretty_print(&self) -> bool {
        self.pretty_print
    }

    /// Enables or disables pretty-printed serialization.
    pub fn set_pretty_print(&mut self, enabled: bool) {
        self.pretty_print = enabled;
    }

    /// Returns the indentation unit used for each nesting level.
    #[must_use]
    pub fn indent(&self) -> &str {
        &self.indent
    }

    /// Sets the indentation unit used for each nesting level.
    pub fn set_indent(&mut self, indent: &str) {
        self.indent = indent.to_string();
    }

    // --- Lookup ---

    /// Returns the root element.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Returns `true` if `id` refers to a node that has not been freed.
    #[must_use]
    pub fn is_live(&self, id: NodeId) -> bool {
        self.slots
            .get(id.as_index())
            .is_some_and(|slot| slot.live && slot.generation == id.generation)
    }

    /// Returns the node data for `id`, or `None` if the handle is stale.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&NodeData> {
        self.is_live(id).then(|| self.data(id))
    }

    /// Returns the number of live nodes, attached or not.
    #[must_use]
    pub fn live_node_count(&self) -> usize {
        self.slots.len() - 1 - self.free.len()
    }

    /// Returns the element name of a node, if it is a live element.
    #[must_use]
    pub fn node_name(&self, id: NodeId) -> Option<&str> {
        match &self.node(id)?.kind {
            NodeKind::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Returns the content of a live text or CDATA node.
    #[must_use]
    pub fn node_text(&self, id: NodeId) -> Option<&str> {
        match &self.node(id)?.kind {
            NodeKind::Text { content } | NodeKind::CData { content } => Some(content),
            NodeKind::Element { .. } => None,
        }
    }

    /// Returns the concatenated text content of a node and all its descendants.
    #[must_use]
    pub fn text_content(&self, id: NodeId) -> String {
        let mut result = String::new();
        if self.is_live(id) {
            self.collect_text(id, &mut result);
        }
        result
    }

    fn collect_text(&self, id: NodeId, buf: &mut String) {
        match &self.data(id).kind {
            NodeKind::Text { content } | NodeKind::CData { content } => {
                buf.push_str(content);
            }
            NodeKind::Element { .. } => {
                for child in self.children(id) {
                    self.collect_text(child, buf);
                }
            }
        }
    }

    /// Returns the attributes of an element node in insertion order.
    ///
    /// Returns an empty slice for non-element or stale nodes.
    #[must_use]
    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        match self.node(id).map(|n| &n.kind) {
            Some(NodeKind::Element { attributes, .. }) => attributes.as_slice(),
            _ => &[],
        }
    }

    /// Returns the value of an attribute by name on an element node.
    #[must_use]
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.node(id)?.kind {
            NodeKind::Element { attributes, .. } => attributes.get(name),
            _ => None,
        }
    }

    // --- Navigation ---

    /// Returns the parent of a node.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.parent
    }

    /// Returns the first child of a node.
    #[must_use]
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.first_child
    }

    /// Returns the last child of a node.
    #[must_use]
    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.last_child
    }

    /// Returns the next sibling of a node.
    #[must_use]
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.next_sibling
    }

    /// Returns the previous sibling of a node.
    #[must_use]
    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.prev_sibling
    }

    /// Returns an iterator over the children of a node.
    ///
    /// A stale handle yields nothing.
    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            doc: self,
            next: self.first_child(id),
        }
    }

    /// Returns an iterator over a node and its ancestors (walking up to root).
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: self.is_live(id).then_some(id),
        }
    }

    // --- Mutation ---

    /// Creates an unattached element.
    ///
    /// # Errors
    ///
    /// Returns `InvalidName` if `name` is not a valid XML name.
    pub fn create_element(&mut self, name: &str) -> BuildResult<NodeId> {
        check_name(name, self.output_encoding)?;
        Ok(self.alloc(NodeKind::element(name)))
    }

    /// Appends an unattached node to the end of a parent element's children.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` if either handle is stale, `parent` is not
    /// an element, `child` is the root or already has a parent, or `child`
    /// is an ancestor of `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> BuildResult<()> {
        self.check_element(parent)?;
        self.check_live(child)?;
        if child == self.root {
            return Err(BuildError::invalid_operation(
                "the root element cannot become a child",
            ));
        }
        if self.data(child).parent.is_some() {
            return Err(BuildError::invalid_operation(
                "child already has a parent; detach it first",
            ));
        }
        if self.ancestors(parent).any(|a| a == child) {
            return Err(BuildError::invalid_operation(
                "cannot append a node to its own descendant",
            ));
        }
        self.link_child(parent, child);
        Ok(())
    }

    /// Creates an element named `name` under `parent`, optionally with text.
    ///
    /// # Errors
    ///
    /// Returns `InvalidName` for a bad name and `InvalidOperation` if
    /// `parent` is not a live element. Nothing is created on failure.
    pub fn add_element(
        &mut self,
        parent: NodeId,
        name: &str,
        value: Option<&str>,
    ) -> BuildResult<NodeId> {
        check_name(name, self.output_encoding)?;
        self.check_element(parent)?;
        let element = self.alloc(NodeKind::element(name));
        if let Some(text) = value.filter(|v| !v.is_empty()) {
            let text_node = self.alloc(NodeKind::Text {
                content: text.to_string(),
            });
            self.link_child(element, text_node);
        }
        self.link_child(parent, element);
        Ok(element)
    }

    /// Replaces all children of an element with a single text node.
    ///
    /// `None` or an empty string removes (and frees) every child, leaving
    /// the element empty.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` if `element` is not a live element.
    pub fn set_text(&mut self, element: NodeId, value: Option<&str>) -> BuildResult<()> {
        self.check_element(element)?;
        let children: Vec<NodeId> = self.children(element).collect();
        for child in children {
            self.unlink(child);
            self.free_subtree(child);
        }
        if let Some(text) = value.filter(|v| !v.is_empty()) {
            let text_node = self.alloc(NodeKind::Text {
                content: text.to_string(),
            });
            self.link_child(element, text_node);
        }
        Ok(())
    }

    /// Converts `value` from the input encoding and checks that it can be
    /// stored as CDATA in the output encoding.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCdataContent` if the bytes are malformed for the
    /// input encoding, contain characters the output encoding cannot
    /// represent, or decode to text holding `]]>` or characters XML does
    /// not allow.
    pub fn prepare_cdata(&self, value: &[u8]) -> BuildResult<String> {
        let text = encoding::convert_input(value, self.input_encoding)
            .map_err(|err| BuildError::invalid_cdata(err.message))?;
        if let Some(c) = encoding::first_unmappable(&text, self.output_encoding) {
            return Err(BuildError::InvalidCdataContent {
                message: format!(
                    "character U+{:04X} cannot be written as CDATA in {}",
                    c as u32,
                    self.output_encoding.name()
                ),
            });
        }
        escape::check_cdata(&text)?;
        Ok(text.into_owned())
    }

    /// Creates an element named `name` under `parent` wrapping one CDATA
    /// section built from `value` (see [`prepare_cdata`](Self::prepare_cdata)).
    ///
    /// With `None` the element is created empty.
    ///
    /// # Errors
    ///
    /// Returns `InvalidName`, `InvalidOperation`, or `InvalidCdataContent`.
    /// Nothing is created on failure.
    pub fn add_cdata(
        &mut self,
        parent: NodeId,
        name: &str,
        value: Option<&[u8]>,
    ) -> BuildResult<NodeId> {
        let content = value.map(|v| self.prepare_cdata(v)).transpose()?;
        self.add_prepared_cdata(parent, name, content)
    }

    /// Like [`add_cdata`](Self::add_cdata) for content that already went
    /// through [`prepare_cdata`](Self::prepare_cdata).
    pub(crate) fn add_prepared_cdata(
        &mut self,
        parent: NodeId,
        name: &str,
        content: Option<String>,
    ) -> BuildResult<NodeId> {
        self.check_new_child(parent, name)?;
        let element = self.alloc(NodeKind::element(name));
        if let Some(content) = content {
            let cdata = self.alloc(NodeKind::CData { content });
            self.link_child(element, cdata);
        }
        self.link_child(parent, element);
        Ok(element)
    }

    /// Sets an attribute, overwriting an existing value in place.
    ///
    /// # Errors
    ///
    /// Returns `InvalidName` for a bad name and `InvalidOperation` if
    /// `element` is not a live element.
    pub fn set_attribute(
        &mut self,
        element: NodeId,
        name: &str,
        value: impl Into<AttributeValue>,
    ) -> BuildResult<()> {
        check_name(name, self.output_encoding)?;
        self.attributes_mut(element)?.set(name, value.into());
        Ok(())
    }

    /// Sets several attributes in iteration order.
    ///
    /// Every name is validated before any attribute is written, so a bad
    /// name leaves the element unchanged.
    ///
    /// # Errors
    ///
    /// Same as [`set_attribute`](Self::set_attribute).
    pub fn set_attributes<I, K, V>(&mut self, element: NodeId, attributes: I) -> BuildResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<AttributeValue>,
    {
        let pending: Vec<(K, AttributeValue)> = attributes
            .into_iter()
            .map(|(name, value)| (name, value.into()))
            .collect();
        for (name, _) in &pending {
            check_name(name.as_ref(), self.output_encoding)?;
        }
        let map = self.attributes_mut(element)?;
        for (name, value) in pending {
            map.set(name.as_ref(), value);
        }
        Ok(())
    }

    /// Detaches a node from its parent and frees it with its subtree.
    ///
    /// Works on unattached nodes too, which are simply freed.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` for the root element or a stale handle.
    pub fn detach(&mut self, id: NodeId) -> BuildResult<()> {
        if id == self.root {
            return Err(BuildError::invalid_operation(
                "cannot detach the root element",
            ));
        }
        self.check_live(id)?;
        self.unlink(id);
        self.free_subtree(id);
        Ok(())
    }

    /// Checks that an element named `name` can be created under `parent`.
    pub(crate) fn check_new_child(&self, parent: NodeId, name: &str) -> BuildResult<()> {
        check_name(name, self.output_encoding)?;
        self.check_element(parent)
    }

    // --- Internals ---

    fn data(&self, id: NodeId) -> &NodeData {
        &self.slots[id.as_index()].data
    }

    fn data_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.slots[id.as_index()].data
    }

    fn check_live(&self, id: NodeId) -> BuildResult<()> {
        if self.is_live(id) {
            Ok(())
        } else {
            Err(BuildError::invalid_operation(
                "node handle is stale or belongs to another document",
            ))
        }
    }

    fn check_element(&self, id: NodeId) -> BuildResult<()> {
        self.check_live(id)?;
        if self.data(id).kind.is_element() {
            Ok(())
        } else {
            Err(BuildError::invalid_operation("node is not an element"))
        }
    }

    fn attributes_mut(&mut self, id: NodeId) -> BuildResult<&mut AttributeMap> {
        self.check_element(id)?;
        match &mut self.data_mut(id).kind {
            NodeKind::Element { attributes, .. } => Ok(attributes),
            _ => Err(BuildError::invalid_operation("node is not an element")),
        }
    }

    /// Allocates a node, reusing a freed slot when one is available.
    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index];
            slot.live = true;
            slot.data = NodeData::new(kind);
            return NodeId::new(index, slot.generation);
        }
        let index = self.slots.len();
        self.slots.push(Slot {
            generation: 0,
            live: true,
            data: NodeData::new(kind),
        });
        NodeId::new(index, 0)
    }

    /// Links an unattached node as the last child of `parent`.
    fn link_child(&mut self, parent: NodeId, child: NodeId) {
        self.data_mut(child).parent = Some(parent);

        if let Some(last) = self.data(parent).last_child {
            self.data_mut(last).next_sibling = Some(child);
            self.data_mut(child).prev_sibling = Some(last);
            self.data_mut(parent).last_child = Some(child);
        } else {
            self.data_mut(parent).first_child = Some(child);
            self.data_mut(parent).last_child = Some(child);
        }
    }

    /// Unlinks a node from its parent without freeing it.
    fn unlink(&mut self, id: NodeId) {
        let Some(parent) = self.data(id).parent else {
            return;
        };

        let prev = self.data(id).prev_sibling;
        let next = self.data(id).next_sibling;

        match prev {
            Some(p) => self.data_mut(p).next_sibling = next,
            None => self.data_mut(parent).first_child = next,
        }

        match next {
            Some(n) => self.data_mut(n).prev_sibling = prev,
            None => self.data_mut(parent).last_child = prev,
        }

        let node = self.data_mut(id);
        node.parent = None;
        node.prev_sibling = None;
        node.next_sibling = None;
    }

    /// Frees an unlinked node and all of its descendants.
    fn free_subtree(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            stack.extend(self.children(current));
            let index = current.as_index();
            let slot = &mut self.slots[index];
            slot.live = false;
            slot.generation = slot.generation.wrapping_add(1);
            slot.data = NodeData::vacant();
            self.free.push(index);
        }
        tracing::trace!(live = self.live_node_count(), "freed subtree");
    }
}

/// Checks that `name` is an XML `Name` the output encoding can spell out.
///
/// Names cannot use character references, so every character must be
/// representable in the output encoding.
fn check_name(name: &str, output: Charset) -> BuildResult<()> {
    if !is_valid_name(name) {
        return Err(BuildError::invalid_name(name));
    }
    if let Some(c) = encoding::first_unmappable(name, output) {
        return Err(BuildError::Encoding {
            message: format!(
                "name '{name}' contains U+{:04X}, which {} cannot represent",
                c as u32,
                output.name()
            ),
        });
    }
    Ok(())
}

/// Returns `true` if `version` matches the XML `VersionNum` production.
fn is_valid_version(version: &str) -> bool {
    version
        .strip_prefix("1.")
        .is_some_and(|minor| !minor.is_empty() && minor.bytes().all(|b| b.is_ascii_digit()))
}

// --- Iterators ---

/// Iterator over the children of a node.
pub struct Children<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.data(current).next_sibling;
        Some(current)
    }
}

/// Iterator over a node and its ancestors.
pub struct Ancestors<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.data(current).parent;
        Some(current)
    }
}
