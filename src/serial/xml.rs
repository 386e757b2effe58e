//! XML serializer.
//!
//! Serializes a `Document` tree into a well-formed XML string. Rendering is a
//! pure function of the current tree: nothing is remembered between calls.

use crate::encoding::escape::{write_escaped_attr, write_escaped_text};
use crate::error::{BuildError, BuildResult};
use crate::tree::{Document, NodeId, NodeKind};

/// Options controlling XML serialization output.
///
/// # Examples
///
/// ```
/// use xmlbuilder::serial::{serialize_with_options, SerializeOptions};
/// use xmlbuilder::tree::Document;
///
/// let mut doc = Document::new("root", "1.0", "UTF-8").unwrap();
/// doc.add_element(doc.root(), "child", Some("Hello")).unwrap();
/// let xml = serialize_with_options(&doc, &SerializeOptions::default().indent(true));
/// assert!(xml.contains("  <child>Hello</child>"));
/// ```
#[derive(Debug, Clone)]
pub struct SerializeOptions {
    /// Whether to produce indented (pretty-printed) output.
    /// Defaults to `false`.
    pub indent: bool,
    /// The indentation string used for each level when `indent` is `true`.
    /// Defaults to two spaces.
    pub indent_str: String,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            indent: false,
            indent_str: "  ".to_string(),
        }
    }
}

impl SerializeOptions {
    /// Takes the formatting settings stored on a document.
    #[must_use]
    pub fn from_document(doc: &Document) -> Self {
        Self {
            indent: doc.pretty_print(),
            indent_str: doc.indent().to_string(),
        }
    }

    /// Enables or disables indented (pretty-printed) output.
    ///
    /// When enabled, children of element-only content are placed on their
    /// own lines with one indentation unit per nesting level. Elements that
    /// hold text or CDATA are written on a single line so the caller's
    /// content is reproduced exactly.
    #[must_use]
    pub fn indent(mut self, indent: bool) -> Self {
        self.indent = indent;
        self
    }

    /// Sets the indentation string used for each nesting level.
    ///
    /// This only takes effect when [`indent`](Self::indent) is enabled.
    #[must_use]
    pub fn indent_str(mut self, s: &str) -> Self {
        self.indent_str = s.to_string();
        self
    }
}

/// Serializes a whole document with the formatting stored on the document.
///
/// # Examples
///
/// ```
/// use xmlbuilder::serial::serialize;
/// use xmlbuilder::tree::Document;
///
/// let mut doc = Document::new("root", "1.0", "UTF-8").unwrap();
/// doc.set_pretty_print(false);
/// doc.add_element(doc.root(), "child", Some("value")).unwrap();
/// assert_eq!(
///     serialize(&doc),
///     "<?xml version=\"1.0\" encoding=\"UTF-8\"?><root><child>value</child></root>"
/// );
/// ```
#[must_use]
pub fn serialize(doc: &Document) -> String {
    serialize_with_options(doc, &SerializeOptions::from_document(doc))
}

/// Serializes a whole document: the XML declaration followed by the root
/// element.
///
/// Indented output puts a newline after the declaration and after the root
/// element. Compact output contains no whitespace that the caller did not
/// put into a value.
#[must_use]
pub fn serialize_with_options(doc: &Document, options: &SerializeOptions) -> String {
    let mut output = String::new();
    write_declaration(doc, &mut output);
    if options.indent {
        output.push('\n');
    }
    write_node(doc, doc.root(), &mut output, options, 0);
    if options.indent {
        output.push('\n');
    }
    output
}

/// Serializes one element and its subtree as a fragment without declaration.
///
/// The fragment starts at nesting depth 0: no leading indentation and no
/// trailing newline.
///
/// # Errors
///
/// Returns `InvalidOperation` if `id` is stale.
pub fn serialize_fragment(doc: &Document, id: NodeId) -> BuildResult<String> {
    if !doc.is_live(id) {
        return Err(BuildError::invalid_operation(
            "node handle is stale or belongs to another document",
        ));
    }
    let mut output = String::new();
    write_node(doc, id, &mut output, &SerializeOptions::from_document(doc), 0);
    Ok(output)
}

/// Writes `<?xml version="…" encoding="…"?>`.
pub(crate) fn write_declaration(doc: &Document, out: &mut String) {
    out.push_str("<?xml version=\"");
    out.push_str(doc.version());
    out.push_str("\" encoding=\"");
    out.push_str(doc.encoding());
    out.push_str("\"?>");
}

/// Writes the opening tag of an element, attributes included.
pub(crate) fn write_start_tag(doc: &Document, id: NodeId, out: &mut String) {
    if let Some(name) = doc.node_name(id) {
        write_open(doc, id, name, out);
        out.push('>');
    }
}

/// Writes the closing tag of an element.
pub(crate) fn write_end_tag(doc: &Document, id: NodeId, out: &mut String) {
    if let Some(name) = doc.node_name(id) {
        write_close(name, out);
    }
}

/// Writes a direct child of the root the way it appears in whole-document
/// output, followed by the newline separator.
pub(crate) fn write_stream_fragment(
    doc: &Document,
    id: NodeId,
    options: &SerializeOptions,
    out: &mut String,
) {
    if options.indent {
        out.push_str(&options.indent_str);
        write_node(doc, id, out, options, 1);
    } else {
        write_node(doc, id, out, options, 0);
    }
    out.push('\n');
}

/// Returns `true` if the element has children and all of them are elements,
/// meaning it's safe to add indentation.
fn is_element_only(doc: &Document, id: NodeId) -> bool {
    let mut children = doc.children(id).peekable();
    children.peek().is_some()
        && children.all(|child| doc.node(child).is_some_and(|n| n.kind.is_element()))
}

fn write_indent(out: &mut String, options: &SerializeOptions, depth: usize) {
    for _ in 0..depth {
        out.push_str(&options.indent_str);
    }
}

fn write_open(doc: &Document, id: NodeId, name: &str, out: &mut String) {
    out.push('<');
    out.push_str(name);
    for attr in doc.attributes(id) {
        out.push(' ');
        out.push_str(&attr.name);
        out.push_str("=\"");
        write_escaped_attr(out, &attr.value);
        out.push('"');
    }
}

fn write_close(name: &str, out: &mut String) {
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

/// Writes a node assuming the caller already wrote its leading indentation.
fn write_node(
    doc: &Document,
    id: NodeId,
    out: &mut String,
    options: &SerializeOptions,
    depth: usize,
) {
    let Some(node) = doc.node(id) else {
        return;
    };
    match &node.kind {
        NodeKind::Element { name, .. } => {
            write_open(doc, id, name, out);

            if node.first_child.is_none() {
                out.push_str("/>");
                return;
            }

            out.push('>');
            let element_only = options.indent && is_element_only(doc, id);
            if element_only {
                out.push('\n');
            }
            for child in doc.children(id) {
                if element_only {
                    write_indent(out, options, depth + 1);
                }
                write_node(doc, child, out, options, depth + 1);
                if element_only {
                    out.push('\n');
                }
            }
            if element_only {
                write_indent(out, options, depth);
            }
            write_close(name, out);
        }
        NodeKind::Text { content } => {
            write_escaped_text(out, content);
        }
        NodeKind::CData { content } => {
            out.push_str("<![CDATA[");
            out.push_str(content);
            out.push_str("]]>");
        }
    }
}
