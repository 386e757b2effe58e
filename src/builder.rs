//! High-level document builder.
//!
//! [`XmlBuilder`] ties together the node model, the serializer, the stream
//! controller, and the diagnostics sink behind one mutable handle. Every
//! failed operation is returned to the caller and also recorded in the
//! diagnostics sink, which can be read at any time with
//! [`get_errors`](XmlBuilder::get_errors).
//!
//! # Examples
//!
//! ```
//! use xmlbuilder::XmlBuilder;
//!
//! let mut xml = XmlBuilder::new("root").unwrap();
//! let child = xml.add_element_to_root("child", None).unwrap();
//! xml.add_attributes(child, [("id", "10"), ("type", "example")]).unwrap();
//! xml.add_cdata_elements(xml.root(), "item", ["one", "two"]).unwrap();
//!
//! let out = xml.get_xml();
//! assert!(out.contains("<child id=\"10\" type=\"example\"/>"));
//! assert!(out.contains("<item><![CDATA[two]]></item>"));
//! ```

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::encoding::{self, escape};
use crate::error::{BuildError, BuildResult, Diagnostic, ErrorSeverity, ErrorSink};
use crate::serial;
use crate::stream::{StreamController, StreamState};
use crate::tree::{AttributeValue, Document, NodeId};

/// Builds an XML document in memory or streams it to a sink.
#[derive(Debug)]
pub struct XmlBuilder {
    doc: Document,
    stream: StreamController,
    errors: ErrorSink,
}

impl XmlBuilder {
    /// Creates a builder for a `1.0` document encoded in `UTF-8`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidName` if `root` is not a valid XML name.
    pub fn new(root: &str) -> BuildResult<Self> {
        Self::with_options(root, "1.0", "UTF-8")
    }

    /// Creates a builder with an explicit XML version and output encoding.
    ///
    /// # Errors
    ///
    /// See [`Document::new`].
    pub fn with_options(root: &str, version: &str, encoding: &str) -> BuildResult<Self> {
        Ok(Self {
            doc: Document::new(root, version, encoding)?,
            stream: StreamController::new(),
            errors: ErrorSink::new(),
        })
    }

    /// Returns the root element.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.doc.root()
    }

    /// Returns the underlying document for read access.
    #[must_use]
    pub fn document(&self) -> &Document {
        &self.doc
    }

    // --- Configuration ---

    /// Enables or disables pretty-printed output for later serialization.
    pub fn set_pretty_print(&mut self, enabled: bool) -> &mut Self {
        self.doc.set_pretty_print(enabled);
        self
    }

    /// Sets the indentation unit for pretty-printed output.
    pub fn set_indent(&mut self, indent: &str) -> &mut Self {
        self.doc.set_indent(indent);
        self
    }

    /// Sets the encoding that CDATA values are converted from.
    ///
    /// # Errors
    ///
    /// Returns `Encoding` if the label is unknown.
    pub fn set_input_encoding(&mut self, label: &str) -> BuildResult<&mut Self> {
        let result = self.doc.set_input_encoding(label);
        self.track(result)?;
        Ok(self)
    }

    // --- Node model ---

    /// Creates an unattached element.
    ///
    /// # Errors
    ///
    /// See [`Document::create_element`].
    pub fn create_element(&mut self, name: &str) -> BuildResult<NodeId> {
        let result = self.doc.create_element(name);
        self.track(result)
    }

    /// Appends an unattached node to `parent`.
    ///
    /// # Errors
    ///
    /// See [`Document::append_child`].
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> BuildResult<()> {
        let result = self.doc.append_child(parent, child);
        self.track(result)
    }

    /// Adds an element under `parent`, optionally holding `value` as text.
    ///
    /// # Errors
    ///
    /// See [`Document::add_element`].
    pub fn add_element(
        &mut self,
        parent: NodeId,
        name: &str,
        value: Option<&str>,
    ) -> BuildResult<NodeId> {
        let result = self.doc.add_element(parent, name, value);
        let element = self.track(result)?;
        if let Some(text) = value {
            self.inspect_value(&format!("text of <{name}>"), text);
        }
        Ok(element)
    }

    /// Adds an element under the root, optionally holding `value` as text.
    ///
    /// # Errors
    ///
    /// See [`Document::add_element`].
    pub fn add_element_to_root(&mut self, name: &str, value: Option<&str>) -> BuildResult<NodeId> {
        self.add_element(self.doc.root(), name, value)
    }

    /// Replaces the children of `element` with a text node (or nothing).
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` if `element` is not a live element, or if
    /// it is the root while a stream is open.
    pub fn set_text(&mut self, element: NodeId, value: Option<&str>) -> BuildResult<()> {
        let result = self
            .check_root_unlocked(element)
            .and_then(|()| self.doc.set_text(element, value));
        self.track(result)?;
        if let Some(text) = value {
            self.inspect_value("element text", text);
        }
        Ok(())
    }

    /// Adds an element under `parent` wrapping `value` in a CDATA section.
    ///
    /// `value` is converted from the input encoding when the node is created.
    /// With `None` the element is created empty.
    ///
    /// # Errors
    ///
    /// See [`Document::add_cdata`].
    pub fn add_cdata_element<V: AsRef<[u8]>>(
        &mut self,
        parent: NodeId,
        name: &str,
        value: Option<V>,
    ) -> BuildResult<NodeId> {
        let bytes: Option<&[u8]> = value.as_ref().map(|v| v.as_ref());
        let result = self.doc.add_cdata(parent, name, bytes);
        self.track(result)
    }

    /// Adds one CDATA element named `name` under `parent` per value, in order.
    ///
    /// The name, the parent, and every value are checked first; if any
    /// fails, no element is created.
    ///
    /// # Errors
    ///
    /// See [`Document::add_cdata`].
    pub fn add_cdata_elements<I, V>(
        &mut self,
        parent: NodeId,
        name: &str,
        values: I,
    ) -> BuildResult<Vec<NodeId>>
    where
        I: IntoIterator<Item = V>,
        V: AsRef<[u8]>,
    {
        let prepared = self.doc.check_new_child(parent, name).and_then(|()| {
            values
                .into_iter()
                .map(|v| self.doc.prepare_cdata(v.as_ref()))
                .collect::<BuildResult<Vec<String>>>()
        });
        let prepared = self.track(prepared)?;

        let mut created = Vec::with_capacity(prepared.len());
        for content in prepared {
            let result = self.doc.add_prepared_cdata(parent, name, Some(content));
            created.push(self.track(result)?);
        }
        Ok(created)
    }

    /// Sets an attribute on `node`, overwriting any previous value in place.
    ///
    /// # Errors
    ///
    /// See [`Document::set_attribute`]. Also `InvalidOperation` for the root
    /// while a stream is open, since its start tag is already written.
    pub fn add_attribute(
        &mut self,
        node: NodeId,
        name: &str,
        value: impl Into<AttributeValue>,
    ) -> BuildResult<()> {
        let value = value.into();
        let result = self
            .check_root_unlocked(node)
            .and_then(|()| self.doc.set_attribute(node, name, value.clone()));
        self.track(result)?;
        self.inspect_value(&format!("attribute '{name}'"), value.as_str());
        Ok(())
    }

    /// Sets several attributes on `node` in iteration order.
    ///
    /// # Errors
    ///
    /// Same as [`add_attribute`](Self::add_attribute); on error no attribute
    /// is written.
    pub fn add_attributes<I, K, V>(&mut self, node: NodeId, attributes: I) -> BuildResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<AttributeValue>,
    {
        let pending: Vec<(String, AttributeValue)> = attributes
            .into_iter()
            .map(|(name, value)| (name.as_ref().to_string(), value.into()))
            .collect();
        let result = self
            .check_root_unlocked(node)
            .and_then(|()| self.doc.set_attributes(node, pending.iter().cloned()));
        self.track(result)?;
        for (name, value) in &pending {
            self.inspect_value(&format!("attribute '{name}'"), value.as_str());
        }
        Ok(())
    }

    /// Detaches `node` from its parent and frees its subtree.
    ///
    /// # Errors
    ///
    /// See [`Document::detach`].
    pub fn detach(&mut self, node: NodeId) -> BuildResult<()> {
        let result = self.doc.detach(node);
        self.track(result)
    }

    // --- Whole-document output ---

    /// Serializes the current tree as a complete document.
    ///
    /// After streaming, this only contains nodes that were not flushed.
    #[must_use]
    pub fn get_xml(&self) -> String {
        serial::serialize(&self.doc)
    }

    /// Writes the complete document to `path` in the output encoding,
    /// replacing any existing file.
    ///
    /// Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be written.
    pub fn save_to_file(&mut self, path: impl AsRef<Path>) -> BuildResult<u64> {
        let path = path.as_ref();
        let xml = self.get_xml();
        let bytes = encoding::encode_output(&xml, self.doc.output_encoding());
        let result = std::fs::write(path, &bytes).map_err(BuildError::from);
        self.track(result)?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "document saved");
        Ok(bytes.len() as u64)
    }

    // --- Streaming ---

    /// Creates (or truncates) the file at `path` and writes the stream header.
    ///
    /// # Errors
    ///
    /// - `InvalidOperation` if a stream is already open; the file is not
    ///   touched.
    /// - `Io` if the file cannot be created or written.
    pub fn start_stream(&mut self, path: impl AsRef<Path>) -> BuildResult<()> {
        let path = path.as_ref();
        let result = self.check_not_streaming().and_then(|()| {
            let file = File::create(path)?;
            self.stream.start(&self.doc, Box::new(BufWriter::new(file)))
        });
        self.track(result)?;
        tracing::debug!(path = %path.display(), "streaming to file");
        Ok(())
    }

    /// Writes the stream header to an arbitrary byte sink.
    ///
    /// # Errors
    ///
    /// Same as [`start_stream`](Self::start_stream).
    pub fn start_stream_to<W: Write + 'static>(&mut self, sink: W) -> BuildResult<()> {
        let result = self
            .check_not_streaming()
            .and_then(|()| self.stream.start(&self.doc, Box::new(sink)));
        self.track(result)
    }

    /// Writes `element` (a direct child of the root) to the stream and frees
    /// it from the tree. Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// See [`StreamController::append`].
    pub fn append_to_stream(&mut self, element: NodeId) -> BuildResult<u64> {
        let result = self.stream.append(&mut self.doc, element);
        self.track(result)
    }

    /// Writes the root's closing tag and closes the stream.
    ///
    /// A no-op if no stream is open.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the closing tag cannot be written.
    pub fn end_stream(&mut self) -> BuildResult<()> {
        let result = self.stream.end(&self.doc);
        self.track(result)
    }

    /// Returns the current stream state.
    #[must_use]
    pub fn stream_state(&self) -> StreamState {
        self.stream.state()
    }

    // --- Diagnostics ---

    /// Returns the diagnostics collected so far, oldest first.
    #[must_use]
    pub fn get_errors(&self) -> &[Diagnostic] {
        self.errors.diagnostics()
    }

    /// Discards all collected diagnostics.
    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }

    // --- Internals ---

    fn track<T>(&mut self, result: BuildResult<T>) -> BuildResult<T> {
        result.map_err(|err| self.errors.record_failure(err))
    }

    fn check_not_streaming(&self) -> BuildResult<()> {
        if self.stream.state() == StreamState::Started {
            return Err(BuildError::invalid_operation(
                "stream already started; end it before starting another",
            ));
        }
        Ok(())
    }

    fn check_root_unlocked(&self, node: NodeId) -> BuildResult<()> {
        if node == self.doc.root() && self.stream.state() == StreamState::Started {
            return Err(BuildError::invalid_operation(
                "the root start tag is already written to the open stream",
            ));
        }
        Ok(())
    }

    /// Records warnings for characters that will not reach the output as-is.
    fn inspect_value(&mut self, context: &str, value: &str) {
        if let Some(c) = escape::first_illegal_char(value) {
            self.errors.record(Diagnostic::new(
                ErrorSeverity::Warning,
                format!(
                    "{context}: U+{:04X} is not allowed in XML and is dropped",
                    c as u32
                ),
            ));
        }
        let output = self.doc.output_encoding();
        if let Some(c) = encoding::first_unmappable(value, output) {
            self.errors.record(Diagnostic::new(
                ErrorSeverity::Warning,
                format!(
                    "{context}: U+{:04X} cannot be represented in {} and is written as a character reference",
                    c as u32,
                    output.name()
                ),
            ));
        }
    }
}
