//! Incremental document output.
//!
//! The stream controller writes a document in pieces: the header (XML
//! declaration plus the root's opening tag), then one fragment per direct
//! child of the root, then the root's closing tag. After a fragment is
//! written, its subtree is freed from the [`Document`], so an unbounded
//! number of records can be produced under one root while only the records
//! not yet flushed are held in memory.
//!
//! The in-memory document permanently diverges from the written output once
//! a fragment has been flushed: `serialize` afterwards only shows what is
//! still in the tree.
//!
//! # State machine
//!
//! ```text
//! NotStarted --start--> Started --append*--> Started --end--> Ended
//!                                                      Ended --start--> Started
//! ```
//!
//! # Examples
//!
//! ```
//! use xmlbuilder::stream::{StreamController, StreamState};
//! use xmlbuilder::tree::Document;
//!
//! let mut doc = Document::new("records", "1.0", "UTF-8").unwrap();
//! let mut stream = StreamController::new();
//! stream.start(&doc, Box::new(std::io::sink())).unwrap();
//!
//! let record = doc.add_element(doc.root(), "record", Some("1")).unwrap();
//! stream.append(&mut doc, record).unwrap();
//! assert!(!doc.is_live(record));
//!
//! stream.end(&doc).unwrap();
//! assert_eq!(stream.state(), StreamState::Ended);
//! ```

use std::fmt;
use std::io::Write;

use crate::encoding::encode_output;
use crate::error::{BuildError, BuildResult};
use crate::serial::xml::{
    write_declaration, write_end_tag, write_start_tag, write_stream_fragment,
};
use crate::serial::SerializeOptions;
use crate::tree::{Document, NodeId};

/// Lifecycle state of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StreamState {
    /// No header has been written yet.
    #[default]
    NotStarted,
    /// The header is written and fragments may be appended.
    Started,
    /// The closing tag is written and the sink is released.
    Ended,
}

impl fmt::Display for StreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not started"),
            Self::Started => write!(f, "started"),
            Self::Ended => write!(f, "ended"),
        }
    }
}

/// Drives start/append/end writes against an append-only byte sink.
///
/// Every write is flushed before the call returns. A failed write leaves the
/// controller in the state it had before the call and, for `append`, leaves
/// the targeted subtree in the document.
#[derive(Default)]
pub struct StreamController {
    state: StreamState,
    sink: Option<Box<dyn Write>>,
    bytes_written: u64,
}

impl fmt::Debug for StreamController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamController")
            .field("state", &self.state)
            .field("bytes_written", &self.bytes_written)
            .finish_non_exhaustive()
    }
}

impl StreamController {
    /// Creates a controller in the `NotStarted` state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Returns the number of bytes written to the current (or last) sink.
    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Writes the header to `sink` and moves to `Started`.
    ///
    /// The header is the XML declaration and the root's opening tag, with
    /// the attributes the root carries right now. Children already attached
    /// to the root are not written; append them explicitly.
    ///
    /// Starting again after `Ended` begins a fresh stream over the current,
    /// already pruned tree.
    ///
    /// # Errors
    ///
    /// - `InvalidOperation` if a stream is already `Started`.
    /// - `Io` if the header cannot be written; the state is unchanged.
    pub fn start(&mut self, doc: &Document, mut sink: Box<dyn Write>) -> BuildResult<()> {
        if self.state == StreamState::Started {
            return Err(BuildError::invalid_operation(
                "stream already started; end it before starting another",
            ));
        }
        let options = SerializeOptions::from_document(doc);
        let mut header = String::new();
        write_declaration(doc, &mut header);
        if options.indent {
            header.push('\n');
        }
        write_start_tag(doc, doc.root(), &mut header);
        if options.indent {
            header.push('\n');
        }

        let written = write_flushed(&mut *sink, doc, &header)?;
        self.sink = Some(sink);
        self.state = StreamState::Started;
        self.bytes_written = written;
        tracing::debug!(bytes = written, "stream started");
        Ok(())
    }

    /// Writes one direct child of the root and frees it from the document.
    ///
    /// Returns the number of bytes written for the fragment.
    ///
    /// # Errors
    ///
    /// - `StreamNotStarted` unless the state is `Started`.
    /// - `InvalidOperation` if `element` is not a live element whose parent
    ///   is the root.
    /// - `Io` if the write fails; the element stays in the tree.
    pub fn append(&mut self, doc: &mut Document, element: NodeId) -> BuildResult<u64> {
        let Some(sink) = self.sink.as_mut().filter(|_| self.state == StreamState::Started) else {
            return Err(BuildError::StreamNotStarted { state: self.state });
        };
        if doc.node_name(element).is_none() || doc.parent(element) != Some(doc.root()) {
            return Err(BuildError::invalid_operation(
                "only live elements that are direct children of the root can be streamed",
            ));
        }

        let mut fragment = String::new();
        write_stream_fragment(doc, element, &SerializeOptions::from_document(doc), &mut fragment);
        let written = write_flushed(&mut **sink, doc, &fragment)?;
        self.bytes_written += written;

        tracing::debug!(
            element = doc.node_name(element).unwrap_or_default(),
            bytes = written,
            "fragment flushed"
        );
        doc.detach(element)?;
        Ok(written)
    }

    /// Writes the root's closing tag, releases the sink, and moves to `Ended`.
    ///
    /// A no-op when no stream was started or the stream already ended.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the write fails; the stream stays `Started`.
    pub fn end(&mut self, doc: &Document) -> BuildResult<()> {
        let Some(sink) = self.sink.as_mut().filter(|_| self.state == StreamState::Started) else {
            tracing::debug!(state = %self.state, "end requested without an open stream");
            return Ok(());
        };
        let mut footer = String::new();
        write_end_tag(doc, doc.root(), &mut footer);
        if doc.pretty_print() {
            footer.push('\n');
        }
        let written = write_flushed(&mut **sink, doc, &footer)?;
        self.bytes_written += written;
        self.sink = None;
        self.state = StreamState::Ended;
        tracing::debug!(total_bytes = self.bytes_written, "stream ended");
        Ok(())
    }
}

/// Encodes `text` in the document's output encoding, writes it, and flushes.
fn write_flushed(sink: &mut dyn Write, doc: &Document, text: &str) -> BuildResult<u64> {
    let bytes = encode_output(text, doc.output_encoding());
    sink.write_all(&bytes)?;
    sink.flush()?;
    Ok(bytes.len() as u64)
}
