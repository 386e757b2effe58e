//! # xmlbuilder
//!
//! Builds XML documents from an in-memory element tree, either serializing
//! the whole document at once or streaming it in bounded memory: write the
//! declaration and root start tag, append top-level elements one by one
//! (each is freed after it is written), then close the root.
//!
//! ## Quick Start
//!
//! ```
//! use xmlbuilder::XmlBuilder;
//!
//! let mut xml = XmlBuilder::new("root").unwrap();
//! xml.add_element_to_root("child", Some("value")).unwrap();
//! assert!(xml.get_xml().contains("<child>value</child>"));
//! ```
//!
//! ## Streaming
//!
//! ```
//! use xmlbuilder::{StreamState, XmlBuilder};
//!
//! let dir = std::env::temp_dir().join("xmlbuilder-doc-stream.xml");
//! let mut xml = XmlBuilder::new("rows").unwrap();
//! xml.start_stream(&dir).unwrap();
//! for i in 0..3 {
//!     let row = xml.add_element_to_root("row", None).unwrap();
//!     xml.add_attribute(row, "n", i).unwrap();
//!     xml.append_to_stream(row).unwrap();
//! }
//! xml.end_stream().unwrap();
//! assert_eq!(xml.stream_state(), StreamState::Ended);
//! # std::fs::remove_file(&dir).unwrap();
//! ```

pub mod builder;
pub mod encoding;
pub mod error;
pub mod serial;
pub mod stream;
pub mod tree;
pub mod util;

// Re-export primary types at the crate root for convenience.
pub use builder::XmlBuilder;
pub use error::{BuildError, BuildResult, Diagnostic, ErrorSeverity};
pub use stream::StreamState;
pub use tree::{AttributeValue, Document, NodeId};
