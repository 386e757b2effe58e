//! XML serialization.
//!
//! This module renders a `Document` tree, or one subtree of it, to XML text.
//! Whole-document output carries the XML declaration; fragments do not and
//! are what the stream controller appends to an open root element.

pub mod xml;

pub use xml::{serialize, serialize_fragment, serialize_with_options, SerializeOptions};
