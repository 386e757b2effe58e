//! Integration tests for bounded-memory streaming to files.

#![allow(clippy::unwrap_used)]

use std::fs;
use std::path::Path;

use xmlbuilder::{BuildError, ErrorSeverity, StreamState, XmlBuilder};

fn populate(xml: &mut XmlBuilder, count: usize) {
    for i in 0..count {
        let item = xml.add_element_to_root("item", None).unwrap();
        xml.add_attribute(item, "id", i).unwrap();
        xml.add_element(item, "name", Some(&format!("Item {i}")))
            .unwrap();
        xml.add_cdata_element(item, "body", Some(format!("<p>{i}</p>")))
            .unwrap();
    }
}

fn stream_items(xml: &mut XmlBuilder, path: &Path, count: usize) {
    xml.start_stream(path).unwrap();
    for i in 0..count {
        let item = xml.add_element_to_root("item", None).unwrap();
        xml.add_attribute(item, "id", i).unwrap();
        xml.add_element(item, "name", Some(&format!("Item {i}")))
            .unwrap();
        xml.add_cdata_element(item, "body", Some(format!("<p>{i}</p>")))
            .unwrap();
        xml.append_to_stream(item).unwrap();
    }
    xml.end_stream().unwrap();
}

#[test]
fn test_pretty_stream_matches_in_memory_document() {
    let mut expected = XmlBuilder::new("catalog").unwrap();
    let root = expected.root();
    expected.add_attribute(root, "version", 2).unwrap();
    populate(&mut expected, 5);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stream.xml");
    let mut xml = XmlBuilder::new("catalog").unwrap();
    let root = xml.root();
    xml.add_attribute(root, "version", 2).unwrap();
    stream_items(&mut xml, &path, 5);

    assert_eq!(fs::read_to_string(&path).unwrap(), expected.get_xml());
}

#[test]
fn test_compact_stream_layout() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("compact.xml");
    let mut xml = XmlBuilder::new("rows").unwrap();
    xml.set_pretty_print(false);
    xml.start_stream(&path).unwrap();
    for i in 0..2 {
        let row = xml.add_element_to_root("row", Some(&i.to_string())).unwrap();
        xml.append_to_stream(row).unwrap();
    }
    xml.end_stream().unwrap();
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?><rows><row>0</row>\n<row>1</row>\n</rows>"
    );
}

#[test]
fn test_streamed_elements_are_freed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("freed.xml");
    let mut xml = XmlBuilder::new("root").unwrap();
    xml.start_stream(&path).unwrap();
    let mut peak = 0;
    for i in 0..1000 {
        let item = xml.add_element_to_root("item", Some(&i.to_string())).unwrap();
        peak = peak.max(xml.document().live_node_count());
        xml.append_to_stream(item).unwrap();
        assert!(!xml.document().is_live(item));
    }
    xml.end_stream().unwrap();
    // root + one item + its text node
    assert_eq!(peak, 3);
    assert_eq!(xml.document().live_node_count(), 1);

    let contents = fs::read_to_string(&path).unwrap();
    assert!(contents.contains("  <item>0</item>\n"));
    assert!(contents.contains("  <item>999</item>\n"));
    assert!(contents.ends_with("</root>\n"));
}

#[test]
fn test_get_xml_after_flush_shows_remaining_nodes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("partial.xml");
    let mut xml = XmlBuilder::new("root").unwrap();
    xml.set_pretty_print(false);
    let flushed = xml.add_element_to_root("flushed", None).unwrap();
    xml.add_element_to_root("kept", None).unwrap();
    xml.start_stream(&path).unwrap();
    xml.append_to_stream(flushed).unwrap();
    let out = xml.get_xml();
    assert!(!out.contains("flushed"));
    assert!(out.contains("<kept/>"));
}

#[test]
fn test_append_before_start_fails() {
    let mut xml = XmlBuilder::new("root").unwrap();
    let item = xml.add_element_to_root("item", None).unwrap();
    let err = xml.append_to_stream(item).unwrap_err();
    assert!(matches!(
        err,
        BuildError::StreamNotStarted {
            state: StreamState::NotStarted
        }
    ));
    assert!(xml.document().is_live(item));
}

#[test]
fn test_append_after_end_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ended.xml");
    let mut xml = XmlBuilder::new("root").unwrap();
    xml.start_stream(&path).unwrap();
    xml.end_stream().unwrap();
    assert_eq!(xml.stream_state(), StreamState::Ended);
    let item = xml.add_element_to_root("late", None).unwrap();
    assert!(matches!(
        xml.append_to_stream(item),
        Err(BuildError::StreamNotStarted {
            state: StreamState::Ended
        })
    ));
    let contents = fs::read_to_string(&path).unwrap();
    assert!(!contents.contains("late"));
}

#[test]
fn test_append_rejects_nested_and_root() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested.xml");
    let mut xml = XmlBuilder::new("root").unwrap();
    xml.start_stream(&path).unwrap();
    let outer = xml.add_element_to_root("outer", None).unwrap();
    let inner = xml.add_element(outer, "inner", None).unwrap();
    let root = xml.root();
    assert!(matches!(
        xml.append_to_stream(inner),
        Err(BuildError::InvalidOperation { .. })
    ));
    assert!(matches!(
        xml.append_to_stream(root),
        Err(BuildError::InvalidOperation { .. })
    ));
    xml.append_to_stream(outer).unwrap();
    assert!(xml.append_to_stream(outer).is_err());
    xml.end_stream().unwrap();
    assert_eq!(xml.get_errors().len(), 3);
}

#[test]
fn test_end_without_start_is_noop() {
    let mut xml = XmlBuilder::new("root").unwrap();
    xml.end_stream().unwrap();
    assert_eq!(xml.stream_state(), StreamState::NotStarted);
    assert!(xml.get_errors().is_empty());
}

#[test]
fn test_second_start_does_not_truncate_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("first.xml");
    let mut xml = XmlBuilder::new("root").unwrap();
    xml.start_stream(&path).unwrap();
    let item = xml.add_element_to_root("item", None).unwrap();
    xml.append_to_stream(item).unwrap();

    assert!(matches!(
        xml.start_stream(&path),
        Err(BuildError::InvalidOperation { .. })
    ));
    xml.end_stream().unwrap();
    assert!(fs::read_to_string(&path).unwrap().contains("<item/>"));
}

#[test]
fn test_restart_after_end() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("a.xml");
    let second = dir.path().join("b.xml");
    let mut xml = XmlBuilder::new("root").unwrap();
    xml.set_pretty_print(false);
    xml.start_stream(&first).unwrap();
    let a = xml.add_element_to_root("a", None).unwrap();
    xml.append_to_stream(a).unwrap();
    xml.end_stream().unwrap();

    xml.start_stream(&second).unwrap();
    assert_eq!(xml.stream_state(), StreamState::Started);
    let b = xml.add_element_to_root("b", None).unwrap();
    xml.append_to_stream(b).unwrap();
    xml.end_stream().unwrap();

    let second = fs::read_to_string(&second).unwrap();
    assert!(second.ends_with("<root><b/>\n</root>"));
    assert!(!second.contains("<a/>"));
}

#[test]
fn test_start_stream_to_unwritable_path_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("out.xml");
    let mut xml = XmlBuilder::new("root").unwrap();
    assert!(matches!(xml.start_stream(&path), Err(BuildError::Io(_))));
    assert_eq!(xml.stream_state(), StreamState::NotStarted);
    assert_eq!(xml.get_errors()[0].severity, ErrorSeverity::Fatal);
}

#[test]
fn test_stream_in_output_encoding() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("latin1.xml");
    let mut xml = XmlBuilder::with_options("root", "1.0", "ISO-8859-1").unwrap();
    xml.set_pretty_print(false);
    xml.start_stream(&path).unwrap();
    let t = xml.add_element_to_root("t", Some("caf\u{e9}")).unwrap();
    xml.append_to_stream(t).unwrap();
    xml.end_stream().unwrap();
    let bytes = fs::read(&path).unwrap();
    assert!(bytes.ends_with(b"<root><t>caf\xE9</t>\n</root>"));
}

#[test]
fn test_stream_in_us_ascii() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ascii.xml");
    let mut xml = XmlBuilder::with_options("root", "1.0", "US-ASCII").unwrap();
    xml.set_pretty_print(false);
    xml.start_stream(&path).unwrap();
    let t = xml.add_element_to_root("t", Some("na\u{ef}ve \u{20AC}")).unwrap();
    xml.append_to_stream(t).unwrap();
    xml.end_stream().unwrap();
    let bytes = fs::read(&path).unwrap();
    assert!(bytes.is_ascii());
    assert!(bytes.ends_with(b"<root><t>na&#239;ve &#8364;</t>\n</root>"));
}
