//! XML persistence
//!
//! Reads and writes the on-disk skein document: a `<Skein>` root element
//! naming the root node and the active node, followed by one flat `<item>`
//! per node. Structure is carried by id references in each item's
//! `<children>` list, not by element nesting, so items can appear in any
//! order. Texts that must survive byte-for-byte (command, result,
//! commentary, annotation) are marked `xml:space="preserve"`.
//!
//! Loading never mutates the caller's state on failure: the document is
//! parsed into flat records first, then validated and assembled into a
//! fresh [`NodeTree`], and only a fully assembled tree is handed back.
//! Node ids are regenerated on load; the ids in the file only resolve
//! references within that file.

use std::collections::HashMap;
use std::io::Write;

use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

use crate::node::Node;
use crate::tree::{NodeId, NodeTree};

/// Value written as the document's `<generator>` element.
const GENERATOR: &str = concat!("skein-core ", env!("CARGO_PKG_VERSION"));

/// Namespace of the skein document format.
const NAMESPACE: &str = "http://www.logicalshift.org.uk/IF/Skein";

/// Errors raised by skein persistence.
#[derive(Debug, Error)]
pub enum SkeinError {
    /// Reading or writing the underlying file failed.
    #[error("skein file i/o failed: {0}")]
    Io(#[from] std::io::Error),
    /// The document is not well-formed XML.
    #[error("malformed skein XML: {0}")]
    Xml(#[from] quick_xml::Error),
    /// An element carries a malformed attribute list.
    #[error("malformed skein XML attribute: {0}")]
    Attr(#[from] AttrError),
    /// The document is well-formed XML but not a valid skein.
    #[error("invalid skein document: {0}")]
    BadFormat(String),
}

fn bad(message: impl Into<String>) -> SkeinError {
    SkeinError::BadFormat(message.into())
}

/// A parsed document, ready to replace a skein's state wholesale.
#[derive(Debug)]
pub(crate) struct Document {
    /// The reconstructed tree, with freshly generated node ids.
    pub tree: NodeTree,
    /// The node that was active when the document was saved.
    pub current: NodeId,
}

// ---------------------------------------------------------------------------
// Writing

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "YES" } else { "NO" }
}

/// Serialize the whole tree as a skein document.
pub(crate) fn write_document<W: Write>(
    tree: &NodeTree,
    current: NodeId,
    out: &mut W,
) -> Result<(), SkeinError> {
    let root = tree
        .get(tree.root())
        .expect("tree always has a live root");
    let active = tree
        .get(current)
        .expect("current always refers to a live node");

    writeln!(out, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>")?;
    writeln!(
        out,
        "<Skein rootNode=\"{}\" xmlns=\"{}\">",
        escape(root.id()),
        NAMESPACE
    )?;
    writeln!(out, "  <generator>{}</generator>", escape(GENERATOR))?;
    writeln!(out, "  <activeNode nodeId=\"{}\"/>", escape(active.id()))?;

    for id in tree.preorder() {
        let node = tree.get(id).expect("preorder yields live nodes");
        writeln!(out, "  <item nodeId=\"{}\">", escape(node.id()))?;
        writeln!(
            out,
            "    <command xml:space=\"preserve\">{}</command>",
            escape(node.command())
        )?;
        writeln!(
            out,
            "    <result xml:space=\"preserve\">{}</result>",
            escape(node.transcript_text())
        )?;
        writeln!(
            out,
            "    <commentary xml:space=\"preserve\">{}</commentary>",
            escape(node.expected_text())
        )?;
        writeln!(out, "    <played>{}</played>", yes_no(node.played()))?;
        writeln!(out, "    <changed>{}</changed>", yes_no(node.changed()))?;
        writeln!(
            out,
            "    <temporary score=\"{}\">{}</temporary>",
            node.score(),
            yes_no(node.temporary())
        )?;
        if node.has_label() {
            writeln!(
                out,
                "    <annotation xml:space=\"preserve\">{}</annotation>",
                escape(node.label())
            )?;
        }
        let children = tree.children(id);
        if !children.is_empty() {
            writeln!(out, "    <children>")?;
            for &child in children {
                let child_node = tree.get(child).expect("children are live");
                writeln!(
                    out,
                    "      <child nodeId=\"{}\"/>",
                    escape(child_node.id())
                )?;
            }
            writeln!(out, "    </children>")?;
        }
        writeln!(out, "  </item>")?;
    }
    writeln!(out, "</Skein>")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Reading

/// Flat record of one `<item>` element, before assembly.
#[derive(Default)]
struct ItemRecord {
    command: String,
    result: String,
    commentary: String,
    annotation: String,
    played: bool,
    temporary: bool,
    score: i32,
    children: Vec<String>,
}

fn attribute(element: &BytesStart, name: &str) -> Result<Option<String>, SkeinError> {
    match element.try_get_attribute(name)? {
        Some(attr) => Ok(Some(attr.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}

fn require_attribute(element: &BytesStart, name: &str) -> Result<String, SkeinError> {
    attribute(element, name)?.ok_or_else(|| {
        bad(format!(
            "<{}> element is missing its {name} attribute",
            String::from_utf8_lossy(element.name().as_ref())
        ))
    })
}

/// Which text-bearing child element of an `<item>` is currently open.
#[derive(Clone, Copy, PartialEq, Eq)]
enum TextField {
    Command,
    Result,
    Commentary,
    Annotation,
    Played,
    Temporary,
}

/// Parse a skein document from its full text.
pub(crate) fn parse_document(text: &str) -> Result<Document, SkeinError> {
    let mut reader = Reader::from_str(text);

    let mut root_id: Option<String> = None;
    let mut active_id: Option<String> = None;
    let mut items: HashMap<String, ItemRecord> = HashMap::new();
    // (id, record) of the <item> currently being read, if any.
    let mut current_item: Option<(String, ItemRecord)> = None;
    let mut open_field: Option<TextField> = None;
    let mut field_text = String::new();
    let mut seen_root_element = false;

    loop {
        let event = reader.read_event()?;
        match event {
            Event::Start(e) => match e.name().as_ref() {
                b"Skein" => {
                    seen_root_element = true;
                    root_id = Some(require_attribute(&e, "rootNode")?);
                }
                _ if !seen_root_element => {
                    return Err(bad(format!(
                        "unrecognized root element <{}>",
                        String::from_utf8_lossy(e.name().as_ref())
                    )));
                }
                b"activeNode" => {
                    active_id = Some(require_attribute(&e, "nodeId")?);
                }
                b"item" => {
                    let id = require_attribute(&e, "nodeId")?;
                    if items.contains_key(&id) || current_item.is_some() {
                        return Err(bad(format!("duplicate item id {id:?}")));
                    }
                    current_item = Some((id, ItemRecord::default()));
                }
                b"child" => {
                    let id = require_attribute(&e, "nodeId")?;
                    match current_item.as_mut() {
                        Some((_, record)) => record.children.push(id),
                        None => return Err(bad("<child> outside of an <item>")),
                    }
                }
                b"command" => open_field = Some(TextField::Command),
                b"result" => open_field = Some(TextField::Result),
                b"commentary" => open_field = Some(TextField::Commentary),
                b"annotation" => open_field = Some(TextField::Annotation),
                b"played" => open_field = Some(TextField::Played),
                b"temporary" => {
                    if let Some((_, record)) = current_item.as_mut() {
                        if let Some(score) = attribute(&e, "score")? {
                            record.score = score
                                .parse()
                                .map_err(|_| bad(format!("unreadable score {score:?}")))?;
                        }
                    }
                    open_field = Some(TextField::Temporary);
                }
                // generator, children, and anything a later version of
                // the format might add.
                _ => {}
            },
            // Self-closing elements carry no text, so no field opens.
            Event::Empty(e) => match e.name().as_ref() {
                b"Skein" => {
                    seen_root_element = true;
                    root_id = Some(require_attribute(&e, "rootNode")?);
                }
                _ if !seen_root_element => {
                    return Err(bad(format!(
                        "unrecognized root element <{}>",
                        String::from_utf8_lossy(e.name().as_ref())
                    )));
                }
                b"activeNode" => {
                    active_id = Some(require_attribute(&e, "nodeId")?);
                }
                b"child" => {
                    let id = require_attribute(&e, "nodeId")?;
                    match current_item.as_mut() {
                        Some((_, record)) => record.children.push(id),
                        None => return Err(bad("<child> outside of an <item>")),
                    }
                }
                _ => {}
            },
            Event::Text(t) => {
                if open_field.is_some() {
                    field_text.push_str(&t.unescape()?);
                }
            }
            Event::End(e) => {
                let closed = open_field.take();
                let text = std::mem::take(&mut field_text);
                if let (Some(field), Some((_, record))) = (closed, current_item.as_mut()) {
                    match field {
                        TextField::Command => record.command = text,
                        TextField::Result => record.result = text,
                        TextField::Commentary => record.commentary = text,
                        TextField::Annotation => record.annotation = text,
                        TextField::Played => record.played = text == "YES",
                        TextField::Temporary => record.temporary = text == "YES",
                    }
                }
                if e.name().as_ref() == b"item" {
                    if let Some((id, record)) = current_item.take() {
                        items.insert(id, record);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_root_element {
        return Err(bad("document has no <Skein> root element"));
    }
    let root_id = root_id.expect("rootNode recorded with the root element");
    let active_id = active_id.ok_or_else(|| bad("document has no <activeNode> element"))?;

    assemble(&root_id, &active_id, items)
}

/// Turn validated flat records into a tree with fresh ids.
fn assemble(
    root_id: &str,
    active_id: &str,
    mut items: HashMap<String, ItemRecord>,
) -> Result<Document, SkeinError> {
    let root_record = items
        .remove(root_id)
        .ok_or_else(|| bad(format!("root node {root_id:?} has no <item>")))?;

    let mut tree = NodeTree::with_root(record_to_node(&root_record));
    // Old document id -> new in-memory id, for child and active refs.
    let mut assigned: HashMap<String, NodeId> = HashMap::new();
    assigned.insert(root_id.to_owned(), tree.root());

    let mut pending: Vec<(NodeId, Vec<String>)> = vec![(tree.root(), root_record.children)];
    while let Some((parent, child_ids)) = pending.pop() {
        for child_id in child_ids {
            if assigned.contains_key(&child_id) {
                return Err(bad(format!(
                    "node {child_id:?} appears as a child more than once"
                )));
            }
            let record = items
                .remove(&child_id)
                .ok_or_else(|| bad(format!("child {child_id:?} has no <item>")))?;
            let node = tree.create_node(record_to_node(&record));
            tree.append_child(parent, node);
            assigned.insert(child_id, node);
            pending.push((node, record.children));
        }
    }
    // Items never referenced from the root are silently dropped.

    let current = *assigned
        .get(active_id)
        .ok_or_else(|| bad(format!("active node {active_id:?} is not in the tree")))?;

    Ok(Document { tree, current })
}

fn record_to_node(record: &ItemRecord) -> Node {
    // The file's <changed> flag is not trusted: changed is derived from
    // the two texts, so a stale flag cannot survive a load.
    Node::new(
        &record.command,
        &record.annotation,
        &record.result,
        &record.commentary,
        record.played,
        record.temporary,
        record.score,
    )
}
