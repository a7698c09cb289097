//! GraphML reading and writing for [`ExchangeGraph`].
//!
//! Attribute keys are declared once per name and domain. Writing infers each key's
//! `attr.type` from the values present (mixed integer and float values widen to `double`,
//! anything mixed with strings becomes `string`). Reading applies key defaults to elements
//! lacking a value and yields a multigraph only when the file contains parallel edges.
use crate::graph::{AttrValue, Attributes, ExchangeGraph};
use crate::HgcError;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;
use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::Path;

const GRAPHML_NS: &str = "http://graphml.graphdrawing.org/xmlns";
const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";
const SCHEMA_LOCATION: &str = "http://graphml.graphdrawing.org/xmlns \
    http://graphml.graphdrawing.org/xmlns/1.0/graphml.xsd";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Domain {
    Node,
    Edge,
    Graph,
    All,
}

impl Domain {
    fn as_str(&self) -> &'static str {
        match self {
            Domain::Node => "node",
            Domain::Edge => "edge",
            Domain::Graph => "graph",
            Domain::All => "all",
        }
    }
}

// ============================================================================
// Writing
// ============================================================================

/// Writes a graph as a GraphML document.
pub fn write_graphml<W: Write>(graph: &ExchangeGraph, sink: W) -> Result<(), HgcError> {
    let mut writer = Writer::new_with_indent(sink, b' ', 2);
    let keys = declare_keys(graph);

    emit(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    emit(
        &mut writer,
        Event::Start(BytesStart::new("graphml").with_attributes([
            ("xmlns", GRAPHML_NS),
            ("xmlns:xsi", XSI_NS),
            ("xsi:schemaLocation", SCHEMA_LOCATION),
        ])),
    )?;
    for ((domain, name), (id, attr_type)) in &keys {
        emit(
            &mut writer,
            Event::Empty(BytesStart::new("key").with_attributes([
                ("id", id.as_str()),
                ("for", domain.as_str()),
                ("attr.name", name.as_str()),
                ("attr.type", *attr_type),
            ])),
        )?;
    }

    let edgedefault = if graph.is_directed() { "directed" } else { "undirected" };
    emit(
        &mut writer,
        Event::Start(BytesStart::new("graph").with_attributes([("edgedefault", edgedefault)])),
    )?;
    for (id, attributes) in graph.nodes() {
        let element = BytesStart::new("node").with_attributes([("id", id)]);
        write_element(&mut writer, element, "node", Domain::Node, attributes, &keys)?;
    }
    for edge in graph.edges() {
        let key = edge.key.to_string();
        let mut element = BytesStart::new("edge");
        if graph.is_multigraph() {
            element.push_attribute(("id", key.as_str()));
        }
        element.push_attribute(("source", edge.source.as_str()));
        element.push_attribute(("target", edge.target.as_str()));
        write_element(&mut writer, element, "edge", Domain::Edge, &edge.attributes, &keys)?;
    }
    emit(&mut writer, Event::End(BytesEnd::new("graph")))?;
    emit(&mut writer, Event::End(BytesEnd::new("graphml")))?;
    writer.into_inner().flush()?;
    Ok(())
}

/// Renders a graph as a GraphML string.
pub fn to_graphml_string(graph: &ExchangeGraph) -> Result<String, HgcError> {
    let mut buffer = Vec::new();
    write_graphml(graph, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| HgcError::Io(std::io::Error::other(e)))
}

/// Writes a graph to a GraphML file, replacing any existing file.
pub fn write_graphml_file(graph: &ExchangeGraph, path: impl AsRef<Path>) -> Result<(), HgcError> {
    let file = std::fs::File::create(path.as_ref())?;
    write_graphml(graph, std::io::BufWriter::new(file))
}

type KeyTable = BTreeMap<(Domain, String), (String, &'static str)>;

fn declare_keys(graph: &ExchangeGraph) -> KeyTable {
    let mut types: BTreeMap<(Domain, String), &'static str> = BTreeMap::new();
    let node_attributes = graph.nodes().map(|(_, attributes)| (Domain::Node, attributes));
    let edge_attributes = graph.edges().iter().map(|edge| (Domain::Edge, &edge.attributes));
    for (domain, attributes) in node_attributes.chain(edge_attributes) {
        for (name, value) in attributes {
            let entry = types.entry((domain, name.clone())).or_insert(value.graphml_type());
            *entry = widen(*entry, value.graphml_type());
        }
    }
    types
        .into_iter()
        .enumerate()
        .map(|(n, (key, attr_type))| (key, (format!("d{n}"), attr_type)))
        .collect()
}

fn widen(current: &'static str, next: &'static str) -> &'static str {
    match (current, next) {
        (a, b) if a == b => a,
        ("long", "double") | ("double", "long") => "double",
        ("boolean", "long") | ("long", "boolean") => "long",
        ("boolean", "double") | ("double", "boolean") => "double",
        _ => "string",
    }
}

fn write_element<W: Write>(
    writer: &mut Writer<W>,
    element: BytesStart<'_>,
    tag: &str,
    domain: Domain,
    attributes: &Attributes,
    keys: &KeyTable,
) -> Result<(), HgcError> {
    if attributes.is_empty() {
        return emit(writer, Event::Empty(element));
    }
    emit(writer, Event::Start(element))?;
    for (name, value) in attributes {
        let Some((id, _)) = keys.get(&(domain, name.clone())) else {
            continue;
        };
        let text = value.to_string();
        emit(
            writer,
            Event::Start(BytesStart::new("data").with_attributes([("key", id.as_str())])),
        )?;
        emit(writer, Event::Text(BytesText::new(&text)))?;
        emit(writer, Event::End(BytesEnd::new("data")))?;
    }
    emit(writer, Event::End(BytesEnd::new(tag)))
}

fn emit<W: Write>(writer: &mut Writer<W>, event: Event<'_>) -> Result<(), HgcError> {
    writer
        .write_event(event)
        .map_err(|e| HgcError::Io(std::io::Error::other(e.to_string())))
}

// ============================================================================
// Reading
// ============================================================================

#[derive(Debug, Clone)]
struct KeyDef {
    name: String,
    domain: Domain,
    attr_type: String,
    default: Option<String>,
}

#[derive(Debug, Default)]
struct PendingElement {
    id: Option<String>,
    source: Option<String>,
    target: Option<String>,
    attributes: Attributes,
}

#[derive(Debug)]
struct PendingEdge {
    source: String,
    target: String,
    attributes: Attributes,
}

/// Parses a GraphML document.
///
/// # Returns
/// * The graph, or `UnreadableSource` if the document is not well formed, an element is
///   missing a required attribute, or a value does not match its key's declared type.
pub fn read_graphml(input: &str) -> Result<ExchangeGraph, HgcError> {
    GraphmlReader::default().read(input)
}

/// Reads and parses a GraphML file.
pub fn read_graphml_file(path: impl AsRef<Path>) -> Result<ExchangeGraph, HgcError> {
    let path = path.as_ref();
    let input = std::fs::read_to_string(path).map_err(|e| HgcError::unreadable(path, e))?;
    read_graphml(&input).map_err(|e| match e {
        HgcError::UnreadableSource { reason, .. } => HgcError::unreadable(path, reason),
        other => other,
    })
}

#[derive(Default)]
struct GraphmlReader {
    keys: HashMap<String, KeyDef>,
    current_key: Option<String>,
    current: Option<(Domain, PendingElement)>,
    current_data: Option<String>,
    text: String,
    directed: bool,
    nodes: Vec<(String, Attributes)>,
    edges: Vec<PendingEdge>,
}

impl GraphmlReader {
    fn read(mut self, input: &str) -> Result<ExchangeGraph, HgcError> {
        // Text is kept verbatim; whitespace between elements is dropped when the next
        // element opens.
        let mut reader = Reader::from_str(input);
        loop {
            match reader.read_event().map_err(parse_error)? {
                Event::Eof => break,
                Event::Start(element) => self.open(&element)?,
                Event::Empty(element) => {
                    self.open(&element)?;
                    self.close(element.local_name().as_ref())?;
                }
                Event::End(element) => self.close(element.local_name().as_ref())?,
                Event::Text(text) => {
                    let text = text.unescape().map_err(parse_error)?;
                    self.text.push_str(&text);
                }
                Event::CData(data) => {
                    self.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
                _ => {}
            }
        }
        Ok(self.finish())
    }

    fn open(&mut self, element: &BytesStart<'_>) -> Result<(), HgcError> {
        self.text.clear();
        let attributes = xml_attributes(element)?;
        match element.local_name().as_ref() {
            b"key" => {
                let id = required(&attributes, "id", "key")?;
                let domain = match attributes.get("for").map(String::as_str) {
                    Some("node") => Domain::Node,
                    Some("edge") => Domain::Edge,
                    Some("graph") => Domain::Graph,
                    _ => Domain::All,
                };
                let name = attributes.get("attr.name").cloned().unwrap_or_else(|| id.clone());
                let attr_type = attributes
                    .get("attr.type")
                    .cloned()
                    .unwrap_or_else(|| "string".to_string());
                self.keys.insert(
                    id.clone(),
                    KeyDef {
                        name,
                        domain,
                        attr_type,
                        default: None,
                    },
                );
                self.current_key = Some(id);
            }
            b"graph" => {
                self.directed = attributes.get("edgedefault").map(String::as_str) == Some("directed");
            }
            b"node" => {
                let pending = PendingElement {
                    id: Some(required(&attributes, "id", "node")?),
                    ..PendingElement::default()
                };
                self.current = Some((Domain::Node, pending));
            }
            b"edge" => {
                let pending = PendingElement {
                    id: attributes.get("id").cloned(),
                    source: Some(required(&attributes, "source", "edge")?),
                    target: Some(required(&attributes, "target", "edge")?),
                    attributes: Attributes::new(),
                };
                self.current = Some((Domain::Edge, pending));
            }
            b"data" => {
                self.current_data = Some(required(&attributes, "key", "data")?);
            }
            _ => {}
        }
        Ok(())
    }

    fn close(&mut self, name: &[u8]) -> Result<(), HgcError> {
        match name {
            b"default" => {
                if let Some(key) = self.current_key.as_ref().and_then(|id| self.keys.get_mut(id)) {
                    key.default = Some(std::mem::take(&mut self.text));
                }
            }
            b"key" => self.current_key = None,
            b"data" => {
                let text = std::mem::take(&mut self.text);
                if let (Some(key_id), Some((_, pending))) =
                    (self.current_data.take(), self.current.as_mut())
                {
                    let (name, value) = match self.keys.get(&key_id) {
                        Some(key) => (key.name.clone(), convert(&text, &key.attr_type)?),
                        None => (key_id, AttrValue::Str(text)),
                    };
                    pending.attributes.insert(name, value);
                }
            }
            b"node" | b"edge" => {
                if let Some((domain, mut pending)) = self.current.take() {
                    self.apply_defaults(domain, &mut pending.attributes)?;
                    match (domain, pending) {
                        (
                            Domain::Node,
                            PendingElement {
                                id: Some(id),
                                attributes,
                                ..
                            },
                        ) => self.nodes.push((id, attributes)),
                        (
                            Domain::Edge,
                            PendingElement {
                                source: Some(source),
                                target: Some(target),
                                attributes,
                                ..
                            },
                        ) => self.edges.push(PendingEdge {
                            source,
                            target,
                            attributes,
                        }),
                        _ => {}
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn apply_defaults(&self, domain: Domain, attributes: &mut Attributes) -> Result<(), HgcError> {
        for key in self.keys.values() {
            if key.domain != domain && key.domain != Domain::All {
                continue;
            }
            if let Some(default) = &key.default {
                if !attributes.contains_key(&key.name) {
                    attributes.insert(key.name.clone(), convert(default, &key.attr_type)?);
                }
            }
        }
        Ok(())
    }

    fn finish(self) -> ExchangeGraph {
        let directed = self.directed;
        let has_parallel_edges = self.edges.iter().enumerate().any(|(n, edge)| {
            self.edges[..n].iter().any(|earlier| {
                (earlier.source == edge.source && earlier.target == edge.target)
                    || (!directed && earlier.source == edge.target && earlier.target == edge.source)
            })
        });

        let mut graph = if has_parallel_edges {
            ExchangeGraph::new_multigraph()
        } else {
            ExchangeGraph::new()
        };
        graph.set_directed(directed);
        for (id, attributes) in self.nodes {
            graph.add_node(id, attributes);
        }
        for edge in self.edges {
            graph.add_edge(edge.source, edge.target, edge.attributes);
        }
        graph
    }
}

fn xml_attributes(element: &BytesStart<'_>) -> Result<HashMap<String, String>, HgcError> {
    let mut attributes = HashMap::new();
    for attribute in element.attributes() {
        let attribute = attribute.map_err(parse_error)?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute.unescape_value().map_err(parse_error)?.into_owned();
        attributes.insert(key, value);
    }
    Ok(attributes)
}

fn required(
    attributes: &HashMap<String, String>,
    name: &str,
    element: &str,
) -> Result<String, HgcError> {
    attributes.get(name).cloned().ok_or_else(|| {
        HgcError::unreadable("<graphml>", format!("<{element}> is missing the \"{name}\" attribute"))
    })
}

fn convert(text: &str, attr_type: &str) -> Result<AttrValue, HgcError> {
    let trimmed = text.trim();
    let invalid = || {
        HgcError::unreadable(
            "<graphml>",
            format!("\"{trimmed}\" is not a valid {attr_type} value"),
        )
    };
    match attr_type {
        "boolean" => match trimmed.to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(AttrValue::Bool(true)),
            "false" | "0" => Ok(AttrValue::Bool(false)),
            _ => Err(invalid()),
        },
        "int" | "long" => trimmed.parse().map(AttrValue::Int).map_err(|_| invalid()),
        "float" | "double" => trimmed.parse().map(AttrValue::Float).map_err(|_| invalid()),
        _ => Ok(AttrValue::Str(text.to_string())),
    }
}

fn parse_error(error: impl std::fmt::Display) -> HgcError {
    HgcError::unreadable("<graphml>", error)
}
